use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::core_types::Element;
use crate::error::{ForgeError, ForgeResult};
use crate::prism::Prism;

/// A character or word as loaded, before element names are resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCodable {
    pub name: String,
    /// Whitespace-separated element labels in component order.
    pub sequence: String,
    pub frequency: u64,
    /// Keys kept as a priority short code.
    #[serde(default)]
    pub level: Option<usize>,
    #[serde(default)]
    pub reading: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

impl RawCodable {
    pub fn new(name: &str, sequence: &str, frequency: u64) -> Self {
        Self {
            name: name.to_string(),
            sequence: sequence.to_string(),
            frequency,
            level: None,
            reading: None,
            tag: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CodableObject {
    pub name: String,
    pub sequence: Vec<Element>,
    pub frequency: u64,
    pub level: Option<usize>,
    pub reading: Option<String>,
    pub tag: Option<String>,
    /// Position in the input, used to print code tables in input order.
    pub original_order: usize,
    /// Frequency rank among characters or among words.
    pub group_rank: usize,
    /// Too long to encode in full; always scored as a duplicate.
    pub degenerate: bool,
}

impl CodableObject {
    pub fn word_length(&self) -> usize {
        self.name.chars().count()
    }

    pub fn is_character(&self) -> bool {
        self.word_length() == 1
    }
}

/// Objects in descending frequency, stable on input order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub objects: Vec<CodableObject>,
    pub character_count: usize,
    pub word_count: usize,
}

impl Corpus {
    pub fn build(raw: Vec<RawCodable>, prism: &Prism, max_length: usize) -> ForgeResult<Self> {
        let mut objects = Vec::with_capacity(raw.len());
        let mut degenerate_count = 0;

        for (original_order, r) in raw.into_iter().enumerate() {
            let mut sequence = Vec::new();
            for label in r.sequence.split_whitespace() {
                let element = prism.element(label).ok_or_else(|| {
                    ForgeError::Validation(format!(
                        "'{}' references unknown element '{}'",
                        r.name, label
                    ))
                })?;
                sequence.push(element);
            }
            if sequence.is_empty() {
                return Err(ForgeError::Validation(format!(
                    "'{}' has an empty element sequence",
                    r.name
                )));
            }
            if let Some(level) = r.level {
                if level == 0 || level > max_length {
                    return Err(ForgeError::Validation(format!(
                        "'{}' has priority level {} outside 1..={}",
                        r.name, level, max_length
                    )));
                }
            }
            let degenerate = sequence.len() > max_length;
            if degenerate {
                degenerate_count += 1;
                sequence.truncate(max_length);
            }
            objects.push(CodableObject {
                name: r.name,
                sequence,
                frequency: r.frequency,
                level: r.level,
                reading: r.reading,
                tag: r.tag,
                original_order,
                group_rank: 0,
                degenerate,
            });
        }

        if degenerate_count > 0 {
            warn!(
                "{} objects exceed max_length {} and are scored as duplicates",
                degenerate_count, max_length
            );
        }

        objects.sort_by(|a, b| b.frequency.cmp(&a.frequency));

        let mut character_count = 0;
        let mut word_count = 0;
        for object in objects.iter_mut() {
            if object.is_character() {
                object.group_rank = character_count;
                character_count += 1;
            } else {
                object.group_rank = word_count;
                word_count += 1;
            }
        }

        info!(
            "Corpus: {} characters, {} words",
            character_count, word_count
        );

        Ok(Self {
            objects,
            character_count,
            word_count,
        })
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// For each element, the objects whose sequence contains it.
    pub fn involvement(&self, element_count: usize) -> Vec<Vec<usize>> {
        let mut involved = vec![Vec::new(); element_count];
        for (index, object) in self.objects.iter().enumerate() {
            for &element in &object.sequence {
                let list: &mut Vec<usize> = &mut involved[element];
                if list.last() != Some(&index) {
                    list.push(index);
                }
            }
        }
        involved
    }
}

/// Penalties for drifting away from the ideal share of a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionLoss {
    /// Ideal usage, in percent.
    pub ideal: f64,
    pub lt_penalty: f64,
    pub gt_penalty: f64,
}

/// Reference tables consumed by the objective.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Assets {
    pub key_distribution: BTreeMap<char, DistributionLoss>,
    /// Equivalence of typing each key n-gram.
    pub pair_equivalence: BTreeMap<String, f64>,
}
