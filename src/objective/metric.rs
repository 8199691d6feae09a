use serde::{Deserialize, Serialize};
use std::fmt;
use strum::IntoEnumIterator;

use super::fingering::FingeringKind;
use crate::config::MetricGroup;
use crate::consts::FINGERING_LABEL_COUNT;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelMetric {
    pub length: usize,
    pub frequency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelCount {
    pub length: usize,
    pub count: i64,
}

/// Unweighted counts among the most frequent objects of a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierMetric {
    pub top: Option<usize>,
    pub duplication: Option<i64>,
    pub levels: Option<Vec<LevelCount>>,
    pub fingering: Option<[Option<i64>; FINGERING_LABEL_COUNT]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupMetric {
    pub tiers: Option<Vec<TierMetric>>,
    pub duplication: Option<f64>,
    pub key_distribution: Option<f64>,
    pub pair_equivalence: Option<f64>,
    pub fingering: Option<[Option<f64>; FINGERING_LABEL_COUNT]>,
    pub levels: Option<Vec<LevelMetric>>,
}

/// Breakdown of a loss across the four metric groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub characters_full: Option<GroupMetric>,
    pub characters_short: Option<GroupMetric>,
    pub words_full: Option<GroupMetric>,
    pub words_short: Option<GroupMetric>,
}

impl Metric {
    pub fn group(&self, group: MetricGroup) -> Option<&GroupMetric> {
        match group {
            MetricGroup::CharactersFull => self.characters_full.as_ref(),
            MetricGroup::CharactersShort => self.characters_short.as_ref(),
            MetricGroup::WordsFull => self.words_full.as_ref(),
            MetricGroup::WordsShort => self.words_short.as_ref(),
        }
    }

    pub fn set_group(&mut self, group: MetricGroup, metric: GroupMetric) {
        let slot = match group {
            MetricGroup::CharactersFull => &mut self.characters_full,
            MetricGroup::CharactersShort => &mut self.characters_short,
            MetricGroup::WordsFull => &mut self.words_full,
            MetricGroup::WordsShort => &mut self.words_short,
        };
        *slot = Some(metric);
    }
}

fn fingering_name(slot: usize) -> String {
    FingeringKind::iter()
        .find(|k| *k as usize == slot)
        .map(|k| k.to_string())
        .unwrap_or_else(|| format!("label_{}", slot))
}

impl fmt::Display for GroupMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tiers) = &self.tiers {
            for tier in tiers {
                let top = tier
                    .top
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "all".into());
                if let Some(d) = tier.duplication {
                    write!(f, "top {} duplicates {}; ", top, d)?;
                }
                if let Some(levels) = &tier.levels {
                    for level in levels {
                        write!(f, "top {} length {}: {}; ", top, level.length, level.count)?;
                    }
                }
                if let Some(fingering) = &tier.fingering {
                    for (slot, value) in fingering.iter().enumerate() {
                        if let Some(v) = value {
                            write!(f, "top {} {}: {}; ", top, fingering_name(slot), v)?;
                        }
                    }
                }
            }
        }
        if let Some(d) = self.duplication {
            write!(f, "duplication {:.2}%; ", d * 100.0)?;
        }
        if let Some(d) = self.key_distribution {
            write!(f, "key distribution {:.4}; ", d)?;
        }
        if let Some(e) = self.pair_equivalence {
            write!(f, "pair equivalence {:.4}; ", e)?;
        }
        if let Some(fingering) = &self.fingering {
            for (slot, value) in fingering.iter().enumerate() {
                if let Some(v) = value {
                    write!(f, "{} {:.2}%; ", fingering_name(slot), v * 100.0)?;
                }
            }
        }
        if let Some(levels) = &self.levels {
            for level in levels {
                write!(f, "length {} {:.2}%; ", level.length, level.frequency * 100.0)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for group in MetricGroup::iter() {
            if let Some(metric) = self.group(group) {
                writeln!(f, "{}: {}", group, metric)?;
            }
        }
        Ok(())
    }
}
