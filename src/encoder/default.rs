use tracing::debug;

use super::space::CodeSpace;
use super::{CodeInfo, Encoder, PartialCode};
use crate::config::EncoderConfig;
use crate::consts::MAX_WORD_LENGTH;
use crate::core_types::{Code, Element, Key};
use crate::corpus::Corpus;
use crate::error::{ForgeError, ForgeResult};
use crate::mapping::ElementMapping;
use crate::prism::Prism;

#[derive(Debug, Clone)]
struct CompiledScheme {
    prefix: usize,
    count: u8,
    select_keys: Vec<Key>,
}

/// How a key code becomes the code actually typed.
#[derive(Debug, Clone)]
struct SelectRule {
    weights: Vec<u64>,
    select_keys: Vec<Key>,
    auto_select_length: Option<usize>,
    max_length: usize,
}

impl SelectRule {
    #[inline(always)]
    fn auto_selects(&self, length: usize) -> bool {
        length >= self.max_length || self.auto_select_length.map_or(true, |l| length >= l)
    }

    #[inline(always)]
    fn wrap(&self, code: Code, rank: u8, length: usize, keys: Option<&[Key]>) -> Code {
        if rank == 0 && self.auto_selects(length) {
            return code;
        }
        let keys = keys.unwrap_or(&self.select_keys);
        let select = keys
            .get(rank as usize)
            .or(keys.first())
            .copied()
            .unwrap_or(0);
        code + select * self.weights[length]
    }

    #[inline(always)]
    fn compose(&self, sequence: &[Element], mapping: &ElementMapping) -> Code {
        sequence
            .iter()
            .zip(&self.weights)
            .map(|(&e, &w)| mapping[e] * w)
            .sum()
    }
}

pub struct DefaultEncoder {
    sequences: Vec<Vec<Element>>,
    levels: Vec<Option<usize>>,
    degenerate: Vec<bool>,
    involvement: Vec<Vec<usize>>,
    raw: Vec<Code>,
    buffer: Vec<CodeInfo>,
    select: SelectRule,
    short_rules: Option<Vec<Vec<CompiledScheme>>>,
    full_space: CodeSpace,
    short_space: CodeSpace,
    encoded: bool,
}

impl DefaultEncoder {
    pub fn new(corpus: &Corpus, prism: &Prism, config: &EncoderConfig) -> ForgeResult<Self> {
        let radix = prism.radix;
        let weights: Vec<u64> = (0..=config.max_length as u32 + 1)
            .map(|i| radix.pow(i))
            .collect();

        let short_rules = match &config.short_code {
            Some(rules) => Some(Self::compile_rules(rules, prism)?),
            None => None,
        };

        let buffer = corpus
            .objects
            .iter()
            .map(|o| CodeInfo {
                frequency: o.frequency,
                word_length: o.word_length(),
                group_rank: o.group_rank,
                ..Default::default()
            })
            .collect();

        let space = weights[config.max_length];
        debug!(
            "Encoder: radix {}, max_length {}, {} objects",
            radix,
            config.max_length,
            corpus.len()
        );

        Ok(Self {
            sequences: corpus.objects.iter().map(|o| o.sequence.clone()).collect(),
            levels: corpus.objects.iter().map(|o| o.level).collect(),
            degenerate: corpus.objects.iter().map(|o| o.degenerate).collect(),
            involvement: corpus.involvement(prism.element_count()),
            raw: vec![0; corpus.len()],
            buffer,
            select: SelectRule {
                weights,
                select_keys: prism.select_keys.clone(),
                auto_select_length: config.auto_select_length,
                max_length: config.max_length,
            },
            short_rules,
            full_space: CodeSpace::new(space),
            short_space: CodeSpace::new(space),
            encoded: false,
        })
    }

    /// One scheme list per word length. Every rule covering a length appends
    /// its schemes, so overlapping rules are tried in configuration order.
    fn compile_rules(
        rules: &[crate::config::ShortCodeConfig],
        prism: &Prism,
    ) -> ForgeResult<Vec<Vec<CompiledScheme>>> {
        let mut table = vec![Vec::new(); MAX_WORD_LENGTH];
        for rule in rules {
            let mut compiled = Vec::new();
            for scheme in rule.schemes() {
                let select_keys = match &scheme.select_keys {
                    Some(chars) => {
                        let mut keys = Vec::with_capacity(chars.len());
                        for &c in chars {
                            let key = prism.key(c).ok_or_else(|| {
                                ForgeError::Config(format!(
                                    "short code select key '{}' is not a known key",
                                    c
                                ))
                            })?;
                            keys.push(key);
                        }
                        keys
                    }
                    None => prism.select_keys.clone(),
                };
                let count = scheme.count.unwrap_or(1);
                if count > select_keys.len() {
                    return Err(ForgeError::Config(format!(
                        "short code count {} exceeds its {} select key(s)",
                        count,
                        select_keys.len()
                    )));
                }
                compiled.push(CompiledScheme {
                    prefix: scheme.prefix,
                    count: count.min(u8::MAX as usize) as u8,
                    select_keys: select_keys[..count].to_vec(),
                });
            }
            let (lo, hi) = rule.length_range();
            for length in lo..=hi {
                table[length - 1].extend(compiled.iter().cloned());
            }
        }
        Ok(table)
    }

    fn assign_full(&mut self) {
        self.full_space.reset();
        for (i, info) in self.buffer.iter_mut().enumerate() {
            let code = self.raw[i];
            let length = self.sequences[i].len();
            let rank = self.full_space.rank(code);
            self.full_space.insert(code);
            info.full = PartialCode {
                code,
                rank,
                actual: self.select.wrap(code, rank, length, None),
                duplicate: rank > 0 || self.degenerate[i],
            };
        }
    }

    fn assign_short(&mut self) {
        self.short_space.reset();
        let Some(rules) = &self.short_rules else {
            for info in self.buffer.iter_mut() {
                info.short = info.full;
            }
            return;
        };

        // Priority short codes claim their prefixes first.
        for (i, info) in self.buffer.iter_mut().enumerate() {
            let Some(level) = self.levels[i] else {
                continue;
            };
            let length = level.min(self.sequences[i].len());
            let code = info.full.code % self.select.weights[length];
            let rank = self.short_space.rank(code);
            self.short_space.insert(code);
            info.short = PartialCode {
                code,
                rank,
                actual: self.select.wrap(code, rank, length, None),
                duplicate: rank > 0 || self.degenerate[i],
            };
        }

        for (i, info) in self.buffer.iter_mut().enumerate() {
            if self.levels[i].is_some() {
                continue;
            }
            let full = info.full;
            if self.degenerate[i] {
                self.short_space.insert(full.code);
                info.short = full;
                continue;
            }
            let length = self.sequences[i].len();
            let schemes = &rules[info.word_length.clamp(1, MAX_WORD_LENGTH) - 1];

            let mut reduced = None;
            for scheme in schemes {
                if length <= scheme.prefix {
                    continue;
                }
                let code = full.code % self.select.weights[scheme.prefix];
                let rank = self
                    .full_space
                    .rank(code)
                    .saturating_add(self.short_space.rank(code));
                if rank >= scheme.count {
                    continue;
                }
                reduced = Some((code, rank, scheme));
                break;
            }

            info.short = match reduced {
                Some((code, rank, scheme)) => {
                    self.short_space.insert(code);
                    PartialCode {
                        code,
                        rank,
                        actual: self.select.wrap(
                            code,
                            rank,
                            scheme.prefix,
                            Some(scheme.select_keys.as_slice()),
                        ),
                        duplicate: false,
                    }
                }
                None => {
                    let rank = full.rank.saturating_add(self.short_space.rank(full.code));
                    self.short_space.insert(full.code);
                    PartialCode {
                        code: full.code,
                        rank,
                        actual: self.select.wrap(full.code, rank, length, None),
                        duplicate: rank > 0,
                    }
                }
            };
        }
    }
}

impl Encoder for DefaultEncoder {
    fn encode(&mut self, mapping: &ElementMapping, moved: Option<&[Element]>) -> &[CodeInfo] {
        match moved {
            Some(moved) if self.encoded => {
                for &element in moved {
                    let Some(objects) = self.involvement.get(element) else {
                        continue;
                    };
                    for &i in objects {
                        self.raw[i] = self.select.compose(&self.sequences[i], mapping);
                    }
                }
            }
            _ => {
                for (raw, sequence) in self.raw.iter_mut().zip(&self.sequences) {
                    *raw = self.select.compose(sequence, mapping);
                }
            }
        }
        self.encoded = true;
        self.assign_full();
        self.assign_short();
        &self.buffer
    }

    fn codes(&self) -> &[CodeInfo] {
        &self.buffer
    }
}
