use fnv::FnvHasher;
use rayon::prelude::*;
use std::hash::{Hash, Hasher};

use super::metric::GroupMetric;
use super::partials::{Contribution, Tally};
use super::tables::ObjectiveTables;
use crate::config::{MetricGroup, PartialWeights};
use crate::encoder::{CodeInfo, PartialCode};

#[derive(Debug, Clone, Copy)]
pub struct CacheEntry {
    pub fingerprint: u64,
    pub contribution: Contribution,
}

#[inline(always)]
fn fingerprint(index: usize, code: &PartialCode) -> u64 {
    let mut hasher = FnvHasher::default();
    index.hash(&mut hasher);
    code.actual.hash(&mut hasher);
    code.duplicate.hash(&mut hasher);
    hasher.finish()
}

/// Running totals of one metric group plus the contribution each object
/// last added, so a changed object can be swapped out without a rescan.
#[derive(Debug, Clone)]
pub struct Cache {
    group: MetricGroup,
    tally: Tally,
    with_equivalence: bool,
    with_fingering: bool,
    entries: Vec<Option<CacheEntry>>,
}

impl Cache {
    pub fn new(
        group: MetricGroup,
        weights: &PartialWeights,
        group_size: usize,
        object_count: usize,
        radix: u64,
    ) -> Self {
        let tier_fingering = weights
            .tiers
            .as_ref()
            .is_some_and(|tiers| tiers.iter().any(|t| t.fingering.is_some()));
        Self {
            group,
            tally: Tally::new(weights, group_size, radix),
            with_equivalence: weights.pair_equivalence.is_some(),
            with_fingering: weights.fingering.is_some() || tier_fingering,
            entries: vec![None; object_count],
        }
    }

    pub fn group(&self) -> MetricGroup {
        self.group
    }

    #[inline(always)]
    pub fn contains(&self, info: &CodeInfo) -> bool {
        info.is_character() == self.group.is_characters()
    }

    #[inline(always)]
    fn part<'a>(&self, info: &'a CodeInfo) -> &'a PartialCode {
        if self.group.is_short() {
            &info.short
        } else {
            &info.full
        }
    }

    pub fn contribution(&self, info: &CodeInfo, tables: &ObjectiveTables) -> Contribution {
        let part = self.part(info);
        let mut c = Contribution {
            rank: info.group_rank,
            frequency: info.frequency as i64,
            code: part.actual,
            length: tables.code_length(part.actual),
            duplicate: part.duplicate,
            ..Default::default()
        };
        if self.with_equivalence || self.with_fingering {
            for window in tables.windows(part.actual) {
                if self.with_equivalence {
                    c.equivalence += tables.equivalence[window];
                }
                if self.with_fingering {
                    for (count, &label) in c.fingering.iter_mut().zip(&tables.fingering[window]) {
                        *count += label as i64;
                    }
                }
            }
        }
        c
    }

    /// Brings object `index` up to date, touching the totals only when its
    /// code changed since it was last seen. Returns the new contribution, or
    /// `None` when nothing changed.
    pub fn process(
        &mut self,
        index: usize,
        info: &CodeInfo,
        tables: &ObjectiveTables,
    ) -> Option<Contribution> {
        let part = self.part(info);
        let fp = fingerprint(index, part);
        if let Some(entry) = &self.entries[index] {
            if entry.fingerprint == fp
                && entry.contribution.code == part.actual
                && entry.contribution.duplicate == part.duplicate
            {
                return None;
            }
        }
        let contribution = self.contribution(info, tables);
        if let Some(old) = self.entries[index].take() {
            self.tally.accumulate(&old.contribution, -1);
        }
        self.tally.accumulate(&contribution, 1);
        self.entries[index] = Some(CacheEntry {
            fingerprint: fp,
            contribution,
        });
        Some(contribution)
    }

    fn contributions(&self, codes: &[CodeInfo], tables: &ObjectiveTables) -> Vec<Option<Contribution>> {
        codes
            .par_iter()
            .map(|info| self.contains(info).then(|| self.contribution(info, tables)))
            .collect()
    }

    /// Recomputes every entry from scratch.
    pub fn rebuild(&mut self, codes: &[CodeInfo], tables: &ObjectiveTables) {
        let contributions = self.contributions(codes, tables);
        self.tally.reset();
        for (index, (info, contribution)) in codes.iter().zip(contributions).enumerate() {
            self.entries[index] = match contribution {
                Some(c) => {
                    self.tally.accumulate(&c, 1);
                    Some(CacheEntry {
                        fingerprint: fingerprint(index, self.part(info)),
                        contribution: c,
                    })
                }
                None => None,
            };
        }
    }

    /// Scores `codes` without reading or touching the cached entries.
    pub fn batch(&self, codes: &[CodeInfo], tables: &ObjectiveTables) -> (GroupMetric, f64) {
        let contributions = self.contributions(codes, tables);
        let mut tally = self.tally.clone();
        tally.reset();
        // summed in corpus order so parallel and sequential runs agree bit for bit
        for c in contributions.iter().flatten() {
            tally.accumulate(c, 1);
        }
        tally.finalize(tables)
    }

    pub fn finalize(&self, tables: &ObjectiveTables) -> (GroupMetric, f64) {
        self.tally.finalize(tables)
    }
}
