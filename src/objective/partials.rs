use super::metric::{GroupMetric, LevelCount, LevelMetric, TierMetric};
use super::tables::ObjectiveTables;
use crate::config::{LevelWeights, PartialWeights};
use crate::consts::FINGERING_LABEL_COUNT;
use crate::core_types::{Code, FingeringWeights};

/// What one object adds to the running totals of a metric group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Contribution {
    /// Frequency rank within the object's group.
    pub rank: usize,
    pub frequency: i64,
    /// Actual code.
    pub code: Code,
    pub length: usize,
    pub duplicate: bool,
    /// Unweighted sum over the code's key windows.
    pub equivalence: f64,
    pub fingering: [i64; FINGERING_LABEL_COUNT],
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Totals {
    pub frequency: i64,
    pub pairs: i64,
}

impl Totals {
    #[inline(always)]
    fn accumulate(&mut self, c: &Contribution, sign: i64) {
        let f = sign * c.frequency;
        self.frequency += f;
        self.pairs += c.length.saturating_sub(1) as i64 * f;
    }
}

/// A ratio that is zero when nothing has been counted.
#[inline(always)]
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// One weighted component of a group's loss. `accumulate` with `sign = -1`
/// removes a contribution added earlier, so totals can be updated in place.
pub trait PartialMetric {
    type Report;

    fn accumulate(&mut self, contribution: &Contribution, sign: i64);

    fn reset(&mut self);

    /// The reported value and its weighted share of the loss.
    fn finalize(&self, totals: &Totals, tables: &ObjectiveTables) -> (Self::Report, f64);
}

#[derive(Debug, Clone)]
pub struct Duplication {
    weight: f64,
    duplicated: i64,
}

impl PartialMetric for Duplication {
    type Report = f64;

    fn accumulate(&mut self, c: &Contribution, sign: i64) {
        if c.duplicate {
            self.duplicated += sign * c.frequency;
        }
    }

    fn reset(&mut self) {
        self.duplicated = 0;
    }

    fn finalize(&self, totals: &Totals, _: &ObjectiveTables) -> (f64, f64) {
        let value = ratio(self.duplicated as f64, totals.frequency as f64);
        (value, value * self.weight)
    }
}

#[derive(Debug, Clone)]
pub struct KeyDistribution {
    weight: f64,
    radix: u64,
    usage: Vec<i64>,
}

impl PartialMetric for KeyDistribution {
    type Report = f64;

    fn accumulate(&mut self, c: &Contribution, sign: i64) {
        let mut code = c.code;
        while code > 0 {
            self.usage[(code % self.radix) as usize] += sign * c.frequency;
            code /= self.radix;
        }
    }

    fn reset(&mut self) {
        self.usage.fill(0);
    }

    fn finalize(&self, _: &Totals, tables: &ObjectiveTables) -> (f64, f64) {
        let total: i64 = self.usage.iter().sum();
        let mut distance = 0.0;
        for (&used, loss) in self.usage.iter().zip(&tables.ideal) {
            let diff = ratio(used as f64, total as f64) - loss.ideal;
            if diff > 0.0 {
                distance += loss.gt_penalty * diff;
            } else {
                distance -= loss.lt_penalty * diff;
            }
        }
        (distance, distance * self.weight)
    }
}

#[derive(Debug, Clone)]
pub struct PairEquivalence {
    weight: f64,
    total: f64,
}

impl PartialMetric for PairEquivalence {
    type Report = f64;

    fn accumulate(&mut self, c: &Contribution, sign: i64) {
        self.total += c.equivalence * (sign * c.frequency) as f64;
    }

    fn reset(&mut self) {
        self.total = 0.0;
    }

    fn finalize(&self, totals: &Totals, _: &ObjectiveTables) -> (f64, f64) {
        let value = ratio(self.total, totals.pairs as f64);
        (value, value * self.weight)
    }
}

fn fingering_weights(weights: &[Option<f64>]) -> FingeringWeights {
    let mut out = FingeringWeights::default();
    for (slot, w) in out.iter_mut().zip(weights) {
        *slot = *w;
    }
    out
}

#[derive(Debug, Clone)]
pub struct Fingering {
    weights: FingeringWeights,
    counts: [i64; FINGERING_LABEL_COUNT],
}

impl PartialMetric for Fingering {
    type Report = [Option<f64>; FINGERING_LABEL_COUNT];

    fn accumulate(&mut self, c: &Contribution, sign: i64) {
        for (count, &labels) in self.counts.iter_mut().zip(&c.fingering) {
            *count += sign * c.frequency * labels;
        }
    }

    fn reset(&mut self) {
        self.counts = [0; FINGERING_LABEL_COUNT];
    }

    fn finalize(&self, totals: &Totals, _: &ObjectiveTables) -> (Self::Report, f64) {
        let mut report = [None; FINGERING_LABEL_COUNT];
        let mut loss = 0.0;
        for (slot, weight) in self.weights.iter().enumerate() {
            if let Some(w) = weight {
                let value = ratio(self.counts[slot] as f64, totals.pairs as f64);
                report[slot] = Some(value);
                loss += self.counts[slot] as f64 * w;
            }
        }
        (report, loss)
    }
}

#[derive(Debug, Clone)]
pub struct Levels {
    levels: Vec<LevelWeights>,
    counts: Vec<i64>,
}

impl PartialMetric for Levels {
    type Report = Vec<LevelMetric>;

    fn accumulate(&mut self, c: &Contribution, sign: i64) {
        for (count, level) in self.counts.iter_mut().zip(&self.levels) {
            if level.length == c.length {
                *count += sign * c.frequency;
            }
        }
    }

    fn reset(&mut self) {
        self.counts.fill(0);
    }

    fn finalize(&self, totals: &Totals, _: &ObjectiveTables) -> (Vec<LevelMetric>, f64) {
        let mut loss = 0.0;
        let report = self
            .levels
            .iter()
            .zip(&self.counts)
            .map(|(level, &count)| {
                let value = ratio(count as f64, totals.frequency as f64);
                loss += value * level.frequency;
                LevelMetric {
                    length: level.length,
                    frequency: value,
                }
            })
            .collect();
        (report, loss)
    }
}

#[derive(Debug, Clone)]
struct TierTally {
    top: Option<usize>,
    /// Objects ranked below this belong to the tier.
    limit: usize,
    /// Denominator of the tier's ratios.
    size: f64,
    duplication_weight: Option<f64>,
    levels: Option<Vec<LevelWeights>>,
    fingering_weights: Option<FingeringWeights>,
    duplicated: i64,
    level_counts: Vec<i64>,
    fingering: [i64; FINGERING_LABEL_COUNT],
}

/// Tier counts are unweighted: every object in the tier counts once.
#[derive(Debug, Clone)]
pub struct Tiers {
    tiers: Vec<TierTally>,
}

impl PartialMetric for Tiers {
    type Report = Vec<TierMetric>;

    fn accumulate(&mut self, c: &Contribution, sign: i64) {
        for tier in self.tiers.iter_mut().filter(|t| c.rank < t.limit) {
            if c.duplicate {
                tier.duplicated += sign;
            }
            if let Some(levels) = &tier.levels {
                for (count, level) in tier.level_counts.iter_mut().zip(levels) {
                    if level.length == c.length {
                        *count += sign;
                    }
                }
            }
            for (count, &labels) in tier.fingering.iter_mut().zip(&c.fingering) {
                *count += sign * labels;
            }
        }
    }

    fn reset(&mut self) {
        for tier in self.tiers.iter_mut() {
            tier.duplicated = 0;
            tier.level_counts.fill(0);
            tier.fingering = [0; FINGERING_LABEL_COUNT];
        }
    }

    fn finalize(&self, _: &Totals, _: &ObjectiveTables) -> (Vec<TierMetric>, f64) {
        let mut loss = 0.0;
        let mut report = Vec::with_capacity(self.tiers.len());
        for tier in &self.tiers {
            let mut metric = TierMetric {
                top: tier.top,
                duplication: None,
                levels: None,
                fingering: None,
            };
            if let Some(w) = tier.duplication_weight {
                loss += ratio(tier.duplicated as f64, tier.size) * w;
                metric.duplication = Some(tier.duplicated);
            }
            if let Some(levels) = &tier.levels {
                let mut counts = Vec::with_capacity(levels.len());
                for (level, &count) in levels.iter().zip(&tier.level_counts) {
                    loss += ratio(count as f64, tier.size) * level.frequency;
                    counts.push(LevelCount {
                        length: level.length,
                        count,
                    });
                }
                metric.levels = Some(counts);
            }
            if let Some(weights) = &tier.fingering_weights {
                let mut values = [None; FINGERING_LABEL_COUNT];
                for (slot, weight) in weights.iter().enumerate() {
                    if let Some(w) = weight {
                        loss += ratio(tier.fingering[slot] as f64, tier.size) * w;
                        values[slot] = Some(tier.fingering[slot]);
                    }
                }
                metric.fingering = Some(values);
            }
            report.push(metric);
        }
        (report, loss)
    }
}

/// Running totals of every configured partial metric of one group.
#[derive(Debug, Clone)]
pub struct Tally {
    totals: Totals,
    duplication: Option<Duplication>,
    key_distribution: Option<KeyDistribution>,
    pair_equivalence: Option<PairEquivalence>,
    fingering: Option<Fingering>,
    levels: Option<Levels>,
    tiers: Option<Tiers>,
}

impl Tally {
    pub fn new(weights: &PartialWeights, group_size: usize, radix: u64) -> Self {
        Self {
            totals: Totals::default(),
            duplication: weights.duplication.map(|weight| Duplication {
                weight,
                duplicated: 0,
            }),
            key_distribution: weights.key_distribution.map(|weight| KeyDistribution {
                weight,
                radix,
                usage: vec![0; radix as usize],
            }),
            pair_equivalence: weights.pair_equivalence.map(|weight| PairEquivalence {
                weight,
                total: 0.0,
            }),
            fingering: weights.fingering.as_ref().map(|w| Fingering {
                weights: fingering_weights(w),
                counts: [0; FINGERING_LABEL_COUNT],
            }),
            levels: weights.levels.as_ref().map(|levels| Levels {
                levels: levels.clone(),
                counts: vec![0; levels.len()],
            }),
            tiers: weights.tiers.as_ref().map(|tiers| Tiers {
                tiers: tiers
                    .iter()
                    .map(|t| TierTally {
                        top: t.top,
                        limit: t.top.unwrap_or(usize::MAX),
                        size: t.top.unwrap_or(group_size) as f64,
                        duplication_weight: t.duplication,
                        levels: t.levels.clone(),
                        fingering_weights: t.fingering.as_deref().map(fingering_weights),
                        duplicated: 0,
                        level_counts: vec![0; t.levels.as_ref().map_or(0, |l| l.len())],
                        fingering: [0; FINGERING_LABEL_COUNT],
                    })
                    .collect(),
            }),
        }
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn accumulate(&mut self, c: &Contribution, sign: i64) {
        self.totals.accumulate(c, sign);
        if let Some(m) = &mut self.duplication {
            m.accumulate(c, sign);
        }
        if let Some(m) = &mut self.key_distribution {
            m.accumulate(c, sign);
        }
        if let Some(m) = &mut self.pair_equivalence {
            m.accumulate(c, sign);
        }
        if let Some(m) = &mut self.fingering {
            m.accumulate(c, sign);
        }
        if let Some(m) = &mut self.levels {
            m.accumulate(c, sign);
        }
        if let Some(m) = &mut self.tiers {
            m.accumulate(c, sign);
        }
    }

    pub fn reset(&mut self) {
        self.totals = Totals::default();
        if let Some(m) = &mut self.duplication {
            m.reset();
        }
        if let Some(m) = &mut self.key_distribution {
            m.reset();
        }
        if let Some(m) = &mut self.pair_equivalence {
            m.reset();
        }
        if let Some(m) = &mut self.fingering {
            m.reset();
        }
        if let Some(m) = &mut self.levels {
            m.reset();
        }
        if let Some(m) = &mut self.tiers {
            m.reset();
        }
    }

    pub fn finalize(&self, tables: &ObjectiveTables) -> (GroupMetric, f64) {
        let totals = &self.totals;
        let mut metric = GroupMetric::default();
        let mut loss = 0.0;
        if let Some(m) = &self.tiers {
            let (report, l) = m.finalize(totals, tables);
            metric.tiers = Some(report);
            loss += l;
        }
        if let Some(m) = &self.duplication {
            let (report, l) = m.finalize(totals, tables);
            metric.duplication = Some(report);
            loss += l;
        }
        if let Some(m) = &self.key_distribution {
            let (report, l) = m.finalize(totals, tables);
            metric.key_distribution = Some(report);
            loss += l;
        }
        if let Some(m) = &self.pair_equivalence {
            let (report, l) = m.finalize(totals, tables);
            metric.pair_equivalence = Some(report);
            loss += l;
        }
        if let Some(m) = &self.fingering {
            let (report, l) = m.finalize(totals, tables);
            metric.fingering = Some(report);
            loss += l;
        }
        if let Some(m) = &self.levels {
            let (report, l) = m.finalize(totals, tables);
            metric.levels = Some(report);
            loss += l;
        }
        (metric, loss)
    }
}
