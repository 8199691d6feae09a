use strum::IntoEnumIterator;
use tracing::debug;

use super::cache::Cache;
use super::metric::{GroupMetric, Metric};
use super::tables::ObjectiveTables;
use super::Objective;
use crate::config::{KeyboardLayout, MetricGroup, ObjectiveConfig};
use crate::corpus::{Assets, Corpus};
use crate::encoder::CodeInfo;
use crate::error::{ForgeError, ForgeResult};
use crate::prism::Prism;

pub struct DefaultObjective {
    tables: ObjectiveTables,
    caches: Vec<Cache>,
    object_count: usize,
    primed: bool,
}

impl DefaultObjective {
    pub fn new(
        corpus: &Corpus,
        prism: &Prism,
        config: &ObjectiveConfig,
        assets: &Assets,
        max_length: usize,
    ) -> ForgeResult<Self> {
        let configured: Vec<_> = MetricGroup::iter()
            .filter_map(|g| config.group(g).map(|w| (g, w)))
            .collect();
        if configured.is_empty() {
            return Err(ForgeError::Config(
                "objective must configure at least one metric group".into(),
            ));
        }

        let with_equivalence = configured.iter().any(|(_, w)| w.pair_equivalence.is_some());
        let with_fingering = configured.iter().any(|(_, w)| {
            w.fingering.is_some()
                || w
                    .tiers
                    .as_ref()
                    .is_some_and(|t| t.iter().any(|t| t.fingering.is_some()))
        });
        let keyboard = config.keyboard.clone().unwrap_or_default();
        let tables = ObjectiveTables::build(
            prism,
            assets,
            &keyboard,
            max_length,
            with_equivalence,
            with_fingering,
        );

        let caches = configured
            .into_iter()
            .map(|(group, weights)| {
                let group_size = if group.is_characters() {
                    corpus.character_count
                } else {
                    corpus.word_count
                };
                Cache::new(group, weights, group_size, corpus.len(), prism.radix)
            })
            .collect();

        debug!(
            "Objective: window {}, equivalence table {}, fingering table {}",
            tables.window,
            tables.equivalence.len(),
            tables.fingering.len()
        );

        Ok(Self {
            tables,
            caches,
            object_count: corpus.len(),
            primed: false,
        })
    }

    fn check_len(&self, codes: &[CodeInfo]) -> ForgeResult<()> {
        if codes.len() != self.object_count {
            return Err(ForgeError::Validation(format!(
                "objective expects {} codes, got {}",
                self.object_count,
                codes.len()
            )));
        }
        Ok(())
    }
}

fn assemble(parts: impl Iterator<Item = (MetricGroup, (GroupMetric, f64))>) -> ForgeResult<(Metric, f64)> {
    let mut metric = Metric::default();
    let mut loss = 0.0;
    for (group, (group_metric, group_loss)) in parts {
        if !group_loss.is_finite() {
            return Err(ForgeError::NumericFault(format!(
                "{} loss is {}",
                group, group_loss
            )));
        }
        loss += group_loss;
        metric.set_group(group, group_metric);
    }
    if !loss.is_finite() {
        return Err(ForgeError::NumericFault(format!("total loss is {}", loss)));
    }
    Ok((metric, loss))
}

impl Objective for DefaultObjective {
    fn evaluate(&mut self, codes: &[CodeInfo]) -> ForgeResult<(Metric, f64)> {
        self.check_len(codes)?;
        let tables = &self.tables;
        if self.primed {
            for cache in self.caches.iter_mut() {
                for (index, info) in codes.iter().enumerate() {
                    if cache.contains(info) {
                        cache.process(index, info, tables);
                    }
                }
            }
        } else {
            for cache in self.caches.iter_mut() {
                cache.rebuild(codes, tables);
            }
            self.primed = true;
        }
        assemble(self.caches.iter().map(|c| (c.group(), c.finalize(tables))))
    }

    fn evaluate_batch(&self, codes: &[CodeInfo]) -> ForgeResult<(Metric, f64)> {
        self.check_len(codes)?;
        assemble(
            self.caches
                .iter()
                .map(|c| (c.group(), c.batch(codes, &self.tables))),
        )
    }
}
