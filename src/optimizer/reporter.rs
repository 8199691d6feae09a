use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::objective::Metric;
use crate::problem::CodeTableEntry;

/// Progress events emitted by the optimizers, in the order they happen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    TrialMax {
        temperature: f64,
        accept_rate: f64,
    },
    TrialMin {
        temperature: f64,
        improve_rate: f64,
    },
    Parameters {
        t_max: f64,
        t_min: f64,
    },
    Progress {
        step: usize,
        total: usize,
        percent: f64,
        temperature: Option<f64>,
        accept_rate: Option<f64>,
        improve_rate: Option<f64>,
        current: f64,
        best: f64,
    },
    BetterSolution {
        step: usize,
        score: f64,
        metric: Metric,
        mapping: BTreeMap<String, String>,
        /// Found late enough in the run to be worth persisting.
        save: bool,
    },
    Elapsed {
        micros_per_step: f64,
    },
    Finished {
        score: f64,
        metric: Metric,
        table: Vec<CodeTableEntry>,
    },
}

/// Receives progress messages. Returning `false` asks the search to stop
/// after the current step.
pub trait Reporter: Send + Sync {
    fn post(&self, message: &Message) -> bool;
}

/// Writes messages to the tracing subscriber.
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn post(&self, message: &Message) -> bool {
        match message {
            Message::TrialMax {
                temperature,
                accept_rate,
            } => debug!("Tuning t_max: T = {:.3e}, accept {:.2}%", temperature, accept_rate * 100.0),
            Message::TrialMin {
                temperature,
                improve_rate,
            } => debug!("Tuning t_min: T = {:.3e}, improve {:.2}%", temperature, improve_rate * 100.0),
            Message::Parameters { t_max, t_min } => {
                info!("Tuned temperatures: t_max = {:.3e}, t_min = {:.3e}", t_max, t_min)
            }
            Message::Progress {
                step,
                total,
                percent,
                temperature,
                current,
                best,
                ..
            } => match temperature {
                Some(t) => info!(
                    "[{:>5.1}%] step {}/{} T = {:.3e} current {:.6} best {:.6}",
                    percent, step, total, t, current, best
                ),
                None => info!(
                    "[{:>5.1}%] generation {}/{} current {:.6} best {:.6}",
                    percent, step, total, current, best
                ),
            },
            Message::BetterSolution {
                step, score, save, ..
            } => info!("Step {}: new best {:.6}{}", step, score, if *save { " (saved)" } else { "" }),
            Message::Elapsed { micros_per_step } => {
                info!("Average {:.1} µs per step", micros_per_step)
            }
            Message::Finished { score, table, .. } => {
                info!("Finished: score {:.6}, {} codes", score, table.len())
            }
        }
        true
    }
}

/// Discards every message.
pub struct NullReporter;

impl Reporter for NullReporter {
    fn post(&self, _: &Message) -> bool {
        true
    }
}
