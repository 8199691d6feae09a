use fastrand::Rng;
use std::time::Duration;

use super::timer::Timer;
use crate::config::SearchParams;

/// Randomness and clock for one run, passed explicitly to every step.
#[derive(Debug, Clone)]
pub struct SearchContext {
    pub rng: Rng,
    pub timer: Timer,
    pub seed: Option<u64>,
}

impl SearchContext {
    pub fn new(seed: Option<u64>, budget: Option<Duration>) -> Self {
        let rng = match seed {
            Some(s) => Rng::with_seed(s),
            None => Rng::new(),
        };
        Self {
            rng,
            timer: Timer::start(budget),
            seed,
        }
    }

    pub fn from_params(params: &SearchParams) -> Self {
        Self::new(params.seed, params.time_limit.map(Duration::from_secs))
    }
}
