/// Longest full code, in keys. Actual codes may carry one extra select key,
/// and `radix^8` must still fit in a `u64`.
pub const MAX_CODE_LENGTH: usize = 7;

/// Word lengths beyond this share the short-code rules of this length.
pub const MAX_WORD_LENGTH: usize = 10;

/// Width of the sliding key window used by pair equivalence and fingering.
pub const MAX_COMBINATION_LENGTH: usize = 4;

/// Number of fingering label slots in a label vector.
pub const FINGERING_LABEL_COUNT: usize = 8;

/// Select key used when the encoder configuration names none.
pub const DEFAULT_SELECT_KEY: char = '_';

/// How often an operator may redraw an invalid proposal before giving up.
pub const MAX_OPERATOR_RETRIES: usize = 256;

/// Steps per batch while autotuning the annealing temperatures.
pub const TUNING_BATCH_SIZE: usize = 1000;

/// Upper bound on halving/doubling rounds during temperature autotuning.
pub const MAX_TUNING_ROUNDS: usize = 40;

pub const DEFAULT_ANNEALING_STEPS: usize = 10_000;
pub const DEFAULT_UPDATE_INTERVAL: usize = 1000;
pub const DEFAULT_REPORT_AFTER: f64 = 0.9;

/// Accept rate the tuned `t_max` must reach.
pub const TUNING_HIGH_ACCEPTANCE: f64 = 0.98;

/// Improve rate the tuned `t_min` must fall to.
pub const TUNING_LOW_IMPROVEMENT: f64 = 0.02;

/// Added to every roulette weight so the worst individual can still be drawn.
pub const ROULETTE_EPSILON: f64 = 1e-9;
