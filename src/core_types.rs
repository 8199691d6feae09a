/// Index of an abstract element. Elements `0..radix` are the keys themselves.
pub type Element = usize;

/// Key number: `1..=n` for the alphabet, then select keys. `0` means no key.
pub type Key = u64;

/// A code packed as `Σ key_i · radix^i`, first key least significant.
pub type Code = u64;

/// Per-window counts of each fingering label.
pub type FingeringLabel = [u8; crate::consts::FINGERING_LABEL_COUNT];

/// Optional weight per fingering label.
pub type FingeringWeights = [Option<f64>; crate::consts::FINGERING_LABEL_COUNT];
