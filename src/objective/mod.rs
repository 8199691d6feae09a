pub mod cache;
pub mod default;
pub mod fingering;
pub mod metric;
pub mod partials;
pub mod tables;

pub use self::default::DefaultObjective;
pub use self::metric::{GroupMetric, Metric};

use crate::encoder::CodeInfo;
use crate::error::ForgeResult;

pub trait Objective {
    /// Scores the codes, reusing what is known about objects whose codes did
    /// not change since the previous call.
    fn evaluate(&mut self, codes: &[CodeInfo]) -> ForgeResult<(Metric, f64)>;

    /// Scores the codes from scratch, leaving any incremental state untouched.
    fn evaluate_batch(&self, codes: &[CodeInfo]) -> ForgeResult<(Metric, f64)>;
}
