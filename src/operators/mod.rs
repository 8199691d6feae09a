pub mod constraints;
pub mod crossover;
pub mod mutation;

use fastrand::Rng;
use strum_macros::{Display, EnumIter};

use crate::core_types::Element;
use crate::error::ForgeResult;
use crate::mapping::ElementMapping;

pub use self::constraints::Constraints;
pub use self::mutation::DefaultOperator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum MutationKind {
    RandomMove,
    RandomSwap,
    RandomFullKeySwap,
}

/// Proposes a neighbouring mapping in place.
pub trait Mutate {
    /// Returns the elements whose key changed. On error the mapping is left
    /// as it was.
    fn mutate(&self, mapping: &mut ElementMapping, rng: &mut Rng) -> ForgeResult<Vec<Element>>;
}

/// Combines two parents into a child that satisfies the constraints.
/// `primary` is the fitter parent; the child falls back to it on conflicts.
pub trait Crossover {
    fn crossover(
        &self,
        primary: &ElementMapping,
        secondary: &ElementMapping,
        rng: &mut Rng,
    ) -> ElementMapping;
}
