use fastrand::Rng;

use super::{Crossover, DefaultOperator};
use crate::mapping::ElementMapping;

impl Crossover for DefaultOperator {
    /// Uniform crossover: each movable element independently takes the
    /// secondary parent's key when its constraints allow it.
    fn crossover(
        &self,
        primary: &ElementMapping,
        secondary: &ElementMapping,
        rng: &mut Rng,
    ) -> ElementMapping {
        let mut child = primary.clone();
        for &e in self.movable() {
            if rng.bool() {
                let key = secondary[e];
                if self.constraints().allows(e, key) {
                    child.set(e, key);
                }
            }
        }
        self.constraints().repair(&mut child, primary);
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConstraintsConfig, EncoderConfig, FormConfig, MutationWeights};
    use crate::operators::{Constraints, Mutate};
    use crate::prism::Prism;
    use proptest::prelude::*;

    fn operator(apart: bool) -> (DefaultOperator, ElementMapping) {
        let form = FormConfig {
            alphabet: "abcd".into(),
            mapping: [("W", "a"), ("X", "b"), ("Y", "c"), ("Z", "d")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            grouping: Default::default(),
        };
        let (prism, initial) = Prism::build(&form, &EncoderConfig::default()).unwrap();
        let config = ConstraintsConfig {
            apart: if apart {
                vec![["W".into(), "X".into()], ["Y".into(), "Z".into()]]
            } else {
                Vec::new()
            },
            ..Default::default()
        };
        let c = Constraints::build(&config, &prism, &initial).unwrap();
        (DefaultOperator::new(c, MutationWeights::default()), initial)
    }

    #[test]
    fn test_identical_parents_give_identical_child() {
        let (op, parent) = operator(false);
        let child = op.crossover(&parent, &parent, &mut Rng::with_seed(1));
        assert_eq!(child, parent);
    }

    #[test]
    fn test_child_keys_come_from_a_parent() {
        let (op, primary) = operator(false);
        let mut rng = Rng::with_seed(4);
        let mut secondary = primary.clone();
        for _ in 0..10 {
            op.mutate(&mut secondary, &mut rng).unwrap();
        }
        let child = op.crossover(&primary, &secondary, &mut rng);
        for e in 0..child.len() {
            assert!(child[e] == primary[e] || child[e] == secondary[e]);
        }
    }

    proptest! {
        #[test]
        fn prop_crossover_respects_apart_pairs(seed in any::<u64>(), steps in 1usize..20) {
            let (op, primary) = operator(true);
            let mut rng = Rng::with_seed(seed);
            let mut secondary = primary.clone();
            for _ in 0..steps {
                op.mutate(&mut secondary, &mut rng).unwrap();
            }
            let child = op.crossover(&primary, &secondary, &mut rng);
            prop_assert!(op.constraints().is_satisfied(&child));
        }
    }
}
