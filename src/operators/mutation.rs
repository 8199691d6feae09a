use fastrand::Rng;
use strum::IntoEnumIterator;
use tracing::trace;

use super::{Constraints, Mutate, MutationKind};
use crate::config::MutationWeights;
use crate::consts::MAX_OPERATOR_RETRIES;
use crate::core_types::{Element, Key};
use crate::error::{ForgeError, ForgeResult};
use crate::mapping::ElementMapping;

/// The stock mutations over a fixed set of constraints.
#[derive(Debug, Clone)]
pub struct DefaultOperator {
    constraints: Constraints,
    weights: MutationWeights,
    movable: Vec<Element>,
}

fn exhausted(kind: MutationKind) -> ForgeError {
    ForgeError::SearchExhausted(format!(
        "{} found no valid proposal in {} attempts",
        kind, MAX_OPERATOR_RETRIES
    ))
}

/// A key from `keys` other than `current`, assuming `keys` holds `current`.
#[inline(always)]
fn other_key(keys: &[Key], current: Key, rng: &mut Rng) -> Key {
    let i = rng.usize(..keys.len() - 1);
    if keys[i] == current {
        keys[keys.len() - 1]
    } else {
        keys[i]
    }
}

impl DefaultOperator {
    pub fn new(constraints: Constraints, weights: MutationWeights) -> Self {
        let movable = constraints.movable();
        Self {
            constraints,
            weights,
            movable,
        }
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn movable(&self) -> &[Element] {
        &self.movable
    }

    pub fn set_weights(&mut self, weights: MutationWeights) {
        self.weights = weights;
    }

    fn weight(&self, kind: MutationKind) -> f64 {
        match kind {
            MutationKind::RandomMove => self.weights.random_move,
            MutationKind::RandomSwap => self.weights.random_swap,
            MutationKind::RandomFullKeySwap => self.weights.random_full_key_swap,
        }
    }

    fn choose(&self, rng: &mut Rng) -> MutationKind {
        let total: f64 = MutationKind::iter().map(|k| self.weight(k)).sum();
        let mut roll = rng.f64() * total;
        for kind in MutationKind::iter() {
            roll -= self.weight(kind);
            if roll < 0.0 {
                return kind;
            }
        }
        MutationKind::RandomMove
    }

    #[inline(always)]
    fn pick(&self, rng: &mut Rng) -> Element {
        self.movable[rng.usize(..self.movable.len())]
    }

    /// Moves one element to another allowed key.
    pub fn random_move(&self, mapping: &mut ElementMapping, rng: &mut Rng) -> ForgeResult<Vec<Element>> {
        if self.movable.is_empty() {
            return Err(ForgeError::SearchExhausted("no element can move".into()));
        }
        for _ in 0..MAX_OPERATOR_RETRIES {
            let e = self.pick(rng);
            let current = mapping[e];
            let key = other_key(self.constraints.allowed_keys(e), current, rng);
            mapping.set(e, key);
            if self.constraints.separated(mapping, &[e]) {
                return Ok(vec![e]);
            }
            mapping.set(e, current);
        }
        Err(exhausted(MutationKind::RandomMove))
    }

    /// Exchanges the keys of two elements.
    pub fn random_swap(&self, mapping: &mut ElementMapping, rng: &mut Rng) -> ForgeResult<Vec<Element>> {
        if self.movable.len() < 2 {
            return Err(ForgeError::SearchExhausted(
                "fewer than two elements can move".into(),
            ));
        }
        for _ in 0..MAX_OPERATOR_RETRIES {
            let (a, b) = (self.pick(rng), self.pick(rng));
            let (ka, kb) = (mapping[a], mapping[b]);
            if ka == kb || !self.constraints.allows(a, kb) || !self.constraints.allows(b, ka) {
                continue;
            }
            mapping.swap(a, b);
            if self.constraints.separated(mapping, &[a, b]) {
                return Ok(vec![a, b]);
            }
            mapping.swap(a, b);
        }
        Err(exhausted(MutationKind::RandomSwap))
    }

    /// Exchanges two keys wholesale: every movable element on one goes to
    /// the other, where its constraints allow.
    pub fn random_full_key_swap(
        &self,
        mapping: &mut ElementMapping,
        rng: &mut Rng,
    ) -> ForgeResult<Vec<Element>> {
        if self.movable.is_empty() {
            return Err(ForgeError::SearchExhausted("no element can move".into()));
        }
        for _ in 0..MAX_OPERATOR_RETRIES {
            let e = self.pick(rng);
            let k1 = mapping[e];
            let k2 = other_key(self.constraints.allowed_keys(e), k1, rng);
            let mut moved = Vec::new();
            for &x in &self.movable {
                let k = mapping[x];
                if k == k1 && self.constraints.allows(x, k2) {
                    mapping.set(x, k2);
                    moved.push(x);
                } else if k == k2 && self.constraints.allows(x, k1) {
                    mapping.set(x, k1);
                    moved.push(x);
                }
            }
            if self.constraints.separated(mapping, &moved) {
                return Ok(moved);
            }
            for &x in &moved {
                let k = mapping[x];
                mapping.set(x, if k == k2 { k1 } else { k2 });
            }
        }
        Err(exhausted(MutationKind::RandomFullKeySwap))
    }

    fn apply(
        &self,
        kind: MutationKind,
        mapping: &mut ElementMapping,
        rng: &mut Rng,
    ) -> ForgeResult<Vec<Element>> {
        match kind {
            MutationKind::RandomMove => self.random_move(mapping, rng),
            MutationKind::RandomSwap => self.random_swap(mapping, rng),
            MutationKind::RandomFullKeySwap => self.random_full_key_swap(mapping, rng),
        }
    }
}

impl Mutate for DefaultOperator {
    /// Draws a kind by weight; if it cannot produce a valid proposal, the
    /// other weighted kinds are tried before giving up.
    fn mutate(&self, mapping: &mut ElementMapping, rng: &mut Rng) -> ForgeResult<Vec<Element>> {
        let first = self.choose(rng);
        let mut last_error = match self.apply(first, mapping, rng) {
            Ok(moved) => return Ok(moved),
            Err(e @ ForgeError::SearchExhausted(_)) => e,
            Err(e) => return Err(e),
        };
        for kind in MutationKind::iter().filter(|&k| k != first && self.weight(k) > 0.0) {
            trace!("{} exhausted, falling back to {}", first, kind);
            match self.apply(kind, mapping, rng) {
                Ok(moved) => return Ok(moved),
                Err(e @ ForgeError::SearchExhausted(_)) => last_error = e,
                Err(e) => return Err(e),
            }
        }
        Err(last_error)
    }
}
