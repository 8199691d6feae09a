use serde::{Deserialize, Serialize};
use std::ops::Index;

use crate::core_types::{Element, Key};
use crate::error::{ForgeError, ForgeResult};

/// Key assignment for every element. Elements below `radix` are the keys
/// themselves and always map to their own number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementMapping {
    keys: Vec<Key>,
}

impl ElementMapping {
    pub fn new(keys: Vec<Key>) -> Self {
        Self { keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline(always)]
    pub fn get(&self, element: Element) -> Key {
        self.keys[element]
    }

    #[inline(always)]
    pub fn set(&mut self, element: Element, key: Key) {
        self.keys[element] = key;
    }

    pub fn swap(&mut self, a: Element, b: Element) {
        self.keys.swap(a, b);
    }

    pub fn as_slice(&self) -> &[Key] {
        &self.keys
    }

    /// Elements whose keys differ between the two mappings.
    pub fn diff(&self, other: &ElementMapping) -> Vec<Element> {
        self.keys
            .iter()
            .zip(other.keys.iter())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i)
            .collect()
    }

    /// Checks totality over `element_count` elements, the identity prefix and
    /// that every other element sits on an alphabet key.
    pub fn validate(&self, element_count: usize, radix: u64, alphabet: &[Key]) -> ForgeResult<()> {
        if self.keys.len() != element_count {
            return Err(ForgeError::Validation(format!(
                "mapping covers {} elements, expected {}",
                self.keys.len(),
                element_count
            )));
        }
        for (element, &key) in self.keys.iter().enumerate() {
            if (element as u64) < radix {
                if key != element as u64 {
                    return Err(ForgeError::Validation(format!(
                        "key element {} must map to itself, found {}",
                        element, key
                    )));
                }
            } else if !alphabet.contains(&key) {
                return Err(ForgeError::Validation(format!(
                    "element {} is assigned key {} outside the alphabet",
                    element, key
                )));
            }
        }
        Ok(())
    }
}

impl Index<Element> for ElementMapping {
    type Output = Key;

    #[inline(always)]
    fn index(&self, element: Element) -> &Key {
        &self.keys[element]
    }
}
