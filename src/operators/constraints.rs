use tracing::debug;

use crate::config::ConstraintsConfig;
use crate::core_types::{Element, Key};
use crate::error::{ForgeError, ForgeResult};
use crate::mapping::ElementMapping;
use crate::prism::Prism;

/// Hard limits on where each element may go.
#[derive(Debug, Clone)]
pub struct Constraints {
    radix: u64,
    alphabet: Vec<Key>,
    fixed: Vec<Option<Key>>,
    allowed: Vec<Option<Vec<Key>>>,
    apart: Vec<(Element, Element)>,
    partners: Vec<Vec<Element>>,
}

fn targets(prism: &Prism, element: Option<&str>, index: Option<usize>) -> ForgeResult<Vec<Element>> {
    let lookup = |name: &str| {
        prism
            .elements_of(name)
            .ok_or_else(|| ForgeError::Config(format!("constraint names unknown element '{}'", name)))
    };
    match (element, index) {
        (Some(name), Some(i)) => {
            let elements = lookup(name)?;
            elements.get(i).map(|&e| vec![e]).ok_or_else(|| {
                ForgeError::Config(format!("element '{}' has no key at index {}", name, i))
            })
        }
        (Some(name), None) => Ok(lookup(name)?.to_vec()),
        (None, Some(i)) => Ok(prism
            .mapped()
            .filter_map(|(_, elements)| elements.get(i).copied())
            .collect()),
        (None, None) => Err(ForgeError::Config(
            "a constraint needs an element, an index, or both".into(),
        )),
    }
}

fn alphabet_keys(prism: &Prism, chars: &[char]) -> ForgeResult<Vec<Key>> {
    chars.iter().map(|&c| prism.alphabet_key(c)).collect()
}

impl Constraints {
    /// Compiles the configured constraints against the element numbering and
    /// checks that `initial` satisfies all of them.
    pub fn build(
        config: &ConstraintsConfig,
        prism: &Prism,
        initial: &ElementMapping,
    ) -> ForgeResult<Self> {
        let n = prism.element_count();
        let mut fixed = vec![None; n];
        let mut allowed: Vec<Option<Vec<Key>>> = vec![None; n];

        for c in &config.elements {
            let elements = targets(prism, c.element.as_deref(), c.index)?;
            match &c.keys {
                None => {
                    for e in elements {
                        fixed[e] = Some(initial[e]);
                    }
                }
                Some(chars) => {
                    let keys = alphabet_keys(prism, chars)?;
                    for e in elements {
                        let narrowed: Vec<Key> = match &allowed[e] {
                            Some(existing) => existing.iter().copied().filter(|k| keys.contains(k)).collect(),
                            None => keys.clone(),
                        };
                        if narrowed.is_empty() {
                            return Err(ForgeError::Config(format!(
                                "constraints leave '{}' with no key",
                                prism.element_label(e)
                            )));
                        }
                        allowed[e] = Some(narrowed);
                    }
                }
            }
        }

        for f in &config.forbidden {
            let keys = alphabet_keys(prism, &f.keys)?;
            for e in targets(prism, Some(&f.element), f.index)? {
                let remaining: Vec<Key> = allowed[e]
                    .as_deref()
                    .unwrap_or(&prism.alphabet)
                    .iter()
                    .copied()
                    .filter(|k| !keys.contains(k))
                    .collect();
                if remaining.is_empty() {
                    return Err(ForgeError::Config(format!(
                        "constraints forbid every key for '{}'",
                        prism.element_label(e)
                    )));
                }
                allowed[e] = Some(remaining);
            }
        }

        let mut apart = Vec::with_capacity(config.apart.len());
        let mut partners = vec![Vec::new(); n];
        for [a, b] in &config.apart {
            let find = |label: &str| match prism.element(label) {
                Some(e) if e as u64 >= prism.radix => Ok(e),
                _ => Err(ForgeError::Config(format!(
                    "apart constraint names unknown element '{}'",
                    label
                ))),
            };
            let (ea, eb) = (find(a)?, find(b)?);
            if ea == eb {
                return Err(ForgeError::Config(format!(
                    "'{}' and '{}' are the same element and cannot be kept apart",
                    a, b
                )));
            }
            apart.push((ea, eb));
            partners[ea].push(eb);
            partners[eb].push(ea);
        }

        let constraints = Self {
            radix: prism.radix,
            alphabet: prism.alphabet.clone(),
            fixed,
            allowed,
            apart,
            partners,
        };

        for e in (prism.radix as usize)..n {
            if let (Some(key), Some(keys)) = (constraints.fixed[e], &constraints.allowed[e]) {
                if !keys.contains(&key) {
                    return Err(ForgeError::Config(format!(
                        "'{}' is fixed on a key its constraints exclude",
                        prism.element_label(e)
                    )));
                }
            }
        }
        if !constraints.is_satisfied(initial) {
            return Err(ForgeError::Config(
                "the initial mapping violates the configured constraints".into(),
            ));
        }

        debug!(
            "Constraints: {} fixed, {} narrowed, {} apart pairs",
            constraints.fixed.iter().filter(|f| f.is_some()).count(),
            constraints.allowed.iter().filter(|a| a.is_some()).count(),
            constraints.apart.len()
        );
        Ok(constraints)
    }

    /// No constraints beyond the alphabet.
    pub fn unconstrained(prism: &Prism) -> Self {
        let n = prism.element_count();
        Self {
            radix: prism.radix,
            alphabet: prism.alphabet.clone(),
            fixed: vec![None; n],
            allowed: vec![None; n],
            apart: Vec::new(),
            partners: vec![Vec::new(); n],
        }
    }

    #[inline(always)]
    fn is_key_element(&self, e: Element) -> bool {
        (e as u64) < self.radix
    }

    pub fn allowed_keys(&self, e: Element) -> &[Key] {
        self.allowed[e].as_deref().unwrap_or(&self.alphabet)
    }

    #[inline(always)]
    pub fn allows(&self, e: Element, key: Key) -> bool {
        !self.is_key_element(e) && self.fixed[e].is_none() && self.allowed_keys(e).contains(&key)
    }

    /// Elements that have somewhere else to go.
    pub fn movable(&self) -> Vec<Element> {
        (self.radix as usize..self.fixed.len())
            .filter(|&e| self.fixed[e].is_none() && self.allowed_keys(e).len() >= 2)
            .collect()
    }

    /// Apart pairs touching `touched` are on different keys.
    pub fn separated(&self, mapping: &ElementMapping, touched: &[Element]) -> bool {
        touched
            .iter()
            .all(|&e| self.partners[e].iter().all(|&p| mapping[e] != mapping[p]))
    }

    pub fn is_satisfied(&self, mapping: &ElementMapping) -> bool {
        if mapping.len() != self.fixed.len() {
            return false;
        }
        (0..mapping.len()).all(|e| {
            let key = mapping[e];
            if self.is_key_element(e) {
                return key == e as u64;
            }
            if let Some(fixed) = self.fixed[e] {
                return key == fixed;
            }
            self.allowed_keys(e).contains(&key)
        }) && self.apart.iter().all(|&(a, b)| mapping[a] != mapping[b])
    }

    /// Reverts both members of any pair that ended up sharing a key to their
    /// keys in `primary`, until no pair does. `primary` must satisfy the
    /// constraints; elements only ever move back to it, so this terminates.
    pub fn repair(&self, child: &mut ElementMapping, primary: &ElementMapping) {
        loop {
            let mut changed = false;
            for &(a, b) in &self.apart {
                if child[a] == child[b] && (child[a] != primary[a] || child[b] != primary[b]) {
                    child.set(a, primary[a]);
                    child.set(b, primary[b]);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }
}
