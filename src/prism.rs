use fnv::FnvHashMap;
use std::collections::BTreeMap;

use crate::config::{EncoderConfig, FormConfig};
use crate::consts::DEFAULT_SELECT_KEY;
use crate::core_types::{Code, Element, Key};
use crate::error::{ForgeError, ForgeResult};
use crate::mapping::ElementMapping;

/// Numbering of keys and elements, and the way back to text.
#[derive(Debug, Clone)]
pub struct Prism {
    pub radix: u64,
    /// Alphabet key numbers, `1..=n`.
    pub alphabet: Vec<Key>,
    /// Select key numbers, following the alphabet.
    pub select_keys: Vec<Key>,
    key_to_number: FnvHashMap<char, Key>,
    number_to_key: Vec<Option<char>>,
    element_to_number: FnvHashMap<String, Element>,
    number_to_element: Vec<String>,
    mapped: Vec<(String, Vec<Element>)>,
    aliases: BTreeMap<String, String>,
}

impl Prism {
    /// Numbers keys and elements and returns the mapping written in `form`.
    pub fn build(form: &FormConfig, encoder: &EncoderConfig) -> ForgeResult<(Self, ElementMapping)> {
        let mut key_to_number = FnvHashMap::default();
        let mut number_to_key = vec![None];

        for c in form.alphabet.chars() {
            let number = number_to_key.len() as Key;
            if key_to_number.insert(c, number).is_some() {
                return Err(ForgeError::Config(format!("alphabet contains '{}' twice", c)));
            }
            number_to_key.push(Some(c));
        }
        let alphabet: Vec<Key> = (1..number_to_key.len() as Key).collect();

        let select_chars = encoder
            .select_keys
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_SELECT_KEY]);
        let mut select_keys = Vec::with_capacity(select_chars.len());
        for c in select_chars {
            if let Some(&number) = key_to_number.get(&c) {
                // a select key may repeat, but never doubles as an alphabet key
                if alphabet.contains(&number) {
                    return Err(ForgeError::Config(format!(
                        "select key '{}' is also an alphabet key",
                        c
                    )));
                }
                select_keys.push(number);
                continue;
            }
            let number = number_to_key.len() as Key;
            key_to_number.insert(c, number);
            number_to_key.push(Some(c));
            select_keys.push(number);
        }

        let radix = number_to_key.len() as u64;
        if radix.checked_pow(encoder.max_length as u32 + 1).is_none() {
            return Err(ForgeError::Config(format!(
                "{} keys with max_length {} overflow the code space",
                radix - 1,
                encoder.max_length
            )));
        }

        // Keys are elements of themselves so sequences may name them directly.
        let mut element_to_number = FnvHashMap::default();
        let mut number_to_element = vec![String::new()];
        let mut keys: Vec<Key> = (0..radix).collect();
        for number in 1..radix {
            if let Some(c) = number_to_key[number as usize] {
                element_to_number.insert(c.to_string(), number as Element);
                number_to_element.push(c.to_string());
            }
        }

        let mut mapped = Vec::with_capacity(form.mapping.len());
        for (name, key_string) in &form.mapping {
            let mut elements = Vec::new();
            for (index, c) in key_string.chars().enumerate() {
                let key = match key_to_number.get(&c) {
                    Some(&k) if alphabet.contains(&k) => k,
                    _ => {
                        return Err(ForgeError::Config(format!(
                            "element '{}' is mapped to '{}', which is not in the alphabet",
                            name, c
                        )))
                    }
                };
                let label = Self::element_name(name, index);
                let number = keys.len();
                if element_to_number.insert(label.clone(), number).is_some() {
                    return Err(ForgeError::Config(format!(
                        "element '{}' clashes with a key or another element",
                        label
                    )));
                }
                number_to_element.push(label);
                keys.push(key);
                elements.push(number);
            }
            mapped.push((name.clone(), elements));
        }

        let aliases = Self::resolve_grouping(form)?;
        for (name, representative) in &aliases {
            let Some((_, elements)) = mapped.iter().find(|(n, _)| n == representative) else {
                return Err(ForgeError::Config(format!(
                    "element '{}' is grouped under '{}', which is not mapped",
                    name, representative
                )));
            };
            for (index, &element) in elements.iter().enumerate() {
                let label = Self::element_name(name, index);
                if element_to_number.insert(label.clone(), element).is_some() {
                    return Err(ForgeError::Config(format!(
                        "grouped element '{}' clashes with a key or another element",
                        label
                    )));
                }
            }
        }

        let prism = Prism {
            radix,
            alphabet,
            select_keys,
            key_to_number,
            number_to_key,
            element_to_number,
            number_to_element,
            mapped,
            aliases,
        };
        Ok((prism, ElementMapping::new(keys)))
    }

    /// Follows grouping chains down to a mapped representative.
    fn resolve_grouping(form: &FormConfig) -> ForgeResult<BTreeMap<String, String>> {
        let mut resolved = BTreeMap::new();
        for (name, target) in &form.grouping {
            if form.mapping.contains_key(name) {
                return Err(ForgeError::Config(format!(
                    "element '{}' is both mapped and grouped",
                    name
                )));
            }
            let mut current = target;
            let mut hops = 0;
            while let Some(next) = form.grouping.get(current) {
                hops += 1;
                if hops > form.grouping.len() {
                    return Err(ForgeError::Config(format!(
                        "grouping of '{}' forms a cycle",
                        name
                    )));
                }
                current = next;
            }
            resolved.insert(name.clone(), current.clone());
        }
        Ok(resolved)
    }

    /// Label of the `index`-th key of a mapped element.
    pub fn element_name(name: &str, index: usize) -> String {
        if index == 0 {
            name.to_string()
        } else {
            format!("{}.{}", name, index)
        }
    }

    pub fn element_count(&self) -> usize {
        self.number_to_element.len()
    }

    pub fn element(&self, label: &str) -> Option<Element> {
        self.element_to_number.get(label).copied()
    }

    pub fn element_label(&self, element: Element) -> &str {
        self.number_to_element
            .get(element)
            .map(String::as_str)
            .unwrap_or("?")
    }

    /// Elements behind a mapped or grouped name, one per key position.
    pub fn elements_of(&self, name: &str) -> Option<&[Element]> {
        let name = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.mapped
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e.as_slice())
    }

    pub fn mapped(&self) -> impl Iterator<Item = (&str, &[Element])> {
        self.mapped.iter().map(|(n, e)| (n.as_str(), e.as_slice()))
    }

    pub fn key(&self, c: char) -> Option<Key> {
        self.key_to_number.get(&c).copied()
    }

    /// Looks up a character that must be an alphabet key.
    pub fn alphabet_key(&self, c: char) -> ForgeResult<Key> {
        match self.key(c) {
            Some(k) if self.alphabet.contains(&k) => Ok(k),
            _ => Err(ForgeError::Config(format!("'{}' is not an alphabet key", c))),
        }
    }

    pub fn key_char(&self, key: Key) -> Option<char> {
        self.number_to_key.get(key as usize).copied().flatten()
    }

    /// Renders a code as the key characters typed, first key first.
    pub fn decode(&self, mut code: Code) -> String {
        let mut out = String::new();
        while code > 0 {
            if let Some(c) = self.key_char(code % self.radix) {
                out.push(c);
            }
            code /= self.radix;
        }
        out
    }

    /// Writes a mapping back in the shape of `form.mapping`.
    pub fn render(&self, mapping: &ElementMapping) -> BTreeMap<String, String> {
        self.mapped
            .iter()
            .map(|(name, elements)| {
                let keys: String = elements
                    .iter()
                    .filter_map(|&e| self.key_char(mapping[e]))
                    .collect();
                (name.clone(), keys)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(mapping: &[(&str, &str)], grouping: &[(&str, &str)]) -> FormConfig {
        FormConfig {
            alphabet: "abc".into(),
            mapping: mapping
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            grouping: grouping
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_numbering_and_identity_prefix() {
        let (prism, mapping) =
            Prism::build(&form(&[("X", "ab"), ("Y", "c")], &[]), &EncoderConfig::default())
                .unwrap();
        // a b c + default select key
        assert_eq!(prism.radix, 5);
        assert_eq!(prism.alphabet, vec![1, 2, 3]);
        assert_eq!(prism.select_keys, vec![4]);
        assert_eq!(&mapping.as_slice()[..5], &[0, 1, 2, 3, 4]);

        let x0 = prism.element("X").unwrap();
        let x1 = prism.element("X.1").unwrap();
        let y = prism.element("Y").unwrap();
        assert_eq!((mapping[x0], mapping[x1], mapping[y]), (1, 2, 3));
        assert_eq!(prism.element("b"), Some(2));
        assert_eq!(prism.render(&mapping)["X"], "ab");
    }

    #[test]
    fn test_decode_skips_empty_digits() {
        let (prism, _) = Prism::build(&form(&[], &[]), &EncoderConfig::default()).unwrap();
        // "ca" = 3 + 1 * 5
        assert_eq!(prism.decode(3 + 5), "ca");
        assert_eq!(prism.decode(3 + 5 + 4 * 25), "ca_");
    }

    #[test]
    fn test_grouping_shares_elements() {
        let (prism, _) =
            Prism::build(&form(&[("X", "a")], &[("Z", "W"), ("W", "X")]), &EncoderConfig::default())
                .unwrap();
        assert_eq!(prism.element("Z"), prism.element("X"));
        assert_eq!(prism.elements_of("W"), prism.elements_of("X"));
    }

    #[test]
    fn test_grouping_errors() {
        let cfg = EncoderConfig::default();
        assert!(Prism::build(&form(&[("X", "a")], &[("X", "X")]), &cfg).is_err());
        assert!(Prism::build(&form(&[("X", "a")], &[("P", "Q"), ("Q", "P")]), &cfg).is_err());
        assert!(Prism::build(&form(&[("X", "a")], &[("P", "nowhere")]), &cfg).is_err());
    }

    #[test]
    fn test_rejects_key_outside_alphabet() {
        let err = Prism::build(&form(&[("X", "z")], &[]), &EncoderConfig::default());
        assert!(matches!(err, Err(ForgeError::Config(_))));
    }
}
