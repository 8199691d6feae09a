use tracing::{debug, warn};

use super::fingering::FingeringTable;
use crate::config::KeyboardLayout;
use crate::consts::MAX_COMBINATION_LENGTH;
use crate::core_types::{Code, FingeringLabel};
use crate::corpus::{Assets, DistributionLoss};
use crate::prism::Prism;

/// Lookup tables shared by every metric group, precomputed over all key
/// windows of up to `MAX_COMBINATION_LENGTH` keys.
#[derive(Debug, Clone)]
pub struct ObjectiveTables {
    pub radix: u64,
    /// Keys per window.
    pub window: usize,
    max_index: u64,
    segment: u64,
    breakpoints: Vec<u64>,
    /// Ideal share per key number, as a fraction.
    pub ideal: Vec<DistributionLoss>,
    pub equivalence: Vec<f64>,
    pub fingering: Vec<FingeringLabel>,
}

impl ObjectiveTables {
    pub fn build(
        prism: &Prism,
        assets: &Assets,
        keyboard: &KeyboardLayout,
        max_length: usize,
        with_equivalence: bool,
        with_fingering: bool,
    ) -> Self {
        let radix = prism.radix;
        // actual codes are one select key longer than key codes
        let window = (max_length + 1).clamp(2, MAX_COMBINATION_LENGTH);
        let max_index = radix.pow(window as u32);
        let segment = radix.pow(window as u32 - 1);
        let breakpoints = (0..=max_length as u32 + 1).map(|i| radix.pow(i)).collect();

        let mut ideal = vec![DistributionLoss::default(); radix as usize];
        for (&c, loss) in &assets.key_distribution {
            match prism.key(c) {
                Some(key) => {
                    ideal[key as usize] = DistributionLoss {
                        ideal: loss.ideal / 100.0,
                        ..*loss
                    }
                }
                None => debug!("Ignoring distribution entry for unknown key '{}'", c),
            }
        }

        let decode = |index: u64| -> Vec<char> {
            let mut keys = Vec::with_capacity(window);
            let mut rest = index;
            while rest > 0 {
                let digit = rest % radix;
                if digit == 0 {
                    break;
                }
                if let Some(c) = prism.key_char(digit) {
                    keys.push(c);
                }
                rest /= radix;
            }
            keys
        };

        let equivalence = if with_equivalence {
            let mut missing = 0usize;
            let table: Vec<f64> = (0..max_index)
                .map(|index| {
                    let keys = decode(index);
                    keys.windows(2)
                        .map(|pair| {
                            let gram: String = pair.iter().collect();
                            assets.pair_equivalence.get(&gram).copied().unwrap_or_else(|| {
                                missing += 1;
                                0.0
                            })
                        })
                        .sum()
                })
                .collect();
            if missing > 0 {
                warn!(
                    "{} key pairs lack equivalence data and count as zero",
                    missing
                );
            }
            table
        } else {
            Vec::new()
        };

        let fingering = if with_fingering {
            let layout = FingeringTable::from_layout(keyboard);
            (0..max_index).map(|index| layout.label(&decode(index))).collect()
        } else {
            Vec::new()
        };

        Self {
            radix,
            window,
            max_index,
            segment,
            breakpoints,
            ideal,
            equivalence,
            fingering,
        }
    }

    /// Number of keys in an actual code.
    #[inline(always)]
    pub fn code_length(&self, code: Code) -> usize {
        self.breakpoints
            .iter()
            .position(|&b| code < b)
            .unwrap_or(self.breakpoints.len())
    }

    /// Overlapping windows of a code, each sharing one key with the next.
    #[inline(always)]
    pub fn windows(&self, code: Code) -> Windows {
        Windows {
            code,
            radix: self.radix,
            max_index: self.max_index,
            segment: self.segment,
        }
    }
}

pub struct Windows {
    code: Code,
    radix: u64,
    max_index: u64,
    segment: u64,
}

impl Iterator for Windows {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        if self.code <= self.radix {
            return None;
        }
        let index = self.code % self.max_index;
        self.code /= self.segment;
        Some(index as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EncoderConfig, FormConfig};

    fn tables(max_length: usize) -> ObjectiveTables {
        let form = FormConfig {
            alphabet: "abc".into(),
            ..Default::default()
        };
        let encoder = EncoderConfig {
            max_length,
            ..Default::default()
        };
        let (prism, _) = Prism::build(&form, &encoder).unwrap();
        let mut assets = Assets::default();
        assets.pair_equivalence.insert("ab".into(), 1.0);
        assets.pair_equivalence.insert("bc".into(), 2.0);
        assets.pair_equivalence.insert("ca".into(), 4.0);
        ObjectiveTables::build(&prism, &assets, &KeyboardLayout::default(), max_length, true, true)
    }

    #[test]
    fn test_code_length() {
        let t = tables(3); // radix 5
        assert_eq!(t.code_length(3), 1);
        assert_eq!(t.code_length(3 + 5), 2);
        assert_eq!(t.code_length(1 + 2 * 5 + 3 * 25 + 4 * 125), 4);
    }

    #[test]
    fn test_windows_cover_every_pair_once() {
        let t = tables(3); // window 4, radix 5
        // "abcab" = 1 2 3 1 2
        let code = 1 + 2 * 5 + 3 * 25 + 5u64.pow(3) + 2 * 5u64.pow(4);
        let total: f64 = t.windows(code).map(|w| t.equivalence[w]).sum();
        // ab + bc + ca + ab
        assert_eq!(total, 1.0 + 2.0 + 4.0 + 1.0);
    }

    #[test]
    fn test_single_key_has_no_windows() {
        let t = tables(2);
        assert_eq!(t.windows(2).count(), 0);
    }
}
