use fnv::FnvHashMap;
use strum::{Display, EnumIter};

use crate::config::KeyboardLayout;
use crate::core_types::FingeringLabel;

/// Label slots of a fingering vector. Slots 6 and 7 are unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum FingeringKind {
    SameHand = 0,
    SameFingerLargeJump = 1,
    SameFingerSmallJump = 2,
    LittleFingerInterference = 3,
    AwkwardUpsideDown = 4,
    TripleRepeat = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Finger {
    Index,
    Middle,
    Ring,
    Little,
}

impl Finger {
    fn from_column(column: usize) -> Self {
        match column {
            0 | 1 => Finger::Index,
            2 => Finger::Middle,
            3 => Finger::Ring,
            _ => Finger::Little,
        }
    }

    fn is_long(self) -> bool {
        matches!(self, Finger::Middle | Finger::Ring)
    }
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    hand: u8,
    row: usize,
    finger: Finger,
}

/// Where each physical key sits and which finger strikes it.
#[derive(Debug, Clone)]
pub struct FingeringTable {
    placements: FnvHashMap<char, Placement>,
}

impl FingeringTable {
    pub fn from_layout(layout: &KeyboardLayout) -> Self {
        let mut placements = FnvHashMap::default();
        for (hand, rows) in [&layout.left, &layout.right].into_iter().enumerate() {
            for (row, keys) in rows.iter().enumerate() {
                for (column, c) in keys.chars().enumerate() {
                    placements.insert(
                        c,
                        Placement {
                            hand: hand as u8,
                            row,
                            finger: Finger::from_column(column),
                        },
                    );
                }
            }
        }
        Self { placements }
    }

    fn pair(&self, a: char, b: char, label: &mut FingeringLabel) {
        let (Some(p1), Some(p2)) = (self.placements.get(&a), self.placements.get(&b)) else {
            return;
        };
        if p1.hand != p2.hand {
            return;
        }
        label[FingeringKind::SameHand as usize] += 1;

        let row_diff = p1.row.abs_diff(p2.row);
        if p1.finger == p2.finger {
            if row_diff >= 2 {
                label[FingeringKind::SameFingerLargeJump as usize] += 1;
            } else if row_diff == 1 {
                label[FingeringKind::SameFingerSmallJump as usize] += 1;
            }
        }
        if (p1.finger == Finger::Little && p2.finger >= Finger::Middle)
            || (p2.finger == Finger::Little && p1.finger >= Finger::Middle)
        {
            label[FingeringKind::LittleFingerInterference as usize] += 1;
        }
        // a short finger high followed by a long finger low, or the reverse
        let reaching_down = p1.row < p2.row && !p1.finger.is_long() && p2.finger.is_long();
        let reaching_up = p1.row > p2.row && p1.finger.is_long() && !p2.finger.is_long();
        if (reaching_down || reaching_up) && row_diff >= 2 {
            label[FingeringKind::AwkwardUpsideDown as usize] += 1;
        }
    }

    /// Label counts for a run of keys, pair by pair.
    pub fn label(&self, keys: &[char]) -> FingeringLabel {
        let mut label = FingeringLabel::default();
        for pair in keys.windows(2) {
            self.pair(pair[0], pair[1], &mut label);
        }
        for triple in keys.windows(3) {
            if triple[0] == triple[1] && triple[1] == triple[2] {
                label[FingeringKind::TripleRepeat as usize] += 1;
            }
        }
        label
    }
}
