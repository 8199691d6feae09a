use fnv::FnvHashMap;

use crate::core_types::Code;

/// Largest dense region allocated for a code space.
const MAX_DENSE_SIZE: u64 = 1 << 24;

/// Occupancy counts per code. Short codes live in a dense table, longer ones
/// in a hash map.
#[derive(Debug, Clone)]
pub struct CodeSpace {
    dense: Vec<u8>,
    overflow: FnvHashMap<Code, u8>,
}

impl CodeSpace {
    pub fn new(size: u64) -> Self {
        Self {
            dense: vec![0; size.min(MAX_DENSE_SIZE) as usize],
            overflow: FnvHashMap::default(),
        }
    }

    #[inline(always)]
    pub fn rank(&self, code: Code) -> u8 {
        match self.dense.get(code as usize) {
            Some(&count) => count,
            None => self.overflow.get(&code).copied().unwrap_or(0),
        }
    }

    #[inline(always)]
    pub fn insert(&mut self, code: Code) {
        match self.dense.get_mut(code as usize) {
            Some(count) => *count = count.saturating_add(1),
            None => {
                let count = self.overflow.entry(code).or_insert(0);
                *count = count.saturating_add(1);
            }
        }
    }

    pub fn reset(&mut self) {
        self.dense.fill(0);
        self.overflow.clear();
    }
}
