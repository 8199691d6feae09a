pub mod default;
pub mod space;

pub use self::default::DefaultEncoder;

use crate::core_types::{Code, Element};
use crate::mapping::ElementMapping;

/// One encoded form of an object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartialCode {
    /// Keys only, without a select key.
    pub code: Code,
    /// Objects that claimed this code earlier.
    pub rank: u8,
    /// The code as typed, select key included.
    pub actual: Code,
    pub duplicate: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CodeInfo {
    pub frequency: u64,
    pub word_length: usize,
    pub group_rank: usize,
    pub full: PartialCode,
    pub short: PartialCode,
}

impl CodeInfo {
    pub fn is_character(&self) -> bool {
        self.word_length == 1
    }
}

pub trait Encoder {
    /// Encodes every object. `moved` lists elements whose keys changed since
    /// the previous call, so only their objects need new key codes; `None`
    /// recomputes everything. Ranks and short codes are always rebuilt.
    fn encode(&mut self, mapping: &ElementMapping, moved: Option<&[Element]>) -> &[CodeInfo];

    /// Codes from the last call to `encode`, in corpus order.
    fn codes(&self) -> &[CodeInfo];
}
