use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// According to pdf documentation source codes can be of various byte length but they
// should be smaller than integer
pub type CharCode = u32;
pub type CodeLen = u8;

const MAX_CODE_LEN: CodeLen = 4;

/// One `<first> <last>` line of a `begincodespacerange` block.
/// Both bounds are written with the same number of bytes, `len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CodeSpaceRange {
    pub first: CharCode,
    pub last: CharCode,
    pub len: CodeLen,
}

impl CodeSpaceRange {
    /// Returns `None` if `first > last`, the byte length is not between 1 and 4,
    /// or `last` does not fit into `len` bytes.
    pub fn new(first: CharCode, last: CharCode, len: CodeLen) -> Option<CodeSpaceRange> {
        if first > last || len == 0 || len > MAX_CODE_LEN || last > max_code(len) {
            return None;
        }
        Some(CodeSpaceRange { first, last, len })
    }

    #[inline]
    pub fn contains(&self, code: CharCode) -> bool {
        self.first <= code && code <= self.last
    }
}

#[inline]
fn max_code(len: CodeLen) -> CharCode {
    if len >= MAX_CODE_LEN {
        CharCode::MAX
    } else {
        (1 << (8 * len as u32)) - 1
    }
}

/// The set of byte sequences that are valid character codes for a CMap.
///
/// A code is contained if some range encloses it. The byte width a code is rendered with
/// is the width of the widest range containing it, and [`CodeSpace::decode`] likewise tries
/// the widest declared width first, so `decode(encode(code))` always gives `code` back.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CodeSpace {
    ranges: Vec<CodeSpaceRange>,
}

impl Default for CodeSpace {
    /// `<0000> <FFFF>`, the code space of CID-keyed ToUnicode maps.
    fn default() -> Self {
        CodeSpace::two_byte()
    }
}

impl CodeSpace {
    pub fn new(ranges: Vec<CodeSpaceRange>) -> CodeSpace {
        CodeSpace { ranges }
    }

    pub fn one_byte() -> CodeSpace {
        CodeSpace::new(vec![CodeSpaceRange {
            first: 0x00,
            last: 0xFF,
            len: 1,
        }])
    }

    pub fn two_byte() -> CodeSpace {
        CodeSpace::new(vec![CodeSpaceRange {
            first: 0x0000,
            last: 0xFFFF,
            len: 2,
        }])
    }

    pub fn ranges(&self) -> &[CodeSpaceRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, code: CharCode) -> bool {
        self.ranges.iter().any(|range| range.contains(code))
    }

    /// Whether `code` written with `len` bytes is a code of this space.
    ///
    /// Codes are written and read back with the widest width containing them, so a narrower
    /// rendering of the same value does not count.
    pub fn contains_with_len(&self, code: CharCode, len: CodeLen) -> bool {
        self.code_len(code) == Some(len)
    }

    /// Number of bytes `code` is written with, `None` if no range contains it.
    pub fn code_len(&self, code: CharCode) -> Option<CodeLen> {
        self.ranges
            .iter()
            .filter(|range| range.contains(code))
            .map(|range| range.len)
            .max()
    }

    /// Render `code` as big-endian bytes.
    pub fn encode(&self, code: CharCode) -> Result<Vec<u8>> {
        let len = self.code_len(code).ok_or(Error::CodeNotInSpace(code))?;
        let bytes = code.to_be_bytes();
        Ok(bytes[bytes.len() - len as usize..].to_vec())
    }

    /// Read the code at the start of `bytes`.
    ///
    /// Returns the code and the number of bytes it occupies, or `None` if no declared
    /// range matches a prefix of `bytes`.
    pub fn decode(&self, bytes: &[u8]) -> Option<(CharCode, usize)> {
        let mut widths: Vec<CodeLen> = self.ranges.iter().map(|range| range.len).collect();
        widths.sort_unstable_by(|a, b| b.cmp(a));
        widths.dedup();

        for len in widths {
            let len = len as usize;
            if bytes.len() < len {
                continue;
            }
            let code = bytes[..len]
                .iter()
                .fold(0, |code: CharCode, &byte| (code << 8) | byte as CharCode);
            if self
                .ranges
                .iter()
                .any(|range| range.len as usize == len && range.contains(code))
            {
                return Some((code, len));
            }
        }
        None
    }
}
