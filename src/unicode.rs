use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const HIGH_SURROGATES: std::ops::RangeInclusive<u16> = 0xD800..=0xDBFF;
const LOW_SURROGATES: std::ops::RangeInclusive<u16> = 0xDC00..=0xDFFF;

/// The destination of a ToUnicode mapping: a sequence of UTF-16 code units.
///
/// The units are kept exactly as given, including unpaired surrogates, so a value read
/// from a CMap is written back bit for bit.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnicodeValue(Vec<u16>);

impl UnicodeValue {
    pub const REPLACEMENT_CHAR: u16 = 0xFFFD;

    pub fn new(units: Vec<u16>) -> UnicodeValue {
        UnicodeValue(units)
    }

    pub fn replacement() -> UnicodeValue {
        UnicodeValue(vec![Self::REPLACEMENT_CHAR])
    }

    /// Big-endian UTF-16 as found in CMap hex strings. `None` for an odd number of bytes.
    pub fn from_be_bytes(bytes: &[u8]) -> Option<UnicodeValue> {
        if bytes.len() % 2 != 0 {
            return None;
        }
        Some(UnicodeValue(
            bytes
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect(),
        ))
    }

    pub fn units(&self) -> &[u16] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_be_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|unit| unit.to_be_bytes()).collect()
    }

    /// Whether the value can be the base of an incrementing bfrange: a single BMP unit
    /// outside the surrogate block, or one well-formed surrogate pair.
    pub fn is_incrementable(&self) -> bool {
        match self.0.as_slice() {
            [unit] => !is_surrogate(*unit),
            [high, low] => HIGH_SURROGATES.contains(high) && LOW_SURROGATES.contains(low),
            _ => false,
        }
    }

    /// The value a code `offset` positions after the start of an incrementing bfrange maps to.
    ///
    /// A single unit stays inside its non-surrogate block, a surrogate pair carries from the
    /// low into the high surrogate. Returns `None` if the value has any other shape or the
    /// result would leave the valid range.
    pub fn checked_offset(&self, offset: u32) -> Option<UnicodeValue> {
        match self.0.as_slice() {
            [unit] if !is_surrogate(*unit) => {
                let value = (*unit as u32).checked_add(offset)?;
                let same_block = if *unit < *HIGH_SURROGATES.start() {
                    value < *HIGH_SURROGATES.start() as u32
                } else {
                    value <= 0xFFFF
                };
                same_block.then(|| UnicodeValue(vec![value as u16]))
            }
            [high, low] if HIGH_SURROGATES.contains(high) && LOW_SURROGATES.contains(low) => {
                let scalar = 0x10000 + (((*high - 0xD800) as u32) << 10) + (*low - 0xDC00) as u32;
                let value = scalar.checked_add(offset).filter(|value| *value <= 0x10FFFF)? - 0x10000;
                Some(UnicodeValue(vec![
                    0xD800 + (value >> 10) as u16,
                    0xDC00 + (value & 0x3FF) as u16,
                ]))
            }
            _ => None,
        }
    }

    /// Like [`UnicodeValue::checked_offset`], but values of other shapes (ligatures, lone
    /// surrogates) found in parsed CMaps get their last unit incremented with wrap-around.
    pub fn offset(&self, offset: u32) -> UnicodeValue {
        if offset == 0 {
            return self.clone();
        }
        self.checked_offset(offset).unwrap_or_else(|| {
            let mut units = self.0.clone();
            if let Some(last) = units.last_mut() {
                *last = last.wrapping_add(offset as u16);
            }
            UnicodeValue(units)
        })
    }
}

#[inline]
fn is_surrogate(unit: u16) -> bool {
    (0xD800..=0xDFFF).contains(&unit)
}

impl fmt::Display for UnicodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in char::decode_utf16(self.0.iter().copied()) {
            write!(f, "{}", c.unwrap_or(char::REPLACEMENT_CHARACTER))?;
        }
        Ok(())
    }
}

impl From<Vec<u16>> for UnicodeValue {
    fn from(units: Vec<u16>) -> Self {
        UnicodeValue(units)
    }
}

impl From<&[u16]> for UnicodeValue {
    fn from(units: &[u16]) -> Self {
        UnicodeValue(units.to_vec())
    }
}

impl From<&str> for UnicodeValue {
    fn from(text: &str) -> Self {
        UnicodeValue(text.encode_utf16().collect())
    }
}

impl From<char> for UnicodeValue {
    fn from(c: char) -> Self {
        let mut buf = [0; 2];
        UnicodeValue(c.encode_utf16(&mut buf).to_vec())
    }
}

impl FromIterator<char> for UnicodeValue {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        let mut buf = [0; 2];
        UnicodeValue(
            iter.into_iter()
                .flat_map(|c| c.encode_utf16(&mut buf).to_vec())
                .collect(),
        )
    }
}
