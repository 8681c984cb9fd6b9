pub mod cmap;

use encoding_rs::UTF_16BE;

use crate::unicode::UnicodeValue;
use cmap::ToUnicodeCMap;

impl ToUnicodeCMap {
    /// Decode the code at the start of `bytes`.
    ///
    /// Returns the mapped value and the number of bytes the code occupies. Bytes that do not
    /// form a code of the code space give U+FFFD and advance by one byte, so decoding always
    /// makes progress. Unmapped codes give U+FFFD as well.
    pub fn decode_next(&self, bytes: &[u8]) -> (UnicodeValue, usize) {
        match self.code_space().decode(bytes) {
            Some((code, len)) => (self.get_or_replacement_char(code), len),
            None => (UnicodeValue::replacement(), bytes.len().min(1)),
        }
    }

    /// Iterate over the values of all codes in `bytes`.
    pub fn decode<'a>(&'a self, bytes: &'a [u8]) -> Decode<'a> {
        Decode { cmap: self, bytes }
    }

    /// Text of an encoded string, unpaired surrogates are replaced by U+FFFD.
    pub fn decode_text(&self, bytes: &[u8]) -> String {
        let utf16: Vec<u8> = self.decode(bytes).flat_map(|value| value.to_be_bytes()).collect();
        let (text, _) = UTF_16BE.decode_without_bom_handling(&utf16);
        text.into_owned()
    }
}

/// Iterator returned by [`ToUnicodeCMap::decode`].
#[derive(Debug, Clone)]
pub struct Decode<'a> {
    cmap: &'a ToUnicodeCMap,
    bytes: &'a [u8],
}

impl Iterator for Decode<'_> {
    type Item = UnicodeValue;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bytes.is_empty() {
            return None;
        }
        let (value, consumed) = self.cmap.decode_next(self.bytes);
        self.bytes = &self.bytes[consumed..];
        Some(value)
    }
}
