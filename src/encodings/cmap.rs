use std::ops::RangeInclusive;

use log::{debug, warn};
use rangemap::RangeInclusiveMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cmap_section::{CMapContent, CMapSection, RangeTarget};
use crate::code_space::{CharCode, CodeSpace, CodeSpaceRange};
use crate::parser::cmap_parser;
use crate::unicode::UnicodeValue;
use crate::{Error, Result};

/// One `<code> <value>` line of a `beginbfchar` block.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BfChar {
    pub code: CharCode,
    pub value: UnicodeValue,
}

impl BfChar {
    pub fn new(code: CharCode, value: impl Into<UnicodeValue>) -> BfChar {
        BfChar {
            code,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BfRangeTarget {
    /// `first + i` maps to the base value offset by `i`.
    Incrementing(UnicodeValue),
    /// `first + i` maps to the `i`-th value of the array.
    Array(Vec<UnicodeValue>),
}

/// One `<first> <last> target` line of a `beginbfrange` block.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BfRange {
    pub first: CharCode,
    pub last: CharCode,
    pub target: BfRangeTarget,
}

impl BfRange {
    /// Number of codes covered by the range.
    pub fn code_count(&self) -> u64 {
        u64::from(self.last.saturating_sub(self.first)) + 1
    }

    pub fn contains(&self, code: CharCode) -> bool {
        self.first <= code && code <= self.last
    }

    pub fn get(&self, code: CharCode) -> Option<UnicodeValue> {
        if !self.contains(code) {
            return None;
        }
        let offset = code - self.first;
        match &self.target {
            BfRangeTarget::Incrementing(base) => Some(base.offset(offset)),
            BfRangeTarget::Array(values) => values.get(offset as usize).cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CIDSystemInfo {
    pub registry: String,
    pub ordering: String,
    pub supplement: i32,
}

impl Default for CIDSystemInfo {
    fn default() -> Self {
        CIDSystemInfo {
            registry: "Adobe".to_string(),
            ordering: "UCS".to_string(),
            supplement: 0,
        }
    }
}

impl CIDSystemInfo {
    /// Registry and Ordering must be made of ASCII alphanumerics and `_`, and the supplement
    /// must not be negative. Anything else would not survive a write and parse.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [("Registry", &self.registry), ("Ordering", &self.ordering)] {
            if !is_system_info_string(value.as_bytes()) {
                return Err(Error::InvalidInput(format!("{} {:?} is not alphanumeric", key, value)));
            }
        }
        if self.supplement < 0 {
            return Err(Error::InvalidInput(format!("Supplement {} is negative", self.supplement)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Char(usize),
    Range(usize),
}

/// A ToUnicode CMap: maps character codes of a font to the UTF-16 text they represent.
///
/// Entries are kept in the order they are written. Lookups go through an interval map over
/// all entries, so a code is found in logarithmic time no matter how the map is split into
/// bfchar and bfrange lines. No code is mapped by more than one entry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "ToUnicodeCMapData", into = "ToUnicodeCMapData")
)]
pub struct ToUnicodeCMap {
    name: String,
    system_info: CIDSystemInfo,
    code_space: CodeSpace,
    bf_chars: Vec<BfChar>,
    bf_ranges: Vec<BfRange>,
    index: RangeInclusiveMap<CharCode, Slot>,
}

impl Default for ToUnicodeCMap {
    fn default() -> Self {
        ToUnicodeCMap {
            name: ToUnicodeCMap::DEFAULT_NAME.to_string(),
            system_info: CIDSystemInfo::default(),
            code_space: CodeSpace::default(),
            bf_chars: Vec::new(),
            bf_ranges: Vec::new(),
            index: RangeInclusiveMap::new(),
        }
    }
}

impl ToUnicodeCMap {
    pub const DEFAULT_NAME: &'static str = "Adobe-Identity-UCS";

    /// Build a CMap from explicit entries.
    ///
    /// Fails with [`Error::CodeNotInSpace`] if an entry's code lies outside `code_space`, and
    /// with [`Error::InvalidInput`] for reversed ranges, arrays whose length differs from the
    /// range length, codes that are mapped more than once and a `system_info` that fails
    /// [`CIDSystemInfo::validate`].
    pub fn new(
        name: impl Into<String>, system_info: CIDSystemInfo, code_space: CodeSpace, bf_chars: Vec<BfChar>,
        bf_ranges: Vec<BfRange>,
    ) -> Result<ToUnicodeCMap> {
        system_info.validate()?;
        let mut index = RangeInclusiveMap::new();

        for (i, range) in bf_ranges.iter().enumerate() {
            if range.first > range.last {
                return Err(Error::InvalidInput(format!(
                    "bfrange {:#X}..{:#X} is reversed",
                    range.first, range.last
                )));
            }
            for code in [range.first, range.last] {
                if !code_space.contains(code) {
                    return Err(Error::CodeNotInSpace(code));
                }
            }
            if let BfRangeTarget::Array(values) = &range.target {
                if values.len() as u64 != range.code_count() {
                    return Err(Error::InvalidInput(format!(
                        "bfrange {:#X}..{:#X} covers {} codes but has {} values",
                        range.first,
                        range.last,
                        range.code_count(),
                        values.len()
                    )));
                }
            }
            if !insert_entry(&mut index, range.first..=range.last, Slot::Range(i)) {
                return Err(Error::InvalidInput(format!(
                    "bfrange {:#X}..{:#X} overlaps another entry",
                    range.first, range.last
                )));
            }
        }

        for (i, bf_char) in bf_chars.iter().enumerate() {
            if !code_space.contains(bf_char.code) {
                return Err(Error::CodeNotInSpace(bf_char.code));
            }
            if !insert_entry(&mut index, bf_char.code..=bf_char.code, Slot::Char(i)) {
                return Err(Error::InvalidInput(format!(
                    "code {:#X} is mapped more than once",
                    bf_char.code
                )));
            }
        }

        Ok(ToUnicodeCMap {
            name: name.into(),
            system_info,
            code_space,
            bf_chars,
            bf_ranges,
            index,
        })
    }

    /// Parse the content of a ToUnicode CMap stream.
    ///
    /// Only a missing `begincmap`/`endcmap`, an unterminated block or a `/CMapType` other
    /// than 2 fail the parse. Entries that cannot be used are logged and left out.
    pub fn parse(stream_content: &[u8]) -> Result<ToUnicodeCMap> {
        let content = cmap_parser::parse(stream_content)?;
        Self::from_content(content, None)
    }

    /// Like [`ToUnicodeCMap::parse`], but codes are checked against `code_space` instead of
    /// the code space ranges declared in the stream.
    pub fn parse_with_code_space(stream_content: &[u8], code_space: CodeSpace) -> Result<ToUnicodeCMap> {
        let content = cmap_parser::parse(stream_content)?;
        Self::from_content(content, Some(code_space))
    }

    fn from_content(content: CMapContent, code_space: Option<CodeSpace>) -> Result<ToUnicodeCMap> {
        if let Some(cmap_type) = content.cmap_type {
            if cmap_type != 2 {
                return Err(Error::UnsupportedCMapType(cmap_type));
            }
        }

        let mut cmap = ToUnicodeCMap::default();
        if let Some(name) = content.name {
            cmap.name = String::from_utf8_lossy(&name).into_owned();
        }
        if let Some(registry) = content.registry {
            match system_info_string(registry) {
                Some(registry) => cmap.system_info.registry = registry,
                None => warn!("ignoring CIDSystemInfo Registry with invalid characters"),
            }
        }
        if let Some(ordering) = content.ordering {
            match system_info_string(ordering) {
                Some(ordering) => cmap.system_info.ordering = ordering,
                None => warn!("ignoring CIDSystemInfo Ordering with invalid characters"),
            }
        }
        if let Some(supplement) = content.supplement {
            cmap.system_info.supplement = match i32::try_from(supplement) {
                Ok(supplement) if supplement >= 0 => supplement,
                _ => {
                    warn!("CIDSystemInfo Supplement {} out of range, using 0", supplement);
                    0
                }
            };
        }

        let mut char_mappings = Vec::new();
        let mut range_mappings = Vec::new();
        let mut code_space_ranges = Vec::new();
        for section in content.sections {
            match section {
                CMapSection::CsRange(ranges) => {
                    for (first, last, len) in ranges {
                        match CodeSpaceRange::new(first, last, len) {
                            Some(range) => code_space_ranges.push(range),
                            None => warn!("discarding invalid codespacerange {:#X}..{:#X}", first, last),
                        }
                    }
                }
                CMapSection::BfChar(mappings) => char_mappings.extend(mappings),
                CMapSection::BfRange(mappings) => range_mappings.extend(mappings),
            }
        }

        cmap.code_space = match code_space {
            Some(code_space) => code_space,
            None if code_space_ranges.is_empty() => {
                debug!("no codespacerange given, using the default code space");
                CodeSpace::default()
            }
            None => CodeSpace::new(code_space_ranges),
        };

        for ((first, last, len), target) in range_mappings {
            if first > last {
                warn!("discarding reversed bfrange {:#X}..{:#X}", first, last);
                continue;
            }
            if !cmap.code_space.contains_with_len(first, len) || !cmap.code_space.contains_with_len(last, len) {
                warn!(
                    "discarding {} byte bfrange {:#X}..{:#X} outside the code space",
                    len, first, last
                );
                continue;
            }
            let range = match target {
                RangeTarget::Incrementing(base) => BfRange {
                    first,
                    last,
                    target: BfRangeTarget::Incrementing(base),
                },
                RangeTarget::Array(values) if values.is_empty() => {
                    warn!("discarding bfrange {:#X}..{:#X} with an empty array", first, last);
                    continue;
                }
                RangeTarget::Array(mut values) => {
                    let count = u64::from(last - first) + 1;
                    let last = if (values.len() as u64) < count {
                        warn!(
                            "bfrange {:#X}..{:#X} has only {} values, truncating it",
                            first,
                            last,
                            values.len()
                        );
                        first + (values.len() as u32 - 1)
                    } else {
                        if values.len() as u64 > count {
                            debug!("dropping surplus values of bfrange {:#X}..{:#X}", first, last);
                        }
                        values.truncate(count as usize);
                        last
                    };
                    BfRange {
                        first,
                        last,
                        target: BfRangeTarget::Array(values),
                    }
                }
            };
            if insert_entry(&mut cmap.index, range.first..=range.last, Slot::Range(cmap.bf_ranges.len())) {
                cmap.bf_ranges.push(range);
            } else {
                warn!("discarding bfrange {:#X}..{:#X} overlapping an earlier entry", first, last);
            }
        }

        for ((code, len), value) in char_mappings {
            if !cmap.code_space.contains_with_len(code, len) {
                warn!("discarding {} byte bfchar {:#X} outside the code space", len, code);
                continue;
            }
            if insert_entry(&mut cmap.index, code..=code, Slot::Char(cmap.bf_chars.len())) {
                cmap.bf_chars.push(BfChar { code, value });
            } else {
                warn!("discarding bfchar {:#X} overlapping an earlier entry", code);
            }
        }

        debug!(
            "ToUnicode CMap {} with {} bfchars and {} bfranges",
            cmap.name,
            cmap.bf_chars.len(),
            cmap.bf_ranges.len()
        );
        Ok(cmap)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn system_info(&self) -> &CIDSystemInfo {
        &self.system_info
    }

    /// Replaces the CIDSystemInfo, rejecting values [`CIDSystemInfo::validate`] refuses.
    pub fn set_system_info(&mut self, system_info: CIDSystemInfo) -> Result<()> {
        system_info.validate()?;
        self.system_info = system_info;
        Ok(())
    }

    pub fn code_space(&self) -> &CodeSpace {
        &self.code_space
    }

    pub fn bf_chars(&self) -> &[BfChar] {
        &self.bf_chars
    }

    pub fn bf_ranges(&self) -> &[BfRange] {
        &self.bf_ranges
    }

    /// Number of mapped codes.
    pub fn len(&self) -> usize {
        self.index
            .iter()
            .map(|(codes, _)| (codes.end() - codes.start()) as usize + 1)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn get(&self, code: CharCode) -> Option<UnicodeValue> {
        self.index.get(&code).and_then(|slot| self.slot_value(*slot, code))
    }

    pub fn get_or_replacement_char(&self, code: CharCode) -> UnicodeValue {
        self.get(code).unwrap_or_else(UnicodeValue::replacement)
    }

    /// Every mapped code with its value, in ascending code order.
    pub fn to_flat_list(&self) -> Vec<BfChar> {
        let mut list = Vec::with_capacity(self.len());
        for (codes, slot) in self.index.iter() {
            for code in codes.clone() {
                if let Some(value) = self.slot_value(*slot, code) {
                    list.push(BfChar { code, value });
                }
            }
        }
        list
    }

    fn slot_value(&self, slot: Slot, code: CharCode) -> Option<UnicodeValue> {
        match slot {
            Slot::Char(i) => self.bf_chars.get(i).map(|bf_char| bf_char.value.clone()),
            Slot::Range(i) => self.bf_ranges.get(i).and_then(|range| range.get(code)),
        }
    }
}

/// Adds `codes` to the index unless one of them is already mapped.
fn insert_entry(index: &mut RangeInclusiveMap<CharCode, Slot>, codes: RangeInclusive<CharCode>, slot: Slot) -> bool {
    if index.overlaps(&codes) {
        return false;
    }
    index.insert(codes, slot);
    true
}

// Registry and Ordering are restricted to alphanumerics and underscore
fn is_system_info_string(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'_')
}

fn system_info_string(bytes: Vec<u8>) -> Option<String> {
    if is_system_info_string(&bytes) {
        String::from_utf8(bytes).ok()
    } else {
        None
    }
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct ToUnicodeCMapData {
    name: String,
    system_info: CIDSystemInfo,
    code_space: CodeSpace,
    bf_chars: Vec<BfChar>,
    bf_ranges: Vec<BfRange>,
}

#[cfg(feature = "serde")]
impl TryFrom<ToUnicodeCMapData> for ToUnicodeCMap {
    type Error = Error;

    fn try_from(data: ToUnicodeCMapData) -> Result<Self> {
        ToUnicodeCMap::new(data.name, data.system_info, data.code_space, data.bf_chars, data.bf_ranges)
    }
}

#[cfg(feature = "serde")]
impl From<ToUnicodeCMap> for ToUnicodeCMapData {
    fn from(cmap: ToUnicodeCMap) -> Self {
        ToUnicodeCMapData {
            name: cmap.name,
            system_info: cmap.system_info,
            code_space: cmap.code_space,
            bf_chars: cmap.bf_chars,
            bf_ranges: cmap.bf_ranges,
        }
    }
}
