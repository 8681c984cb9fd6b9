/*
Raw content of a ToUnicode CMap as it comes out of the parser.
- codes keep the byte length they were written with
- only codespacerange, bfchar and bfrange sections carry data
- destinations are hex strings holding UTF-16BE, glyph names are dropped
 */

use crate::code_space::{CharCode, CodeLen};
use crate::unicode::UnicodeValue;

pub(crate) type SourceCode = (CharCode, CodeLen);
pub(crate) type SourceRange = (CharCode, CharCode, CodeLen);
pub(crate) type SourceCharMapping = (SourceCode, UnicodeValue);
pub(crate) type SourceRangeMapping = (SourceRange, RangeTarget);

/// Destination of one bfrange line, before it is checked against the code space.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RangeTarget {
    Incrementing(UnicodeValue),
    Array(Vec<UnicodeValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CMapSection {
    CsRange(Vec<SourceRange>),
    BfChar(Vec<SourceCharMapping>),
    BfRange(Vec<SourceRangeMapping>),
}

/// Everything the parser found between `begincmap` and `endcmap`.
/// Header values are raw, validation happens when the `ToUnicodeCMap` is assembled.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct CMapContent {
    pub(crate) name: Option<Vec<u8>>,
    pub(crate) cmap_type: Option<i64>,
    pub(crate) registry: Option<Vec<u8>>,
    pub(crate) ordering: Option<Vec<u8>>,
    pub(crate) supplement: Option<i64>,
    pub(crate) sections: Vec<CMapSection>,
}
