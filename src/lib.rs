//! Reading, writing and compacting ToUnicode CMaps.
//!
//! A ToUnicode CMap tells a PDF consumer which text a character code of a font stands for.
//! [`ToUnicodeCMap`] holds such a mapping. It is built either from a flat list of mappings,
//! in which case the entries are split into bfchar and bfrange lines so that the written
//! CMap is as short as possible, or by parsing the content of a ToUnicode stream.
//!
//! ```
//! use tounicode::{ToUnicodeCMap, UnicodeValue};
//!
//! let mappings: Vec<_> = "Hello".chars().zip(1..).map(|(c, code)| (code, UnicodeValue::from(c))).collect();
//! let cmap = ToUnicodeCMap::from_mappings(&mappings)?;
//! let bytes = cmap.to_bytes()?;
//!
//! let parsed = ToUnicodeCMap::parse(&bytes)?;
//! assert_eq!(parsed.decode_text(&[0x00, 0x01, 0x00, 0x05]), "Ho");
//! # Ok::<(), tounicode::Error>(())
//! ```

mod cmap_section;
mod code_space;
mod compact;
mod encodings;
mod error;
mod parser;
mod unicode;
mod write_options;
mod writer;

pub use crate::code_space::{CharCode, CodeLen, CodeSpace, CodeSpaceRange};
pub use crate::compact::Compactor;
pub use crate::encodings::Decode;
pub use crate::encodings::cmap::{BfChar, BfRange, BfRangeTarget, CIDSystemInfo, ToUnicodeCMap};
pub use crate::error::{Error, MalformedCMapError, Result};
pub use crate::unicode::UnicodeValue;
pub use crate::write_options::{WriteOptions, WriteOptionsBuilder};
pub use crate::writer::Writer;
