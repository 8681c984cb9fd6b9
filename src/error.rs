use thiserror::Error;

use crate::code_space::CharCode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The mappings handed to the compactor or to `ToUnicodeCMap::new` violate a precondition,
    /// e.g. character codes that are not strictly increasing.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A character code cannot be encoded under the active code space.
    #[error("character code {0:#X} is not contained in the code space")]
    CodeNotInSpace(CharCode),
    /// The CMap declares a `/CMapType` other than 2.
    #[error("unsupported CMapType {0}, a ToUnicode CMap must have CMapType 2")]
    UnsupportedCMapType(i64),
    /// The CMap body could not be parsed at all.
    #[error("malformed CMap: {0}")]
    MalformedCMap(#[from] MalformedCMapError),
    /// IO error while writing the CMap.
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

/// Structural problems of a CMap body. Problems of individual entries never end up here,
/// such entries are skipped by the parser.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MalformedCMapError {
    #[error("missing begincmap")]
    MissingBeginCMap,
    #[error("missing endcmap")]
    MissingEndCMap,
    #[error("unterminated {0} block")]
    UnterminatedBlock(&'static str),
}
