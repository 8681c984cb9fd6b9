//! Recursive descent over the token stream of a ToUnicode CMap.
//!
//! Only the structure of the body is enforced: `begincmap` and `endcmap` must be present and
//! every data block must be closed by its end keyword. Entries inside a block that do not
//! have the expected shape are logged and skipped.

use log::{debug, trace, warn};

use super::{Lexeme, Token, tokenize};
use crate::cmap_section::{
    CMapContent, CMapSection, RangeTarget, SourceCharMapping, SourceCode, SourceRange, SourceRangeMapping,
};
use crate::error::MalformedCMapError;
use crate::unicode::UnicodeValue;

/// Blocks of general CMaps that carry no ToUnicode information.
const IGNORED_SECTIONS: [(&[u8], &[u8], &str); 4] = [
    (b"begincidrange", b"endcidrange", "cidrange"),
    (b"begincidchar", b"endcidchar", "cidchar"),
    (b"beginnotdefrange", b"endnotdefrange", "notdefrange"),
    (b"beginnotdefchar", b"endnotdefchar", "notdefchar"),
];

pub(crate) fn parse(stream_content: &[u8]) -> Result<CMapContent, MalformedCMapError> {
    let lexemes = tokenize(stream_content);
    CMapParser::new(&lexemes).cmap()
}

struct CMapParser<'a> {
    lexemes: &'a [Lexeme],
    pos: usize,
}

impl<'a> CMapParser<'a> {
    fn new(lexemes: &'a [Lexeme]) -> Self {
        CMapParser { lexemes, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.lexemes.get(self.pos).map(|lexeme| &lexeme.token)
    }

    fn next(&mut self) -> Option<&'a Lexeme> {
        let lexeme = self.lexemes.get(self.pos)?;
        self.pos += 1;
        Some(lexeme)
    }

    /// Consume the next token if `f` accepts it.
    fn accept<T>(&mut self, f: impl FnOnce(&'a Token) -> Option<T>) -> Option<T> {
        let value = self.peek().and_then(f)?;
        self.pos += 1;
        Some(value)
    }

    fn cmap(mut self) -> Result<CMapContent, MalformedCMapError> {
        // procset and resource dictionary preamble carry nothing we need
        let begin = self
            .lexemes
            .iter()
            .position(|lexeme| lexeme.token.is_keyword(b"begincmap"))
            .ok_or(MalformedCMapError::MissingBeginCMap)?;
        self.pos = begin + 1;

        let mut content = CMapContent::default();
        loop {
            let Some(lexeme) = self.next() else {
                return Err(MalformedCMapError::MissingEndCMap);
            };
            match &lexeme.token {
                Token::Keyword(k) if k == b"endcmap" => break,
                token if token.is_name(b"CMapName") => {
                    content.name = self.accept(|token| match token {
                        Token::Name(name) => Some(name.clone()),
                        _ => None,
                    });
                }
                token if token.is_name(b"CMapType") => {
                    content.cmap_type = self.accept(integer);
                }
                token if token.is_name(b"CIDSystemInfo") => self.cid_system_info(&mut content),
                Token::Keyword(k) if k == b"begincodespacerange" => {
                    let ranges = self.codespace_range_section()?;
                    content.sections.push(CMapSection::CsRange(ranges));
                }
                Token::Keyword(k) if k == b"beginbfchar" => {
                    let mappings = self.bf_char_section()?;
                    content.sections.push(CMapSection::BfChar(mappings));
                }
                Token::Keyword(k) if k == b"beginbfrange" => {
                    let mappings = self.bf_range_section()?;
                    content.sections.push(CMapSection::BfRange(mappings));
                }
                Token::Keyword(k) => {
                    if let Some(&(_, end, section)) =
                        IGNORED_SECTIONS.iter().find(|(begin, _, _)| *begin == k.as_slice())
                    {
                        debug!("skipping {} section at offset {}", section, lexeme.offset);
                        self.skip_section(end, section)?;
                    } else {
                        trace!("skipping keyword {} at offset {}", String::from_utf8_lossy(k), lexeme.offset);
                    }
                }
                token => trace!("skipping {:?} at offset {}", token, lexeme.offset),
            }
        }

        debug!("parsed {} cmap sections", content.sections.len());
        Ok(content)
    }

    fn cid_system_info(&mut self, content: &mut CMapContent) {
        // CMap files may wrap the dictionary in an array
        let in_array = self.accept(|token| (*token == Token::ArrayBegin).then_some(())).is_some();

        if self.accept(|token| (*token == Token::DictBegin).then_some(())).is_some() {
            self.system_info_entries(content, |token| *token == Token::DictEnd);
        } else if self.accept(integer).is_some() {
            // `3 dict dup begin /Registry (Adobe) def ... end`
            for keyword in [&b"dict"[..], b"dup", b"begin"] {
                if self.accept(|token| token.is_keyword(keyword).then_some(())).is_none() {
                    warn!("malformed CIDSystemInfo dictionary");
                    return;
                }
            }
            self.system_info_entries(content, |token| token.is_keyword(b"end"));
        } else {
            warn!("CIDSystemInfo is not a dictionary, ignoring it");
        }

        if in_array {
            self.accept(|token| (*token == Token::ArrayEnd).then_some(()));
        }
    }

    fn system_info_entries(&mut self, content: &mut CMapContent, is_end: impl Fn(&Token) -> bool) {
        while let Some(token) = self.peek() {
            if is_end(token) {
                self.pos += 1;
                return;
            }
            if is_structural(token) {
                warn!("unterminated CIDSystemInfo dictionary");
                return;
            }
            self.pos += 1;
            if let Token::Name(key) = token {
                match key.as_slice() {
                    b"Registry" => content.registry = self.accept(literal_string),
                    b"Ordering" => content.ordering = self.accept(literal_string),
                    b"Supplement" => content.supplement = self.accept(integer),
                    _ => {}
                }
            }
        }
    }

    /// Next token of a data block, `None` once the block's end keyword is consumed.
    fn block_lexeme(&mut self, end: &[u8], section: &'static str) -> Result<Option<&'a Lexeme>, MalformedCMapError> {
        match self.peek() {
            None => Err(MalformedCMapError::UnterminatedBlock(section)),
            Some(token) if token.is_keyword(end) => {
                self.pos += 1;
                Ok(None)
            }
            Some(token) if is_structural(token) => Err(MalformedCMapError::UnterminatedBlock(section)),
            Some(_) => Ok(self.next()),
        }
    }

    fn skip_section(&mut self, end: &[u8], section: &'static str) -> Result<(), MalformedCMapError> {
        while let Some(lexeme) = self.next() {
            if lexeme.token.is_keyword(end) {
                return Ok(());
            }
        }
        Err(MalformedCMapError::UnterminatedBlock(section))
    }

    fn codespace_range_section(&mut self) -> Result<Vec<SourceRange>, MalformedCMapError> {
        let mut ranges = Vec::new();
        while let Some(lexeme) = self.block_lexeme(b"endcodespacerange", "codespacerange")? {
            let Token::HexString(first) = &lexeme.token else {
                trace!("skipping {:?} in codespacerange at offset {}", lexeme.token, lexeme.offset);
                continue;
            };
            let last = self.accept(hex_string);
            match (source_code(first), last.and_then(source_code)) {
                (Some((first, len)), Some((last, last_len))) if len == last_len => ranges.push((first, last, len)),
                _ => warn!("skipping malformed codespace range at offset {}", lexeme.offset),
            }
        }
        Ok(ranges)
    }

    fn bf_char_section(&mut self) -> Result<Vec<SourceCharMapping>, MalformedCMapError> {
        let mut mappings = Vec::new();
        // Some real-world ToUnicode CMaps contain sections like `0 beginbfchar ... endbfchar`.
        while let Some(lexeme) = self.block_lexeme(b"endbfchar", "bfchar")? {
            let Token::HexString(code) = &lexeme.token else {
                trace!("skipping {:?} in bfchar at offset {}", lexeme.token, lexeme.offset);
                continue;
            };
            let Some(target) = self.accept(hex_string) else {
                warn!("skipping bfchar without a hex string target at offset {}", lexeme.offset);
                continue;
            };
            match (source_code(code), UnicodeValue::from_be_bytes(target)) {
                (Some(code), Some(value)) => mappings.push((code, value)),
                _ => warn!("skipping malformed bfchar at offset {}", lexeme.offset),
            }
        }
        Ok(mappings)
    }

    fn bf_range_section(&mut self) -> Result<Vec<SourceRangeMapping>, MalformedCMapError> {
        let mut mappings = Vec::new();
        while let Some(lexeme) = self.block_lexeme(b"endbfrange", "bfrange")? {
            let Token::HexString(first) = &lexeme.token else {
                trace!("skipping {:?} in bfrange at offset {}", lexeme.token, lexeme.offset);
                continue;
            };
            let Some(last) = self.accept(hex_string) else {
                warn!("skipping bfrange without upper bound at offset {}", lexeme.offset);
                continue;
            };
            let target = if let Some(value) = self.accept(hex_string) {
                UnicodeValue::from_be_bytes(value).map(RangeTarget::Incrementing)
            } else if self.accept(|token| (*token == Token::ArrayBegin).then_some(())).is_some() {
                self.range_target_array().map(RangeTarget::Array)
            } else {
                None
            };
            match (source_code(first), source_code(last), target) {
                (Some((first, len)), Some((last, last_len)), Some(target)) if len == last_len => {
                    mappings.push(((first, last, len), target))
                }
                _ => warn!("skipping malformed bfrange at offset {}", lexeme.offset),
            }
        }
        Ok(mappings)
    }

    /// Values up to the closing `]`. `None` if any element is not a UTF-16BE hex string
    /// or the array is cut short by a block keyword.
    fn range_target_array(&mut self) -> Option<Vec<UnicodeValue>> {
        let mut values = Some(Vec::new());
        while let Some(token) = self.peek() {
            if is_structural(token) {
                return None;
            }
            self.pos += 1;
            match token {
                Token::ArrayEnd => return values,
                Token::HexString(bytes) => match UnicodeValue::from_be_bytes(bytes) {
                    Some(value) => {
                        if let Some(values) = values.as_mut() {
                            values.push(value);
                        }
                    }
                    None => values = None,
                },
                _ => values = None,
            }
        }
        None
    }
}

/// Keywords that open or close a block can never be part of an entry.
fn is_structural(token: &Token) -> bool {
    matches!(token, Token::Keyword(k) if k.starts_with(b"begin") || k.starts_with(b"end"))
}

fn integer(token: &Token) -> Option<i64> {
    match token {
        Token::Integer(value) => Some(*value),
        _ => None,
    }
}

fn literal_string(token: &Token) -> Option<Vec<u8>> {
    match token {
        Token::LiteralString(value) => Some(value.clone()),
        _ => None,
    }
}

fn hex_string(token: &Token) -> Option<&[u8]> {
    match token {
        Token::HexString(bytes) => Some(bytes.as_slice()),
        _ => None,
    }
}

fn source_code(bytes: &[u8]) -> Option<SourceCode> {
    if bytes.is_empty() || bytes.len() > 4 {
        return None;
    }
    let code = bytes.iter().fold(0u32, |code, &byte| (code << 8) | byte as u32);
    Some((code, bytes.len() as u8))
}
