//! Tokenizer for the PostScript subset CMap files are written in.
//!
//! The byte-level recognizers follow the PDF object syntax (white-space, comments, names,
//! hexadecimal and literal strings). Bytes that do not start any token become
//! [`Token::Invalid`] so that one bad entry never stops the rest of the file from being read.

use std::str::{self, FromStr};

use nom::branch::alt;
use nom::bytes::complete::{tag, take, take_till, take_while, take_while1, take_while_m_n};
use nom::combinator::{map, map_opt, opt, verify};
use nom::multi::{fold_many0, many0};
use nom::sequence::{delimited, preceded, terminated};
use nom::{IResult, Parser};
use nom_locate::LocatedSpan;

pub(crate) mod cmap_parser;

pub(crate) type ParserInput<'a> = LocatedSpan<&'a [u8], &'a str>;
pub(crate) type NomError<'a> = nom::error::Error<ParserInput<'a>>;
pub(crate) type NomResult<'a, O, E = NomError<'a>> = IResult<ParserInput<'a>, O, E>;

/// Maximum nesting of parentheses inside a literal string.
const MAX_BRACKET: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Integer(i64),
    Real(f64),
    Name(Vec<u8>),
    HexString(Vec<u8>),
    LiteralString(Vec<u8>),
    ArrayBegin,
    ArrayEnd,
    DictBegin,
    DictEnd,
    ProcBegin,
    ProcEnd,
    /// Operators such as `begincmap`, `def` or `endbfrange`.
    Keyword(Vec<u8>),
    Invalid,
}

impl Token {
    pub(crate) fn is_keyword(&self, keyword: &[u8]) -> bool {
        matches!(self, Token::Keyword(k) if k == keyword)
    }

    pub(crate) fn is_name(&self, name: &[u8]) -> bool {
        matches!(self, Token::Name(n) if n == name)
    }
}

/// A token together with its byte offset in the CMap stream.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Lexeme {
    pub(crate) token: Token,
    pub(crate) offset: usize,
}

pub(crate) fn tokenize(stream_content: &[u8]) -> Vec<Lexeme> {
    let mut input = ParserInput::new_extra(stream_content, "cmap");
    let mut lexemes = Vec::new();
    while let Ok((rest, lexeme)) = lexeme(input) {
        lexemes.push(lexeme);
        input = rest;
    }
    lexemes
}

fn lexeme(input: ParserInput) -> NomResult<Lexeme> {
    let (input, _) = space(input)?;
    let offset = input.location_offset();
    map(token, move |token| Lexeme { token, offset }).parse(input)
}

fn token(input: ParserInput) -> NomResult<Token> {
    alt((
        map(tag(&b"<<"[..]), |_| Token::DictBegin),
        map(tag(&b">>"[..]), |_| Token::DictEnd),
        map(hexadecimal_string, Token::HexString),
        map(literal_string, Token::LiteralString),
        map(name, Token::Name),
        map(tag(&b"["[..]), |_| Token::ArrayBegin),
        map(tag(&b"]"[..]), |_| Token::ArrayEnd),
        map(tag(&b"{"[..]), |_| Token::ProcBegin),
        map(tag(&b"}"[..]), |_| Token::ProcEnd),
        regular_token,
        invalid,
    ))
    .parse(input)
}

pub(crate) fn eol(input: ParserInput) -> NomResult<ParserInput> {
    alt((tag(&b"\r\n"[..]), tag(&b"\n"[..]), tag(&b"\r"[..]))).parse(input)
}

pub(crate) fn comment(input: ParserInput) -> NomResult<()> {
    map(
        (tag(&b"%"[..]), take_while(|c: u8| !b"\r\n".contains(&c)), opt(eol)),
        |_| (),
    )
    .parse(input)
}

#[inline]
fn is_whitespace(c: u8) -> bool {
    b" \t\n\r\0\x0C".contains(&c)
}

#[inline]
fn is_delimiter(c: u8) -> bool {
    b"()<>[]{}/%".contains(&c)
}

#[inline]
fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

#[inline]
fn is_direct_literal_string(c: u8) -> bool {
    !b"()\\\r\n".contains(&c)
}

fn white_space(input: ParserInput) -> NomResult<()> {
    map(take_while(is_whitespace), |_| ()).parse(input)
}

fn space(input: ParserInput) -> NomResult<()> {
    fold_many0(
        alt((map(take_while1(is_whitespace), |_| ()), comment)),
        || {},
        |_, _| (),
    )
    .parse(input)
}

/// Numbers and keywords are both runs of regular characters.
fn regular_token(input: ParserInput) -> NomResult<Token> {
    map(take_while1(is_regular), |run: ParserInput| {
        let text = str::from_utf8(&run).ok();
        if let Some(number) = text.and_then(|text| i64::from_str(text).ok()) {
            Token::Integer(number)
        } else if let Some(number) = text
            .filter(|text| text.bytes().any(|c| c.is_ascii_digit()))
            .and_then(|text| f64::from_str(text).ok())
        {
            Token::Real(number)
        } else {
            Token::Keyword(run.to_vec())
        }
    })
    .parse(input)
}

/// A hex string with a character outside `0-9A-Fa-f` is swallowed up to its closing `>`,
/// any other unexpected byte on its own.
fn invalid(input: ParserInput) -> NomResult<Token> {
    alt((
        map(
            (tag(&b"<"[..]), take_till(|c: u8| c == b'>' || c == b'<'), opt(tag(&b">"[..]))),
            |_| Token::Invalid,
        ),
        map(take(1usize), |_| Token::Invalid),
    ))
    .parse(input)
}

#[inline]
fn hex_digit(input: ParserInput) -> NomResult<u8> {
    map_opt(take(1usize), |c: ParserInput| (c[0] as char).to_digit(16).map(|d| d as u8)).parse(input)
}

pub(crate) fn hex_char(input: ParserInput) -> NomResult<u8> {
    map_opt(take(2usize), |h: ParserInput| {
        str::from_utf8(&h).ok().and_then(|h| u8::from_str_radix(h, 16).ok())
    })
    .parse(input)
}

/// Pairs of hex digits, white-space between them is ignored. A missing final digit is
/// taken as 0.
fn hexadecimal_string(input: ParserInput) -> NomResult<Vec<u8>> {
    map(
        delimited(
            tag(&b"<"[..]),
            terminated(
                fold_many0(
                    preceded(white_space, hex_digit),
                    || -> (Vec<u8>, bool) { (Vec::new(), false) },
                    |state, c| match state {
                        (mut out, false) => {
                            out.push(c << 4);
                            (out, true)
                        }
                        (mut out, true) => {
                            if let Some(last) = out.last_mut() {
                                *last |= c;
                            }
                            (out, false)
                        }
                    },
                ),
                white_space,
            ),
            tag(&b">"[..]),
        ),
        |(bytes, _)| bytes,
    )
    .parse(input)
}

pub(crate) fn name(input: ParserInput) -> NomResult<Vec<u8>> {
    preceded(
        tag(&b"/"[..]),
        many0(alt((
            preceded(tag(&b"#"[..]), hex_char),
            map_opt(take(1usize), |c: ParserInput| {
                if c[0] != b'#' && is_regular(c[0]) {
                    Some(c[0])
                } else {
                    None
                }
            }),
        ))),
    )
    .parse(input)
}

fn oct_char(input: ParserInput) -> NomResult<u8> {
    map_opt(
        take_while_m_n(1, 3, |c: u8| (b'0'..=b'7').contains(&c)),
        // overflow of \400 and above is ignored
        |x: ParserInput| {
            str::from_utf8(&x)
                .ok()
                .and_then(|x| u16::from_str_radix(x, 8).ok())
                .map(|o| o as u8)
        },
    )
    .parse(input)
}

fn escape_sequence(input: ParserInput) -> NomResult<Option<u8>> {
    preceded(
        tag(&b"\\"[..]),
        alt((
            map(oct_char, Some),
            map(eol, |_| None),
            map(tag(&b"n"[..]), |_| Some(b'\n')),
            map(tag(&b"r"[..]), |_| Some(b'\r')),
            map(tag(&b"t"[..]), |_| Some(b'\t')),
            map(tag(&b"b"[..]), |_| Some(b'\x08')),
            map(tag(&b"f"[..]), |_| Some(b'\x0C')),
            map(take(1usize), |c: ParserInput| Some(c[0])),
        )),
    )
    .parse(input)
}

enum InnerLiteralString<'a> {
    Direct(ParserInput<'a>),
    Escape(Option<u8>),
    Eol(ParserInput<'a>),
    Nested(Vec<u8>),
}

impl InnerLiteralString<'_> {
    fn push(&self, output: &mut Vec<u8>) {
        match self {
            InnerLiteralString::Direct(s) | InnerLiteralString::Eol(s) => output.extend_from_slice(s),
            InnerLiteralString::Escape(e) => output.extend(e),
            InnerLiteralString::Nested(n) => output.extend_from_slice(n),
        }
    }
}

fn inner_literal_string(depth: usize) -> impl Fn(ParserInput) -> NomResult<Vec<u8>> {
    move |input| {
        fold_many0(
            alt((
                map(take_while1(is_direct_literal_string), InnerLiteralString::Direct),
                map(escape_sequence, InnerLiteralString::Escape),
                map(eol, InnerLiteralString::Eol),
                map(nested_literal_string(depth), InnerLiteralString::Nested),
            )),
            Vec::new,
            |mut out: Vec<u8>, value| {
                value.push(&mut out);
                out
            },
        )
        .parse(input)
    }
}

fn nested_literal_string(depth: usize) -> impl Fn(ParserInput) -> NomResult<Vec<u8>> {
    move |input| {
        if depth == 0 {
            map(verify(tag(&b"too deep"[..]), |_| false), |_| vec![]).parse(input)
        } else {
            map(
                delimited(tag(&b"("[..]), inner_literal_string(depth - 1), tag(&b")"[..])),
                |mut content| {
                    content.insert(0, b'(');
                    content.push(b')');
                    content
                },
            )
            .parse(input)
        }
    }
}

fn literal_string(input: ParserInput) -> NomResult<Vec<u8>> {
    delimited(tag(&b"("[..]), inner_literal_string(MAX_BRACKET), tag(&b")"[..])).parse(input)
}
