use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::Result;
use crate::code_space::{CharCode, CodeLen, CodeSpace};
use crate::encodings::cmap::{BfChar, BfRange, BfRangeTarget, ToUnicodeCMap};
use crate::unicode::UnicodeValue;
use crate::write_options::WriteOptions;

/// A CMap block holds at most this many entries.
pub(crate) const MAX_BLOCK_ENTRIES: usize = 100;

/// Length of the lines that open and close a full `bfchar` block.
pub(crate) const CHAR_BLOCK_OVERHEAD: u64 = ("100 beginbfchar\n".len() + "endbfchar\n".len()) as u64;
/// Length of the lines that open and close a full `bfrange` block.
pub(crate) const RANGE_BLOCK_OVERHEAD: u64 = ("100 beginbfrange\n".len() + "endbfrange\n".len()) as u64;

// Widths of the entry lines as written below, the compactor minimizes their sum.

/// `<XXXX>`
pub(crate) fn code_width(len: CodeLen) -> u64 {
    2 * len as u64 + 2
}

/// `<XXXX XXXX>`, or `<>` for an empty value.
pub(crate) fn value_width(value: &UnicodeValue) -> u64 {
    if value.is_empty() {
        2
    } else {
        5 * value.len() as u64 + 1
    }
}

/// `<code> <value>\n`
pub(crate) fn bf_char_width(len: CodeLen, value: &UnicodeValue) -> u64 {
    code_width(len) + 1 + value_width(value) + 1
}

/// `<first> <last> <value>\n`
pub(crate) fn incrementing_range_width(len: CodeLen, base: &UnicodeValue) -> u64 {
    2 * code_width(len) + 2 + value_width(base) + 1
}

/// `<first> <last> [<value> <value>]\n`
pub(crate) fn array_range_width<'a>(len: CodeLen, values: impl IntoIterator<Item = &'a UnicodeValue>) -> u64 {
    let (values_width, count) = values
        .into_iter()
        .fold((0, 0), |(width, count), value| (width + value_width(value), count + 1));
    2 * code_width(len) + 2 + 2 + values_width + count.max(1) - 1 + 1
}

impl ToUnicodeCMap {
    /// Save the CMap to the specified file path.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<File> {
        let mut file = BufWriter::new(File::create(path)?);
        self.write_to(&mut file)?;
        file.into_inner().map_err(|err| err.into_error().into())
    }

    /// Write the CMap program, ready to be embedded as a ToUnicode stream.
    pub fn write_to<W: Write>(&self, target: &mut W) -> Result<()> {
        self.write_with_options(target, &WriteOptions::default())
    }

    pub fn write_with_options<W: Write>(&self, target: &mut W, options: &WriteOptions) -> Result<()> {
        Writer::write_cmap(target, self, options)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }
}

pub struct Writer;

impl Writer {
    pub fn write_cmap(file: &mut dyn Write, cmap: &ToUnicodeCMap, options: &WriteOptions) -> Result<()> {
        if options.comments {
            Writer::write_header_comments(file, cmap)?;
        }

        file.write_all(b"/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n")?;
        Writer::write_system_info(file, cmap)?;
        file.write_all(b"/CMapName ")?;
        Writer::write_name(file, cmap.name().as_bytes())?;
        file.write_all(b" def\n")?;
        if let Some(version) = options.cmap_version {
            writeln!(file, "/CMapVersion {} def", version)?;
        }
        file.write_all(b"/CMapType 2 def\n")?;

        Writer::write_code_space(file, cmap.code_space())?;
        for block in cmap.bf_chars().chunks(MAX_BLOCK_ENTRIES) {
            Writer::write_bf_char_block(file, cmap.code_space(), block)?;
        }
        for block in cmap.bf_ranges().chunks(MAX_BLOCK_ENTRIES) {
            Writer::write_bf_range_block(file, cmap.code_space(), block)?;
        }

        file.write_all(b"endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n")?;
        if options.comments {
            file.write_all(b"%%EndResource\n%%EOF\n")?;
        }
        Ok(())
    }

    fn write_header_comments(file: &mut dyn Write, cmap: &ToUnicodeCMap) -> Result<()> {
        let info = cmap.system_info();
        file.write_all(b"%!PS-Adobe-3.0 Resource-CMap\n")?;
        file.write_all(b"%%DocumentNeededResources: ProcSet (CIDInit)\n")?;
        file.write_all(b"%%IncludeResource: ProcSet (CIDInit)\n")?;
        file.write_all(b"%%BeginResource: CMap ")?;
        Writer::write_string(file, cmap.name().as_bytes())?;
        file.write_all(b"\n%%Title: ")?;
        let title = format!(
            "{} {} {} {}",
            cmap.name(),
            info.registry,
            info.ordering,
            info.supplement
        );
        Writer::write_string(file, title.as_bytes())?;
        file.write_all(b"\n%%EndComments\n\n")?;
        Ok(())
    }

    fn write_system_info(file: &mut dyn Write, cmap: &ToUnicodeCMap) -> Result<()> {
        let info = cmap.system_info();
        file.write_all(b"/CIDSystemInfo << /Registry ")?;
        Writer::write_string(file, info.registry.as_bytes())?;
        file.write_all(b" /Ordering ")?;
        Writer::write_string(file, info.ordering.as_bytes())?;
        file.write_all(b" /Supplement ")?;
        Writer::write_integer(file, info.supplement.into())?;
        file.write_all(b" >> def\n")?;
        Ok(())
    }

    fn write_code_space(file: &mut dyn Write, code_space: &CodeSpace) -> Result<()> {
        for block in code_space.ranges().chunks(MAX_BLOCK_ENTRIES) {
            Writer::write_integer(file, block.len() as i64)?;
            file.write_all(b" begincodespacerange\n")?;
            for range in block {
                Writer::write_hex_code(file, range.first, range.len)?;
                file.write_all(b" ")?;
                Writer::write_hex_code(file, range.last, range.len)?;
                file.write_all(b"\n")?;
            }
            file.write_all(b"endcodespacerange\n")?;
        }
        Ok(())
    }

    fn write_bf_char_block(file: &mut dyn Write, code_space: &CodeSpace, block: &[BfChar]) -> Result<()> {
        Writer::write_integer(file, block.len() as i64)?;
        file.write_all(b" beginbfchar\n")?;
        for bf_char in block {
            Writer::write_code(file, code_space, bf_char.code)?;
            file.write_all(b" ")?;
            Writer::write_value(file, &bf_char.value)?;
            file.write_all(b"\n")?;
        }
        file.write_all(b"endbfchar\n")?;
        Ok(())
    }

    fn write_bf_range_block(file: &mut dyn Write, code_space: &CodeSpace, block: &[BfRange]) -> Result<()> {
        Writer::write_integer(file, block.len() as i64)?;
        file.write_all(b" beginbfrange\n")?;
        for range in block {
            Writer::write_code(file, code_space, range.first)?;
            file.write_all(b" ")?;
            Writer::write_code(file, code_space, range.last)?;
            file.write_all(b" ")?;
            match &range.target {
                BfRangeTarget::Incrementing(base) => Writer::write_value(file, base)?,
                BfRangeTarget::Array(values) => {
                    file.write_all(b"[")?;
                    for (i, value) in values.iter().enumerate() {
                        if i > 0 {
                            file.write_all(b" ")?;
                        }
                        Writer::write_value(file, value)?;
                    }
                    file.write_all(b"]")?;
                }
            }
            file.write_all(b"\n")?;
        }
        file.write_all(b"endbfrange\n")?;
        Ok(())
    }

    fn write_code(file: &mut dyn Write, code_space: &CodeSpace, code: CharCode) -> Result<()> {
        file.write_all(b"<")?;
        for byte in code_space.encode(code)? {
            write!(file, "{:02X}", byte)?;
        }
        file.write_all(b">")?;
        Ok(())
    }

    fn write_hex_code(file: &mut dyn Write, code: CharCode, len: CodeLen) -> Result<()> {
        write!(file, "<{:0width$X}>", code, width = 2 * len as usize)?;
        Ok(())
    }

    fn write_value(file: &mut dyn Write, value: &UnicodeValue) -> Result<()> {
        file.write_all(b"<")?;
        for (i, unit) in value.units().iter().enumerate() {
            if i > 0 {
                file.write_all(b" ")?;
            }
            write!(file, "{:04X}", unit)?;
        }
        file.write_all(b">")?;
        Ok(())
    }

    fn write_integer(file: &mut dyn Write, value: i64) -> Result<()> {
        let mut buffer = itoa::Buffer::new();
        file.write_all(buffer.format(value).as_bytes())?;
        Ok(())
    }

    fn write_name(file: &mut dyn Write, name: &[u8]) -> Result<()> {
        file.write_all(b"/")?;
        for &byte in name {
            // white-space and delimiter chars are encoded to # sequences
            // also encode bytes outside of the range 33 (!) to 126 (~)
            if b" \t\n\r\x0C()<>[]{}/%#".contains(&byte) || !(33..=126).contains(&byte) {
                write!(file, "#{:02X}", byte)?;
            } else {
                file.write_all(&[byte])?;
            }
        }
        Ok(())
    }

    fn write_string(file: &mut dyn Write, text: &[u8]) -> Result<()> {
        file.write_all(b"(")?;
        for &byte in text {
            match byte {
                b'(' | b')' | b'\\' => file.write_all(&[b'\\', byte])?,
                b'\r' => file.write_all(b"\\r")?,
                // keeps comment lines on one line
                b' '..=b'~' => file.write_all(&[byte])?,
                _ => write!(file, "\\{:03o}", byte)?,
            }
        }
        file.write_all(b")")?;
        Ok(())
    }
}
