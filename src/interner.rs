//! Deduplicating C string table.
//!
//! Strings are appended in order of first request, each followed by a NUL.
//! The offset handed out for a string is the byte position of its first
//! character, so a consumer reading from that offset up to the NUL gets
//! the original string back.

use std::fmt::{self, Write as _};

use indexmap::IndexMap;

use crate::error::{ProbeError, Result, Rule};

#[derive(Debug, Default)]
pub struct StringTable {
    offsets: IndexMap<String, u32>,
    /// Total size in bytes, including every terminating NUL.
    size: u64,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the offset of `s`.
    pub fn index(&mut self, s: &str) -> Result<u32> {
        if let Some(offset) = self.offsets.get(s) {
            return Ok(*offset);
        }
        if s.contains("*/") {
            return Err(ProbeError::new(
                Rule::Name,
                format!("'{s}' cannot be placed in a string table because it contains '*/'"),
            ));
        }
        let offset = u32::try_from(self.size).map_err(|_| {
            ProbeError::new(
                Rule::OffsetOverflow,
                format!("string table offset {} does not fit in uint32_t", self.size),
            )
        })?;
        self.size += s.len() as u64 + 1;
        self.offsets.insert(s.to_string(), offset);
        Ok(offset)
    }

    pub fn indexes<'s>(&mut self, strings: impl IntoIterator<Item = &'s str>) -> Result<Vec<u32>> {
        strings.into_iter().map(|s| self.index(s)).collect()
    }

    /// Size of the table in bytes.
    pub fn len_bytes(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Strings with their offsets, in table order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, u32)> {
        self.offsets.iter().map(|(s, offset)| (s.as_str(), *offset))
    }

    /// The raw table contents.
    pub fn as_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size as usize);
        for (s, _) in self.entries() {
            bytes.extend_from_slice(s.as_bytes());
            bytes.push(0);
        }
        bytes
    }

    /// Write the table as a character-by-character array definition,
    /// followed by its size assertion.
    pub fn write_definition(&self, out: &mut String, table_name: &str) -> fmt::Result {
        writeln!(out, "constexpr char {table_name}[] = {{")?;
        for (s, offset) in self.entries() {
            write!(out, "  /* {offset:5} - \"{s}\" */ ")?;
            for byte in s.bytes() {
                write!(out, "{}, ", char_literal(byte))?;
            }
            writeln!(out, "'\\0',")?;
        }
        if self.is_empty() {
            writeln!(out, "  '\\0',")?;
        }
        writeln!(out, "}};\n")?;
        writeln!(
            out,
            "static_assert(sizeof({table_name}) <= UINT32_MAX,\n              \"index overflow of {table_name}\");\n"
        )
    }
}

/// A C character literal for one byte.
fn char_literal(byte: u8) -> String {
    match byte {
        b'\'' => "'\\''".to_string(),
        b'\\' => "'\\\\'".to_string(),
        0x20..=0x7e => format!("'{}'", byte as char),
        _ => format!("'\\x{byte:02x}'"),
    }
}
