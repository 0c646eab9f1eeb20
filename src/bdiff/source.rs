//! Source text and position bookkeeping
//!
//! The lexer works on byte offsets (that is what logos hands back), while tokens, errors and
//! the stripper talk in line/column positions. [`SourceText`] owns the raw text together with
//! the byte offset of every line start, so converting between the two is a binary search.
//!
//! Lines are 1-based and columns are 0-based character (not byte) offsets, which is what the
//! stripper needs to re-align tokens with spaces. `\n`, `\r\n` and a lone `\r` each end a
//! line, matching the tokenizer.

use std::fmt;
use std::ops::Range;

/// A line/column position in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Raw source plus a line index.
#[derive(Debug, Clone)]
pub struct SourceText {
    text: String,
    /// Byte offsets where each line starts
    line_starts: Vec<usize>,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let bytes = text.as_bytes();
        let mut line_starts = vec![0];
        for (byte_pos, &byte) in bytes.iter().enumerate() {
            let ends_line = match byte {
                b'\n' => true,
                b'\r' => bytes.get(byte_pos + 1) != Some(&b'\n'),
                _ => false,
            };
            if ends_line {
                line_starts.push(byte_pos + 1);
            }
        }
        Self { text, line_starts }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of physical lines (a trailing newline opens a final empty line).
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Convert a byte offset to a position.
    pub fn position(&self, byte_offset: usize) -> Position {
        let offset = byte_offset.min(self.text.len());
        let index = self
            .line_starts
            .binary_search(&offset)
            .unwrap_or_else(|i| i - 1);
        let line_start = self.line_starts[index];
        let column = self.text[line_start..offset].chars().count();
        Position::new(index + 1, column)
    }

    /// Byte range of a 1-based line, without its line terminator.
    pub fn line_span(&self, line: usize) -> Option<Range<usize>> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let mut end = self
            .line_starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        if end > start && self.text.as_bytes()[end - 1] == b'\r' {
            end -= 1;
        }
        Some(start..end)
    }

    /// Text of a 1-based line, without its line terminator.
    pub fn line(&self, line: usize) -> Option<&str> {
        self.line_span(line).map(|span| &self.text[span])
    }

    /// The first `column` characters of a line, when they are all whitespace.
    ///
    /// Used to reproduce a line's exact leading indentation (tabs included).
    pub fn leading_whitespace(&self, line: usize, column: usize) -> Option<&str> {
        let text = self.line(line)?;
        let end = text
            .char_indices()
            .nth(column)
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        let prefix = &text[..end];
        if prefix.chars().count() == column && prefix.chars().all(char::is_whitespace) {
            Some(prefix)
        } else {
            None
        }
    }
}

impl From<&str> for SourceText {
    fn from(text: &str) -> Self {
        SourceText::new(text)
    }
}
