//! String literal prefixes, escape validation and decoding
//!
//! The lexer only needs to know where a literal ends and whether its escapes are well formed.
//! The parser needs the literal's value so that `'a'`, `"a"` and `"\x61"` all produce the same
//! canonical text. Both sides share the prefix/quote splitting implemented here.
//!
//! Decoded text is a [`PyStr`], a run of code points rather than a Rust `String`: Python
//! source may spell lone surrogates (`'\ud800'`), and each one is a distinct value.

use std::fmt;

use thiserror::Error;

/// A malformed literal, described in the same words Python uses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LiteralError {
    pub message: String,
}

impl LiteralError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A Python `str` value.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct PyStr(Vec<u32>);

impl PyStr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, c: char) {
        self.0.push(u32::from(c));
    }

    /// Append any code point up to U+10FFFF, surrogates included.
    pub fn push_code_point(&mut self, point: u32) {
        self.0.push(point);
    }

    pub fn push_str(&mut self, text: &str) {
        self.0.extend(text.chars().map(u32::from));
    }

    pub fn extend_from(&mut self, other: &PyStr) {
        self.0.extend_from_slice(&other.0);
    }

    pub fn code_points(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, c: char) -> bool {
        self.0.contains(&u32::from(c))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for PyStr {
    fn from(text: &str) -> Self {
        let mut value = PyStr::new();
        value.push_str(text);
        value
    }
}

impl fmt::Debug for PyStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: String = self
            .code_points()
            .map(|point| char::from_u32(point).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
        write!(f, "{text:?}")
    }
}

/// The letters in front of the opening quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StringPrefix {
    pub raw: bool,
    pub bytes: bool,
    pub format: bool,
}

impl StringPrefix {
    pub fn parse(letters: &str) -> Self {
        let mut prefix = StringPrefix::default();
        for letter in letters.chars() {
            match letter.to_ascii_lowercase() {
                'r' => prefix.raw = true,
                'b' => prefix.bytes = true,
                'f' => prefix.format = true,
                _ => {}
            }
        }
        prefix
    }
}

/// A literal split into prefix, quote and body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralParts<'a> {
    pub prefix: StringPrefix,
    pub quote: &'a str,
    pub body: &'a str,
}

/// Split the full text of a string token.
pub fn split_literal(text: &str) -> Result<LiteralParts<'_>, LiteralError> {
    let letters_end = text
        .find(|c: char| c == '\'' || c == '"')
        .ok_or_else(|| LiteralError::new("missing opening quote"))?;
    let prefix = StringPrefix::parse(&text[..letters_end]);
    let rest = &text[letters_end..];
    let quote_char = &rest[..1];
    let triple = quote_char.repeat(3);
    let quote_len = if rest.len() >= 6 && rest.starts_with(&triple) && rest.ends_with(&triple) {
        3
    } else {
        1
    };
    if rest.len() < quote_len * 2 || !rest.ends_with(quote_char) {
        return Err(LiteralError::new("unterminated string literal"));
    }
    Ok(LiteralParts {
        prefix,
        quote: &rest[..quote_len],
        body: &rest[quote_len..rest.len() - quote_len],
    })
}

/// Decoded value of a string token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Str(PyStr),
    Bytes(Vec<u8>),
    /// f-strings keep their token text; the parser splits out the replacement fields
    Format(String),
}

/// Check the escapes of a literal body without decoding it.
pub fn validate_escapes(prefix: StringPrefix, body: &str) -> Result<(), LiteralError> {
    if prefix.raw {
        return Ok(());
    }
    if prefix.bytes {
        decode_bytes(body).map(|_| ())
    } else {
        decode_str(body).map(|_| ())
    }
}

/// Decode a complete string token.
pub fn decode(text: &str) -> Result<Literal, LiteralError> {
    let parts = split_literal(text)?;
    if parts.prefix.format {
        return Ok(Literal::Format(text.to_string()));
    }
    match (parts.prefix.bytes, parts.prefix.raw) {
        (true, true) => raw_bytes(parts.body).map(Literal::Bytes),
        (true, false) => decode_bytes(parts.body).map(Literal::Bytes),
        (false, raw) => decode_text(raw, parts.body).map(Literal::Str),
    }
}

/// Decode the text of a `str` literal body, or a literal run inside an f-string.
pub fn decode_text(raw: bool, body: &str) -> Result<PyStr, LiteralError> {
    if raw {
        Ok(PyStr::from(body))
    } else {
        decode_str(body)
    }
}

fn raw_bytes(body: &str) -> Result<Vec<u8>, LiteralError> {
    if !body.is_ascii() {
        return Err(LiteralError::new(
            "bytes can only contain ASCII literal characters",
        ));
    }
    Ok(body.as_bytes().to_vec())
}

fn hex_value(digits: &str, expected: usize, escape: char) -> Result<u32, LiteralError> {
    if digits.len() != expected || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(LiteralError::new(format!(
            "truncated \\{escape} escape"
        )));
    }
    u32::from_str_radix(digits, 16).map_err(|_| LiteralError::new(format!("invalid \\{escape} escape")))
}

/// Take up to `count` characters from the front of `rest`.
fn take_chars(rest: &str, count: usize) -> &str {
    let end = rest
        .char_indices()
        .nth(count)
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    &rest[..end]
}

fn simple_escape(c: char) -> Option<char> {
    Some(match c {
        '\\' => '\\',
        '\'' => '\'',
        '"' => '"',
        'a' => '\u{7}',
        'b' => '\u{8}',
        'f' => '\u{c}',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\u{b}',
        _ => return None,
    })
}

fn octal_escape(first: char, rest: &str) -> (u32, usize) {
    let mut value = first.to_digit(8).unwrap_or(0);
    let mut used = 0;
    for c in rest.chars().take(2) {
        match c.to_digit(8) {
            Some(d) => {
                value = value * 8 + d;
                used += 1;
            }
            None => break,
        }
    }
    (value, used)
}

fn named_character(name: &str) -> Result<char, LiteralError> {
    unicode_names2::character(&name.to_ascii_uppercase())
        .ok_or_else(|| LiteralError::new("unknown Unicode character name"))
}

fn decode_str(body: &str) -> Result<PyStr, LiteralError> {
    let mut out = PyStr::new();
    let mut rest = body;
    while let Some(index) = rest.find('\\') {
        out.push_str(&rest[..index]);
        let after = &rest[index + 1..];
        let Some(escape) = after.chars().next() else {
            // A lone trailing backslash cannot be produced by the lexer.
            out.push('\\');
            break;
        };
        let mut tail = &after[escape.len_utf8()..];
        if let Some(c) = simple_escape(escape) {
            out.push(c);
        } else {
            match escape {
                '\n' => {}
                '\r' => {
                    if let Some(stripped) = tail.strip_prefix('\n') {
                        tail = stripped;
                    }
                }
                '0'..='7' => {
                    let (value, used) = octal_escape(escape, tail);
                    out.push_code_point(value);
                    tail = &tail[used..];
                }
                'x' | 'u' | 'U' => {
                    let width = match escape {
                        'x' => 2,
                        'u' => 4,
                        _ => 8,
                    };
                    let digits = take_chars(tail, width);
                    let value = hex_value(digits, width, escape)?;
                    if value > 0x10FFFF {
                        return Err(LiteralError::new("illegal Unicode character"));
                    }
                    out.push_code_point(value);
                    tail = &tail[digits.len()..];
                }
                'N' => {
                    let close = tail
                        .strip_prefix('{')
                        .and_then(|named| named.find('}').map(|end| end + 1));
                    match close {
                        Some(end) if end > 1 => {
                            out.push(named_character(&tail[1..end])?);
                            tail = &tail[end + 1..];
                        }
                        _ => return Err(LiteralError::new("malformed \\N character escape")),
                    }
                }
                other => {
                    out.push('\\');
                    out.push(other);
                }
            }
        }
        rest = tail;
    }
    out.push_str(rest);
    Ok(out)
}

fn decode_bytes(body: &str) -> Result<Vec<u8>, LiteralError> {
    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if !c.is_ascii() {
            return Err(LiteralError::new(
                "bytes can only contain ASCII literal characters",
            ));
        }
        if c != '\\' {
            out.push(c as u8);
            continue;
        }
        let Some(escape) = chars.next() else {
            out.push(b'\\');
            break;
        };
        if let Some(simple) = simple_escape(escape) {
            out.push(simple as u8);
            continue;
        }
        match escape {
            '\n' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '0'..='7' => {
                let mut value = escape.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push((value & 0xFF) as u8);
            }
            'x' => {
                let digits: String = chars.by_ref().take(2).collect();
                let value = hex_value(&digits, 2, 'x')?;
                out.push(value as u8);
            }
            other if other.is_ascii() => {
                out.push(b'\\');
                out.push(other as u8);
            }
            _ => {
                return Err(LiteralError::new(
                    "bytes can only contain ASCII literal characters",
                ))
            }
        }
    }
    Ok(out)
}
