//! Base tokenization for Python source
//!
//! This module provides the raw tokenization using the logos lexer library.
//! This is the entry point where source strings become token streams.
//!
//! This is NOT the final token stream: the raw tokens know nothing about indentation, and line
//! breaks are not yet classified. See [semantic_indentation](super::semantic_indentation) for
//! the pass that turns them into [`Token`](crate::bdiff::token::Token)s.
//!
//! Horizontal whitespace and backslash continuations are skipped here. Indentation is recovered
//! later from the source line itself, which keeps tabs and form feeds out of the logos grammar.

use std::ops::Range;

use logos::Logos;

use super::LexErrorKind;
use crate::bdiff::literals::{validate_escapes, StringPrefix};

/// Raw Python lexemes.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(error = LexErrorKind)]
#[logos(skip r"([ \t\x0C]|\\\r?\n)+")]
pub enum RawToken {
    #[regex(r"[A-Za-z_\x{80}-\x{10FFFF}][A-Za-z0-9_\x{80}-\x{10FFFF}]*")]
    Name,

    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9][0-9_]*)?[jJ]?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9][0-9_]*)?[jJ]?")]
    #[regex(r"0[xX][0-9a-fA-F_]+|0[oO][0-7_]+|0[bB][01_]+")]
    Number,

    // Only the prefix and opening quote are matched here; the callback finds the end.
    #[regex(r#"([rRbBuUfF]|[rR][bBfF]|[bBfF][rR])?["']"#, lex_string)]
    String,

    #[regex(r"#[^\r\n]*")]
    Comment,

    #[regex(r"\r?\n|\r")]
    Newline,

    #[token("(")]
    #[token("[")]
    #[token("{")]
    Open,

    #[token(")")]
    #[token("]")]
    #[token("}")]
    Close,

    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("/")]
    #[token("%")]
    #[token("@")]
    #[token("&")]
    #[token("|")]
    #[token("^")]
    #[token("~")]
    #[token("<")]
    #[token(">")]
    #[token("=")]
    #[token(".")]
    #[token(",")]
    #[token(":")]
    #[token(";")]
    #[token("!")]
    #[token("**")]
    #[token("//")]
    #[token("<<")]
    #[token(">>")]
    #[token("<=")]
    #[token(">=")]
    #[token("==")]
    #[token("!=")]
    #[token("->")]
    #[token(":=")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    #[token("@=")]
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    #[token("**=")]
    #[token("//=")]
    #[token("<<=")]
    #[token(">>=")]
    #[token("...")]
    Operator,
}

/// Scan the rest of a string literal after its opening quote.
///
/// Single-quoted literals may not cross a line break unless it is escaped. The escapes of the
/// body are validated once the closing quote is found.
fn lex_string(lex: &mut logos::Lexer<RawToken>) -> Result<(), LexErrorKind> {
    let opener = lex.slice();
    let quote = opener.as_bytes()[opener.len() - 1];
    let prefix = StringPrefix::parse(&opener[..opener.len() - 1]);
    let remainder = lex.remainder();
    let bytes = remainder.as_bytes();

    let triple = bytes.len() >= 2 && bytes[0] == quote && bytes[1] == quote;
    let (body_start, quote_len) = if triple { (2, 3) } else { (0, 1) };

    let mut i = body_start;
    let end = loop {
        let Some(&byte) = bytes.get(i) else {
            return Err(LexErrorKind::UnterminatedString);
        };
        match byte {
            b'\\' => {
                i += if bytes.get(i + 1) == Some(&b'\r') && bytes.get(i + 2) == Some(&b'\n') {
                    3
                } else {
                    2
                };
            }
            b'\n' | b'\r' if !triple => return Err(LexErrorKind::UnterminatedString),
            b if b == quote => {
                if !triple {
                    break i + 1;
                }
                if bytes.get(i + 1) == Some(&quote) && bytes.get(i + 2) == Some(&quote) {
                    break i + 3;
                }
                i += 1;
            }
            _ => i += 1,
        }
    };

    // The body starts after the opening quotes of a triple-quoted string.
    let body = &remainder[body_start..end - quote_len];
    validate_escapes(prefix, body).map_err(|e| LexErrorKind::InvalidEscape(e.message))?;
    lex.bump(end);
    Ok(())
}

/// Tokenize source code with byte spans
///
/// Stops at the first malformed lexeme, returning its kind and span.
pub fn tokenize(source: &str) -> Result<Vec<(RawToken, Range<usize>)>, (LexErrorKind, Range<usize>)> {
    let mut lexer = RawToken::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(kind) => return Err((kind, lexer.span())),
        }
    }

    Ok(tokens)
}
