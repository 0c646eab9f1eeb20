//! Lexing for Python source
//!
//! Tokenization runs in two stages:
//!
//!     1. [base_tokenization]: the logos lexer turns text into raw lexemes with byte spans.
//!        Literal syntax (unterminated strings, bad escapes, stray characters) fails here.
//!     2. [semantic_indentation]: a single scan over the raw lexemes that tracks bracket depth
//!        and the indentation stack. It emits `Indent`/`Dedent` markers, classifies line
//!        breaks as `Newline` or `Nl`, and resolves names into keywords.
//!
//! The split mirrors how the stripper consumes tokens: it only needs kinds and positions, and
//! every decision about "start of statement" is made on the explicit markers, not whitespace.

pub mod base_tokenization;
pub mod semantic_indentation;

use thiserror::Error;
use tracing::trace;

use crate::bdiff::source::{Position, SourceText};
use crate::bdiff::token::Token;

/// What went wrong while lexing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
pub enum LexErrorKind {
    #[default]
    #[error("unexpected character")]
    UnexpectedCharacter,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid escape sequence: {0}")]
    InvalidEscape(String),
    #[error("unindent does not match any outer indentation level")]
    InconsistentDedent,
    #[error("unexpected end of file in multi-line statement")]
    UnclosedBracket,
}

/// A lexing failure with the position of the offending lexeme.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at {position}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub position: Position,
}

impl LexError {
    pub fn new(kind: LexErrorKind, position: Position) -> Self {
        Self { kind, position }
    }
}

/// Tokenize a source string into the semantic token stream.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    tokenize_source(&SourceText::new(source))
}

/// Tokenize an already indexed source.
pub fn tokenize_source(source: &SourceText) -> Result<Vec<Token>, LexError> {
    let raw = base_tokenization::tokenize(source.as_str())
        .map_err(|(kind, span)| LexError::new(kind, source.position(span.start)))?;
    trace!(raw_tokens = raw.len(), "base tokenization done");
    let tokens = semantic_indentation::transform(source, raw)?;
    trace!(tokens = tokens.len(), "semantic indentation done");
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bdiff::token::TokenKind;

    #[test]
    fn test_error_reports_position() {
        let err = tokenize("x = 1\ny = 'oops\n").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
        assert_eq!(err.position, Position::new(2, 4));
        assert_eq!(
            err.to_string(),
            "unterminated string literal at 2:4"
        );
    }

    #[test]
    fn test_stream_ends_with_endmarker() {
        let tokens = tokenize("pass\n").unwrap();
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::EndMarker));
    }
}
