//! Parser for Python token streams
//!
//! Builds a [`Module`] from the semantic token stream using chumsky combinators. The grammar
//! is split the same way the tree is:
//!
//!     - [expressions]: atoms, trailers and the operator precedence ladder
//!     - [statements]: simple statements, compound statements and indented blocks
//!     - [patterns]: the patterns of `match` statements
//!     - [fstrings]: the replacement fields inside f-string tokens
//!
//! The parser never sees comments or non-logical line breaks; they are filtered out before
//! the token stream is handed over. Block structure comes entirely from the `Newline`,
//! `Indent` and `Dedent` markers produced by the lexer.

pub mod expressions;
pub mod fstrings;
pub mod patterns;
pub mod statements;

use std::fmt;

use chumsky::error::SimpleReason;
use chumsky::prelude::*;
use chumsky::Stream;
use thiserror::Error;
use tracing::trace;

use crate::bdiff::ast::Module;
use crate::bdiff::source::Position;
use crate::bdiff::token::{Token, TokenKind};

/// The parser's view of a token: its kind and text, without position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Lexeme {
    pub kind: TokenKind,
    pub text: String,
}

impl From<&Token> for Lexeme {
    fn from(token: &Token) -> Self {
        Self {
            kind: token.kind,
            text: token.text.clone(),
        }
    }
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::Indent => write!(f, "indent"),
            TokenKind::Dedent => write!(f, "dedent"),
            TokenKind::EndMarker => write!(f, "end of file"),
            _ => write!(f, "'{}'", self.text),
        }
    }
}

pub(crate) type ParserError = Simple<Lexeme>;
pub(crate) type Boxed<O> = BoxedParser<'static, Lexeme, O, ParserError>;

/// A syntax error with the position of the token where parsing gave up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {position}")]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }

    /// Report the error that got furthest into the input.
    fn from_errors(errors: Vec<ParserError>, tokens: &[&Token]) -> Self {
        let eof = tokens.last().map(|t| t.start).unwrap_or_default();
        match errors.into_iter().max_by_key(|e| e.span().start) {
            Some(error) => {
                let position = tokens.get(error.span().start).map_or(eof, |t| t.start);
                Self::new(describe(&error), position)
            }
            None => Self::new("invalid syntax", eof),
        }
    }
}

fn describe(error: &ParserError) -> String {
    match error.reason() {
        SimpleReason::Custom(message) => message.clone(),
        SimpleReason::Unclosed { delimiter, .. } => format!("'{}' was never closed", delimiter.text),
        SimpleReason::Unexpected => match error.found() {
            Some(found) => format!("invalid syntax: unexpected {found}"),
            None => "invalid syntax: unexpected end of input".to_string(),
        },
    }
}

/// Parse a complete token stream, as produced by [tokenize](crate::bdiff::lexing::tokenize).
pub fn parse_module(tokens: &[Token]) -> Result<Module, ParseError> {
    let significant: Vec<&Token> = tokens.iter().filter(|t| !t.kind.is_trivia()).collect();
    let count = significant.len();
    let input = significant
        .iter()
        .enumerate()
        .map(|(index, token)| (Lexeme::from(*token), index..index + 1))
        .collect::<Vec<_>>();

    let module = statements::module()
        .parse(Stream::from_iter(count..count + 1, input.into_iter()))
        .map_err(|errors| ParseError::from_errors(errors, &significant))?;
    trace!(statements = module.body.len(), "parsed module");
    Ok(module)
}

// ============================================================================
// Token matchers shared by the grammar
// ============================================================================

fn unexpected(span: std::ops::Range<usize>, found: Lexeme) -> ParserError {
    Simple::expected_input_found(span, Vec::new(), Some(found))
}

/// An operator or delimiter.
pub(crate) fn op(symbol: &'static str) -> impl Parser<Lexeme, (), Error = ParserError> + Clone {
    filter(move |t: &Lexeme| t.kind == TokenKind::Operator && t.text == symbol)
        .ignored()
        .labelled(symbol)
}

/// A reserved word.
pub(crate) fn kw(word: &'static str) -> impl Parser<Lexeme, (), Error = ParserError> + Clone {
    filter(move |t: &Lexeme| t.kind == TokenKind::Keyword && t.text == word)
        .ignored()
        .labelled(word)
}

/// A soft keyword (`match`, `case`, `type`, `_`): lexed as a name, reserved only in context.
pub(crate) fn soft(word: &'static str) -> impl Parser<Lexeme, (), Error = ParserError> + Clone {
    filter(move |t: &Lexeme| t.kind == TokenKind::Name && t.text == word)
        .ignored()
        .labelled(word)
}

/// Any structural marker of the given kind.
pub(crate) fn marker(kind: TokenKind) -> impl Parser<Lexeme, (), Error = ParserError> + Clone {
    filter(move |t: &Lexeme| t.kind == kind).ignored()
}

pub(crate) fn identifier() -> impl Parser<Lexeme, String, Error = ParserError> + Clone {
    filter_map(|span, t: Lexeme| {
        if t.kind == TokenKind::Name {
            Ok(t.text)
        } else {
            Err(unexpected(span, t))
        }
    })
    .labelled("name")
}

/// A token whose operator text is found in `table`, mapped to the table's value.
pub(crate) fn operator_table<T: Copy + 'static>(
    table: &'static [(&'static str, T)],
) -> impl Parser<Lexeme, T, Error = ParserError> + Clone {
    filter_map(move |span, t: Lexeme| {
        if t.kind == TokenKind::Operator {
            if let Some((_, value)) = table.iter().find(|(symbol, _)| *symbol == t.text) {
                return Ok(*value);
            }
        }
        Err(unexpected(span, t))
    })
}
