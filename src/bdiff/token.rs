//! Core token types shared by the lexer, the stripper and the parser.
//!
//! Token Layers
//!
//!     Raw Tokens:
//!         Produced by the logos lexer in [base_tokenization](crate::bdiff::lexing::base_tokenization).
//!         They know nothing about lines or indentation: whitespace is skipped, brackets are plain
//!         operators and every line break is the same `Newline`.
//!
//!     Semantic Tokens:
//!         The [`Token`] values defined here. The semantic indentation pass turns raw tokens into a
//!         stream that carries the block structure explicitly: `Indent`/`Dedent` markers, and line
//!         breaks split into `Newline` (ends a logical line) and `Nl` (blank line, comment-only line,
//!         or a break inside brackets). The stripper relies on that split to tell a statement-level
//!         string apart from a string operand.

use std::fmt;
use std::ops::Range;

use crate::bdiff::source::Position;

/// Python keywords. Soft keywords (`match`, `case`, `type`, `_`) lex as names.
pub const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Name,
    Keyword,
    Number,
    String,
    Comment,
    Operator,
    /// Ends a logical line
    Newline,
    /// Non-logical line break: blank line, comment-only line, or inside brackets
    Nl,
    Indent,
    Dedent,
    EndMarker,
}

impl TokenKind {
    /// Tokens that never affect statement structure.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Comment | TokenKind::Nl)
    }

    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Name => "NAME",
            TokenKind::Keyword => "KEYWORD",
            TokenKind::Number => "NUMBER",
            TokenKind::String => "STRING",
            TokenKind::Comment => "COMMENT",
            TokenKind::Operator => "OP",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Nl => "NL",
            TokenKind::Indent => "INDENT",
            TokenKind::Dedent => "DEDENT",
            TokenKind::EndMarker => "ENDMARKER",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// A lexeme with its kind and location.
///
/// `Dedent`, `EndMarker` and the synthetic end-of-file `Newline` have empty text and an empty
/// span located where they were inferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: Position,
    pub end: Position,
    pub span: Range<usize>,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        text: impl Into<String>,
        start: Position,
        end: Position,
        span: Range<usize>,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            start,
            end,
            span,
        }
    }

    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == word
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} {:<9} {:?}",
            self.start, self.end, self.kind, self.text
        )
    }
}
