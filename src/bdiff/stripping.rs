//! Comment and docstring stripping
//!
//! Rebuilds source text from the token stream, leaving out comments and the string literals
//! that document a module, class or function. Every other token is written back at its
//! original column, so the result keeps the input's indentation and still parses.
//!
//! A string is dropped only when all of these hold:
//!
//! - it is a plain text literal (no `f` or `b` prefix)
//! - it is outside any bracket
//! - it is the first significant token of the module, or it directly follows the `Indent`
//!   that opens the body of a `def`, `async def` or `class`
//! - the statement ends right after it (the next significant token is `Newline`)
//! - for an indented body, at least one more statement follows in that body
//!
//! The last rule keeps a body that holds nothing but its docstring from becoming empty. Bare
//! string statements elsewhere (inside `if` blocks, after other statements) are kept; the
//! structural pass in [canonical](crate::bdiff::canonical) has the final word on what is
//! documentation.

use tracing::trace;

use crate::bdiff::literals::split_literal;
use crate::bdiff::source::SourceText;
use crate::bdiff::token::{Token, TokenKind};

/// Tracks the bracket depth and the shape of the logical line being read.
#[derive(Default)]
struct LineState {
    depth: usize,
    first_word: Option<String>,
    second_word: Option<String>,
    /// The last completed logical line was a `def`/`class` header
    header_opens_scope: bool,
}

impl LineState {
    fn observe(&mut self, token: &Token) {
        match token.kind {
            TokenKind::Operator => match token.text.as_str() {
                "(" | "[" | "{" => self.depth += 1,
                ")" | "]" | "}" => self.depth = self.depth.saturating_sub(1),
                _ => {}
            },
            TokenKind::Newline => {
                self.header_opens_scope = match (self.first_word.as_deref(), self.second_word.as_deref()) {
                    (Some("def" | "class"), _) => true,
                    (Some("async"), Some("def")) => true,
                    _ => false,
                };
                self.first_word = None;
                self.second_word = None;
                return;
            }
            _ => {}
        }
        if token.kind.is_trivia() || matches!(token.kind, TokenKind::Indent | TokenKind::Dedent) {
            return;
        }
        if self.first_word.is_none() {
            self.first_word = Some(token.text.clone());
        } else if self.second_word.is_none() {
            self.second_word = Some(token.text.clone());
        }
    }
}

fn next_significant(tokens: &[Token], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&i| !tokens[i].kind.is_trivia())
}

/// f-strings run code and bytes are never documentation.
fn is_text_literal(token: &Token) -> bool {
    split_literal(&token.text).is_ok_and(|parts| !parts.prefix.format && !parts.prefix.bytes)
}

/// Whether a token ends a logical or physical line, so the next token may start a new one.
fn ends_line(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Newline | TokenKind::Nl | TokenKind::Indent | TokenKind::Dedent | TokenKind::Comment
    )
}

/// Mark the string tokens that are lexical docstrings.
fn find_docstrings(tokens: &[Token]) -> Vec<bool> {
    let mut marks = vec![false; tokens.len()];
    let mut state = LineState::default();
    let mut previous: Option<TokenKind> = None;

    for (index, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::String && state.depth == 0 && is_text_literal(token) {
            let at_module_head = previous.is_none();
            let at_body_head = previous == Some(TokenKind::Indent) && state.header_opens_scope;
            if at_module_head || at_body_head {
                let ends_statement = next_significant(tokens, index + 1)
                    .filter(|&next| tokens[next].kind == TokenKind::Newline);
                if let Some(newline) = ends_statement {
                    let body_continues = next_significant(tokens, newline + 1).is_some_and(|after| {
                        !matches!(tokens[after].kind, TokenKind::Dedent | TokenKind::EndMarker)
                    });
                    marks[index] = at_module_head || body_continues;
                }
            }
        }
        state.observe(token);
        if !token.kind.is_trivia() {
            previous = Some(token.kind);
        }
    }
    marks
}

/// Rebuild source text without comments and docstrings.
///
/// A line joined to the previous one by a backslash is written back with the backslash, so
/// the tokens on either side of the join stay apart.
pub fn strip(source: &SourceText, tokens: &[Token]) -> String {
    let docstrings = find_docstrings(tokens);
    let mut out = String::with_capacity(source.len());
    let mut last_line = 0;
    let mut last_col = 0;
    let mut previous: Option<TokenKind> = None;

    for (token, is_docstring) in tokens.iter().zip(docstrings.iter().copied()) {
        if token.start.line > last_line {
            if previous.is_some_and(|kind| !ends_line(kind)) {
                for _ in last_line..token.start.line {
                    out.push_str("\\\n");
                }
            }
            last_col = 0;
            if let Some(indent) = source.leading_whitespace(token.start.line, token.start.column) {
                out.push_str(indent);
                last_col = token.start.column;
            }
        }
        if token.start.column > last_col {
            out.extend(std::iter::repeat(' ').take(token.start.column - last_col));
        }
        match token.kind {
            TokenKind::Comment => {}
            TokenKind::String if is_docstring => {
                trace!(position = %token.start, "dropping docstring");
            }
            _ => out.push_str(&token.text),
        }
        last_col = token.end.column;
        last_line = token.end.line;
        previous = Some(token.kind);
    }
    out
}
