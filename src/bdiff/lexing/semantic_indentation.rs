//! Semantic indentation transformation
//!
//! Converts raw lexemes into the final token stream. This is the only place that knows about
//! logical lines, so it is also where `Newline`/`Nl` get told apart.
//!
//! # Algorithm
//!
//! The scanner carries three pieces of state:
//!
//! - the bracket depth: line breaks inside brackets are `Nl` and never start a statement
//! - the indentation stack: widths of the open blocks, starting with `[0]`
//! - whether the current logical line has produced anything but comments
//!
//! On the first significant lexeme of a logical line (depth 0) the indentation width of its
//! physical line is compared with the top of the stack:
//!
//! - wider: push it and emit one `Indent` carrying the leading whitespace
//! - narrower: pop until it matches, emitting one `Dedent` per pop; no match is an error
//! - equal: nothing
//!
//! Blank and comment-only lines never touch the stack. At the end of input the last logical
//! line is closed with an empty `Newline` if needed, every open block gets a `Dedent`, and an
//! `EndMarker` terminates the stream.

use std::ops::Range;

use super::base_tokenization::RawToken;
use super::{LexError, LexErrorKind};
use crate::bdiff::source::{Position, SourceText};
use crate::bdiff::token::{is_keyword, Token, TokenKind};

const TAB_SIZE: usize = 8;

/// Indentation width of a line prefix. Tabs advance to the next multiple of eight and a form
/// feed resets the count.
pub fn indentation_width(prefix: &str) -> usize {
    prefix.chars().fold(0, |width, c| match c {
        '\t' => (width / TAB_SIZE + 1) * TAB_SIZE,
        '\x0C' => 0,
        _ => width + 1,
    })
}

struct Scanner<'a> {
    source: &'a SourceText,
    tokens: Vec<Token>,
    indents: Vec<usize>,
    depth: usize,
    at_line_start: bool,
    line_has_content: bool,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a SourceText) -> Self {
        Self {
            source,
            tokens: Vec::new(),
            indents: vec![0],
            depth: 0,
            at_line_start: true,
            line_has_content: false,
        }
    }

    fn push(&mut self, kind: TokenKind, span: Range<usize>) {
        let text = &self.source.as_str()[span.clone()];
        let start = self.source.position(span.start);
        let end = self.source.position(span.end);
        self.tokens.push(Token::new(kind, text, start, end, span));
    }

    fn push_empty(&mut self, kind: TokenKind, offset: usize) {
        let position = self.source.position(offset);
        self.tokens
            .push(Token::new(kind, "", position, position, offset..offset));
    }

    /// Emit `Indent`/`Dedent` markers for a logical line whose first lexeme starts at `offset`.
    fn open_line(&mut self, offset: usize) -> Result<(), LexError> {
        let start = self.source.position(offset);
        let line_start = offset - self.line_prefix_len(offset);
        let prefix = &self.source.as_str()[line_start..offset];
        let width = indentation_width(prefix);
        let current = self.indents.last().copied().unwrap_or(0);

        if width > current {
            self.indents.push(width);
            self.tokens.push(Token::new(
                TokenKind::Indent,
                prefix,
                Position::new(start.line, 0),
                start,
                line_start..offset,
            ));
        } else if width < current {
            while self.indents.last().is_some_and(|&top| top > width) {
                self.indents.pop();
                self.push_empty(TokenKind::Dedent, offset);
            }
            if self.indents.last().copied() != Some(width) {
                return Err(LexError::new(LexErrorKind::InconsistentDedent, start));
            }
        }
        Ok(())
    }

    /// Byte length of the physical line's text in front of `offset`.
    fn line_prefix_len(&self, offset: usize) -> usize {
        let before = &self.source.as_str()[..offset];
        match before.rfind(|c| c == '\n' || c == '\r') {
            Some(index) => offset - index - 1,
            None => offset,
        }
    }

    fn newline(&mut self, span: Range<usize>) {
        let kind = if self.depth == 0 && self.line_has_content {
            TokenKind::Newline
        } else {
            TokenKind::Nl
        };
        // A line break ends on the line it terminates, not at the start of the next one.
        let text = &self.source.as_str()[span.clone()];
        let start = self.source.position(span.start);
        let end = Position::new(start.line, start.column + text.chars().count());
        self.tokens.push(Token::new(kind, text, start, end, span));
        if self.depth == 0 {
            self.at_line_start = true;
            self.line_has_content = false;
        }
    }

    fn significant(&mut self, raw: RawToken, span: Range<usize>) -> Result<(), LexError> {
        if self.at_line_start && self.depth == 0 {
            self.open_line(span.start)?;
        }
        self.at_line_start = false;
        self.line_has_content = true;

        let kind = match raw {
            RawToken::Name if is_keyword(&self.source.as_str()[span.clone()]) => TokenKind::Keyword,
            RawToken::Name => TokenKind::Name,
            RawToken::Number => TokenKind::Number,
            RawToken::String => TokenKind::String,
            RawToken::Open => {
                self.depth += 1;
                TokenKind::Operator
            }
            RawToken::Close => {
                self.depth = self.depth.saturating_sub(1);
                TokenKind::Operator
            }
            RawToken::Operator => TokenKind::Operator,
            RawToken::Comment => TokenKind::Comment,
            RawToken::Newline => TokenKind::Nl,
        };
        self.push(kind, span);
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Token>, LexError> {
        let eof = self.source.len();
        if self.depth > 0 {
            return Err(LexError::new(
                LexErrorKind::UnclosedBracket,
                self.source.position(eof),
            ));
        }
        if self.line_has_content {
            self.push_empty(TokenKind::Newline, eof);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push_empty(TokenKind::Dedent, eof);
        }
        self.push_empty(TokenKind::EndMarker, eof);
        Ok(self.tokens)
    }
}

/// Transform raw lexemes into the semantic token stream.
pub fn transform(
    source: &SourceText,
    raw: Vec<(RawToken, Range<usize>)>,
) -> Result<Vec<Token>, LexError> {
    let mut scanner = Scanner::new(source);
    for (token, span) in raw {
        match token {
            RawToken::Newline => scanner.newline(span),
            RawToken::Comment => scanner.push(TokenKind::Comment, span),
            other => scanner.significant(other, span)?,
        }
    }
    scanner.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bdiff::lexing::tokenize;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_indentation_width() {
        assert_eq!(indentation_width("    "), 4);
        assert_eq!(indentation_width("\t"), 8);
        assert_eq!(indentation_width("  \t"), 8);
        assert_eq!(indentation_width("\t  "), 10);
    }

    #[test]
    fn test_function_body_is_indented() {
        use TokenKind::*;
        assert_eq!(
            kinds("def f():\n    return 1\n"),
            vec![
                Keyword, Name, Operator, Operator, Operator, Newline, Indent, Keyword, Number,
                Newline, Dedent, EndMarker
            ]
        );
    }

    #[test]
    fn test_indent_token_carries_whitespace() {
        let tokens = tokenize("if x:\n\ty = 1\n").unwrap();
        let indent = tokens.iter().find(|t| t.kind == TokenKind::Indent).unwrap();
        assert_eq!(indent.text, "\t");
        assert_eq!(indent.start, Position::new(2, 0));
        assert_eq!(indent.end, Position::new(2, 1));
    }

    #[test]
    fn test_blank_and_comment_lines_are_nl() {
        use TokenKind::*;
        assert_eq!(
            kinds("x = 1\n\n    # note\ny = 2\n"),
            vec![
                Name, Operator, Number, Newline, Nl, Comment, Nl, Name, Operator, Number, Newline,
                EndMarker
            ]
        );
    }

    #[test]
    fn test_newlines_inside_brackets_are_nl() {
        use TokenKind::*;
        assert_eq!(
            kinds("x = [\n    1,\n]\n"),
            vec![
                Name, Operator, Operator, Nl, Number, Operator, Nl, Operator, Newline, EndMarker
            ]
        );
    }

    #[test]
    fn test_missing_final_newline_is_synthesized() {
        let tokens = tokenize("x").unwrap();
        let newline = &tokens[1];
        assert_eq!(newline.kind, TokenKind::Newline);
        assert_eq!(newline.text, "");
    }

    #[test]
    fn test_multiple_dedents() {
        let source = "if a:\n    if b:\n        c\nd\n";
        let dedents = kinds(source)
            .into_iter()
            .filter(|k| *k == TokenKind::Dedent)
            .count();
        assert_eq!(dedents, 2);
    }

    #[test]
    fn test_dedent_is_placed_at_next_statement() {
        let tokens = tokenize("if a:\n    b\nc\n").unwrap();
        let dedent = tokens.iter().find(|t| t.kind == TokenKind::Dedent).unwrap();
        assert_eq!(dedent.start, Position::new(3, 0));
        assert_eq!(dedent.text, "");
    }

    #[test]
    fn test_keywords_are_classified() {
        let tokens = tokenize("not x\n").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Keyword);
        assert_eq!(tokens[1].kind, TokenKind::Name);
    }

    #[test]
    fn test_inconsistent_dedent() {
        let err = tokenize("if a:\n    b\n  c\n").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::InconsistentDedent);
        assert_eq!(err.position, Position::new(3, 2));
    }

    #[test]
    fn test_unclosed_bracket() {
        let err = tokenize("x = (1,\n").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnclosedBracket);
    }

    #[test]
    fn test_backslash_continuation_stays_one_logical_line() {
        use TokenKind::*;
        assert_eq!(
            kinds("x = 1 + \\\n        2\n"),
            vec![Name, Operator, Number, Operator, Number, Newline, EndMarker]
        );
    }

    #[test]
    fn test_positions_are_monotonic() {
        let source = "class A:\n    '''doc'''\n    def f(self, x=(1,\n  2)):\n        return x  # c\n";
        let tokens = tokenize(source).unwrap();
        for pair in tokens.windows(2) {
            assert!(pair[0].start <= pair[1].start, "{} then {}", pair[0], pair[1]);
            assert!(pair[0].span.end <= pair[1].span.start);
        }
    }

    #[test]
    fn test_lone_carriage_return_positions() {
        let tokens = tokenize("if a:\r    b\r").unwrap();
        for pair in tokens.windows(2) {
            assert!(pair[0].start <= pair[1].start, "{} then {}", pair[0], pair[1]);
        }
        let indent = tokens.iter().find(|t| t.kind == TokenKind::Indent).unwrap();
        assert_eq!(indent.start, Position::new(2, 0));
    }
}
