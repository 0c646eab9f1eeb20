//! f-string bodies
//!
//! An f-string reaches the parser as one token. Its body is split here into literal text and
//! replacement fields, and the expression of every field goes back through the tokenizer and
//! the full grammar. `f'{a+b}'` and `f"{a + b}"` therefore build the same tree.

use crate::bdiff::ast::{Expr, FStringPart, FormattedValue, Stmt};
use crate::bdiff::lexing::tokenize;
use crate::bdiff::literals::{decode_text, split_literal, PyStr};

use super::parse_module;

/// Parse the full text of an f-string token.
pub fn parse_fstring(text: &str) -> Result<Vec<FStringPart>, String> {
    let literal = split_literal(text).map_err(|e| e.to_string())?;
    let mut scanner = BodyScanner {
        body: literal.body,
        pos: 0,
        raw: literal.prefix.raw,
    };
    scanner.parts(false)
}

/// Append `parts`, merging literal text into a literal that ends `into`.
pub fn push_parts(into: &mut Vec<FStringPart>, parts: Vec<FStringPart>) {
    for part in parts {
        if let FStringPart::Literal(text) = &part {
            if text.is_empty() {
                continue;
            }
            if let Some(FStringPart::Literal(last)) = into.last_mut() {
                last.extend_from(text);
                continue;
            }
        }
        into.push(part);
    }
}

/// Parse the expression of one replacement field.
fn parse_field(source: &str) -> Result<Expr, String> {
    if source.trim().is_empty() {
        return Err("f-string: valid expression required before '}'".to_string());
    }
    // Inside brackets line breaks and comments are free, as they are in a field.
    let wrapped = format!("({source}\n)\n");
    let tokens = tokenize(&wrapped).map_err(|e| format!("f-string: {e}"))?;
    let module = parse_module(&tokens).map_err(|e| format!("f-string: {}", e.message))?;
    match <[Stmt; 1]>::try_from(module.body) {
        Ok([Stmt::Expr(value)]) => Ok(value),
        _ => Err("f-string: invalid expression".to_string()),
    }
}

struct BodyScanner<'a> {
    body: &'a str,
    pos: usize,
    raw: bool,
}

impl BodyScanner<'_> {
    fn peek(&self) -> Option<char> {
        self.body[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.body[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Literal text and fields up to the end of the body, or up to the `}` that closes a
    /// format spec (left for the caller).
    fn parts(&mut self, in_spec: bool) -> Result<Vec<FStringPart>, String> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        while let Some(c) = self.peek() {
            match c {
                '{' if !in_spec && self.peek_second() == Some('{') => {
                    self.pos += 2;
                    literal.push('{');
                }
                '}' if !in_spec && self.peek_second() == Some('}') => {
                    self.pos += 2;
                    literal.push('}');
                }
                '}' if in_spec => break,
                '}' => return Err("f-string: single '}' is not allowed".to_string()),
                '{' => {
                    self.bump();
                    self.flush(&mut literal, &mut parts)?;
                    self.field(&mut parts)?;
                }
                '\\' if !self.raw => {
                    self.bump();
                    literal.push('\\');
                    if let Some(escape) = self.bump() {
                        literal.push(escape);
                        // `\N{NAME}` braces are part of the escape.
                        if escape == 'N' && self.peek() == Some('{') {
                            while let Some(c) = self.bump() {
                                literal.push(c);
                                if c == '}' {
                                    break;
                                }
                            }
                        }
                    }
                }
                c => {
                    self.bump();
                    literal.push(c);
                }
            }
        }
        if in_spec && self.peek().is_none() {
            return Err("f-string: expecting '}'".to_string());
        }
        self.flush(&mut literal, &mut parts)?;
        Ok(parts)
    }

    fn flush(&self, literal: &mut String, parts: &mut Vec<FStringPart>) -> Result<(), String> {
        if !literal.is_empty() {
            let text = decode_text(self.raw, literal).map_err(|e| e.to_string())?;
            push_parts(parts, vec![FStringPart::Literal(text)]);
            literal.clear();
        }
        Ok(())
    }

    /// One replacement field, after its opening `{`.
    fn field(&mut self, parts: &mut Vec<FStringPart>) -> Result<(), String> {
        let start = self.pos;
        let mut depth = 0usize;
        let mut debug = false;
        let end = loop {
            let c = self.peek().ok_or("f-string: expecting '}'")?;
            match c {
                '\'' | '"' => self.skip_string(c)?,
                '(' | '[' | '{' => {
                    depth += 1;
                    self.bump();
                }
                ')' | ']' | '}' if depth > 0 => {
                    depth -= 1;
                    self.bump();
                }
                '}' | ':' if depth == 0 => break self.pos,
                '!' if depth == 0 => {
                    if self.peek_second() == Some('=') {
                        self.pos += 2;
                    } else {
                        break self.pos;
                    }
                }
                '=' if depth == 0 => {
                    let previous = self.body[..self.pos].chars().next_back();
                    if self.peek_second() == Some('=') {
                        self.pos += 2;
                    } else if matches!(previous, Some('<' | '>' | '=' | '!')) {
                        self.bump();
                    } else {
                        debug = true;
                        break self.pos;
                    }
                }
                _ => {
                    self.bump();
                }
            }
        };
        let value = parse_field(&self.body[start..end])?;

        if debug {
            // `{x = }` prints its own source, whitespace included, before the value.
            self.bump();
            while self.peek().is_some_and(char::is_whitespace) {
                self.bump();
            }
            let source = PyStr::from(&self.body[start..self.pos]);
            push_parts(parts, vec![FStringPart::Literal(source)]);
        }

        let mut conversion = None;
        if self.peek() == Some('!') {
            self.bump();
            match self.bump() {
                Some(c @ ('r' | 's' | 'a')) => conversion = Some(c),
                _ => {
                    return Err(
                        "f-string: invalid conversion character: expected 's', 'r', or 'a'"
                            .to_string(),
                    )
                }
            }
        }
        let format_spec = if self.peek() == Some(':') {
            self.bump();
            Some(self.parts(true)?)
        } else {
            None
        };
        if self.bump() != Some('}') {
            return Err("f-string: expecting '}'".to_string());
        }
        if debug && conversion.is_none() && format_spec.is_none() {
            conversion = Some('r');
        }

        parts.push(FStringPart::Field(FormattedValue {
            value: Box::new(value),
            conversion,
            format_spec,
        }));
        Ok(())
    }

    /// Step over a string literal inside a field.
    fn skip_string(&mut self, quote: char) -> Result<(), String> {
        let triple: String = std::iter::repeat(quote).take(3).collect();
        let closing = if self.body[self.pos..].starts_with(&triple) {
            triple
        } else {
            quote.to_string()
        };
        self.pos += closing.len();
        loop {
            if self.body[self.pos..].starts_with(&closing) {
                self.pos += closing.len();
                return Ok(());
            }
            match self.bump() {
                Some('\\') => {
                    self.bump();
                }
                Some(_) => {}
                None => return Err("f-string: unterminated string".to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bdiff::ast::{BinOp, CmpOp};
    use rstest::rstest;

    fn field(part: &FStringPart) -> &FormattedValue {
        match part {
            FStringPart::Field(field) => field,
            other => panic!("expected a field, found {other:?}"),
        }
    }

    #[test]
    fn test_literal_text_and_fields() {
        let parts = parse_fstring("f'a{x}b'").unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], FStringPart::Literal("a".into()));
        assert_eq!(*field(&parts[1]).value, Expr::name("x"));
        assert_eq!(parts[2], FStringPart::Literal("b".into()));
    }

    #[test]
    fn test_field_spacing_does_not_matter() {
        assert_eq!(
            parse_fstring("f'{a+b}'").unwrap(),
            parse_fstring("f\"{ a + b }\"").unwrap()
        );
        let parts = parse_fstring("f'{a+b}'").unwrap();
        assert_eq!(
            *field(&parts[0]).value,
            Expr::binary(Expr::name("a"), BinOp::Add, Expr::name("b"))
        );
    }

    #[test]
    fn test_doubled_braces_are_literal() {
        assert_eq!(
            parse_fstring("f'{{x}}'").unwrap(),
            vec![FStringPart::Literal("{x}".into())]
        );
    }

    #[test]
    fn test_conversion_and_nested_format_spec() {
        let parts = parse_fstring("f'{value!r:>{width}.2f}'").unwrap();
        let value = field(&parts[0]);
        assert_eq!(value.conversion, Some('r'));
        let spec = value.format_spec.as_ref().unwrap();
        assert_eq!(spec[0], FStringPart::Literal(">".into()));
        assert_eq!(*field(&spec[1]).value, Expr::name("width"));
        assert_eq!(spec[2], FStringPart::Literal(".2f".into()));
    }

    #[test]
    fn test_comparison_operators_stay_in_the_expression() {
        let parts = parse_fstring("f'{a != b}{a <= b}{a == b}'").unwrap();
        assert_eq!(parts.len(), 3);
        assert!(matches!(
            &*field(&parts[0]).value,
            Expr::Compare { ops, .. } if ops == &[CmpOp::NotEq]
        ));
        assert_eq!(field(&parts[0]).conversion, None);
    }

    #[test]
    fn test_self_documenting_field() {
        let parts = parse_fstring("f'{x = }'").unwrap();
        assert_eq!(parts[0], FStringPart::Literal("x = ".into()));
        assert_eq!(field(&parts[1]).conversion, Some('r'));
    }

    #[test]
    fn test_nested_strings_and_brackets() {
        let parts = parse_fstring("f\"{d['}']}{ {'k': 1}['k'] }\"").unwrap();
        assert_eq!(parts.len(), 2);
        assert!(matches!(&*field(&parts[0]).value, Expr::Subscript { .. }));
        assert!(matches!(&*field(&parts[1]).value, Expr::Subscript { .. }));
    }

    #[test]
    fn test_escapes_in_literal_text() {
        assert_eq!(
            parse_fstring(r"f'\t\N{BULLET}{x}'").unwrap()[0],
            FStringPart::Literal("\t\u{2022}".into())
        );
        assert_eq!(
            parse_fstring(r"rf'\t{x}'").unwrap()[0],
            FStringPart::Literal("\\t".into())
        );
    }

    #[rstest]
    #[case::empty_field("f'{}'")]
    #[case::lone_closing_brace("f'a}b'")]
    #[case::unclosed_field("f'{x'")]
    #[case::bad_conversion("f'{x!z}'")]
    #[case::bad_expression("f'{a +}'")]
    fn test_malformed_fstrings(#[case] text: &str) {
        assert!(parse_fstring(text).is_err(), "{text}");
    }
}
