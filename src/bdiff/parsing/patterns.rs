//! `match` patterns
//!
//! Patterns look like expressions but build their own tree: bare names capture, `|` separates
//! alternatives and brackets hold sub-patterns. What a name means depends on what follows it:
//!
//!     x, _        capture, wildcard
//!     a.b         value (needs at least one dot)
//!     C(...)      class pattern, with positional then keyword sub-patterns

use chumsky::prelude::*;
use chumsky::recursive::Recursive;

use super::expressions::{number_constant, string_expr};
use super::{identifier, kw, op, unexpected, Boxed, Lexeme, ParserError};
use crate::bdiff::ast::{BinOp, Constant, Expr, Pattern, UnaryOp};
use crate::bdiff::token::TokenKind;

/// The pattern of a `case` clause: one pattern, or an open sequence such as `a, *rest`.
pub fn case_pattern() -> Boxed<Pattern> {
    let item = star_pattern().or(pattern()).boxed();
    item.clone()
        .then(op(",").ignore_then(item).repeated())
        .then(op(",").or_not())
        .map(|((first, rest), comma)| {
            if rest.is_empty() && comma.is_none() && !matches!(first, Pattern::Star(_)) {
                first
            } else {
                let mut items = Vec::with_capacity(rest.len() + 1);
                items.push(first);
                items.extend(rest);
                Pattern::Sequence(items)
            }
        })
        .boxed()
}

fn star_pattern() -> Boxed<Pattern> {
    op("*")
        .ignore_then(identifier())
        .map(|name| Pattern::Star((name != "_").then_some(name)))
        .boxed()
}

fn number() -> impl Parser<Lexeme, Expr, Error = ParserError> + Clone {
    filter_map(|span, t: Lexeme| {
        if t.kind == TokenKind::Number {
            Ok(Expr::Constant(number_constant(&t.text)))
        } else {
            Err(unexpected(span, t))
        }
    })
}

/// `1`, `-1`, `1 + 2j`, `-0.5 - 1j`.
fn signed_number() -> Boxed<Expr> {
    let signed = op("-").or_not().then(number()).map(|(minus, n)| match minus {
        Some(()) => Expr::unary(UnaryOp::USub, n),
        None => n,
    });
    let sign = op("+").to(BinOp::Add).or(op("-").to(BinOp::Sub));
    signed
        .then(sign.then(number()).or_not())
        .map(|(real, imaginary)| match imaginary {
            Some((op, imaginary)) => Expr::binary(real, op, imaginary),
            None => real,
        })
        .boxed()
}

fn strings() -> Boxed<Expr> {
    filter(|t: &Lexeme| t.kind == TokenKind::String)
        .map(|t: Lexeme| t.text)
        .repeated()
        .at_least(1)
        .try_map(|parts: Vec<String>, span| {
            string_expr(&parts).map_err(|message| Simple::custom(span, message))
        })
        .boxed()
}

/// `name` or `a.b.c`; with `dotted` at least one `.` is required.
fn name_or_attribute(dotted: bool) -> Boxed<Expr> {
    let attrs = op(".").ignore_then(identifier()).repeated();
    let attrs = if dotted { attrs.at_least(1) } else { attrs };
    identifier()
        .map(Expr::Name)
        .then(attrs)
        .foldl(|value, attr| Expr::Attribute {
            value: Box::new(value),
            attr,
        })
        .boxed()
}

enum ClassArg {
    Positional(Pattern),
    Keyword(String, Pattern),
}

fn class_pattern(cls: Expr, args: Vec<ClassArg>) -> Result<Pattern, &'static str> {
    let mut patterns = Vec::new();
    let mut kwd_attrs = Vec::new();
    let mut kwd_patterns = Vec::new();
    for arg in args {
        match arg {
            ClassArg::Positional(_) if !kwd_attrs.is_empty() => {
                return Err("positional patterns follow keyword patterns");
            }
            ClassArg::Positional(pattern) => patterns.push(pattern),
            ClassArg::Keyword(attr, pattern) => {
                kwd_attrs.push(attr);
                kwd_patterns.push(pattern);
            }
        }
    }
    Ok(Pattern::Class {
        cls,
        patterns,
        kwd_attrs,
        kwd_patterns,
    })
}

/// A single pattern: alternatives joined by `|`, optionally bound with `as`.
pub fn pattern() -> Boxed<Pattern> {
    recursive(|pattern: Recursive<'static, Lexeme, Pattern, ParserError>| {
        let pattern = pattern.boxed();
        let item = star_pattern().or(pattern.clone()).boxed();

        let singleton = choice((
            kw("None").to(Constant::None),
            kw("True").to(Constant::True),
            kw("False").to(Constant::False),
        ));
        let literal = signed_number().or(strings()).map(Pattern::Value);

        let class_arg = identifier()
            .then_ignore(op("="))
            .then(pattern.clone())
            .map(|(attr, pattern)| ClassArg::Keyword(attr, pattern))
            .or(pattern.clone().map(ClassArg::Positional));
        let class = name_or_attribute(false)
            .then_ignore(op("("))
            .then(class_arg.separated_by(op(",")).allow_trailing())
            .then_ignore(op(")"))
            .try_map(|(cls, args), span| {
                class_pattern(cls, args).map_err(|message| Simple::custom(span, message))
            });

        let value = name_or_attribute(true).map(Pattern::Value);
        let capture = identifier().map(|name| Pattern::As {
            pattern: None,
            name: (name != "_").then_some(name),
        });

        // `(p)` only groups; `()` and `(p,)` are sequences.
        let group = op("(")
            .ignore_then(
                item.clone()
                    .then(op(",").ignore_then(item.clone()).repeated())
                    .then(op(",").or_not())
                    .or_not(),
            )
            .then_ignore(op(")"))
            .map(|items| match items {
                None => Pattern::Sequence(Vec::new()),
                Some(((first, rest), None)) if rest.is_empty() && !matches!(first, Pattern::Star(_)) => {
                    first
                }
                Some(((first, rest), _)) => {
                    let mut items = Vec::with_capacity(rest.len() + 1);
                    items.push(first);
                    items.extend(rest);
                    Pattern::Sequence(items)
                }
            });
        let list = op("[")
            .ignore_then(item.separated_by(op(",")).allow_trailing())
            .then_ignore(op("]"))
            .map(Pattern::Sequence);

        let key = choice((
            signed_number(),
            strings(),
            name_or_attribute(true),
            singleton.clone().map(Expr::Constant),
        ));
        let entry = key.then_ignore(op(":")).then(pattern.clone());
        let mapping = op("{")
            .ignore_then(entry.separated_by(op(",")).allow_trailing())
            .then(op("**").ignore_then(identifier()).or_not())
            .then_ignore(op(",").or_not())
            .then_ignore(op("}"))
            .map(|(entries, rest)| {
                let (keys, patterns) = entries.into_iter().unzip();
                Pattern::Mapping {
                    keys,
                    patterns,
                    rest,
                }
            });

        let closed = choice((
            singleton.map(Pattern::Singleton),
            literal,
            class,
            value,
            capture,
            group,
            list,
            mapping,
        ));

        let alternatives = closed
            .separated_by(op("|"))
            .at_least(1)
            .map(|alternatives: Vec<Pattern>| {
                // `(a | b) | c` is `a | b | c`
                let mut flat = Vec::with_capacity(alternatives.len());
                for alternative in alternatives {
                    match alternative {
                        Pattern::Or(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                if flat.len() == 1 {
                    flat.remove(0)
                } else {
                    Pattern::Or(flat)
                }
            });

        alternatives
            .then(kw("as").ignore_then(identifier()).or_not())
            .try_map(|(pattern, name), span| match name {
                None => Ok(pattern),
                Some(name) if name == "_" => {
                    Err(Simple::custom(span, "cannot use '_' as a target"))
                }
                Some(name) => Ok(Pattern::As {
                    pattern: Some(Box::new(pattern)),
                    name: Some(name),
                }),
            })
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bdiff::ast::{MatchCase, Stmt};
    use crate::bdiff::lexing::tokenize;
    use crate::bdiff::parsing::parse_module;

    fn cases(source: &str) -> Vec<MatchCase> {
        let mut body = parse_module(&tokenize(source).unwrap()).unwrap().body;
        match body.remove(0) {
            Stmt::Match { cases, .. } => cases,
            other => panic!("expected a match statement, found {other:?}"),
        }
    }

    fn case(pattern: &str) -> Pattern {
        cases(&format!("match x:\n    case {pattern}:\n        pass\n"))
            .remove(0)
            .pattern
    }

    fn capture(name: &str) -> Pattern {
        Pattern::As {
            pattern: None,
            name: Some(name.to_string()),
        }
    }

    #[test]
    fn test_capture_and_wildcard() {
        assert_eq!(case("y"), capture("y"));
        assert_eq!(
            case("_"),
            Pattern::As {
                pattern: None,
                name: None
            }
        );
    }

    #[test]
    fn test_literals_and_values() {
        assert_eq!(case("None"), Pattern::Singleton(Constant::None));
        assert!(matches!(case("-1"), Pattern::Value(Expr::UnaryOp { .. })));
        assert!(matches!(case("1 + 2j"), Pattern::Value(Expr::BinOp { op: BinOp::Add, .. })));
        assert_eq!(case("'a' 'b'"), Pattern::Value(Expr::Constant(Constant::Str("ab".into()))));
        assert!(matches!(case("Color.RED"), Pattern::Value(Expr::Attribute { .. })));
    }

    #[test]
    fn test_sequences_share_one_shape() {
        let expected = Pattern::Sequence(vec![capture("a"), Pattern::Star(Some("rest".into()))]);
        assert_eq!(case("[a, *rest]"), expected);
        assert_eq!(case("(a, *rest)"), expected);
        assert_eq!(case("a, *rest"), expected);
        assert_eq!(case("(a)"), capture("a"));
        assert_eq!(case("()"), Pattern::Sequence(Vec::new()));
    }

    #[test]
    fn test_class_pattern() {
        let Pattern::Class {
            cls,
            patterns,
            kwd_attrs,
            kwd_patterns,
        } = case("Point(0, y=_)")
        else {
            panic!("expected a class pattern");
        };
        assert_eq!(cls, Expr::name("Point"));
        assert_eq!(patterns.len(), 1);
        assert_eq!(kwd_attrs, vec!["y".to_string()]);
        assert_eq!(kwd_patterns.len(), 1);
    }

    #[test]
    fn test_mapping_pattern() {
        let Pattern::Mapping {
            keys,
            patterns,
            rest,
        } = case("{'k': v, **others}")
        else {
            panic!("expected a mapping pattern");
        };
        assert_eq!(keys, vec![Expr::Constant(Constant::Str("k".into()))]);
        assert_eq!(patterns, vec![capture("v")]);
        assert_eq!(rest.as_deref(), Some("others"));
    }

    #[test]
    fn test_or_and_as() {
        let Pattern::As { pattern, name } = case("1 | 2 as n") else {
            panic!("expected an as pattern");
        };
        assert_eq!(name.as_deref(), Some("n"));
        assert!(matches!(pattern.as_deref(), Some(Pattern::Or(alts)) if alts.len() == 2));
    }

    #[test]
    fn test_guard() {
        let cases = cases("match p:\n    case (a, b) if a > b:\n        pass\n    case _:\n        pass\n");
        assert_eq!(cases.len(), 2);
        assert!(cases[0].guard.is_some());
        assert!(cases[1].guard.is_none());
    }

    #[test]
    fn test_positional_after_keyword_is_an_error() {
        let source = "match x:\n    case P(a=1, b):\n        pass\n";
        assert!(parse_module(&tokenize(source).unwrap()).is_err());
    }
}
