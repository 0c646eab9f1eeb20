//! Expression grammar
//!
//! The precedence ladder, lowest binding first:
//!
//!     lambda, conditional          test
//!     or / and / not               disjunction, conjunction, inversion
//!     comparisons                  comparison (chained: `a < b < c`)
//!     | ^ & << >> + - * / // % @   one left-associative level each
//!     unary - + ~                  factor
//!     **                           power (right-associative, binds tighter than unary on its left)
//!     await                        await_primary
//!     .attr, (args), [slices]      primary
//!     names, literals, displays    atom
//!
//! Two levels are recursive entry points: `test` (anything nested in brackets is a full
//! expression) and `bitor` (targets of `for` clauses and starred items stop below the
//! comparison level so that `for x in xs` does not read `x in xs` as a comparison).

use chumsky::prelude::*;
use chumsky::recursive::Recursive;

use super::fstrings::{parse_fstring, push_parts};
use super::{identifier, kw, op, operator_table, unexpected, Boxed, Lexeme, ParserError};
use crate::bdiff::ast::{
    Argument, BinOp, BoolOp, CmpOp, Comprehension, Constant, DictEntry, Expr, FStringPart,
    Param, UnaryOp,
};
use crate::bdiff::literals::{decode, Literal, PyStr};
use crate::bdiff::token::TokenKind;

const UNARY_OPS: &[(&str, UnaryOp)] = &[
    ("-", UnaryOp::USub),
    ("+", UnaryOp::UAdd),
    ("~", UnaryOp::Invert),
];
const TERM_OPS: &[(&str, BinOp)] = &[
    ("*", BinOp::Mult),
    ("/", BinOp::Div),
    ("//", BinOp::FloorDiv),
    ("%", BinOp::Mod),
    ("@", BinOp::MatMult),
];
const ARITH_OPS: &[(&str, BinOp)] = &[("+", BinOp::Add), ("-", BinOp::Sub)];
const SHIFT_OPS: &[(&str, BinOp)] = &[("<<", BinOp::LShift), (">>", BinOp::RShift)];
const BAND_OPS: &[(&str, BinOp)] = &[("&", BinOp::BitAnd)];
const BXOR_OPS: &[(&str, BinOp)] = &[("^", BinOp::BitXor)];
const BOR_OPS: &[(&str, BinOp)] = &[("|", BinOp::BitOr)];
const COMPARISON_OPS: &[(&str, CmpOp)] = &[
    ("==", CmpOp::Eq),
    ("!=", CmpOp::NotEq),
    ("<", CmpOp::Lt),
    ("<=", CmpOp::LtE),
    (">", CmpOp::Gt),
    (">=", CmpOp::GtE),
];

type RecursiveExpr = Recursive<'static, Lexeme, Expr, ParserError>;

/// Entry points into the expression grammar, used by the statement parsers.
#[derive(Clone)]
pub struct Expressions {
    /// A full expression, including `lambda` and conditional expressions
    pub test: Boxed<Expr>,
    /// `name := value` or a full expression
    pub named: Boxed<Expr>,
    /// An expression at the `|` level
    pub bitor: Boxed<Expr>,
    /// Comma-separated expressions; a comma makes a tuple
    pub star_expressions: Boxed<Expr>,
    /// Comma-separated targets, as in `for a, *b in ...`
    pub star_targets: Boxed<Expr>,
    pub yield_expr: Boxed<Expr>,
    /// The inside of a call's parentheses
    pub arguments: Boxed<Vec<Argument>>,
}

pub fn expressions() -> Expressions {
    let test = recursive(|test: RecursiveExpr| {
        let test = test.boxed();
        let bitor = bitor_expr(test.clone());
        test_expr(test, bitor)
    })
    .boxed();
    let bitor = bitor_expr(test.clone());
    let star_expressions = tuple_or_single(starred(bitor.clone()).or(test.clone()).boxed());

    Expressions {
        named: named_expr(test.clone()),
        star_targets: tuple_or_single(starred(bitor.clone()).or(bitor.clone()).boxed()),
        yield_expr: yield_expr(test.clone(), star_expressions.clone()),
        arguments: arguments(test.clone(), comprehension_clauses(test.clone(), bitor.clone())),
        star_expressions,
        bitor,
        test,
    }
}

/// A parameter list, without the surrounding parentheses. Lambda parameters have no
/// annotations: their `:` ends the list.
pub fn parameters(annotated: bool, test: Boxed<Expr>) -> Boxed<Vec<Param>> {
    let annotation: Boxed<Option<Expr>> = if annotated {
        op(":").ignore_then(test.clone()).or_not().boxed()
    } else {
        empty().to(None).boxed()
    };

    let param = choice((
        op("**")
            .ignore_then(identifier())
            .then(annotation.clone())
            .map(|(name, annotation)| Param::KwArgs { name, annotation }),
        op("*")
            .ignore_then(identifier().then(annotation.clone()).or_not())
            .map(|arg| match arg {
                Some((name, annotation)) => Param::VarArgs { name, annotation },
                None => Param::KeywordOnly,
            }),
        op("/").to(Param::PositionalOnly),
        identifier()
            .then(annotation)
            .then(op("=").ignore_then(test).or_not())
            .map(|((name, annotation), default)| Param::Plain {
                name,
                annotation,
                default,
            }),
    ));

    param.separated_by(op(",")).allow_trailing().boxed()
}

/// One item, or several separated by commas. A trailing comma alone also makes a tuple.
pub(crate) fn tuple_or_single(item: Boxed<Expr>) -> Boxed<Expr> {
    item.clone()
        .then(op(",").ignore_then(item).repeated())
        .then(op(",").or_not())
        .map(|((first, rest), comma)| {
            if rest.is_empty() && comma.is_none() {
                first
            } else {
                let mut items = Vec::with_capacity(rest.len() + 1);
                items.push(first);
                items.extend(rest);
                Expr::Tuple(items)
            }
        })
        .boxed()
}

pub(crate) fn starred(bitor: Boxed<Expr>) -> Boxed<Expr> {
    op("*")
        .ignore_then(bitor)
        .map(|e| Expr::Starred(Box::new(e)))
        .boxed()
}

fn named_expr(test: Boxed<Expr>) -> Boxed<Expr> {
    identifier()
        .then_ignore(op(":="))
        .then(test.clone())
        .map(|(name, value)| Expr::NamedExpr {
            target: Box::new(Expr::Name(name)),
            value: Box::new(value),
        })
        .or(test)
        .boxed()
}

fn yield_expr(test: Boxed<Expr>, star_expressions: Boxed<Expr>) -> Boxed<Expr> {
    kw("yield")
        .ignore_then(
            kw("from")
                .ignore_then(test)
                .map(|e| Expr::YieldFrom(Box::new(e)))
                .or(star_expressions
                    .or_not()
                    .map(|value| Expr::Yield(value.map(Box::new)))),
        )
        .boxed()
}

/// One or more `for ... in ... if ...` clauses.
fn comprehension_clauses(test: Boxed<Expr>, bitor: Boxed<Expr>) -> Boxed<Vec<Comprehension>> {
    let targets = tuple_or_single(starred(bitor.clone()).or(bitor).boxed());
    kw("async")
        .or_not()
        .then_ignore(kw("for"))
        .then(targets)
        .then_ignore(kw("in"))
        .then(test.clone())
        .then(kw("if").ignore_then(test).repeated())
        .map(|(((is_async, target), iter), ifs)| Comprehension {
            is_async: is_async.is_some(),
            target,
            iter,
            ifs,
        })
        .repeated()
        .at_least(1)
        .boxed()
}

fn arguments(test: Boxed<Expr>, generators: Boxed<Vec<Comprehension>>) -> Boxed<Vec<Argument>> {
    let argument = choice((
        op("**").ignore_then(test.clone()).map(Argument::Unpack),
        op("*")
            .ignore_then(test.clone())
            .map(|e| Argument::Positional(Expr::Starred(Box::new(e)))),
        identifier()
            .then_ignore(op("="))
            .then(test.clone())
            .map(|(name, value)| Argument::Keyword { name, value }),
        named_expr(test)
            .then(generators.or_not())
            .map(|(elt, generators)| {
                Argument::Positional(match generators {
                    Some(generators) => Expr::GeneratorExp {
                        elt: Box::new(elt),
                        generators,
                    },
                    None => elt,
                })
            }),
    ));
    argument.separated_by(op(",")).allow_trailing().boxed()
}

fn slices(test: Boxed<Expr>, bitor: Boxed<Expr>) -> Boxed<Expr> {
    let bound = test.clone().or_not();
    let slice = bound
        .clone()
        .then_ignore(op(":"))
        .then(bound.clone())
        .then(op(":").ignore_then(bound).or_not())
        .map(|((lower, upper), step)| Expr::Slice {
            lower: lower.map(Box::new),
            upper: upper.map(Box::new),
            step: step.flatten().map(Box::new),
        });
    let item = slice.or(starred(bitor)).or(named_expr(test)).boxed();
    tuple_or_single(item)
}

// ============================================================================
// Atoms
// ============================================================================

fn atom(test: Boxed<Expr>, bitor: Boxed<Expr>) -> Boxed<Expr> {
    let named = named_expr(test.clone());
    let star_named = starred(bitor.clone()).or(named).boxed();
    let generators = comprehension_clauses(test.clone(), bitor.clone());
    let star_expressions = tuple_or_single(starred(bitor.clone()).or(test.clone()).boxed());

    let number = filter_map(|span, t: Lexeme| {
        if t.kind == TokenKind::Number {
            Ok(Expr::Constant(number_constant(&t.text)))
        } else {
            Err(unexpected(span, t))
        }
    });
    let strings = filter(|t: &Lexeme| t.kind == TokenKind::String)
        .map(|t: Lexeme| t.text)
        .repeated()
        .at_least(1)
        .try_map(|parts: Vec<String>, span| {
            string_expr(&parts).map_err(|message| Simple::custom(span, message))
        });
    let constant = choice((
        kw("None").to(Constant::None),
        kw("True").to(Constant::True),
        kw("False").to(Constant::False),
        op("...").to(Constant::Ellipsis),
    ))
    .map(Expr::Constant);

    // Displays share one shape: a first item, optional comprehension clauses, more items.
    let items = star_named
        .clone()
        .then(generators.clone().or_not())
        .then(op(",").ignore_then(star_named).repeated())
        .then(op(",").or_not())
        .boxed();

    let parenthesized = op("(").ignore_then(choice((
        op(")").to(Expr::Tuple(Vec::new())),
        yield_expr(test.clone(), star_expressions).then_ignore(op(")")),
        items
            .clone()
            .then_ignore(op(")"))
            .try_map(|(((first, generators), rest), comma), span| {
                match (generators, rest.is_empty(), comma.is_some()) {
                    (Some(generators), true, false) => Ok(Expr::GeneratorExp {
                        elt: Box::new(first),
                        generators,
                    }),
                    (Some(_), _, _) => Err(Simple::custom(span, "invalid generator expression")),
                    (None, true, false) => Ok(first),
                    (None, _, _) => Ok(Expr::Tuple(prepend(first, rest))),
                }
            }),
    )));

    let list = op("[").ignore_then(choice((
        op("]").to(Expr::List(Vec::new())),
        items
            .clone()
            .then_ignore(op("]"))
            .try_map(|(((first, generators), rest), _), span| match generators {
                Some(generators) if rest.is_empty() => Ok(Expr::ListComp {
                    elt: Box::new(first),
                    generators,
                }),
                Some(_) => Err(Simple::custom(span, "invalid list comprehension")),
                None => Ok(Expr::List(prepend(first, rest))),
            }),
    )));

    let dict_entry = op("**")
        .ignore_then(bitor)
        .map(DictEntry::Unpack)
        .or(test
            .clone()
            .then_ignore(op(":"))
            .then(test)
            .map(|(key, value)| DictEntry::Pair(key, value)))
        .boxed();
    let dict = dict_entry
        .clone()
        .then(generators.or_not())
        .then(op(",").ignore_then(dict_entry).repeated())
        .then_ignore(op(",").or_not())
        .then_ignore(op("}"))
        .try_map(|((first, generators), rest), span| match (first, generators) {
            (DictEntry::Pair(key, value), Some(generators)) if rest.is_empty() => {
                Ok(Expr::DictComp {
                    key: Box::new(key),
                    value: Box::new(value),
                    generators,
                })
            }
            (_, Some(_)) => Err(Simple::custom(span, "invalid dict comprehension")),
            (first, None) => Ok(Expr::Dict(prepend(first, rest))),
        });
    let set = items
        .then_ignore(op("}"))
        .try_map(|(((first, generators), rest), _), span| match generators {
            Some(generators) if rest.is_empty() => Ok(Expr::SetComp {
                elt: Box::new(first),
                generators,
            }),
            Some(_) => Err(Simple::custom(span, "invalid set comprehension")),
            None => Ok(Expr::Set(prepend(first, rest))),
        });
    let braces = op("{").ignore_then(choice((op("}").to(Expr::Dict(Vec::new())), dict, set)));

    choice((
        identifier().map(Expr::Name),
        number,
        strings,
        constant,
        parenthesized,
        list,
        braces,
    ))
    .boxed()
}

fn prepend<T>(first: T, rest: Vec<T>) -> Vec<T> {
    let mut items = Vec::with_capacity(rest.len() + 1);
    items.push(first);
    items.extend(rest);
    items
}

enum Trailer {
    Attribute(String),
    Call(Vec<Argument>),
    Subscript(Expr),
}

fn primary(atom: Boxed<Expr>, test: Boxed<Expr>, bitor: Boxed<Expr>) -> Boxed<Expr> {
    let generators = comprehension_clauses(test.clone(), bitor.clone());
    let trailer = choice((
        op(".").ignore_then(identifier()).map(Trailer::Attribute),
        op("(")
            .ignore_then(arguments(test.clone(), generators))
            .then_ignore(op(")"))
            .map(Trailer::Call),
        op("[")
            .ignore_then(slices(test, bitor))
            .then_ignore(op("]"))
            .map(Trailer::Subscript),
    ));

    atom.then(trailer.repeated())
        .foldl(|value, trailer| match trailer {
            Trailer::Attribute(attr) => Expr::Attribute {
                value: Box::new(value),
                attr,
            },
            Trailer::Call(args) => Expr::Call {
                func: Box::new(value),
                args,
            },
            Trailer::Subscript(slice) => Expr::Subscript {
                value: Box::new(value),
                slice: Box::new(slice),
            },
        })
        .boxed()
}

// ============================================================================
// Operator levels
// ============================================================================

fn binary_level(operand: Boxed<Expr>, table: &'static [(&'static str, BinOp)]) -> Boxed<Expr> {
    operand
        .clone()
        .then(operator_table(table).then(operand).repeated())
        .foldl(|left, (op, right)| Expr::binary(left, op, right))
        .boxed()
}

/// Everything from atoms up to `|`.
fn bitor_expr(test: Boxed<Expr>) -> Boxed<Expr> {
    recursive(|bitor: RecursiveExpr| {
        let bitor = bitor.boxed();
        let atom = atom(test.clone(), bitor.clone());
        let primary = primary(atom, test.clone(), bitor);
        let await_primary = kw("await")
            .ignore_then(primary.clone())
            .map(|e| Expr::Await(Box::new(e)))
            .or(primary)
            .boxed();

        let factor = recursive(|factor: RecursiveExpr| {
            let power = await_primary
                .clone()
                .then(op("**").ignore_then(factor.clone()).or_not())
                .map(|(base, exponent)| match exponent {
                    Some(exponent) => Expr::binary(base, BinOp::Pow, exponent),
                    None => base,
                });
            operator_table(UNARY_OPS)
                .then(factor)
                .map(|(op, operand)| Expr::unary(op, operand))
                .or(power)
        })
        .boxed();

        let term = binary_level(factor, TERM_OPS);
        let arith = binary_level(term, ARITH_OPS);
        let shift = binary_level(arith, SHIFT_OPS);
        let band = binary_level(shift, BAND_OPS);
        let bxor = binary_level(band, BXOR_OPS);
        binary_level(bxor, BOR_OPS)
    })
    .boxed()
}

fn comparison_op() -> Boxed<CmpOp> {
    choice((
        operator_table(COMPARISON_OPS),
        kw("in").to(CmpOp::In),
        kw("not").then(kw("in")).to(CmpOp::NotIn),
        kw("is").then(kw("not")).to(CmpOp::IsNot),
        kw("is").to(CmpOp::Is),
    ))
    .boxed()
}

fn bool_level(operand: Boxed<Expr>, word: &'static str, op: BoolOp) -> Boxed<Expr> {
    operand
        .clone()
        .then(kw(word).ignore_then(operand).repeated())
        .map(move |(first, rest)| {
            if rest.is_empty() {
                first
            } else {
                Expr::BoolOp {
                    op,
                    values: prepend(first, rest),
                }
            }
        })
        .boxed()
}

/// Comparisons, boolean operators, conditional expressions and lambdas.
fn test_expr(test: Boxed<Expr>, bitor: Boxed<Expr>) -> Boxed<Expr> {
    let comparison = bitor
        .clone()
        .then(comparison_op().then(bitor).repeated())
        .map(|(left, rest)| {
            if rest.is_empty() {
                left
            } else {
                let (ops, comparators) = rest.into_iter().unzip();
                Expr::Compare {
                    left: Box::new(left),
                    ops,
                    comparators,
                }
            }
        });
    let inversion = recursive(|inversion: RecursiveExpr| {
        kw("not")
            .ignore_then(inversion)
            .map(|e| Expr::unary(UnaryOp::Not, e))
            .or(comparison)
    })
    .boxed();
    let conjunction = bool_level(inversion, "and", BoolOp::And);
    let disjunction = bool_level(conjunction, "or", BoolOp::Or);

    let conditional = disjunction
        .clone()
        .then(
            kw("if")
                .ignore_then(disjunction)
                .then_ignore(kw("else"))
                .then(test.clone())
                .or_not(),
        )
        .map(|(body, rest)| match rest {
            Some((condition, orelse)) => Expr::IfExp {
                test: Box::new(condition),
                body: Box::new(body),
                orelse: Box::new(orelse),
            },
            None => body,
        });
    let lambda = kw("lambda")
        .ignore_then(parameters(false, test.clone()))
        .then_ignore(op(":"))
        .then(test)
        .map(|(params, body)| Expr::Lambda {
            params,
            body: Box::new(body),
        });

    lambda.or(conditional).boxed()
}

// ============================================================================
// Literals
// ============================================================================

/// Normalized spelling of a numeric literal: no underscores, lowercase, integers in decimal.
pub fn number_constant(text: &str) -> Constant {
    let clean = text.replace('_', "").to_ascii_lowercase();
    if let Some(mantissa) = clean.strip_suffix('j') {
        return Constant::Imaginary(format!("{}j", float_spelling(mantissa)));
    }
    let radix = match clean.get(..2) {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return Constant::Int(
            u128::from_str_radix(&clean[2..], radix).map_or(clean.clone(), |v| v.to_string()),
        );
    }
    if clean.contains(['.', 'e']) {
        return Constant::Float(float_spelling(&clean));
    }
    Constant::Int(clean.parse::<u128>().map_or(clean.clone(), |v| v.to_string()))
}

fn float_spelling(text: &str) -> String {
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => format!("{value:?}"),
        _ => text.to_string(),
    }
}

/// Merge implicitly concatenated string tokens into one expression.
///
/// Plain literals fold into a single constant. Once any part is an f-string the whole run is
/// an [`Expr::JoinedStr`] with neighbouring literal text merged.
pub fn string_expr(parts: &[String]) -> Result<Expr, String> {
    let decoded = parts
        .iter()
        .map(|part| decode(part).map_err(|e| e.to_string()))
        .collect::<Result<Vec<_>, _>>()?;

    let bytes = decoded
        .iter()
        .filter(|l| matches!(l, Literal::Bytes(_)))
        .count();
    if bytes > 0 && bytes < decoded.len() {
        return Err("cannot mix bytes and nonbytes literals".to_string());
    }
    if decoded.iter().any(|l| matches!(l, Literal::Format(_))) {
        let mut joined = Vec::new();
        for literal in decoded {
            match literal {
                Literal::Str(text) => push_parts(&mut joined, vec![FStringPart::Literal(text)]),
                Literal::Format(text) => push_parts(&mut joined, parse_fstring(&text)?),
                Literal::Bytes(_) => {}
            }
        }
        return Ok(Expr::JoinedStr(joined));
    }

    if bytes > 0 {
        let mut value = Vec::new();
        for literal in decoded {
            if let Literal::Bytes(b) = literal {
                value.extend(b);
            }
        }
        return Ok(Expr::Constant(Constant::Bytes(value)));
    }
    let mut value = PyStr::new();
    for literal in decoded {
        if let Literal::Str(s) = literal {
            value.extend_from(&s);
        }
    }
    Ok(Expr::Constant(Constant::Str(value)))
}
