//! Statement grammar
//!
//! A statement is either one compound statement or a line of simple statements joined by
//! `;`. The recursion runs through the suite: the body of a compound statement is either the
//! rest of its header line, or a `Newline` followed by an indented run of statements closed
//! by a `Dedent`.
//!
//! `match`, `case` and `type` are soft keywords: they only open a statement when the rest of
//! the line has that statement's shape, and are plain names otherwise.

use chumsky::prelude::*;
use chumsky::recursive::Recursive;

use super::expressions::{expressions, parameters, starred, tuple_or_single, Expressions};
use super::patterns::case_pattern;
use super::{identifier, kw, marker, op, operator_table, soft, Boxed, Lexeme, ParserError};
use crate::bdiff::ast::{
    Alias, BinOp, ClassDef, ExceptHandler, Expr, FunctionDef, MatchCase, Module, Stmt,
    TypeParam, WithItem,
};
use crate::bdiff::token::TokenKind;

const AUGMENTED_OPS: &[(&str, BinOp)] = &[
    ("+=", BinOp::Add),
    ("-=", BinOp::Sub),
    ("*=", BinOp::Mult),
    ("@=", BinOp::MatMult),
    ("/=", BinOp::Div),
    ("%=", BinOp::Mod),
    ("&=", BinOp::BitAnd),
    ("|=", BinOp::BitOr),
    ("^=", BinOp::BitXor),
    ("<<=", BinOp::LShift),
    (">>=", BinOp::RShift),
    ("**=", BinOp::Pow),
    ("//=", BinOp::FloorDiv),
];

/// A whole token stream: statements up to the end marker.
pub fn module() -> impl Parser<Lexeme, Module, Error = ParserError> {
    statement()
        .repeated()
        .then_ignore(marker(TokenKind::EndMarker))
        .then_ignore(end())
        .map(|lines| Module {
            body: lines.into_iter().flatten().collect(),
        })
}

fn statement() -> Boxed<Vec<Stmt>> {
    let ex = expressions();
    let simple = simple_statements(&ex);

    recursive(
        |statement: Recursive<'static, Lexeme, Vec<Stmt>, ParserError>| {
            let indented = marker(TokenKind::Newline)
                .ignore_then(marker(TokenKind::Indent))
                .ignore_then(statement.repeated().at_least(1))
                .then_ignore(marker(TokenKind::Dedent))
                .map(|lines| lines.into_iter().flatten().collect::<Vec<_>>());
            let suite = op(":").ignore_then(indented.or(simple.clone())).boxed();

            compound_statement(&ex, suite)
                .map(|stmt| vec![stmt])
                .or(simple.clone())
        },
    )
    .boxed()
}

// ============================================================================
// Simple statements
// ============================================================================

fn simple_statements(ex: &Expressions) -> Boxed<Vec<Stmt>> {
    small_statement(ex)
        .separated_by(op(";"))
        .at_least(1)
        .allow_trailing()
        .then_ignore(marker(TokenKind::Newline))
        .boxed()
}

/// What follows the first expression of an expression statement.
enum Tail {
    Annotated(Expr, Option<Expr>),
    Augmented(BinOp, Expr),
    Assigned(Vec<Expr>),
}

fn expression_statement(ex: &Expressions) -> Boxed<Stmt> {
    let value = ex.yield_expr.clone().or(ex.star_expressions.clone()).boxed();
    let annotated = op(":")
        .ignore_then(ex.test.clone())
        .then(op("=").ignore_then(value.clone()).or_not())
        .map(|(annotation, value)| Tail::Annotated(annotation, value));
    let augmented = operator_table(AUGMENTED_OPS)
        .then(value.clone())
        .map(|(op, value)| Tail::Augmented(op, value));
    let assigned = op("=")
        .ignore_then(value.clone())
        .repeated()
        .map(Tail::Assigned);

    value
        .then(choice((annotated, augmented, assigned)))
        .map(|(target, tail)| match tail {
            Tail::Annotated(annotation, value) => Stmt::AnnAssign {
                target,
                annotation,
                value,
            },
            Tail::Augmented(op, value) => Stmt::AugAssign { target, op, value },
            Tail::Assigned(mut values) => match values.pop() {
                None => Stmt::Expr(target),
                Some(value) => {
                    let mut targets = Vec::with_capacity(values.len() + 1);
                    targets.push(target);
                    targets.extend(values);
                    Stmt::Assign { targets, value }
                }
            },
        })
        .boxed()
}

fn import_statement() -> Boxed<Stmt> {
    let dotted = identifier()
        .separated_by(op("."))
        .at_least(1)
        .map(|parts| parts.join("."));
    let alias_of = |name: Boxed<String>| {
        name.then(kw("as").ignore_then(identifier()).or_not())
            .map(|(name, asname)| Alias { name, asname })
    };

    let import = kw("import")
        .ignore_then(
            alias_of(dotted.clone().boxed())
                .separated_by(op(","))
                .at_least(1),
        )
        .map(Stmt::Import);

    let level = op(".")
        .to(1)
        .or(op("...").to(3))
        .repeated()
        .map(|dots: Vec<usize>| dots.into_iter().sum::<usize>());
    let plain = alias_of(identifier().boxed()).boxed();
    let names = choice((
        op("*").to(vec![Alias {
            name: "*".to_string(),
            asname: None,
        }]),
        op("(")
            .ignore_then(plain.clone().separated_by(op(",")).at_least(1).allow_trailing())
            .then_ignore(op(")")),
        plain.separated_by(op(",")).at_least(1),
    ));
    let import_from = kw("from")
        .ignore_then(level)
        .then(dotted.or_not())
        .then_ignore(kw("import"))
        .then(names)
        .try_map(|((level, module), names), span| {
            if level == 0 && module.is_none() {
                return Err(Simple::custom(span, "expected module name"));
            }
            Ok(Stmt::ImportFrom {
                module,
                names,
                level,
            })
        });

    import.or(import_from).boxed()
}

fn small_statement(ex: &Expressions) -> Boxed<Stmt> {
    let names = identifier().separated_by(op(",")).at_least(1);

    let keyword_only = choice((
        kw("pass").to(Stmt::Pass),
        kw("break").to(Stmt::Break),
        kw("continue").to(Stmt::Continue),
    ));
    let return_stmt = kw("return")
        .ignore_then(ex.star_expressions.clone().or_not())
        .map(Stmt::Return);
    let raise = kw("raise")
        .ignore_then(
            ex.test
                .clone()
                .then(kw("from").ignore_then(ex.test.clone()).or_not())
                .or_not(),
        )
        .map(|clause| match clause {
            Some((exc, cause)) => Stmt::Raise {
                exc: Some(exc),
                cause,
            },
            None => Stmt::Raise {
                exc: None,
                cause: None,
            },
        });
    let global = kw("global").ignore_then(names.clone()).map(Stmt::Global);
    let nonlocal = kw("nonlocal").ignore_then(names).map(Stmt::Nonlocal);
    let delete = kw("del")
        .ignore_then(
            ex.bitor
                .clone()
                .separated_by(op(","))
                .at_least(1)
                .allow_trailing(),
        )
        .map(Stmt::Delete);
    let assert = kw("assert")
        .ignore_then(ex.test.clone())
        .then(op(",").ignore_then(ex.test.clone()).or_not())
        .map(|(test, msg)| Stmt::Assert { test, msg });
    let type_alias = soft("type")
        .ignore_then(identifier())
        .then(type_params(ex).or_not())
        .then_ignore(op("="))
        .then(ex.test.clone())
        .map(|((name, type_params), value)| Stmt::TypeAlias {
            name,
            type_params: type_params.unwrap_or_default(),
            value,
        });

    choice((
        keyword_only,
        return_stmt,
        raise,
        global,
        nonlocal,
        delete,
        assert,
        import_statement(),
        type_alias,
        expression_statement(ex),
    ))
    .boxed()
}

// ============================================================================
// Compound statements
// ============================================================================

fn mark_async(stmt: Stmt) -> Stmt {
    match stmt {
        Stmt::For {
            target,
            iter,
            body,
            orelse,
            ..
        } => Stmt::For {
            is_async: true,
            target,
            iter,
            body,
            orelse,
        },
        Stmt::With { items, body, .. } => Stmt::With {
            is_async: true,
            items,
            body,
        },
        other => other,
    }
}

/// `[T, U: int, *Ts, **P]` after the name of a generic function, class or alias.
fn type_params(ex: &Expressions) -> Boxed<Vec<TypeParam>> {
    let param = choice((
        op("**").ignore_then(identifier()).map(TypeParam::ParamSpec),
        op("*").ignore_then(identifier()).map(TypeParam::TypeVarTuple),
        identifier()
            .then(op(":").ignore_then(ex.test.clone()).or_not())
            .map(|(name, bound)| TypeParam::TypeVar { name, bound }),
    ));
    op("[")
        .ignore_then(param.separated_by(op(",")).at_least(1).allow_trailing())
        .then_ignore(op("]"))
        .boxed()
}

fn definition(ex: &Expressions, suite: Boxed<Vec<Stmt>>) -> Boxed<Stmt> {
    let decorators = op("@")
        .ignore_then(ex.named.clone())
        .then_ignore(marker(TokenKind::Newline))
        .repeated();

    let function = kw("async")
        .or_not()
        .then_ignore(kw("def"))
        .then(identifier())
        .then(type_params(ex).or_not())
        .then(
            op("(")
                .ignore_then(parameters(true, ex.test.clone()))
                .then_ignore(op(")")),
        )
        .then(op("->").ignore_then(ex.test.clone()).or_not())
        .then(suite.clone())
        .map(|(((((is_async, name), type_params), params), returns), body)| {
            Stmt::FunctionDef(FunctionDef {
                is_async: is_async.is_some(),
                name,
                type_params: type_params.unwrap_or_default(),
                params,
                returns,
                body,
                decorators: Vec::new(),
            })
        });

    let class = kw("class")
        .ignore_then(identifier())
        .then(type_params(ex).or_not())
        .then(
            op("(")
                .ignore_then(ex.arguments.clone())
                .then_ignore(op(")"))
                .or_not(),
        )
        .then(suite)
        .map(|(((name, type_params), arguments), body)| {
            Stmt::ClassDef(ClassDef {
                name,
                type_params: type_params.unwrap_or_default(),
                arguments: arguments.unwrap_or_default(),
                body,
                decorators: Vec::new(),
            })
        });

    decorators
        .then(function.or(class))
        .map(|(decorators, stmt)| match stmt {
            Stmt::FunctionDef(def) => Stmt::FunctionDef(FunctionDef { decorators, ..def }),
            Stmt::ClassDef(def) => Stmt::ClassDef(ClassDef { decorators, ..def }),
            other => other,
        })
        .boxed()
}

fn with_statement(ex: &Expressions, suite: Boxed<Vec<Stmt>>) -> Boxed<Stmt> {
    let item = ex
        .test
        .clone()
        .then(kw("as").ignore_then(ex.bitor.clone()).or_not())
        .map(|(context, vars)| WithItem { context, vars });
    let items = item.separated_by(op(",")).at_least(1).boxed();
    // `with (a as b, c):` groups its items in parentheses; `with (a) as b:` does not.
    let grouped = op("(")
        .ignore_then(items.clone())
        .then_ignore(op(",").or_not())
        .then_ignore(op(")"))
        .then_ignore(op(":").rewind());

    kw("with")
        .ignore_then(grouped.or(items))
        .then(suite)
        .map(|(items, body)| Stmt::With {
            is_async: false,
            items,
            body,
        })
        .boxed()
}

fn try_statement(ex: &Expressions, suite: Boxed<Vec<Stmt>>) -> Boxed<Stmt> {
    let handler = kw("except")
        .ignore_then(op("*").or_not())
        .then(
            ex.test
                .clone()
                .then(kw("as").ignore_then(identifier()).or_not())
                .or_not(),
        )
        .then(suite.clone())
        .map(|((star, clause), body)| {
            let (kind, name) = match clause {
                Some((kind, name)) => (Some(kind), name),
                None => (None, None),
            };
            (star.is_some(), ExceptHandler { kind, name, body })
        });

    kw("try")
        .ignore_then(suite.clone())
        .then(handler.repeated())
        .then(kw("else").ignore_then(suite.clone()).or_not())
        .then(kw("finally").ignore_then(suite).or_not())
        .try_map(|(((body, handlers), orelse), finalbody), span| {
            if handlers.is_empty() && finalbody.is_none() {
                return Err(Simple::custom(span, "expected 'except' or 'finally' block"));
            }
            let is_star = handlers.iter().any(|(star, _)| *star);
            Ok(Stmt::Try {
                body,
                handlers: handlers.into_iter().map(|(_, handler)| handler).collect(),
                orelse: orelse.unwrap_or_default(),
                finalbody: finalbody.unwrap_or_default(),
                is_star,
            })
        })
        .boxed()
}

fn match_statement(ex: &Expressions, suite: Boxed<Vec<Stmt>>) -> Boxed<Stmt> {
    let subject = tuple_or_single(starred(ex.bitor.clone()).or(ex.named.clone()).boxed());
    let case = soft("case")
        .ignore_then(case_pattern())
        .then(kw("if").ignore_then(ex.named.clone()).or_not())
        .then(suite)
        .map(|((pattern, guard), body)| MatchCase {
            pattern,
            guard,
            body,
        });

    soft("match")
        .ignore_then(subject)
        .then_ignore(op(":"))
        .then_ignore(marker(TokenKind::Newline))
        .then_ignore(marker(TokenKind::Indent))
        .then(case.repeated().at_least(1))
        .then_ignore(marker(TokenKind::Dedent))
        .map(|(subject, cases)| Stmt::Match { subject, cases })
        .boxed()
}

fn compound_statement(ex: &Expressions, suite: Boxed<Vec<Stmt>>) -> Boxed<Stmt> {
    let else_clause = kw("else").ignore_then(suite.clone()).or_not().boxed();

    let if_stmt = kw("if")
        .ignore_then(ex.named.clone())
        .then(suite.clone())
        .then(
            kw("elif")
                .ignore_then(ex.named.clone())
                .then(suite.clone())
                .repeated(),
        )
        .then(else_clause.clone())
        .map(|(((test, body), elifs), orelse)| {
            let orelse = elifs
                .into_iter()
                .rev()
                .fold(orelse.unwrap_or_default(), |orelse, (test, body)| {
                    vec![Stmt::If { test, body, orelse }]
                });
            Stmt::If { test, body, orelse }
        });

    let while_stmt = kw("while")
        .ignore_then(ex.named.clone())
        .then(suite.clone())
        .then(else_clause.clone())
        .map(|((test, body), orelse)| Stmt::While {
            test,
            body,
            orelse: orelse.unwrap_or_default(),
        });

    let for_stmt = kw("for")
        .ignore_then(ex.star_targets.clone())
        .then_ignore(kw("in"))
        .then(ex.star_expressions.clone())
        .then(suite.clone())
        .then(else_clause)
        .map(|(((target, iter), body), orelse)| Stmt::For {
            is_async: false,
            target,
            iter,
            body,
            orelse: orelse.unwrap_or_default(),
        });

    let loops = kw("async")
        .or_not()
        .then(for_stmt.or(with_statement(ex, suite.clone())))
        .map(|(is_async, stmt)| match is_async {
            Some(()) => mark_async(stmt),
            None => stmt,
        });

    choice((
        if_stmt,
        while_stmt,
        try_statement(ex, suite.clone()),
        match_statement(ex, suite.clone()),
        definition(ex, suite),
        loops,
    ))
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bdiff::ast::{Constant, Param};
    use crate::bdiff::lexing::tokenize;
    use crate::bdiff::parsing::parse_module;

    fn parse(source: &str) -> Vec<Stmt> {
        parse_module(&tokenize(source).unwrap()).unwrap().body
    }

    #[test]
    fn test_semicolons_split_statements() {
        assert_eq!(parse("a = 1; b = 2;\n").len(), 2);
    }

    #[test]
    fn test_elif_chain_nests() {
        let body = parse("if a:\n    x\nelif b:\n    y\nelse:\n    z\n");
        let Stmt::If { orelse, .. } = &body[0] else {
            panic!("expected if");
        };
        assert!(matches!(&orelse[..], [Stmt::If { orelse, .. }] if orelse.len() == 1));
    }

    #[test]
    fn test_function_definition() {
        let body = parse("@dec\nasync def f(a, /, b: int = 1, *, c, **kw) -> str:\n    return a\n");
        let Stmt::FunctionDef(def) = &body[0] else {
            panic!("expected def");
        };
        assert!(def.is_async);
        assert_eq!(def.decorators, vec![Expr::name("dec")]);
        assert_eq!(def.params.len(), 6);
        assert_eq!(def.params[1], Param::PositionalOnly);
        assert!(def.returns.is_some());
    }

    #[test]
    fn test_one_line_body() {
        let body = parse("class A: pass\n");
        assert!(matches!(&body[0], Stmt::ClassDef(def) if def.body == vec![Stmt::Pass]));
    }

    #[test]
    fn test_assignment_forms() {
        let body = parse("a = b = 1\nx: int = 2\ny += 3\nz, *w = v\n");
        assert!(matches!(&body[0], Stmt::Assign { targets, .. } if targets.len() == 2));
        assert!(matches!(&body[1], Stmt::AnnAssign { value: Some(_), .. }));
        assert!(matches!(&body[2], Stmt::AugAssign { op: BinOp::Add, .. }));
        assert!(matches!(&body[3], Stmt::Assign { targets, .. } if matches!(targets[0], Expr::Tuple(_))));
    }

    #[test]
    fn test_imports() {
        let body = parse("import os.path as p, sys\nfrom .. import (a, b as c,)\nfrom x import *\n");
        assert!(matches!(&body[0], Stmt::Import(names) if names.len() == 2));
        assert!(matches!(&body[1], Stmt::ImportFrom { level: 2, module: None, names } if names.len() == 2));
        assert!(matches!(&body[2], Stmt::ImportFrom { level: 0, .. }));
    }

    #[test]
    fn test_try_statement() {
        let body = parse(
            "try:\n    x\nexcept (A, B) as e:\n    y\nexcept:\n    z\nelse:\n    w\nfinally:\n    v\n",
        );
        let Stmt::Try {
            handlers,
            orelse,
            finalbody,
            is_star,
            ..
        } = &body[0]
        else {
            panic!("expected try");
        };
        assert_eq!(handlers.len(), 2);
        assert_eq!(handlers[0].name.as_deref(), Some("e"));
        assert_eq!(orelse.len(), 1);
        assert_eq!(finalbody.len(), 1);
        assert!(!is_star);
    }

    #[test]
    fn test_try_without_handlers_is_an_error() {
        assert!(parse_module(&tokenize("try:\n    x\n").unwrap()).is_err());
    }

    #[test]
    fn test_loops_and_with() {
        let body = parse(
            "for i, j in pairs:\n    pass\nelse:\n    done()\nasync with a as b, c:\n    pass\nwhile x:\n    break\n",
        );
        assert!(matches!(&body[0], Stmt::For { orelse, .. } if orelse.len() == 1));
        assert!(matches!(&body[1], Stmt::With { is_async: true, items, .. } if items.len() == 2));
        assert!(matches!(&body[2], Stmt::While { .. }));
    }

    #[test]
    fn test_nested_blocks() {
        let body = parse("def f():\n    if x:\n        return 1\n    return 2\n");
        let Stmt::FunctionDef(def) = &body[0] else {
            panic!("expected def");
        };
        assert_eq!(def.body.len(), 2);
        assert_eq!(
            def.body[1],
            Stmt::Return(Some(Expr::Constant(Constant::Int("2".into()))))
        );
    }

    #[test]
    fn test_match_statement() {
        let body = parse("match command.split():\n    case [action]:\n        go(action)\n    case _:\n        pass\n");
        let Stmt::Match { subject, cases } = &body[0] else {
            panic!("expected match");
        };
        assert!(matches!(subject, Expr::Call { .. }));
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].body.len(), 1);
    }

    #[test]
    fn test_match_subject_tuple() {
        let body = parse("match a, *b:\n    case _:\n        pass\n");
        assert!(matches!(&body[0], Stmt::Match { subject: Expr::Tuple(items), .. } if items.len() == 2));
    }

    #[test]
    fn test_soft_keywords_remain_names() {
        let body = parse("match = 1\nmatch(x)\ntype = int\ncase = type(x)\nprint(match, case)\n");
        assert_eq!(body.len(), 5);
        assert!(matches!(&body[0], Stmt::Assign { .. }));
        assert!(matches!(&body[1], Stmt::Expr(Expr::Call { .. })));
        assert!(matches!(&body[2], Stmt::Assign { .. }));
    }

    #[test]
    fn test_type_alias() {
        let body = parse("type Pair[T: int, *Ts, **P] = tuple[T, T]\ntype X = int\n");
        let Stmt::TypeAlias {
            name, type_params, ..
        } = &body[0]
        else {
            panic!("expected type alias");
        };
        assert_eq!(name, "Pair");
        assert_eq!(type_params.len(), 3);
        assert!(matches!(&type_params[0], TypeParam::TypeVar { bound: Some(_), .. }));
        assert_eq!(type_params[1], TypeParam::TypeVarTuple("Ts".into()));
        assert_eq!(type_params[2], TypeParam::ParamSpec("P".into()));
        assert!(matches!(&body[1], Stmt::TypeAlias { type_params, .. } if type_params.is_empty()));
    }

    #[test]
    fn test_generic_definitions() {
        let body = parse("def first[T](xs: list[T]) -> T:\n    return xs[0]\nclass Box[T](Base):\n    pass\n");
        assert!(matches!(&body[0], Stmt::FunctionDef(def) if def.type_params.len() == 1));
        assert!(matches!(&body[1], Stmt::ClassDef(def) if def.type_params.len() == 1 && def.arguments.len() == 1));
    }
}
