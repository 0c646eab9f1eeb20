//! Canonicalization: parse, drop documentation nodes, print
//!
//! The lexical stripper removes most docstrings while keeping the layout intact, but it works
//! on tokens and has to leave some in place (a body holding nothing but its docstring). The
//! structural pass here sees the tree and removes every documentation node: the first
//! statement of a module, class or function body when it is a bare string.
//!
//! The result of [canonicalize] depends only on the tree's shape, so sources that differ in
//! formatting, quoting, parenthesization or numeric spelling produce identical text.

use thiserror::Error;
use tracing::debug;

use crate::bdiff::ast::{ClassDef, ExceptHandler, FunctionDef, MatchCase, Module, Stmt};
use crate::bdiff::formats::unparse;
use crate::bdiff::lexing::{tokenize, LexError};
use crate::bdiff::parsing::{parse_module, ParseError};

/// Failure to bring source text into canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonicalError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Remove documentation nodes from a whole module.
pub fn remove_docstrings(module: Module) -> Module {
    Module {
        body: scope_body(module.body),
    }
}

/// The body of a module, class or function: its leading string statement is documentation.
fn scope_body(body: Vec<Stmt>) -> Vec<Stmt> {
    let skip = usize::from(body.first().is_some_and(Stmt::is_string_statement));
    body.into_iter().skip(skip).map(transform).collect()
}

/// The body of any other block: only nested scopes change.
fn block_body(body: Vec<Stmt>) -> Vec<Stmt> {
    body.into_iter().map(transform).collect()
}

fn transform(stmt: Stmt) -> Stmt {
    match stmt {
        Stmt::FunctionDef(def) => Stmt::FunctionDef(FunctionDef {
            body: scope_body(def.body),
            ..def
        }),
        Stmt::ClassDef(def) => Stmt::ClassDef(ClassDef {
            body: scope_body(def.body),
            ..def
        }),
        Stmt::For {
            is_async,
            target,
            iter,
            body,
            orelse,
        } => Stmt::For {
            is_async,
            target,
            iter,
            body: block_body(body),
            orelse: block_body(orelse),
        },
        Stmt::While { test, body, orelse } => Stmt::While {
            test,
            body: block_body(body),
            orelse: block_body(orelse),
        },
        Stmt::If { test, body, orelse } => Stmt::If {
            test,
            body: block_body(body),
            orelse: block_body(orelse),
        },
        Stmt::With {
            is_async,
            items,
            body,
        } => Stmt::With {
            is_async,
            items,
            body: block_body(body),
        },
        Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
            is_star,
        } => Stmt::Try {
            body: block_body(body),
            handlers: handlers
                .into_iter()
                .map(|handler| ExceptHandler {
                    body: block_body(handler.body),
                    ..handler
                })
                .collect(),
            orelse: block_body(orelse),
            finalbody: block_body(finalbody),
            is_star,
        },
        Stmt::Match { subject, cases } => Stmt::Match {
            subject,
            cases: cases
                .into_iter()
                .map(|case| MatchCase {
                    body: block_body(case.body),
                    ..case
                })
                .collect(),
        },
        other => other,
    }
}

/// Bring source text into canonical form.
///
/// The input is usually the output of the stripper, but any source works: comments never reach
/// the parser and documentation nodes are removed here.
pub fn canonicalize(source: &str) -> Result<String, CanonicalError> {
    let tokens = tokenize(source)?;
    let module = remove_docstrings(parse_module(&tokens)?);
    let canonical = unparse(&module);
    debug!(
        tokens = tokens.len(),
        statements = module.body.len(),
        "canonicalized source"
    );
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_class_and_function_docstrings_removed() {
        let source = "'''mod'''\nclass A:\n    'cls'\n    def f(self):\n        \"\"\"fn\"\"\"\n        return 1\n";
        assert_eq!(
            canonicalize(source).unwrap(),
            "class A:\n    def f(self):\n        return 1\n"
        );
    }

    #[test]
    fn test_sole_docstring_leaves_pass() {
        assert_eq!(
            canonicalize("def f():\n    'only docs'\n").unwrap(),
            "def f():\n    pass\n"
        );
    }

    #[test]
    fn test_strings_elsewhere_are_kept() {
        let source = "if x:\n    'kept'\ndef f():\n    y = 1\n    'also kept'\n";
        assert_eq!(
            canonicalize(source).unwrap(),
            "if x:\n    'kept'\ndef f():\n    y = 1\n    'also kept'\n"
        );
    }

    #[test]
    fn test_bytes_and_fstrings_are_not_documentation() {
        assert_eq!(canonicalize("b'data'\n").unwrap(), "b'data'\n");
        assert_eq!(canonicalize("f'{x}'\n").unwrap(), "f'{x}'\n");
    }

    #[test]
    fn test_nested_function_in_block() {
        let source = "if x:\n    def g():\n        'doc'\n        return 2\n";
        assert_eq!(
            canonicalize(source).unwrap(),
            "if x:\n    def g():\n        return 2\n"
        );
    }

    #[test]
    fn test_function_in_match_case() {
        let source = "match x:\n    case 1:\n        def g():\n            'doc'\n            return 2\n";
        assert_eq!(
            canonicalize(source).unwrap(),
            "match x:\n    case 1:\n        def g():\n            return 2\n"
        );
    }

    #[test]
    fn test_formatting_differences_vanish() {
        let a = canonicalize("x = ( 1+2 )  # sum\nprint( \"hi\" )\n").unwrap();
        let b = canonicalize("x = 1 + 2\nprint('hi')\n").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_errors_are_reported() {
        assert!(matches!(
            canonicalize("x = 'open\n"),
            Err(CanonicalError::Lex(_))
        ));
        let Err(CanonicalError::Parse(err)) = canonicalize("def f(:\n    pass\n") else {
            panic!("expected a parse error");
        };
        assert_eq!(err.position.line, 1);
    }
}
