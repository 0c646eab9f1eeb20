//! Canonical Python printer
//!
//! Prints a [`Module`] back to source text in one fixed style, so that two trees print the
//! same text exactly when they have the same shape:
//!
//!     - four-space indentation, one statement per line, single spaces around operators
//!     - parentheses only where precedence requires them; tuples always parenthesized
//!       except as subscripts
//!     - string and bytes literals in `repr` style: single quotes unless the value contains
//!       a single quote and no double quote
//!     - f-strings with their fields printed as expressions, quoted around what the fields
//!       contain
//!     - sequence patterns in brackets
//!     - integers in decimal, floats in shortest round-trip form
//!     - an `else` holding a single `if` printed as `elif`
//!     - `class C:` without empty parentheses, `pass` for an empty body
//!
//! The printer never fails. Any tree the parser produces prints to source that parses back
//! into the same tree.

use crate::bdiff::ast::{
    Alias, Argument, BinOp, BoolOp, ClassDef, CmpOp, Comprehension, Constant, DictEntry,
    ExceptHandler, Expr, FStringPart, FunctionDef, MatchCase, Module, Param, Pattern, Stmt,
    TypeParam, UnaryOp, WithItem,
};
use crate::bdiff::literals::PyStr;

const INDENT: &str = "    ";

/// Binding strength, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    NamedExpr,
    Tuple,
    Yield,
    Test,
    Or,
    And,
    Not,
    Cmp,
    BitOr,
    BitXor,
    BitAnd,
    Shift,
    Arith,
    Term,
    Factor,
    Power,
    Await,
    Atom,
}

impl Precedence {
    fn next(self) -> Self {
        use Precedence::*;
        match self {
            NamedExpr => Tuple,
            Tuple => Yield,
            Yield => Test,
            Test => Or,
            Or => And,
            And => Not,
            Not => Cmp,
            Cmp => BitOr,
            BitOr => BitXor,
            BitXor => BitAnd,
            BitAnd => Shift,
            Shift => Arith,
            Arith => Term,
            Term => Factor,
            Factor => Power,
            Power => Await,
            Await | Atom => Atom,
        }
    }

    fn of_binop(op: BinOp) -> Self {
        match op {
            BinOp::BitOr => Precedence::BitOr,
            BinOp::BitXor => Precedence::BitXor,
            BinOp::BitAnd => Precedence::BitAnd,
            BinOp::LShift | BinOp::RShift => Precedence::Shift,
            BinOp::Add | BinOp::Sub => Precedence::Arith,
            BinOp::Mult | BinOp::MatMult | BinOp::Div | BinOp::Mod | BinOp::FloorDiv => {
                Precedence::Term
            }
            BinOp::Pow => Precedence::Power,
        }
    }

    fn of(expr: &Expr) -> Self {
        match expr {
            Expr::NamedExpr { .. } => Precedence::NamedExpr,
            Expr::Yield(_) | Expr::YieldFrom(_) => Precedence::Yield,
            Expr::Lambda { .. } | Expr::IfExp { .. } => Precedence::Test,
            Expr::BoolOp { op: BoolOp::Or, .. } => Precedence::Or,
            Expr::BoolOp { op: BoolOp::And, .. } => Precedence::And,
            Expr::UnaryOp {
                op: UnaryOp::Not, ..
            } => Precedence::Not,
            Expr::UnaryOp { .. } => Precedence::Factor,
            Expr::Compare { .. } => Precedence::Cmp,
            Expr::BinOp { op, .. } => Precedence::of_binop(*op),
            Expr::Await(_) => Precedence::Await,
            _ => Precedence::Atom,
        }
    }
}

/// Print a module in canonical form. Every statement line ends with `\n`.
pub fn unparse(module: &Module) -> String {
    let mut printer = Printer::default();
    printer.statements(&module.body);
    printer.out
}

#[derive(Default)]
struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    /// Write one line at the current depth.
    fn line(&mut self, f: impl FnOnce(&mut Self)) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        f(self);
        self.out.push('\n');
    }

    fn separated<T>(&mut self, items: &[T], separator: &str, mut f: impl FnMut(&mut Self, &T)) {
        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                self.write(separator);
            }
            f(self, item);
        }
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn statements(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.statement(stmt);
        }
    }

    fn block(&mut self, body: &[Stmt]) {
        self.depth += 1;
        if body.is_empty() {
            self.line(|p| p.write("pass"));
        } else {
            self.statements(body);
        }
        self.depth -= 1;
    }

    fn clause(&mut self, keyword: &str, body: &[Stmt]) {
        self.line(|p| {
            p.write(keyword);
            p.write(":");
        });
        self.block(body);
    }

    fn else_clause(&mut self, orelse: &[Stmt]) {
        if !orelse.is_empty() {
            self.clause("else", orelse);
        }
    }

    fn statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::FunctionDef(def) => self.function(def),
            Stmt::ClassDef(def) => self.class(def),
            Stmt::Return(value) => self.line(|p| {
                p.write("return");
                if let Some(value) = value {
                    p.write(" ");
                    p.expr(value, Precedence::Test);
                }
            }),
            Stmt::Delete(targets) => self.line(|p| {
                p.write("del ");
                p.separated(targets, ", ", |p, t| p.expr(t, Precedence::Test));
            }),
            Stmt::Assign { targets, value } => self.line(|p| {
                for target in targets {
                    p.expr(target, Precedence::Tuple);
                    p.write(" = ");
                }
                p.expr(value, Precedence::Yield);
            }),
            Stmt::AugAssign { target, op, value } => self.line(|p| {
                p.expr(target, Precedence::Tuple);
                p.write(" ");
                p.write(op.symbol());
                p.write("= ");
                p.expr(value, Precedence::Yield);
            }),
            Stmt::AnnAssign {
                target,
                annotation,
                value,
            } => self.line(|p| {
                p.expr(target, Precedence::Test);
                p.write(": ");
                p.expr(annotation, Precedence::Test);
                if let Some(value) = value {
                    p.write(" = ");
                    p.expr(value, Precedence::Yield);
                }
            }),
            Stmt::For {
                is_async,
                target,
                iter,
                body,
                orelse,
            } => {
                self.line(|p| {
                    if *is_async {
                        p.write("async ");
                    }
                    p.write("for ");
                    p.expr(target, Precedence::Tuple);
                    p.write(" in ");
                    p.expr(iter, Precedence::Tuple);
                    p.write(":");
                });
                self.block(body);
                self.else_clause(orelse);
            }
            Stmt::While { test, body, orelse } => {
                self.line(|p| {
                    p.write("while ");
                    p.expr(test, Precedence::NamedExpr);
                    p.write(":");
                });
                self.block(body);
                self.else_clause(orelse);
            }
            Stmt::If { test, body, orelse } => self.if_chain("if", test, body, orelse),
            Stmt::With {
                is_async,
                items,
                body,
            } => {
                self.line(|p| {
                    if *is_async {
                        p.write("async ");
                    }
                    p.write("with ");
                    p.separated(items, ", ", Printer::with_item);
                    p.write(":");
                });
                self.block(body);
            }
            Stmt::Raise { exc, cause } => self.line(|p| {
                p.write("raise");
                if let Some(exc) = exc {
                    p.write(" ");
                    p.expr(exc, Precedence::Test);
                }
                if let Some(cause) = cause {
                    p.write(" from ");
                    p.expr(cause, Precedence::Test);
                }
            }),
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
                is_star,
            } => {
                self.clause("try", body);
                for handler in handlers {
                    self.handler(handler, *is_star);
                }
                self.else_clause(orelse);
                if !finalbody.is_empty() {
                    self.clause("finally", finalbody);
                }
            }
            Stmt::Assert { test, msg } => self.line(|p| {
                p.write("assert ");
                p.expr(test, Precedence::Test);
                if let Some(msg) = msg {
                    p.write(", ");
                    p.expr(msg, Precedence::Test);
                }
            }),
            Stmt::Import(names) => self.line(|p| {
                p.write("import ");
                p.separated(names, ", ", Printer::alias);
            }),
            Stmt::ImportFrom {
                module,
                names,
                level,
            } => self.line(|p| {
                p.write("from ");
                p.write(&".".repeat(*level));
                if let Some(module) = module {
                    p.write(module);
                }
                p.write(" import ");
                p.separated(names, ", ", Printer::alias);
            }),
            Stmt::Global(names) => self.line(|p| {
                p.write("global ");
                p.write(&names.join(", "));
            }),
            Stmt::Nonlocal(names) => self.line(|p| {
                p.write("nonlocal ");
                p.write(&names.join(", "));
            }),
            Stmt::Match { subject, cases } => {
                self.line(|p| {
                    p.write("match ");
                    p.expr(subject, Precedence::NamedExpr);
                    p.write(":");
                });
                self.depth += 1;
                for case in cases {
                    self.match_case(case);
                }
                self.depth -= 1;
            }
            Stmt::TypeAlias {
                name,
                type_params,
                value,
            } => self.line(|p| {
                p.write("type ");
                p.write(name);
                p.type_params(type_params);
                p.write(" = ");
                p.expr(value, Precedence::Test);
            }),
            Stmt::Expr(value) => self.line(|p| p.expr(value, Precedence::Yield)),
            Stmt::Pass => self.line(|p| p.write("pass")),
            Stmt::Break => self.line(|p| p.write("break")),
            Stmt::Continue => self.line(|p| p.write("continue")),
        }
    }

    fn if_chain(&mut self, keyword: &str, test: &Expr, body: &[Stmt], orelse: &[Stmt]) {
        self.line(|p| {
            p.write(keyword);
            p.write(" ");
            p.expr(test, Precedence::NamedExpr);
            p.write(":");
        });
        self.block(body);
        match orelse {
            [] => {}
            [Stmt::If { test, body, orelse }] => self.if_chain("elif", test, body, orelse),
            _ => self.clause("else", orelse),
        }
    }

    fn decorators(&mut self, decorators: &[Expr]) {
        for decorator in decorators {
            self.line(|p| {
                p.write("@");
                p.expr(decorator, Precedence::Test);
            });
        }
    }

    fn function(&mut self, def: &FunctionDef) {
        self.decorators(&def.decorators);
        self.line(|p| {
            if def.is_async {
                p.write("async ");
            }
            p.write("def ");
            p.write(&def.name);
            p.type_params(&def.type_params);
            p.write("(");
            p.params(&def.params);
            p.write(")");
            if let Some(returns) = &def.returns {
                p.write(" -> ");
                p.expr(returns, Precedence::Test);
            }
            p.write(":");
        });
        self.block(&def.body);
    }

    fn class(&mut self, def: &ClassDef) {
        self.decorators(&def.decorators);
        self.line(|p| {
            p.write("class ");
            p.write(&def.name);
            p.type_params(&def.type_params);
            if !def.arguments.is_empty() {
                p.write("(");
                p.arguments(&def.arguments);
                p.write(")");
            }
            p.write(":");
        });
        self.block(&def.body);
    }

    fn type_params(&mut self, params: &[TypeParam]) {
        if params.is_empty() {
            return;
        }
        self.write("[");
        self.separated(params, ", ", |p, param| match param {
            TypeParam::TypeVar { name, bound } => {
                p.write(name);
                if let Some(bound) = bound {
                    p.write(": ");
                    p.expr(bound, Precedence::Test);
                }
            }
            TypeParam::TypeVarTuple(name) => {
                p.write("*");
                p.write(name);
            }
            TypeParam::ParamSpec(name) => {
                p.write("**");
                p.write(name);
            }
        });
        self.write("]");
    }

    fn match_case(&mut self, case: &MatchCase) {
        self.line(|p| {
            p.write("case ");
            p.pattern(&case.pattern);
            if let Some(guard) = &case.guard {
                p.write(" if ");
                p.expr(guard, Precedence::NamedExpr);
            }
            p.write(":");
        });
        self.block(&case.body);
    }

    fn pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Value(value) => self.expr(value, Precedence::Arith),
            Pattern::Singleton(value) => self.constant(value),
            Pattern::Sequence(items) => {
                self.write("[");
                self.separated(items, ", ", Printer::pattern);
                self.write("]");
            }
            Pattern::Mapping {
                keys,
                patterns,
                rest,
            } => {
                self.write("{");
                for (index, (key, value)) in keys.iter().zip(patterns).enumerate() {
                    if index > 0 {
                        self.write(", ");
                    }
                    self.expr(key, Precedence::Arith);
                    self.write(": ");
                    self.pattern(value);
                }
                if let Some(rest) = rest {
                    if !keys.is_empty() {
                        self.write(", ");
                    }
                    self.write("**");
                    self.write(rest);
                }
                self.write("}");
            }
            Pattern::Class {
                cls,
                patterns,
                kwd_attrs,
                kwd_patterns,
            } => {
                self.expr(cls, Precedence::Atom);
                self.write("(");
                self.separated(patterns, ", ", Printer::pattern);
                for (index, (attr, value)) in kwd_attrs.iter().zip(kwd_patterns).enumerate() {
                    if index > 0 || !patterns.is_empty() {
                        self.write(", ");
                    }
                    self.write(attr);
                    self.write("=");
                    self.pattern(value);
                }
                self.write(")");
            }
            Pattern::Star(name) => {
                self.write("*");
                self.write(name.as_deref().unwrap_or("_"));
            }
            Pattern::As {
                pattern: None,
                name,
            } => self.write(name.as_deref().unwrap_or("_")),
            Pattern::As {
                pattern: Some(inner),
                name,
            } => {
                self.grouped_pattern(inner, false);
                self.write(" as ");
                self.write(name.as_deref().unwrap_or("_"));
            }
            Pattern::Or(alternatives) => {
                self.separated(alternatives, " | ", |p, alternative| {
                    p.grouped_pattern(alternative, true)
                });
            }
        }
    }

    /// A pattern where only `|` alternatives (or, inside `|`, only closed patterns) may stand
    /// without parentheses.
    fn grouped_pattern(&mut self, pattern: &Pattern, in_alternative: bool) {
        let parenthesize = match pattern {
            Pattern::As {
                pattern: Some(_), ..
            } => true,
            Pattern::Or(_) => in_alternative,
            _ => false,
        };
        if parenthesize {
            self.write("(");
        }
        self.pattern(pattern);
        if parenthesize {
            self.write(")");
        }
    }

    fn handler(&mut self, handler: &ExceptHandler, is_star: bool) {
        self.line(|p| {
            p.write(if is_star { "except*" } else { "except" });
            if let Some(kind) = &handler.kind {
                p.write(" ");
                p.expr(kind, Precedence::Test);
                if let Some(name) = &handler.name {
                    p.write(" as ");
                    p.write(name);
                }
            }
            p.write(":");
        });
        self.block(&handler.body);
    }

    fn with_item(&mut self, item: &WithItem) {
        self.expr(&item.context, Precedence::Test);
        if let Some(vars) = &item.vars {
            self.write(" as ");
            self.expr(vars, Precedence::Tuple);
        }
    }

    fn alias(&mut self, alias: &Alias) {
        self.write(&alias.name);
        if let Some(asname) = &alias.asname {
            self.write(" as ");
            self.write(asname);
        }
    }

    fn params(&mut self, params: &[Param]) {
        self.separated(params, ", ", |p, param| match param {
            Param::Plain {
                name,
                annotation,
                default,
            } => {
                p.write(name);
                if let Some(annotation) = annotation {
                    p.write(": ");
                    p.expr(annotation, Precedence::Test);
                }
                if let Some(default) = default {
                    p.write(if annotation.is_some() { " = " } else { "=" });
                    p.expr(default, Precedence::Test);
                }
            }
            Param::PositionalOnly => p.write("/"),
            Param::KeywordOnly => p.write("*"),
            Param::VarArgs { name, annotation } | Param::KwArgs { name, annotation } => {
                p.write(if matches!(param, Param::VarArgs { .. }) { "*" } else { "**" });
                p.write(name);
                if let Some(annotation) = annotation {
                    p.write(": ");
                    p.expr(annotation, Precedence::Test);
                }
            }
        });
    }

    fn arguments(&mut self, args: &[Argument]) {
        self.separated(args, ", ", |p, arg| match arg {
            Argument::Positional(value) => p.expr(value, Precedence::Test),
            Argument::Keyword { name, value } => {
                p.write(name);
                p.write("=");
                p.expr(value, Precedence::Test);
            }
            Argument::Unpack(value) => {
                p.write("**");
                p.expr(value, Precedence::Test);
            }
        });
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn expr(&mut self, expr: &Expr, required: Precedence) {
        let parenthesize = Precedence::of(expr) < required;
        if parenthesize {
            self.write("(");
        }
        self.expr_unparenthesized(expr);
        if parenthesize {
            self.write(")");
        }
    }

    fn expr_unparenthesized(&mut self, expr: &Expr) {
        match expr {
            Expr::BoolOp { op, values } => {
                let (own, word) = match op {
                    BoolOp::And => (Precedence::And, " and "),
                    BoolOp::Or => (Precedence::Or, " or "),
                };
                self.separated(values, word, |p, v| p.expr(v, own.next()));
            }
            Expr::NamedExpr { target, value } => {
                self.expr(target, Precedence::Atom);
                self.write(" := ");
                self.expr(value, Precedence::Test);
            }
            Expr::BinOp { left, op, right } => {
                let own = Precedence::of_binop(*op);
                let (left_required, right_required) = match op {
                    BinOp::Pow => (Precedence::Await, Precedence::Factor),
                    _ => (own, own.next()),
                };
                self.expr(left, left_required);
                self.write(" ");
                self.write(op.symbol());
                self.write(" ");
                self.expr(right, right_required);
            }
            Expr::UnaryOp { op, operand } => {
                self.write(op.symbol());
                let required = match op {
                    UnaryOp::Not => Precedence::Not,
                    _ => Precedence::Factor,
                };
                self.expr(operand, required);
            }
            Expr::Lambda { params, body } => {
                self.write("lambda");
                if !params.is_empty() {
                    self.write(" ");
                    self.params(params);
                }
                self.write(": ");
                self.expr(body, Precedence::Test);
            }
            Expr::IfExp { test, body, orelse } => {
                self.expr(body, Precedence::Or);
                self.write(" if ");
                self.expr(test, Precedence::Or);
                self.write(" else ");
                self.expr(orelse, Precedence::Test);
            }
            Expr::Dict(entries) => {
                self.write("{");
                self.separated(entries, ", ", |p, entry| match entry {
                    DictEntry::Pair(key, value) => {
                        p.expr(key, Precedence::Test);
                        p.write(": ");
                        p.expr(value, Precedence::Test);
                    }
                    DictEntry::Unpack(value) => {
                        p.write("**");
                        p.expr(value, Precedence::BitOr);
                    }
                });
                self.write("}");
            }
            Expr::Set(items) if items.is_empty() => self.write("{*()}"),
            Expr::Set(items) => {
                self.write("{");
                self.separated(items, ", ", |p, item| p.expr(item, Precedence::Test));
                self.write("}");
            }
            Expr::ListComp { elt, generators } => {
                self.write("[");
                self.comprehension(elt, generators);
                self.write("]");
            }
            Expr::SetComp { elt, generators } => {
                self.write("{");
                self.comprehension(elt, generators);
                self.write("}");
            }
            Expr::DictComp {
                key,
                value,
                generators,
            } => {
                self.write("{");
                self.expr(key, Precedence::Test);
                self.write(": ");
                self.expr(value, Precedence::Test);
                self.generators(generators);
                self.write("}");
            }
            Expr::GeneratorExp { elt, generators } => {
                self.write("(");
                self.comprehension(elt, generators);
                self.write(")");
            }
            Expr::Await(value) => {
                self.write("await ");
                self.expr(value, Precedence::Atom);
            }
            Expr::Yield(value) => {
                self.write("yield");
                if let Some(value) = value {
                    self.write(" ");
                    self.expr(value, Precedence::Test);
                }
            }
            Expr::YieldFrom(value) => {
                self.write("yield from ");
                self.expr(value, Precedence::Test);
            }
            Expr::Compare {
                left,
                ops,
                comparators,
            } => {
                self.expr(left, Precedence::BitOr);
                for (op, comparator) in ops.iter().zip(comparators) {
                    self.write(" ");
                    self.write(CmpOp::symbol(*op));
                    self.write(" ");
                    self.expr(comparator, Precedence::BitOr);
                }
            }
            Expr::Call { func, args } => {
                self.expr(func, Precedence::Atom);
                self.write("(");
                match args.as_slice() {
                    [Argument::Positional(Expr::GeneratorExp { elt, generators })] => {
                        self.comprehension(elt, generators)
                    }
                    _ => self.arguments(args),
                }
                self.write(")");
            }
            Expr::Constant(value) => self.constant(value),
            Expr::JoinedStr(parts) => self.joined_str(parts),
            Expr::Attribute { value, attr } => {
                // `1.real` would lex as a float
                if matches!(**value, Expr::Constant(Constant::Int(_))) {
                    self.write("(");
                    self.expr(value, Precedence::Atom);
                    self.write(")");
                } else {
                    self.expr(value, Precedence::Atom);
                }
                self.write(".");
                self.write(attr);
            }
            Expr::Subscript { value, slice } => {
                self.expr(value, Precedence::Atom);
                self.write("[");
                match &**slice {
                    Expr::Tuple(items) if !items.is_empty() => {
                        self.separated(items, ", ", Printer::slice_item);
                        if items.len() == 1 {
                            self.write(",");
                        }
                    }
                    other => self.slice_item(other),
                }
                self.write("]");
            }
            Expr::Starred(value) => {
                self.write("*");
                self.expr(value, Precedence::BitOr);
            }
            Expr::Name(id) => self.write(id),
            Expr::List(items) => {
                self.write("[");
                self.separated(items, ", ", |p, item| p.expr(item, Precedence::Test));
                self.write("]");
            }
            Expr::Tuple(items) => {
                self.write("(");
                self.separated(items, ", ", |p, item| p.expr(item, Precedence::Test));
                if items.len() == 1 {
                    self.write(",");
                }
                self.write(")");
            }
            Expr::Slice { .. } => self.slice_item(expr),
        }
    }

    fn slice_item(&mut self, item: &Expr) {
        match item {
            Expr::Slice { lower, upper, step } => {
                if let Some(lower) = lower {
                    self.expr(lower, Precedence::Test);
                }
                self.write(":");
                if let Some(upper) = upper {
                    self.expr(upper, Precedence::Test);
                }
                if let Some(step) = step {
                    self.write(":");
                    self.expr(step, Precedence::Test);
                }
            }
            other => self.expr(other, Precedence::Test),
        }
    }

    fn comprehension(&mut self, elt: &Expr, generators: &[Comprehension]) {
        self.expr(elt, Precedence::Test);
        self.generators(generators);
    }

    fn generators(&mut self, generators: &[Comprehension]) {
        for generator in generators {
            self.write(if generator.is_async { " async for " } else { " for " });
            self.expr(&generator.target, Precedence::Tuple);
            self.write(" in ");
            self.expr(&generator.iter, Precedence::Or);
            for condition in &generator.ifs {
                self.write(" if ");
                self.expr(condition, Precedence::Or);
            }
        }
    }

    fn constant(&mut self, value: &Constant) {
        match value {
            Constant::None => self.write("None"),
            Constant::True => self.write("True"),
            Constant::False => self.write("False"),
            Constant::Ellipsis => self.write("..."),
            Constant::Int(text) | Constant::Float(text) | Constant::Imaginary(text) => {
                self.write(text)
            }
            Constant::Str(text) => self.write(&repr_str(text)),
            Constant::Bytes(bytes) => self.write(&repr_bytes(bytes)),
        }
    }

    fn joined_str(&mut self, parts: &[FStringPart]) {
        let mut fields = Vec::new();
        field_sources(parts, &mut fields);
        let quote = fstring_quote(&fields);
        self.write("f");
        self.write(quote);
        let body = fstring_body(parts, quote, false);
        self.write(&body);
        self.write(quote);
    }
}

fn is_printable(c: char) -> bool {
    c == ' ' || !(c.is_control() || c.is_whitespace())
}

/// Escape one code point of string text for a literal closed by `quote`.
fn push_escaped(out: &mut String, point: u32, quote: char) {
    match char::from_u32(point) {
        Some('\\') => out.push_str("\\\\"),
        Some('\n') => out.push_str("\\n"),
        Some('\r') => out.push_str("\\r"),
        Some('\t') => out.push_str("\\t"),
        Some(c) if c == quote => {
            out.push('\\');
            out.push(c);
        }
        Some(c) if is_printable(c) => out.push(c),
        _ if point < 0x100 => out.push_str(&format!("\\x{point:02x}")),
        _ if point < 0x10000 => out.push_str(&format!("\\u{point:04x}")),
        _ => out.push_str(&format!("\\U{point:08x}")),
    }
}

/// Python `repr` of a string.
pub fn repr_str(value: &PyStr) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for point in value.code_points() {
        push_escaped(&mut out, point, quote);
    }
    out.push(quote);
    out
}

fn field_source(value: &Expr) -> String {
    let mut printer = Printer::default();
    printer.expr(value, Precedence::Or);
    printer.out
}

fn field_sources(parts: &[FStringPart], into: &mut Vec<String>) {
    for part in parts {
        if let FStringPart::Field(field) = part {
            into.push(field_source(&field.value));
            if let Some(spec) = &field.format_spec {
                field_sources(spec, into);
            }
        }
    }
}

/// A field may not contain the quote that closes its f-string.
fn fstring_quote(fields: &[String]) -> &'static str {
    let single = fields.iter().any(|field| field.contains('\''));
    let double = fields.iter().any(|field| field.contains('"'));
    match (single, double) {
        (false, _) => "'",
        (true, false) => "\"",
        (true, true) if fields.iter().any(|field| field.contains("'''")) => "\"\"\"",
        (true, true) => "'''",
    }
}

fn fstring_body(parts: &[FStringPart], quote: &str, in_spec: bool) -> String {
    let quote_char = if quote.starts_with('"') { '"' } else { '\'' };
    let mut out = String::new();
    for part in parts {
        match part {
            FStringPart::Literal(text) => {
                for point in text.code_points() {
                    match char::from_u32(point) {
                        Some('{') if !in_spec => out.push_str("{{"),
                        Some('}') if !in_spec => out.push_str("}}"),
                        _ => push_escaped(&mut out, point, quote_char),
                    }
                }
            }
            FStringPart::Field(field) => {
                let source = field_source(&field.value);
                out.push('{');
                // `{{` would read as an escaped brace
                if source.starts_with('{') {
                    out.push(' ');
                }
                out.push_str(&source);
                if let Some(conversion) = field.conversion {
                    out.push('!');
                    out.push(conversion);
                }
                if let Some(spec) = &field.format_spec {
                    out.push(':');
                    out.push_str(&fstring_body(spec, quote, true));
                }
                out.push('}');
            }
        }
    }
    out
}

/// Python `repr` of a bytes value.
pub fn repr_bytes(value: &[u8]) -> String {
    let quote = if value.contains(&b'\'') && !value.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };
    let mut out = String::with_capacity(value.len() + 3);
    out.push('b');
    out.push(char::from(quote));
    for &byte in value {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b if b == quote => {
                out.push('\\');
                out.push(char::from(b));
            }
            0x20..=0x7e => out.push(char::from(byte)),
            _ => out.push_str(&format!("\\x{byte:02x}")),
        }
    }
    out.push(char::from(quote));
    out
}
