//! Constructive builder API (§3.5 note: "a parser produces ... plus a
//! constructive builder API used by tests and by any embedder that
//! already has its own front end"). Every function here takes an explicit
//! `(line, col)` pair rather than defaulting one, so a caller that already
//! tracks source positions never loses them threading through this layer.

use crate::expr::{BinOpKind, BoolOpKind, CmpOp, Constant, Keyword, UnaryOpKind};
use crate::{Expr, Module, Span, Stmt};

pub fn name(id: impl Into<String>, line: u32, col: u32) -> Expr {
    Expr::Name { id: id.into(), span: Span::new(line, col) }
}

pub fn int(value: i64, line: u32, col: u32) -> Expr {
    Expr::Constant { value: Constant::Int(value), span: Span::new(line, col) }
}

pub fn float(value: f64, line: u32, col: u32) -> Expr {
    Expr::Constant { value: Constant::Float(value), span: Span::new(line, col) }
}

pub fn bool_lit(value: bool, line: u32, col: u32) -> Expr {
    Expr::Constant { value: Constant::Bool(value), span: Span::new(line, col) }
}

pub fn str_lit(value: impl Into<String>, line: u32, col: u32) -> Expr {
    Expr::Constant { value: Constant::Str(value.into()), span: Span::new(line, col) }
}

pub fn none_lit(line: u32, col: u32) -> Expr {
    Expr::Constant { value: Constant::None, span: Span::new(line, col) }
}

pub fn attribute(base: Expr, attr: impl Into<String>, line: u32, col: u32) -> Expr {
    Expr::Attribute { base: Box::new(base), attr: attr.into(), span: Span::new(line, col) }
}

pub fn keyword(name: impl Into<String>, value: Expr) -> Keyword {
    Keyword { name: name.into(), value }
}

pub fn call(func: Expr, args: Vec<Expr>, kwargs: Vec<Keyword>, line: u32, col: u32) -> Expr {
    Expr::Call { func: Box::new(func), args, kwargs, span: Span::new(line, col) }
}

pub fn bin_op(op: BinOpKind, left: Expr, right: Expr, line: u32, col: u32) -> Expr {
    Expr::BinOp { op, left: Box::new(left), right: Box::new(right), span: Span::new(line, col) }
}

pub fn compare(left: Expr, op: CmpOp, right: Expr, line: u32, col: u32) -> Expr {
    Expr::Compare { left: Box::new(left), op, right: Box::new(right), span: Span::new(line, col) }
}

pub fn bool_op(op: BoolOpKind, values: Vec<Expr>, line: u32, col: u32) -> Expr {
    Expr::BoolOp { op, values, span: Span::new(line, col) }
}

pub fn unary_op(op: UnaryOpKind, operand: Expr, line: u32, col: u32) -> Expr {
    Expr::UnaryOp { op, operand: Box::new(operand), span: Span::new(line, col) }
}

pub fn if_exp(test: Expr, body: Expr, orelse: Expr, line: u32, col: u32) -> Expr {
    Expr::IfExp {
        test: Box::new(test),
        body: Box::new(body),
        orelse: Box::new(orelse),
        span: Span::new(line, col),
    }
}

pub fn subscript(value: Expr, slice: Expr, line: u32, col: u32) -> Expr {
    Expr::Subscript { value: Box::new(value), slice: Box::new(slice), span: Span::new(line, col) }
}

pub fn list(elements: Vec<Expr>, line: u32, col: u32) -> Expr {
    Expr::List { elements, span: Span::new(line, col) }
}

pub fn tuple(elements: Vec<Expr>, line: u32, col: u32) -> Expr {
    Expr::Tuple { elements, span: Span::new(line, col) }
}

pub fn assign(targets: Vec<Expr>, value: Expr, line: u32, col: u32) -> Stmt {
    Stmt::Assign { targets, value, span: Span::new(line, col) }
}

pub fn expr_stmt(value: Expr, line: u32, col: u32) -> Stmt {
    Stmt::ExprStmt { value, span: Span::new(line, col) }
}

/// Accumulates statements in source order, mirroring the fluent-builder
/// shape used elsewhere in this workspace for multi-field records.
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    body: Vec<Stmt>,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statement(mut self, stmt: Stmt) -> Self {
        self.body.push(stmt);
        self
    }

    pub fn build(self) -> Module {
        Module::new(self.body)
    }
}
