//! Constant folder (C6, §4.4).
//!
//! Pass 1 scans top-level `Assign` statements whose right-hand side is
//! constant-shaped and records `name -> value`. Pass 2 walks every
//! statement and rewrites only the slice of a constant-shaped `Subscript`;
//! `Name` occurrences are otherwise left untouched, to avoid duplicating
//! literal nodes downstream.

use std::collections::HashMap;

use strategy_ast::{BinOpKind, BoolOpKind, CmpOp, Constant, Expr, Keyword, Module, Stmt, UnaryOpKind};

#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(v) => v as f64,
            Num::Float(v) => v,
        }
    }
}

fn as_number(c: &Constant) -> Option<Num> {
    match c {
        Constant::Int(v) => Some(Num::Int(*v)),
        Constant::Float(v) => Some(Num::Float(*v)),
        _ => None,
    }
}

/// Evaluate `expr` to a constant given the bindings folded so far. Returns
/// `None` when any part isn't foldable — including the explicit
/// division/modulo-by-zero silent-failure case (§4.4).
pub fn eval_constant(expr: &Expr, consts: &HashMap<String, Constant>) -> Option<Constant> {
    match expr {
        Expr::Constant { value, .. } => Some(value.clone()),
        Expr::Name { id, .. } => consts.get(id).cloned(),
        Expr::UnaryOp { op, operand, .. } => eval_unary(*op, eval_constant(operand, consts)?),
        Expr::BinOp { op, left, right, .. } => eval_binop(*op, eval_constant(left, consts)?, eval_constant(right, consts)?),
        Expr::Compare { left, op, right, .. } => eval_compare(*op, eval_constant(left, consts)?, eval_constant(right, consts)?),
        Expr::BoolOp { op, values, .. } => {
            let mut evaluated = Vec::with_capacity(values.len());
            for v in values {
                evaluated.push(eval_constant(v, consts)?);
            }
            eval_boolop(*op, evaluated)
        }
        _ => None,
    }
}

fn eval_unary(op: UnaryOpKind, v: Constant) -> Option<Constant> {
    match op {
        UnaryOpKind::Not => Some(Constant::Bool(!v.is_truthy())),
        UnaryOpKind::UAdd => match as_number(&v)? {
            Num::Int(i) => Some(Constant::Int(i)),
            Num::Float(f) => Some(Constant::Float(f)),
        },
        UnaryOpKind::USub => match as_number(&v)? {
            Num::Int(i) => Some(Constant::Int(i.checked_neg()?)),
            Num::Float(f) => Some(Constant::Float(-f)),
        },
    }
}

fn eval_binop(op: BinOpKind, l: Constant, r: Constant) -> Option<Constant> {
    let (ln, rn) = (as_number(&l)?, as_number(&r)?);
    // §4.4: int/int stays int for `+ - * %`; `/` always produces a real;
    // `%` on reals is IEEE fmod; division/modulo by zero silently fails
    // the fold (the expression is left as-is by the caller).
    if let (Num::Int(a), Num::Int(b)) = (ln, rn) {
        return match op {
            BinOpKind::Add => a.checked_add(b).map(Constant::Int),
            BinOpKind::Sub => a.checked_sub(b).map(Constant::Int),
            BinOpKind::Mul => a.checked_mul(b).map(Constant::Int),
            BinOpKind::Div => (b != 0).then(|| Constant::Float(a as f64 / b as f64)),
            BinOpKind::Mod => (b != 0).then(|| Constant::Int(a % b)),
        };
    }
    let (a, b) = (ln.as_f64(), rn.as_f64());
    match op {
        BinOpKind::Add => Some(Constant::Float(a + b)),
        BinOpKind::Sub => Some(Constant::Float(a - b)),
        BinOpKind::Mul => Some(Constant::Float(a * b)),
        BinOpKind::Div => (b != 0.0).then(|| Constant::Float(a / b)),
        BinOpKind::Mod => (b != 0.0).then(|| Constant::Float(a % b)),
    }
}

fn eval_compare(op: CmpOp, l: Constant, r: Constant) -> Option<Constant> {
    if matches!(op, CmpOp::Eq | CmpOp::NotEq) {
        let equal = match (&l, &r) {
            (Constant::Int(a), Constant::Int(b)) => a == b,
            (Constant::Float(a), Constant::Float(b)) => a == b,
            (Constant::Int(a), Constant::Float(b)) | (Constant::Float(b), Constant::Int(a)) => *a as f64 == *b,
            (Constant::Bool(a), Constant::Bool(b)) => a == b,
            (Constant::Str(a), Constant::Str(b)) => a == b,
            (Constant::None, Constant::None) => true,
            // equality across type tags is always false (§4.4)
            _ => false,
        };
        return Some(Constant::Bool(if op == CmpOp::Eq { equal } else { !equal }));
    }
    let (a, b) = (as_number(&l)?.as_f64(), as_number(&r)?.as_f64());
    let result = match op {
        CmpOp::Lt => a < b,
        CmpOp::Gt => a > b,
        CmpOp::Le => a <= b,
        CmpOp::Ge => a >= b,
        CmpOp::Eq | CmpOp::NotEq => unreachable!(),
    };
    Some(Constant::Bool(result))
}

/// Evaluates every operand (no short-circuiting — §9 open question) and
/// applies Python-style `and`/`or` chaining: `and` yields the first falsy
/// operand or the last one; `or` yields the first truthy operand or the
/// last one.
fn eval_boolop(op: BoolOpKind, values: Vec<Constant>) -> Option<Constant> {
    let mut iter = values.into_iter();
    let mut result = iter.next()?;
    for v in iter {
        result = match op {
            BoolOpKind::And => if result.is_truthy() { v } else { result },
            BoolOpKind::Or => if result.is_truthy() { result } else { v },
        };
    }
    Some(result)
}

/// Pass 1 (§4.4).
pub fn bind_top_level_constants(module: &Module) -> HashMap<String, Constant> {
    let mut consts = HashMap::new();
    for stmt in &module.body {
        if let Stmt::Assign { targets, value, .. } = stmt {
            if targets.len() != 1 {
                continue;
            }
            if let Expr::Name { id, .. } = &targets[0] {
                if value.is_constant_shaped() {
                    if let Some(v) = eval_constant(value, &consts) {
                        consts.insert(id.clone(), v);
                    }
                }
            }
        }
    }
    consts
}

/// Pass 2 (§4.4).
pub fn fold_subscripts(module: Module, consts: &HashMap<String, Constant>) -> Module {
    Module { body: module.body.into_iter().map(|s| fold_stmt(s, consts)).collect() }
}

fn fold_stmt(stmt: Stmt, consts: &HashMap<String, Constant>) -> Stmt {
    match stmt {
        Stmt::Assign { targets, value, span } => Stmt::Assign {
            targets: targets.into_iter().map(|t| fold_expr(t, consts)).collect(),
            value: fold_expr(value, consts),
            span,
        },
        Stmt::ExprStmt { value, span } => Stmt::ExprStmt { value: fold_expr(value, consts), span },
    }
}

fn fold_expr(expr: Expr, consts: &HashMap<String, Constant>) -> Expr {
    match expr {
        Expr::Subscript { value, slice, span } => {
            let folded_value = Box::new(fold_expr(*value, consts));
            if slice.is_constant_shaped() {
                if let Some(v) = eval_constant(&slice, consts) {
                    let slice_span = slice.span();
                    return Expr::Subscript { value: folded_value, slice: Box::new(Expr::Constant { value: v, span: slice_span }), span };
                }
            }
            Expr::Subscript { value: folded_value, slice: Box::new(fold_expr(*slice, consts)), span }
        }
        Expr::Attribute { base, attr, span } => Expr::Attribute { base: Box::new(fold_expr(*base, consts)), attr, span },
        Expr::Call { func, args, kwargs, span } => Expr::Call {
            func: Box::new(fold_expr(*func, consts)),
            args: args.into_iter().map(|a| fold_expr(a, consts)).collect(),
            kwargs: kwargs.into_iter().map(|k| Keyword { name: k.name, value: fold_expr(k.value, consts) }).collect(),
            span,
        },
        Expr::BinOp { op, left, right, span } => {
            Expr::BinOp { op, left: Box::new(fold_expr(*left, consts)), right: Box::new(fold_expr(*right, consts)), span }
        }
        Expr::Compare { left, op, right, span } => {
            Expr::Compare { left: Box::new(fold_expr(*left, consts)), op, right: Box::new(fold_expr(*right, consts)), span }
        }
        Expr::BoolOp { op, values, span } => Expr::BoolOp { op, values: values.into_iter().map(|v| fold_expr(v, consts)).collect(), span },
        Expr::UnaryOp { op, operand, span } => Expr::UnaryOp { op, operand: Box::new(fold_expr(*operand, consts)), span },
        Expr::IfExp { test, body, orelse, span } => Expr::IfExp {
            test: Box::new(fold_expr(*test, consts)),
            body: Box::new(fold_expr(*body, consts)),
            orelse: Box::new(fold_expr(*orelse, consts)),
            span,
        },
        Expr::List { elements, span } => Expr::List { elements: elements.into_iter().map(|e| fold_expr(e, consts)).collect(), span },
        Expr::Tuple { elements, span } => Expr::Tuple { elements: elements.into_iter().map(|e| fold_expr(e, consts)).collect(), span },
        other @ (Expr::Name { .. } | Expr::Constant { .. }) => other,
    }
}
