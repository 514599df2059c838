//! Statement nodes (§3.5).

use crate::{Expr, Span};
use serde::{Deserialize, Serialize};

/// Statement nodes. `Assign` carries a `Vec<Expr>` of targets even though
/// §4.5 only permits a single target at compile time — the AST shape stays
/// general; the "single target only" rule is an expression-compiler
/// invariant, not a parse-time restriction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Assign {
        targets: Vec<Expr>,
        value: Expr,
        span: Span,
    },
    ExprStmt {
        value: Expr,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Assign { span, .. } | Stmt::ExprStmt { span, .. } => *span,
        }
    }
}
