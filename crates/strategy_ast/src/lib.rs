//! strategy_ast — the AST shapes (§3.5) a front end hands the
//! script-compilation pipeline.
//!
//! This crate defines *data*, not *parsing*: the tree-sitter front end and
//! its backtick/mismatched-quote preprocessing (§4.4) are an external
//! collaborator's concern and are not reproduced here. What lives here is
//! the node shapes the rest of the pipeline walks, plus a constructive
//! builder module for embedders that already have their own front end and
//! for tests that need to hand-assemble a small program.

pub mod expr;
pub mod stmt;
pub mod module;
pub mod builder;

pub use expr::{BinOpKind, BoolOpKind, CmpOp, Constant, Expr, Keyword, UnaryOpKind};
pub use module::Module;
pub use stmt::Stmt;

/// 1-based source position. Every AST node carries one (§3.5: "Every node
/// carries 1-based source line/column").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Span {
    pub line: u32,
    pub col: u32,
}

impl Span {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}
