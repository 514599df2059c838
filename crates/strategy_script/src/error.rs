//! Script-compilation errors (§7): the script compiler throws on the first
//! offending statement, carrying 1-based `line, col` from the AST node that
//! triggered it where one is available — line-accurate diagnostics matter
//! more here than batching, since scripts are source code.

use std::fmt;

use strategy_ast::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptError {
    pub line: u32,
    pub col: u32,
    pub message: String,
}

impl ScriptError {
    pub fn at(span: Span, message: impl Into<String>) -> Self {
        Self { line: span.line, col: span.col, message: message.into() }
    }

    /// For errors raised after the AST has already been lowered (cast
    /// insertion, the final executor split) where no single source position
    /// applies.
    pub fn general(message: impl Into<String>) -> Self {
        Self { line: 0, col: 0, message: message.into() }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 && self.col == 0 {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}:{}: {}", self.line, self.col, self.message)
        }
    }
}

impl std::error::Error for ScriptError {}
