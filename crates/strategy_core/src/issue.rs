//! The issue model (C13, §3.6): validation findings, batched rather than
//! short-circuited. Rendering/grouping lives in `strategy_report`; this
//! module only defines the shape.

use serde::{Deserialize, Serialize};

/// Fixed issue-code enumeration (§3.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IssueCode {
    UnknownNodeType,
    UnknownTransformType,
    InvalidEdge,
    TimeframeMismatch,
    CycleDetected,
    MissingExecutor,
    MultipleExecutors,
    MissingRequiredInput,
    MissingRequiredOption,
    InvalidOptionReference,
    InvalidNodeId,
    EmptyGraph,
    OrphanedNode,
    InvalidNodeConnection,
    MissingRequiredHandle,
    OptionValueOutOfRange,
    InvalidOptionCombination,
    NoPathToExecutor,
    SecurityViolation,
    ResourceLimitExceeded,
    CircularOptionReference,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::UnknownNodeType => "UnknownNodeType",
            IssueCode::UnknownTransformType => "UnknownTransformType",
            IssueCode::InvalidEdge => "InvalidEdge",
            IssueCode::TimeframeMismatch => "TimeframeMismatch",
            IssueCode::CycleDetected => "CycleDetected",
            IssueCode::MissingExecutor => "MissingExecutor",
            IssueCode::MultipleExecutors => "MultipleExecutors",
            IssueCode::MissingRequiredInput => "MissingRequiredInput",
            IssueCode::MissingRequiredOption => "MissingRequiredOption",
            IssueCode::InvalidOptionReference => "InvalidOptionReference",
            IssueCode::InvalidNodeId => "InvalidNodeId",
            IssueCode::EmptyGraph => "EmptyGraph",
            IssueCode::OrphanedNode => "OrphanedNode",
            IssueCode::InvalidNodeConnection => "InvalidNodeConnection",
            IssueCode::MissingRequiredHandle => "MissingRequiredHandle",
            IssueCode::OptionValueOutOfRange => "OptionValueOutOfRange",
            IssueCode::InvalidOptionCombination => "InvalidOptionCombination",
            IssueCode::NoPathToExecutor => "NoPathToExecutor",
            IssueCode::SecurityViolation => "SecurityViolation",
            IssueCode::ResourceLimitExceeded => "ResourceLimitExceeded",
            IssueCode::CircularOptionReference => "CircularOptionReference",
        }
    }
}

/// Where an issue occurred (§3.6): `context` is one of
/// `{empty, UiNode, UiEdge, UiGroup, UiAnnotation, OptionSpec, string}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueContext {
    Empty,
    UiNode { node_id: String },
    UiEdge { source_node_id: String, target_node_id: String },
    UiGroup { group_id: String },
    UiAnnotation { annotation_id: String },
    OptionSpec { node_id: String, option_id: String },
    Text(String),
}

impl Default for IssueContext {
    fn default() -> Self {
        IssueContext::Empty
    }
}

/// One validation finding (§3.6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub code: IssueCode,
    pub context: IssueContext,
    pub message: String,
    pub suggestion: Option<String>,
}

impl Issue {
    pub fn new(code: IssueCode, context: IssueContext, message: impl Into<String>) -> Self {
        Self { code, context, message: message.into(), suggestion: None }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn maybe_suggest(self, suggestion: Option<String>) -> Self {
        match suggestion {
            Some(s) => self.with_suggestion(s),
            None => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_names_round_trip_through_as_str() {
        for code in [
            IssueCode::UnknownNodeType,
            IssueCode::CircularOptionReference,
            IssueCode::CycleDetected,
        ] {
            assert!(!code.as_str().is_empty());
        }
    }
}
