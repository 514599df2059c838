//! Phase 3 (§4.1): executor presence/uniqueness.

use strategy_core::issue::{Issue, IssueCode, IssueContext};
use strategy_core::ui::UiData;

const EXECUTOR_TYPE: &str = "trade_signal_executor";

/// Gated entirely by `enforce_executor_presence` — when disabled, an
/// embedder compiling a sub-graph (no executor yet) shouldn't be penalized.
pub fn run(graph: &UiData, enforce_executor_presence: bool) -> Vec<Issue> {
    if !enforce_executor_presence {
        return Vec::new();
    }

    let executors: Vec<&str> = graph
        .nodes
        .iter()
        .filter(|n| n.node_type == EXECUTOR_TYPE)
        .map(|n| n.id.as_str())
        .collect();

    match executors.len() {
        0 => vec![Issue::new(
            IssueCode::MissingExecutor,
            IssueContext::Empty,
            "graph has no trade_signal_executor node",
        )],
        1 => Vec::new(),
        _ => vec![Issue::new(
            IssueCode::MultipleExecutors,
            IssueContext::Empty,
            format!("graph has {} trade_signal_executor nodes: {}", executors.len(), executors.join(", ")),
        )],
    }
}
