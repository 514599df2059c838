//! strategy_report — the presentation half of C13 (§7's "user-visible
//! form"): turns a batch of `Issue`s into grouped, human-readable lines,
//! and renders `PartialTradeSignalMetaData` / issue lists as the JSON
//! shapes §6 describes. Every function here is a pure mapping over data
//! the caller already has in hand — no I/O, no recomputation, nothing
//! that could disagree with what the validator or compiler already
//! decided.

use std::collections::BTreeMap;

use strategy_core::ir::PartialTradeSignalMetaData;
use strategy_core::issue::{Issue, IssueCode};

/// One issue, formatted as `"[<Code>] <message> — <suggestion>"` (§7). The
/// `" — <suggestion>"` tail is omitted when there isn't one.
pub fn format_issue(issue: &Issue) -> String {
    match &issue.suggestion {
        Some(suggestion) => format!("[{}] {} — {}", issue.code.as_str(), issue.message, suggestion),
        None => format!("[{}] {}", issue.code.as_str(), issue.message),
    }
}

/// Format a batch of issues as one line per issue (§7), with repeated codes
/// grouped together: issues are stably bucketed by `code`, buckets ordered
/// by the position their first member appeared at, so a caller reading
/// top-to-bottom sees every `CycleDetected` together, then every
/// `InvalidEdge`, in whatever order those groups first showed up.
pub fn format_issues(issues: &[Issue]) -> String {
    group_by_code(issues)
        .into_iter()
        .flat_map(|(_, group)| group.into_iter().map(format_issue))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Group issues by code, preserving first-seen order both across groups and
/// within each group. Exposed separately from `format_issues` so a caller
/// that wants counts per code (e.g. a summary line) doesn't have to
/// re-derive the grouping itself.
pub fn group_by_code(issues: &[Issue]) -> Vec<(IssueCode, Vec<Issue>)> {
    let mut order: Vec<IssueCode> = Vec::new();
    let mut buckets: BTreeMap<IssueCode, Vec<Issue>> = BTreeMap::new();
    for issue in issues {
        if !buckets.contains_key(&issue.code) {
            order.push(issue.code);
        }
        buckets.entry(issue.code).or_default().push(issue.clone());
    }
    order.into_iter().map(|code| (code, buckets.remove(&code).unwrap())).collect()
}

/// A one-line summary (`"3 issue(s): 2 InvalidEdge, 1 CycleDetected"`),
/// handy above the grouped detail for a human skimming a large batch.
pub fn summarize(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return "0 issues".to_string();
    }
    let counts: Vec<String> = group_by_code(issues).into_iter().map(|(code, group)| format!("{} {}", group.len(), code.as_str())).collect();
    format!("{} issue(s): {}", issues.len(), counts.join(", "))
}

/// Render `PartialTradeSignalMetaData` as JSON with snake_case field names
/// (§6 "IR out"). The type's own `Serialize` impl already matches §3.4's
/// shape; this is a thin, named entry point so callers don't reach into
/// `serde_json` directly.
pub fn render_algorithm_json(metadata: &PartialTradeSignalMetaData) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(metadata)
}

/// Render a batch of issues as the JSON list shape §6 describes
/// (`{code, context, message, suggestion}` per entry).
pub fn render_issues_json(issues: &[Issue]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strategy_core::issue::IssueContext;

    fn issue(code: IssueCode, msg: &str) -> Issue {
        Issue::new(code, IssueContext::Empty, msg)
    }

    #[test]
    fn formats_a_single_issue_with_suggestion() {
        let i = issue(IssueCode::OptionValueOutOfRange, "option 'period' of node 'sma_0' is out of range")
            .with_suggestion("Change option 'period' of node 'sma_0' to a value between 1 and 10000. Suggested value: 14.");
        assert_eq!(
            format_issue(&i),
            "[OptionValueOutOfRange] option 'period' of node 'sma_0' is out of range — Change option 'period' of node 'sma_0' to a value between 1 and 10000. Suggested value: 14."
        );
    }

    #[test]
    fn formats_without_a_trailing_dash_when_no_suggestion() {
        let i = issue(IssueCode::MissingExecutor, "graph has no trade_signal_executor node");
        assert_eq!(format_issue(&i), "[MissingExecutor] graph has no trade_signal_executor node");
    }

    #[test]
    fn repeated_codes_are_grouped_together() {
        let issues = vec![
            issue(IssueCode::InvalidEdge, "edge 1"),
            issue(IssueCode::CycleDetected, "cycle 1"),
            issue(IssueCode::InvalidEdge, "edge 2"),
        ];
        let rendered = format_issues(&issues);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines, vec!["[InvalidEdge] edge 1", "[InvalidEdge] edge 2", "[CycleDetected] cycle 1"]);
    }

    #[test]
    fn summarize_counts_per_code() {
        let issues = vec![
            issue(IssueCode::InvalidEdge, "edge 1"),
            issue(IssueCode::InvalidEdge, "edge 2"),
            issue(IssueCode::CycleDetected, "cycle 1"),
        ];
        assert_eq!(summarize(&issues), "3 issue(s): 2 InvalidEdge, 1 CycleDetected");
    }

    #[test]
    fn empty_batch_summarizes_as_zero() {
        assert_eq!(summarize(&[]), "0 issues");
    }

    #[test]
    fn algorithm_json_round_trips_through_serde() {
        let meta = PartialTradeSignalMetaData {
            options: Vec::new(),
            algorithm: vec![strategy_core::ir::AlgorithmNode::new("n", "sma")],
            executor: strategy_core::ir::AlgorithmNode::new("e", "trade_signal_executor"),
        };
        let json = render_algorithm_json(&meta).unwrap();
        let parsed: PartialTradeSignalMetaData = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.algorithm.len(), 1);
        assert_eq!(parsed.executor.id, "e");
    }

    #[test]
    fn issues_json_is_a_list_of_tagged_objects() {
        let issues = vec![issue(IssueCode::EmptyGraph, "graph has no nodes")];
        let json = render_issues_json(&issues).unwrap();
        assert!(json.contains("\"code\""));
        assert!(json.contains("EmptyGraph"));
    }
}
