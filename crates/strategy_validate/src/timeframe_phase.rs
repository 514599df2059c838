//! Phase 5 (§4.1): timeframe-consistency / inheritance, walked in the
//! topological order phase 4 produced. A no-op if phase 4 found a cycle —
//! there is no order to walk (§7).

use crate::cache::ValidationCache;
use strategy_core::issue::{Issue, IssueCode, IssueContext};
use strategy_core::timeframe::Timeframe;

pub fn run(cache: &mut ValidationCache) -> Vec<Issue> {
    let mut issues = Vec::new();
    let order = cache.topo_order.clone();

    for node_id in &order {
        let mut sources: Vec<&str> = cache.bound_sources(node_id);
        sources.sort_unstable();
        sources.dedup();
        if sources.is_empty() {
            continue;
        }

        let mut distinct: Vec<Option<Timeframe>> = Vec::new();
        for src in &sources {
            let tf = cache.timeframes.get(*src).cloned().flatten();
            if !distinct.contains(&tf) {
                distinct.push(tf);
            }
        }
        // `distinct` already holds each distinct `Option<Timeframe>` value at
        // most once (by full equality), so the `Some(_)` entries are the
        // distinct resolved timeframes among this node's sources.
        let unique_present: Vec<&Timeframe> = distinct.iter().filter_map(|o| o.as_ref()).collect();
        let has_missing = distinct.iter().any(|o| o.is_none());

        if unique_present.len() > 1 {
            issues.push(Issue::new(
                IssueCode::TimeframeMismatch,
                IssueContext::UiNode { node_id: node_id.clone() },
                format!(
                    "node '{}' has inputs with differing timeframes: {}",
                    node_id,
                    unique_present.iter().map(|t| t.to_scalar()).collect::<Vec<_>>().join(", ")
                ),
            ));
            continue;
        }

        let explicit = cache.timeframes.get(node_id).cloned().flatten();
        match (&explicit, unique_present.first()) {
            (Some(own), Some(src)) => {
                if own != *src {
                    issues.push(Issue::new(
                        IssueCode::TimeframeMismatch,
                        IssueContext::UiNode { node_id: node_id.clone() },
                        format!(
                            "node '{}' declares timeframe {} but its source resolves to {}",
                            node_id, own, src
                        ),
                    ));
                }
            }
            (Some(own), None) if has_missing => {
                issues.push(Issue::new(
                    IssueCode::TimeframeMismatch,
                    IssueContext::UiNode { node_id: node_id.clone() },
                    format!("node '{}' declares timeframe {} but its source has none resolved", node_id, own),
                ));
            }
            (None, Some(src)) => {
                cache.timeframes.insert(node_id.clone(), Some((*src).clone()));
            }
            _ => {}
        }
    }

    issues
}
