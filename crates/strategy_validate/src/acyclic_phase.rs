//! Phase 4 (§4.1): acyclicity and topological sort, via the shared Kahn's
//! algorithm (C12).

use crate::cache::ValidationCache;
use strategy_core::issue::{Issue, IssueCode, IssueContext};
use strategy_core::toposort::kahn_topo_sort;
use strategy_core::ui::UiData;

pub fn run(graph: &UiData, cache: &mut ValidationCache) -> Vec<Issue> {
    if graph.nodes.is_empty() {
        return vec![Issue::new(IssueCode::EmptyGraph, IssueContext::Empty, "graph has no nodes")];
    }

    let ids: Vec<String> = graph.nodes.iter().map(|n| n.id.clone()).collect();
    match kahn_topo_sort(&ids, |id| cache.bound_sources(id).into_iter().map(String::from).collect()) {
        Ok(order) => {
            cache.topo_order = order;
            Vec::new()
        }
        Err(cycle) => {
            vec![Issue::new(
                IssueCode::CycleDetected,
                IssueContext::Text(cycle.remaining.join(", ")),
                format!("cycle detected among nodes: {}", cycle.remaining.join(", ")),
            )]
        }
    }
}
