//! strategy_validate — `validate_ui_data` (C3, §4.1): the five-phase
//! validator over a `UiData` graph.
//!
//! Phases run in a fixed order, each one populating the private
//! [`cache::ValidationCache`] the next one reads from, and none of them
//! short-circuits the others except where §7 says a later phase has
//! nothing to consume (the timeframe phase is a no-op once a cycle has
//! been reported, since there is no topological order to walk).

mod acyclic_phase;
mod cache;
mod edge_phase;
mod executor_phase;
mod node_phase;
mod timeframe_phase;

use cache::ValidationCache;
use strategy_core::issue::{Issue, IssueCode};
use strategy_core::metadata::ComponentRegistry;
use strategy_core::ui::{UiData, UiNode};

/// `validate_ui_data(graph, enforce_orphaned_node_check, enforce_executor_presence)`
/// (§4.1). On success, the nodes in topological order; on failure, every
/// issue found across all phases, batched.
pub fn validate_ui_data(
    graph: &UiData,
    registry: &dyn ComponentRegistry,
    enforce_orphaned_node_check: bool,
    enforce_executor_presence: bool,
) -> Result<Vec<UiNode>, Vec<Issue>> {
    log::debug!("validating UI graph: {} node(s), {} edge(s)", graph.nodes.len(), graph.edges.len());

    let mut cache = ValidationCache::new();
    let (input_refs, output_refs, touched) = cache::build_reverse_index(graph);
    cache.input_refs = input_refs;
    cache.output_refs = output_refs;
    cache.touched = touched;

    let mut issues = Vec::new();

    issues.extend(node_phase::run(graph, registry, enforce_orphaned_node_check, &mut cache));
    issues.extend(edge_phase::run(graph, registry));
    issues.extend(executor_phase::run(graph, enforce_executor_presence));

    let cycle_issues = acyclic_phase::run(graph, &mut cache);
    let has_cycle = cycle_issues.iter().any(|i| i.code == IssueCode::CycleDetected);
    let has_empty = cycle_issues.iter().any(|i| i.code == IssueCode::EmptyGraph);
    issues.extend(cycle_issues);

    if !has_cycle && !has_empty {
        issues.extend(timeframe_phase::run(&mut cache));
    }

    if !issues.is_empty() {
        log::debug!("validation found {} issue(s)", issues.len());
        return Err(issues);
    }

    let ordered = cache
        .topo_order
        .iter()
        .filter_map(|id| graph.node(id).cloned())
        .collect();
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strategy_core::data_type::DataType;
    use strategy_core::metadata::{ComponentMetadata, IOSpec, MapRegistry, OptionSpec};
    use strategy_core::metadata::OptionKind;
    use strategy_core::ui::{NodeMetadata, Position, UiEdge, UiVertex};

    fn registry() -> MapRegistry {
        MapRegistry::new([
            ComponentMetadata::new("sma")
                .with_options([OptionSpec::new("period", OptionKind::Integer).required().with_range(1.0, 10000.0)])
                .with_inputs([IOSpec::new("*", DataType::Decimal)])
                .with_outputs([IOSpec::new("result", DataType::Decimal)]),
            ComponentMetadata::new("trade_signal_executor")
                .with_inputs([IOSpec::new("signal", DataType::Boolean)])
                .at_least_one_input_required(),
        ])
    }

    fn node(id: &str, node_type: &str) -> UiNode {
        UiNode {
            id: id.to_string(),
            node_type: node_type.to_string(),
            options: Vec::new(),
            metadata: NodeMetadata { parent_id: None, position: Position { x: 0.0, y: 0.0 }, width: 10.0, height: 10.0 },
            timeframe: None,
        }
    }

    #[test]
    fn missing_executor_is_reported() {
        let mut n = node("n", "sma");
        n.options.push(strategy_core::ui::UiOption {
            id: "period".into(),
            value: Some(strategy_core::option_value::OptionValue::Number(20.0)),
            display_name: None,
            exposed: false,
        });
        let graph = UiData { nodes: vec![n], edges: vec![], groups: vec![], annotations: vec![] };
        let issues = validate_ui_data(&graph, &registry(), false, true).unwrap_err();
        assert!(issues.iter().any(|i| i.code == IssueCode::MissingExecutor));
    }

    #[test]
    fn cycle_is_detected() {
        let a = node("a", "sma");
        let b = node("b", "sma");
        let edges = vec![
            UiEdge {
                source: UiVertex { node_id: "a".into(), handle: "result".into() },
                target: UiVertex { node_id: "b".into(), handle: "SLOT".into() },
            },
            UiEdge {
                source: UiVertex { node_id: "b".into(), handle: "result".into() },
                target: UiVertex { node_id: "a".into(), handle: "SLOT".into() },
            },
        ];
        let graph = UiData { nodes: vec![a, b], edges, groups: vec![], annotations: vec![] };
        let issues = validate_ui_data(&graph, &registry(), false, false).unwrap_err();
        assert!(issues.iter().any(|i| i.code == IssueCode::CycleDetected));
    }

    #[test]
    fn empty_graph_is_reported() {
        let graph = UiData::default();
        let issues = validate_ui_data(&graph, &registry(), false, false).unwrap_err();
        assert!(issues.iter().any(|i| i.code == IssueCode::EmptyGraph));
    }
}
