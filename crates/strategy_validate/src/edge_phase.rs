//! Phase 2 (§4.1): per-edge structural and data-type checks.

use strategy_core::data_type::is_compatible;
use strategy_core::issue::{Issue, IssueCode, IssueContext};
use strategy_core::metadata::ComponentRegistry;
use strategy_core::ui::UiData;

pub fn run(graph: &UiData, registry: &dyn ComponentRegistry) -> Vec<Issue> {
    let mut issues = Vec::new();

    for edge in &graph.edges {
        let ctx = || IssueContext::UiEdge {
            source_node_id: edge.source.node_id.clone(),
            target_node_id: edge.target.node_id.clone(),
        };

        if edge.source.handle.is_empty() || edge.target.handle.is_empty() {
            issues.push(Issue::new(IssueCode::InvalidEdge, ctx(), "edge has an empty handle"));
            continue;
        }
        if edge.source.node_id == edge.target.node_id {
            issues.push(Issue::new(
                IssueCode::InvalidEdge,
                ctx(),
                format!("edge from '{}' to itself is a self-loop", edge.source.node_id),
            ));
            continue;
        }

        let source_node = graph.node(&edge.source.node_id);
        let target_node = graph.node(&edge.target.node_id);
        if source_node.is_none() || target_node.is_none() {
            issues.push(Issue::new(
                IssueCode::InvalidEdge,
                ctx(),
                "edge references a node id that does not exist in the graph",
            ));
            continue;
        }
        let (source_node, target_node) = (source_node.unwrap(), target_node.unwrap());

        let source_meta = registry.lookup(&source_node.node_type);
        let target_meta = registry.lookup(&target_node.node_type);
        let (source_meta, target_meta) = match (source_meta, target_meta) {
            (Some(s), Some(t)) => (s, t),
            // An unknown node type is already reported by the node phase;
            // an edge touching it can't be type-checked further.
            _ => continue,
        };

        let source_output = source_meta.output_by_wire_id(&edge.source.handle);
        let target_input = target_meta.input_by_wire_id(&edge.target.handle);

        let (Some(source_output), Some(target_input)) = (source_output, target_input) else {
            issues.push(Issue::new(
                IssueCode::InvalidEdge,
                ctx(),
                format!(
                    "edge handle '{}'/'{}' is not declared on its component",
                    edge.source.handle, edge.target.handle
                ),
            ));
            continue;
        };

        if !is_compatible(source_output.data_type, target_input.data_type) {
            issues.push(Issue::new(
                IssueCode::InvalidEdge,
                ctx(),
                format!(
                    "'{}#{}' has type {} but '{}#{}' expects {}",
                    edge.source.node_id,
                    edge.source.handle,
                    source_output.data_type,
                    edge.target.node_id,
                    edge.target.handle,
                    target_input.data_type
                ),
            ));
        }
    }

    issues
}
