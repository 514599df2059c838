//! Phase 1 (§4.1): per-node id/type checks, option checks (§4.3), and
//! connection checks, plus construction of the reverse-index cache entries.

use crate::cache::ValidationCache;
use std::collections::HashSet;
use strategy_core::issue::{Issue, IssueCode, IssueContext};
use strategy_core::metadata::{ComponentMetadata, ComponentRegistry};
use strategy_core::option_value::{parse_option, resolve_with_default, CoercionErrorKind};
use strategy_core::ui::{UiData, UiNode};

pub fn run(
    graph: &UiData,
    registry: &dyn ComponentRegistry,
    enforce_orphaned_node_check: bool,
    cache: &mut ValidationCache,
) -> Vec<Issue> {
    let mut issues = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for node in &graph.nodes {
        if node.id.is_empty() || !seen_ids.insert(node.id.clone()) {
            issues.push(Issue::new(
                IssueCode::InvalidNodeId,
                IssueContext::UiNode { node_id: node.id.clone() },
                format!("node id {:?} is empty or duplicated", node.id),
            ));
            continue;
        }

        let metadata = registry.lookup(&node.node_type).cloned();
        if metadata.is_none() {
            issues.push(Issue::new(
                IssueCode::UnknownNodeType,
                IssueContext::UiNode { node_id: node.id.clone() },
                format!("node '{}' has unknown component type '{}'", node.id, node.node_type),
            ));
            cache.metadata.insert(node.id.clone(), None);
            cache.timeframes.insert(node.id.clone(), node.timeframe.clone());
            continue;
        }
        let metadata = metadata.unwrap();

        issues.extend(option_checks(node, &metadata));
        issues.extend(connection_checks(node, &metadata, cache));

        if enforce_orphaned_node_check && !cache.touched.contains(&node.id) {
            issues.push(Issue::new(
                IssueCode::OrphanedNode,
                IssueContext::UiNode { node_id: node.id.clone() },
                format!("node '{}' has no incoming or outgoing edges", node.id),
            ));
        }

        cache.timeframes.insert(node.id.clone(), node.timeframe.clone());
        cache.metadata.insert(node.id.clone(), Some(metadata));
    }

    issues
}

fn option_checks(
    node: &UiNode,
    metadata: &ComponentMetadata,
) -> Vec<Issue> {
    let mut issues = Vec::new();
    let is_executor = metadata.is_executor();

    for declared in &metadata.options {
        let supplied = node.option(&declared.id);
        let raw = supplied.and_then(|o| o.value.as_ref());
        match resolve_with_default(raw, declared) {
            Err(e) if e.kind == CoercionErrorKind::MissingRequired => {
                issues.push(
                    Issue::new(
                        IssueCode::MissingRequiredOption,
                        IssueContext::OptionSpec { node_id: node.id.clone(), option_id: declared.id.clone() },
                        e.message,
                    )
                    .maybe_suggest(e.suggestion),
                );
            }
            Err(_) => unreachable!("resolve_with_default only fails with MissingRequired"),
            Ok(resolved) => {
                if let Err(e) = parse_option(resolved, declared, metadata) {
                    let code = match e.kind {
                        CoercionErrorKind::OutOfRange => IssueCode::OptionValueOutOfRange,
                        CoercionErrorKind::MissingRequired => IssueCode::MissingRequiredOption,
                        _ => IssueCode::InvalidOptionCombination,
                    };
                    issues.push(
                        Issue::new(
                            code,
                            IssueContext::OptionSpec { node_id: node.id.clone(), option_id: declared.id.clone() },
                            e.message,
                        )
                        .maybe_suggest(e.suggestion),
                    );
                }
            }
        }

        if let Some(supplied) = supplied {
            if supplied.exposed {
                if is_executor {
                    issues.push(Issue::new(
                        IssueCode::InvalidOptionCombination,
                        IssueContext::OptionSpec { node_id: node.id.clone(), option_id: declared.id.clone() },
                        format!("executor node '{}' cannot expose option '{}'", node.id, declared.id),
                    ));
                } else if supplied.display_name.as_deref().unwrap_or("").is_empty() {
                    issues.push(Issue::new(
                        IssueCode::InvalidOptionCombination,
                        IssueContext::OptionSpec { node_id: node.id.clone(), option_id: declared.id.clone() },
                        format!("exposed option '{}' on node '{}' needs a display name", declared.id, node.id),
                    ));
                }
            }
        }
    }

    let declared_ids: HashSet<&str> = metadata.options.iter().map(|o| o.id.as_str()).collect();
    for supplied in &node.options {
        if !declared_ids.contains(supplied.id.as_str()) {
            issues.push(Issue::new(
                IssueCode::InvalidOptionCombination,
                IssueContext::OptionSpec { node_id: node.id.clone(), option_id: supplied.id.clone() },
                format!("node '{}' supplies unknown option '{}'", node.id, supplied.id),
            ));
        }
    }

    issues
}

fn connection_checks(
    node: &UiNode,
    metadata: &ComponentMetadata,
    cache: &ValidationCache,
) -> Vec<Issue> {
    let mut issues = Vec::new();
    let bound = cache.input_refs.get(&node.id);
    let bound_handle_count = bound.map(|m| m.keys().filter(|h| !m[*h].is_empty()).count()).unwrap_or(0);
    let total_bound_edges: usize = bound.map(|m| m.values().map(|v| v.len()).sum()).unwrap_or(0);

    if metadata.at_least_one_input_required {
        if total_bound_edges == 0 {
            issues.push(Issue::new(
                IssueCode::MissingRequiredInput,
                IssueContext::UiNode { node_id: node.id.clone() },
                format!("node '{}' requires at least one bound input", node.id),
            ));
        }
    } else if metadata.inputs.len() != bound_handle_count {
        issues.push(Issue::new(
            IssueCode::InvalidNodeConnection,
            IssueContext::UiNode { node_id: node.id.clone() },
            format!(
                "node '{}' declares {} input(s) but {} are bound",
                node.id,
                metadata.inputs.len(),
                bound_handle_count
            ),
        ));
    }

    if let Some(handles) = bound {
        for input in &metadata.inputs {
            let wire_id = input.wire_id();
            if let Some(sources) = handles.get(&wire_id) {
                if sources.len() > 1 && !input.allow_multiple {
                    issues.push(Issue::new(
                        IssueCode::InvalidNodeConnection,
                        IssueContext::UiNode { node_id: node.id.clone() },
                        format!(
                            "handle '{}' on node '{}' does not allow multiple incoming edges",
                            wire_id, node.id
                        ),
                    ));
                }
            }
        }
    }

    issues
}
