//! `compile_ui_data` (C4, §4.2): lowers a validated UI graph into
//! `PartialTradeSignalMetaData`. Preconditions: `sorted_nodes` is the
//! validator's output (topologically ordered); `full_graph` is the original
//! graph those nodes came from. Semantic errors are the validator's job —
//! this compiler only surfaces construction errors (a missing registry
//! entry, an option the metadata doesn't declare, more than one executor).

use std::collections::HashMap;

use strategy_core::handle::node_id_of;
use strategy_core::ir::{AlgorithmNode, PartialTradeSignalMetaData};
use strategy_core::metadata::{ComponentRegistry, OptionSpec};
use strategy_core::option_value::OptionValue;
use strategy_core::ui::{UiData, UiNode};
use thiserror::Error;

const EXECUTOR_TYPE: &str = "trade_signal_executor";

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("node '{node_id}' references unknown component '{component}'")]
    UnknownComponent { node_id: String, component: String },
    #[error("node '{node_id}' supplies option '{option_id}' that its component doesn't declare")]
    UnknownOption { node_id: String, option_id: String },
    #[error("node '{node_id}' exposes option '{option_id}' but is the trade signal executor")]
    ExposedOnExecutor { node_id: String, option_id: String },
    #[error("node '{node_id}' exposes option '{option_id}' without a display name")]
    MissingDisplayName { node_id: String, option_id: String },
    #[error("graph has no trade_signal_executor node")]
    MissingExecutor,
    #[error("graph has more than one trade_signal_executor node: {0}")]
    MultipleExecutors(String),
}

/// `compile_ui_data(sorted_nodes, full_graph)` (§4.2).
pub fn compile_ui_data(
    sorted_nodes: &[UiNode],
    full_graph: &UiData,
    registry: &dyn ComponentRegistry,
) -> Result<PartialTradeSignalMetaData, CompileError> {
    log::debug!("compiling {} node(s)", sorted_nodes.len());

    let mut hoisted = Vec::new();
    let mut nodes: HashMap<String, AlgorithmNode> = HashMap::with_capacity(sorted_nodes.len());
    let order: Vec<String> = sorted_nodes.iter().map(|n| n.id.clone()).collect();

    for ui_node in sorted_nodes {
        let metadata = registry.lookup(&ui_node.node_type).ok_or_else(|| CompileError::UnknownComponent {
            node_id: ui_node.id.clone(),
            component: ui_node.node_type.clone(),
        })?;

        let mut algorithm_node = AlgorithmNode::new(ui_node.id.clone(), ui_node.node_type.clone());
        algorithm_node.timeframe = ui_node.timeframe.clone();

        for ui_option in &ui_node.options {
            let declared = metadata.option(&ui_option.id).ok_or_else(|| CompileError::UnknownOption {
                node_id: ui_node.id.clone(),
                option_id: ui_option.id.clone(),
            })?;

            if ui_option.exposed {
                if metadata.is_executor() {
                    return Err(CompileError::ExposedOnExecutor {
                        node_id: ui_node.id.clone(),
                        option_id: ui_option.id.clone(),
                    });
                }
                let display_name = ui_option.display_name.clone().ok_or_else(|| CompileError::MissingDisplayName {
                    node_id: ui_node.id.clone(),
                    option_id: ui_option.id.clone(),
                })?;

                let hoisted_id = format!("{}#{}", ui_node.id, ui_option.id);
                hoisted.push(OptionSpec {
                    id: hoisted_id.clone(),
                    display_name,
                    kind: declared.kind,
                    required: declared.required,
                    default: ui_option.value.clone().or_else(|| declared.default.clone()),
                    min: declared.min,
                    max: declared.max,
                    step: declared.step,
                    select_values: declared.select_values.clone(),
                });
                algorithm_node.options.insert(ui_option.id.clone(), OptionValue::Ref { ref_name: hoisted_id });
            } else if let Some(value) = &ui_option.value {
                algorithm_node.options.insert(ui_option.id.clone(), value.clone());
            }
        }

        nodes.insert(ui_node.id.clone(), algorithm_node);
    }

    // Edge wiring happens in the order edges appear in the original graph
    // (§4.2), independent of the compiler's own node order.
    for edge in &full_graph.edges {
        let source_ref = format!("{}#{}", edge.source.node_id, edge.source.handle);
        if let Some(target) = nodes.get_mut(&edge.target.node_id) {
            target.inputs.entry(edge.target.handle.clone()).or_default().push(source_ref);
        }
    }

    // Timeframe inheritance walks the topological order the validator
    // already established: by the time a node is visited, every node it can
    // draw an input from has already had its own timeframe finalized.
    for node_id in &order {
        if nodes.get(node_id).map(|n| n.timeframe.is_some()).unwrap_or(true) {
            continue;
        }
        let source_ids: Vec<String> = nodes
            .get(node_id)
            .map(|n| n.input_refs().map(node_id_of).map(str::to_string).collect())
            .unwrap_or_default();
        let inherited = source_ids.iter().find_map(|source_id| nodes.get(source_id).and_then(|n| n.timeframe.clone()));
        if let Some(timeframe) = inherited {
            if let Some(node) = nodes.get_mut(node_id) {
                node.timeframe = Some(timeframe);
            }
        }
    }

    let mut executor = None;
    let mut algorithm = Vec::with_capacity(order.len().saturating_sub(1));
    for node_id in order {
        let node = match nodes.remove(&node_id) {
            Some(n) => n,
            None => continue,
        };
        if node.node_type == EXECUTOR_TYPE {
            if let Some(previous) = &executor {
                let previous: &AlgorithmNode = previous;
                return Err(CompileError::MultipleExecutors(format!("{}, {}", previous.id, node.id)));
            }
            executor = Some(node);
        } else {
            algorithm.push(node);
        }
    }

    let executor = executor.ok_or(CompileError::MissingExecutor)?;
    Ok(PartialTradeSignalMetaData { options: hoisted, algorithm, executor })
}
