//! Type checker & cast insertion (C8, §4.7). The data-type lattice itself
//! (`is_compatible` / `needs_cast`) lives in `strategy_core::data_type`
//! since the UI-graph validator shares it; this module adds the two things
//! that are specific to a live compilation in progress: looking up what a
//! node's output actually resolved to, and inserting the cast node that
//! reconciles a bool/numeric mismatch.

use strategy_core::data_type::{is_compatible, needs_cast, CastDirection, DataType};
use strategy_core::ir::AlgorithmNode;

use crate::context::CompilationContext;
use crate::error::ScriptError;
use crate::literals::materialize_number;

/// `GetNodeOutputType(node_id, handle)` (§4.7): an explicit override first
/// (set by this module for the cast nodes it creates, and by the ternary
/// lowering for its result), then the component's declared output type,
/// then a handful of fixed-shape operator shortcuts, then `Any`.
pub fn node_output_type(ctx: &CompilationContext, node_id: &str, handle: &str) -> DataType {
    if let Some(dt) = ctx.output_types.get(&(node_id.to_string(), handle.to_string())) {
        return *dt;
    }
    let Some(node) = ctx.node(node_id) else { return DataType::Any };
    if let Some(meta) = ctx.registry.lookup(&node.node_type) {
        if let Some(out) = meta.output_by_wire_id(handle) {
            return out.data_type;
        }
    }
    operator_shortcut(&node.node_type).unwrap_or(DataType::Any)
}

fn operator_shortcut(node_type: &str) -> Option<DataType> {
    Some(match node_type {
        "lt" | "gt" | "lte" | "gte" | "eq" | "neq" | "logical_and" | "logical_or" | "logical_not" => DataType::Boolean,
        "add" | "sub" | "mul" | "div" | "mod" | "number" => DataType::Decimal,
        "bool_true" | "bool_false" => DataType::Boolean,
        "text" => DataType::String,
        "null" => DataType::Any,
        _ => return None,
    })
}

/// Reconcile `(src_id, src_handle)` against `target_type` (§4.7): passes
/// references through unchanged when already compatible, otherwise inserts
/// the `boolean_select`/`neq` cast node the mismatch calls for. Insertion
/// can append to the node vector, so the caller gets back owned ids rather
/// than a reference into it.
pub fn coerce(
    ctx: &mut CompilationContext,
    src_id: &str,
    src_handle: &str,
    target_type: DataType,
) -> Result<(String, String), ScriptError> {
    let src_type = node_output_type(ctx, src_id, src_handle);
    if is_compatible(src_type, target_type) {
        return Ok((src_id.to_string(), src_handle.to_string()));
    }
    match needs_cast(src_type, target_type) {
        CastDirection::BoolToNumber => {
            let (true_id, true_handle) = materialize_number(ctx, 1.0);
            let (false_id, false_handle) = materialize_number(ctx, 0.0);
            let cast_id = ctx.fresh_id("bool_to_num_cast");
            let mut node = AlgorithmNode::new(cast_id.clone(), "boolean_select");
            node.inputs.insert("condition".to_string(), vec![format!("{src_id}#{src_handle}")]);
            node.inputs.insert("true".to_string(), vec![format!("{true_id}#{true_handle}")]);
            node.inputs.insert("false".to_string(), vec![format!("{false_id}#{false_handle}")]);
            ctx.push(node);
            ctx.output_types.insert((cast_id.clone(), "result".to_string()), DataType::Number);
            Ok((cast_id, "result".to_string()))
        }
        CastDirection::NumberToBool => {
            let (zero_id, zero_handle) = materialize_number(ctx, 0.0);
            let cast_id = ctx.fresh_id("num_to_bool_cast");
            let mut node = AlgorithmNode::new(cast_id.clone(), "neq");
            node.inputs.insert("SLOT0".to_string(), vec![format!("{src_id}#{src_handle}")]);
            node.inputs.insert("SLOT1".to_string(), vec![format!("{zero_id}#{zero_handle}")]);
            ctx.push(node);
            ctx.output_types.insert((cast_id.clone(), "result".to_string()), DataType::Boolean);
            Ok((cast_id, "result".to_string()))
        }
        CastDirection::Incompatible => Err(ScriptError::general(format!(
            "cannot reconcile incompatible types {src_type} and {target_type} for '{src_id}#{src_handle}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strategy_core::metadata::MapRegistry;

    #[test]
    fn bool_source_into_a_numeric_slot_inserts_boolean_select() {
        let registry = MapRegistry::new([]);
        let mut ctx = CompilationContext::new(&registry);
        let (src_id, src_handle) = crate::literals::materialize_bool(&mut ctx, true);
        let (node_id, handle) = coerce(&mut ctx, &src_id, &src_handle, DataType::Decimal).unwrap();
        assert_eq!(handle, "result");
        assert_eq!(ctx.node(&node_id).unwrap().node_type, "boolean_select");
        assert_eq!(node_output_type(&ctx, &node_id, &handle), DataType::Number);
    }

    #[test]
    fn already_compatible_types_pass_through_untouched() {
        let registry = MapRegistry::new([]);
        let mut ctx = CompilationContext::new(&registry);
        let (src_id, src_handle) = materialize_number(&mut ctx, 3.0);
        let before = ctx.nodes.len();
        let (node_id, handle) = coerce(&mut ctx, &src_id, &src_handle, DataType::Number).unwrap();
        assert_eq!((node_id, handle), (src_id, src_handle));
        assert_eq!(ctx.nodes.len(), before);
    }

    #[test]
    fn string_into_boolean_is_rejected() {
        let registry = MapRegistry::new([]);
        let mut ctx = CompilationContext::new(&registry);
        let (src_id, src_handle) = crate::literals::materialize_text(&mut ctx, "x");
        assert!(coerce(&mut ctx, &src_id, &src_handle, DataType::Boolean).is_err());
    }
}
