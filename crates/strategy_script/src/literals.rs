//! Literal node materialisation (§4.5, SPEC_FULL §3): a `Constant`
//! encountered anywhere in an expression becomes a synthetic `number` /
//! `bool_true` / `bool_false` / `text` / `null` node with a fresh id,
//! returning its `result` handle. This is the only way a constant enters
//! the IR — `Name` occurrences are resolved against bindings instead.

use strategy_ast::Constant;
use strategy_core::data_type::DataType;
use strategy_core::ir::AlgorithmNode;
use strategy_core::option_value::OptionValue;

use crate::context::CompilationContext;

pub fn materialize_constant(ctx: &mut CompilationContext, value: &Constant) -> (String, String) {
    match value {
        Constant::Int(v) => materialize_number(ctx, *v as f64),
        Constant::Float(v) => materialize_number(ctx, *v),
        Constant::Bool(v) => materialize_bool(ctx, *v),
        Constant::Str(s) => materialize_text(ctx, s),
        Constant::None => materialize_null(ctx),
    }
}

pub fn materialize_number(ctx: &mut CompilationContext, value: f64) -> (String, String) {
    let id = ctx.fresh_id("number");
    let mut node = AlgorithmNode::new(id.clone(), "number");
    node.options.insert("value".to_string(), OptionValue::Number(value));
    ctx.push(node);
    ctx.output_types.insert((id.clone(), "result".to_string()), DataType::Decimal);
    (id, "result".to_string())
}

pub fn materialize_bool(ctx: &mut CompilationContext, value: bool) -> (String, String) {
    let base = if value { "bool_true" } else { "bool_false" };
    let id = ctx.fresh_id(base);
    let node = AlgorithmNode::new(id.clone(), base);
    ctx.push(node);
    ctx.output_types.insert((id.clone(), "result".to_string()), DataType::Boolean);
    (id, "result".to_string())
}

pub fn materialize_text(ctx: &mut CompilationContext, value: &str) -> (String, String) {
    let id = ctx.fresh_id("text");
    let mut node = AlgorithmNode::new(id.clone(), "text");
    node.options.insert("value".to_string(), OptionValue::Text(value.to_string()));
    ctx.push(node);
    ctx.output_types.insert((id.clone(), "result".to_string()), DataType::String);
    (id, "result".to_string())
}

pub fn materialize_null(ctx: &mut CompilationContext) -> (String, String) {
    let id = ctx.fresh_id("null");
    let node = AlgorithmNode::new(id.clone(), "null");
    ctx.push(node);
    ctx.output_types.insert((id.clone(), "result".to_string()), DataType::Any);
    (id, "result".to_string())
}
