//! The AST-directed expression/constructor compiler (C7, §4.5) — the heart
//! of the script pipeline. Two shapes reach here: a constructor-call chain
//! `comp(options)(feed, ...)` rooted at a `Name`, and everything else, which
//! evaluates to a `ValueHandle` by recursively lowering operators to their
//! registered component equivalents.
//!
//! Node-id allocation is parent-first for `BinOp`/`Compare` (§4.5: a
//! placeholder id is reserved before operands are visited, so the operator
//! ends up with a lower id than its children) and child-first everywhere
//! else (`BoolOp`, `UnaryOp`, `IfExp`, `Subscript`, and every constructor
//! call): operands are visited, then the node is created.

use std::collections::{BTreeMap, HashMap};

use strategy_ast::{BinOpKind, BoolOpKind, CmpOp, Constant, Expr, Module, Stmt, UnaryOpKind};
use strategy_core::data_type::DataType;
use strategy_core::handle::normalize_handle_id;
use strategy_core::ir::AlgorithmNode;
use strategy_core::metadata::ComponentMetadata;
use strategy_core::option_value::{parse_option, OptionValue};

use crate::cast::coerce;
use crate::context::{Binding, CompilationContext};
use crate::error::ScriptError;
use crate::literals::materialize_constant;

type Handle = (String, String);

/// Compile every top-level statement in source order (§4.5).
pub fn compile_module(ctx: &mut CompilationContext, module: &Module, consts: &HashMap<String, Constant>) -> Result<(), ScriptError> {
    for stmt in &module.body {
        visit_stmt(ctx, stmt, consts)?;
    }
    Ok(())
}

fn visit_stmt(ctx: &mut CompilationContext, stmt: &Stmt, consts: &HashMap<String, Constant>) -> Result<(), ScriptError> {
    match stmt {
        Stmt::Assign { targets, value, span } => {
            if targets.len() != 1 {
                return Err(ScriptError::at(*span, "assignment must have exactly one target"));
            }
            match &targets[0] {
                Expr::Name { id, .. } => handle_single_name_assignment(ctx, id, value, *span, consts),
                Expr::Tuple { elements, .. } => handle_tuple_assignment(ctx, elements, value, *span, consts),
                other => Err(ScriptError::at(other.span(), "assignment target must be a name or a tuple of names")),
            }
        }
        Stmt::ExprStmt { value, span } => handle_sink_node(ctx, value, *span, consts),
    }
}

fn handle_single_name_assignment(
    ctx: &mut CompilationContext,
    target: &str,
    value: &Expr,
    span: strategy_ast::Span,
    consts: &HashMap<String, Constant>,
) -> Result<(), ScriptError> {
    if let Some((component, calls)) = constructor_chain(value) {
        if ctx.index.contains_key(target) {
            return Err(ScriptError::at(span, format!("'{target}' is already bound to a node")));
        }
        let meta = lookup_meta(ctx, component, span)?;
        let (options_call, feed_calls) = split_constructor_chain(options_call_is_optional(meta), &calls, span)?;
        build_constructor_node(ctx, target.to_string(), meta, options_call, &feed_calls, consts)?;
        ctx.variables.insert(target.to_string(), Binding::Component { node_id: target.to_string(), component: component.to_string() });
        return Ok(());
    }
    let (node_id, handle) = visit_expr(ctx, value, consts)?;
    ctx.variables.insert(target.to_string(), Binding::Handle { node_id, handle });
    Ok(())
}

fn handle_tuple_assignment(
    ctx: &mut CompilationContext,
    elements: &[Expr],
    value: &Expr,
    span: strategy_ast::Span,
    consts: &HashMap<String, Constant>,
) -> Result<(), ScriptError> {
    let (component, calls) = constructor_chain(value).ok_or_else(|| ScriptError::at(span, "a tuple target requires a constructor call"))?;
    let meta = lookup_meta(ctx, component, span)?;
    if elements.len() != meta.outputs.len() {
        return Err(ScriptError::at(
            span,
            format!("component '{component}' declares {} output(s) but {} name(s) were given", meta.outputs.len(), elements.len()),
        ));
    }
    let (options_call, feed_calls) = split_constructor_chain(options_call_is_optional(meta), &calls, span)?;
    let node_id = ctx.fresh_id(component);
    build_constructor_node(ctx, node_id.clone(), meta, options_call, &feed_calls, consts)?;
    for (element, output) in elements.iter().zip(&meta.outputs) {
        match element {
            Expr::Name { id, .. } if id == "_" => {}
            Expr::Name { id, .. } => {
                ctx.variables.insert(id.clone(), Binding::Handle { node_id: node_id.clone(), handle: output.wire_id() });
            }
            other => return Err(ScriptError::at(other.span(), "tuple assignment targets must be names")),
        }
    }
    Ok(())
}

fn handle_sink_node(ctx: &mut CompilationContext, value: &Expr, span: strategy_ast::Span, consts: &HashMap<String, Constant>) -> Result<(), ScriptError> {
    let (component, calls) = constructor_chain(value).ok_or_else(|| ScriptError::at(span, "expression statements must be a sink component call"))?;
    let meta = lookup_meta(ctx, component, span)?;
    if !meta.outputs.is_empty() {
        return Err(ScriptError::at(span, format!("component '{component}' declares outputs and cannot be used as a bare statement")));
    }
    let (options_call, feed_calls) = split_constructor_chain(options_call_is_optional(meta), &calls, span)?;
    let node_id = ctx.fresh_id(component);
    build_constructor_node(ctx, node_id, meta, options_call, &feed_calls, consts)
}

// --- constructor-call grammar -------------------------------------------------

/// Flattens a `Call(Call(...(Name)))` chain to `(base_name, calls_outer_to_inner)`.
/// Returns `None` when the expression isn't rooted at a bare `Name`.
fn constructor_chain(expr: &Expr) -> Option<(&str, Vec<&Expr>)> {
    let mut calls = Vec::new();
    let mut current = expr;
    loop {
        match current {
            Expr::Call { func, .. } => {
                calls.push(current);
                current = func;
            }
            Expr::Name { id, .. } if !calls.is_empty() => return Some((id.as_str(), calls)),
            _ => return None,
        }
    }
}

/// Splits a flattened call chain into the options call (the one closest to
/// the component `Name`, if any) and the feed-step calls that wrap it, in
/// application order (§4.5). The shorthand `comp(a, b)` — one call, no
/// option that actually needs spelling out, positional args present — is
/// treated entirely as a feed step instead.
///
/// `calls` comes from `constructor_chain` ordered outermost-first, so the
/// options call is always `calls.last()` and the feed steps are everything
/// before it, reversed back into the order they're actually applied in.
fn split_constructor_chain<'a>(
    component_needs_no_options_call: bool,
    calls: &'a [&'a Expr],
    span: strategy_ast::Span,
) -> Result<(Option<&'a Expr>, Vec<&'a Expr>), ScriptError> {
    let innermost = *calls.last().expect("constructor_chain never returns an empty call list");
    let Expr::Call { args: innermost_args, .. } = innermost else { unreachable!("constructor_chain only pushes Call nodes") };
    if calls.len() == 1 && component_needs_no_options_call && !innermost_args.is_empty() {
        return Ok((None, vec![innermost]));
    }
    if !innermost_args.is_empty() {
        return Err(ScriptError::at(span, "constructor options must be passed as keyword arguments"));
    }
    let mut feed_calls = calls[..calls.len() - 1].to_vec();
    feed_calls.reverse();
    Ok((Some(innermost), feed_calls))
}

/// Whether a component's options call can be omitted entirely: true when
/// every declared option either has a default or isn't required, so
/// `comp(feed)` never leaves a required option unset.
fn options_call_is_optional(meta: &ComponentMetadata) -> bool {
    meta.options.iter().all(|o| !o.required || o.default.is_some())
}

fn build_constructor_node(
    ctx: &mut CompilationContext,
    node_id: String,
    meta: &ComponentMetadata,
    options_call: Option<&Expr>,
    feed_calls: &[&Expr],
    consts: &HashMap<String, Constant>,
) -> Result<(), ScriptError> {
    let (options, timeframe_raw, session_raw) = match options_call {
        Some(call) => parse_options_call(ctx, meta, call, consts)?,
        None => (apply_option_defaults(meta, BTreeMap::new())?, None, None),
    };
    let inputs = wire_feed_inputs(ctx, meta, feed_calls, consts)?;
    let mut node = AlgorithmNode::new(node_id, meta.name.clone());
    node.options = options;
    node.inputs = inputs;
    crate::special_params::apply_special_fields(&mut node, timeframe_raw.as_deref(), session_raw.as_deref())?;
    ctx.push(node);
    Ok(())
}

fn parse_options_call(
    ctx: &CompilationContext,
    meta: &ComponentMetadata,
    call: &Expr,
    consts: &HashMap<String, Constant>,
) -> Result<(BTreeMap<String, OptionValue>, Option<String>, Option<String>), ScriptError> {
    let Expr::Call { kwargs, .. } = call else { unreachable!("options_call is always a Call") };
    let mut options = BTreeMap::new();
    let mut timeframe_raw = None;
    let mut session_raw = None;

    for kw in kwargs {
        if kw.name == "timeframe" {
            timeframe_raw = Some(extract_special_string(&kw.value, consts)?);
            continue;
        }
        if kw.name == "session" {
            session_raw = Some(extract_special_string(&kw.value, consts)?);
            continue;
        }
        let spec = meta
            .option(&kw.name)
            .ok_or_else(|| ScriptError::at(kw.value.span(), format!("component '{}' has no option '{}'", meta.name, kw.name)))?;
        let raw = expr_to_option_value(&kw.value, consts)
            .ok_or_else(|| ScriptError::at(kw.value.span(), format!("option '{}' must be a constant value", kw.name)))?;
        let parsed = parse_option(&raw, spec, meta).map_err(|e| ScriptError::at(kw.value.span(), format!("option '{}': {}", kw.name, e.message)))?;
        options.insert(kw.name.clone(), parsed);
    }

    let options = apply_option_defaults(meta, options)?;
    let _ = ctx;
    Ok((options, timeframe_raw, session_raw))
}

/// Anything not supplied gets its declared default, or is an error if
/// required (§4.5). Shared by the explicit-options-call path and the
/// shorthand `comp(feed)` path, which skips the options call entirely but
/// still needs its declared defaults filled in.
fn apply_option_defaults(meta: &ComponentMetadata, mut options: BTreeMap<String, OptionValue>) -> Result<BTreeMap<String, OptionValue>, ScriptError> {
    for spec in &meta.options {
        if options.contains_key(&spec.id) {
            continue;
        }
        if let Some(default) = &spec.default {
            options.insert(spec.id.clone(), default.clone());
        } else if spec.required {
            return Err(ScriptError::general(format!("component '{}' is missing required option '{}'", meta.name, spec.id)));
        }
    }
    Ok(options)
}

/// `timeframe`/`session` accept either a string literal or a bare
/// identifier, the latter read back as its own name (§9 open question: this
/// is a deliberately brittle carve-out, not a general name-to-string rule).
fn extract_special_string(expr: &Expr, consts: &HashMap<String, Constant>) -> Result<String, ScriptError> {
    match expr {
        Expr::Constant { value: Constant::Str(s), .. } => Ok(s.clone()),
        Expr::Name { id, .. } => match consts.get(id) {
            Some(Constant::Str(s)) => Ok(s.clone()),
            _ => Ok(id.clone()),
        },
        other => Err(ScriptError::at(other.span(), "expected a string literal")),
    }
}

fn constant_to_option_value(c: &Constant) -> Option<OptionValue> {
    match c {
        Constant::Int(v) => Some(OptionValue::Number(*v as f64)),
        Constant::Float(v) => Some(OptionValue::Number(*v)),
        Constant::Bool(v) => Some(OptionValue::Bool(*v)),
        Constant::Str(v) => Some(OptionValue::Text(v.clone())),
        Constant::None => None,
    }
}

fn expr_to_option_value(expr: &Expr, consts: &HashMap<String, Constant>) -> Option<OptionValue> {
    if let Expr::List { elements, .. } | Expr::Tuple { elements, .. } = expr {
        let mut out = Vec::with_capacity(elements.len());
        for element in elements {
            out.push(expr_to_option_value(element, consts)?);
        }
        return Some(OptionValue::Sequence(out));
    }
    constant_to_option_value(&crate::constant_fold::eval_constant(expr, consts)?)
}

fn wire_feed_inputs(
    ctx: &mut CompilationContext,
    meta: &ComponentMetadata,
    feed_calls: &[&Expr],
    consts: &HashMap<String, Constant>,
) -> Result<BTreeMap<String, Vec<String>>, ScriptError> {
    let declared_inputs: Vec<String> = meta.inputs.iter().map(|i| i.wire_id()).collect();
    let mut cursor = 0usize;
    let mut inputs: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for call in feed_calls {
        let Expr::Call { args, kwargs, span, .. } = call else { unreachable!("feed_calls only contains Call nodes") };
        for arg in args {
            let wire_id = declared_inputs.get(cursor).cloned().ok_or_else(|| {
                ScriptError::at(*span, format!("component '{}' declares only {} input(s)", meta.name, declared_inputs.len()))
            })?;
            cursor += 1;
            bind_feed_input(ctx, meta, &mut inputs, &wire_id, arg, consts)?;
        }
        for kw in kwargs {
            let wire_id = normalize_handle_id(&kw.name);
            bind_feed_input(ctx, meta, &mut inputs, &wire_id, &kw.value, consts)?;
        }
    }
    Ok(inputs)
}

fn bind_feed_input(
    ctx: &mut CompilationContext,
    meta: &ComponentMetadata,
    inputs: &mut BTreeMap<String, Vec<String>>,
    wire_id: &str,
    value_expr: &Expr,
    consts: &HashMap<String, Constant>,
) -> Result<(), ScriptError> {
    let io = meta
        .input_by_wire_id(wire_id)
        .ok_or_else(|| ScriptError::at(value_expr.span(), format!("component '{}' has no input '{}'", meta.name, wire_id)))?;
    let handle = visit_expr(ctx, value_expr, consts)?;
    let (src_id, src_handle) = coerce(ctx, &handle.0, &handle.1, io.data_type)?;
    inputs.entry(wire_id.to_string()).or_default().push(format!("{src_id}#{src_handle}"));
    Ok(())
}

fn lookup_meta<'a>(ctx: &CompilationContext<'a>, component: &str, span: strategy_ast::Span) -> Result<&'a ComponentMetadata, ScriptError> {
    ctx.registry.lookup(component).ok_or_else(|| ScriptError::at(span, format!("unknown component '{component}'")))
}

fn sole_output(meta: &ComponentMetadata, span: strategy_ast::Span) -> Result<String, ScriptError> {
    match meta.outputs.as_slice() {
        [only] => Ok(only.wire_id()),
        [] => Err(ScriptError::at(span, format!("component '{}' declares no outputs", meta.name))),
        _ => Err(ScriptError::at(span, format!("component '{}' declares multiple outputs; select one with '.handle'", meta.name))),
    }
}

// --- general expression evaluation -------------------------------------------

fn visit_expr(ctx: &mut CompilationContext, expr: &Expr, consts: &HashMap<String, Constant>) -> Result<Handle, ScriptError> {
    match expr {
        Expr::Constant { value, .. } => Ok(materialize_constant(ctx, value)),
        Expr::Name { id, span } => resolve_name(ctx, id, *span),
        Expr::Attribute { base, attr, span } => resolve_attribute(ctx, base, attr, *span, consts),
        Expr::Call { .. } => visit_constructor_expr(ctx, expr, consts),
        Expr::BinOp { op, left, right, span } => visit_binop(ctx, *op, left, right, *span, consts),
        Expr::Compare { left, op, right, span } => visit_compare(ctx, left, *op, right, *span, consts),
        Expr::BoolOp { op, values, span } => visit_boolop(ctx, *op, values, *span, consts),
        Expr::UnaryOp { op, operand, span } => visit_unaryop(ctx, *op, operand, *span, consts),
        Expr::IfExp { test, body, orelse, span } => visit_ifexp(ctx, test, body, orelse, *span, consts),
        Expr::Subscript { value, slice, span } => visit_subscript(ctx, value, slice, *span, consts),
        Expr::List { span, .. } | Expr::Tuple { span, .. } => Err(ScriptError::at(*span, "list/tuple literals are not valid value expressions")),
    }
}

fn resolve_name(ctx: &CompilationContext, id: &str, span: strategy_ast::Span) -> Result<Handle, ScriptError> {
    match ctx.variables.get(id) {
        Some(Binding::Handle { node_id, handle }) => Ok((node_id.clone(), handle.clone())),
        Some(Binding::Component { node_id, component }) => {
            let meta = lookup_meta(ctx, component, span)?;
            Ok((node_id.clone(), sole_output(meta, span)?))
        }
        None => Err(ScriptError::at(span, format!("undefined name '{id}'"))),
    }
}

fn resolve_base_node_id(ctx: &mut CompilationContext, expr: &Expr, consts: &HashMap<String, Constant>) -> Result<String, ScriptError> {
    match expr {
        Expr::Name { id, span } => match ctx.variables.get(id) {
            Some(Binding::Handle { node_id, .. }) => Ok(node_id.clone()),
            Some(Binding::Component { node_id, .. }) => Ok(node_id.clone()),
            None => Err(ScriptError::at(*span, format!("undefined name '{id}'"))),
        },
        _ => visit_expr(ctx, expr, consts).map(|(node_id, _)| node_id),
    }
}

/// `x.h` (§4.5): the base resolves to a node id (not a handle — the
/// attribute picks whichever handle it names), except when the base is an
/// unbound `Name`, in which case the whole thing is an external bar/feed
/// reference (`src.c`) passed through untouched (§1 non-goals).
fn resolve_attribute(ctx: &mut CompilationContext, base: &Expr, attr: &str, span: strategy_ast::Span, consts: &HashMap<String, Constant>) -> Result<Handle, ScriptError> {
    if let Expr::Name { id, .. } = base {
        if !ctx.variables.contains_key(id) {
            return Ok((id.clone(), attr.to_string()));
        }
    }
    let node_id = resolve_base_node_id(ctx, base, consts)?;
    let node = ctx.node(&node_id).ok_or_else(|| ScriptError::at(span, format!("unknown node '{node_id}'")))?;
    let meta = lookup_meta(ctx, &node.node_type, span)?;
    let io = meta
        .output_by_wire_id(attr)
        .ok_or_else(|| ScriptError::at(span, format!("'{attr}' is not a declared output of component '{}'", node.node_type)))?;
    Ok((node_id, io.wire_id()))
}

fn visit_constructor_expr(ctx: &mut CompilationContext, expr: &Expr, consts: &HashMap<String, Constant>) -> Result<Handle, ScriptError> {
    let span = expr.span();
    let (component, calls) = constructor_chain(expr).ok_or_else(|| ScriptError::at(span, "expected a constructor call"))?;
    let meta = lookup_meta(ctx, component, span)?;
    let (options_call, feed_calls) = split_constructor_chain(options_call_is_optional(meta), &calls, span)?;
    let node_id = ctx.fresh_id(component);
    build_constructor_node(ctx, node_id.clone(), meta, options_call, &feed_calls, consts)?;
    Ok((node_id, sole_output(meta, span)?))
}

fn binop_component(op: BinOpKind) -> &'static str {
    match op {
        BinOpKind::Add => "add",
        BinOpKind::Sub => "sub",
        BinOpKind::Mul => "mul",
        BinOpKind::Div => "div",
        BinOpKind::Mod => "mod",
    }
}

fn compare_component(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Lt => "lt",
        CmpOp::Gt => "gt",
        CmpOp::Le => "lte",
        CmpOp::Ge => "gte",
        CmpOp::Eq => "eq",
        CmpOp::NotEq => "neq",
    }
}

/// Arithmetic: parent-first id reservation, fixed `SLOT0`/`SLOT1` wiring (§4.5).
fn visit_binop(ctx: &mut CompilationContext, op: BinOpKind, left: &Expr, right: &Expr, span: strategy_ast::Span, consts: &HashMap<String, Constant>) -> Result<Handle, ScriptError> {
    let component = binop_component(op);
    let node_id = ctx.fresh_id(component);
    let l = visit_expr(ctx, left, consts)?;
    let r = visit_expr(ctx, right, consts)?;
    let (l_id, l_handle) = coerce(ctx, &l.0, &l.1, DataType::Decimal)?;
    let (r_id, r_handle) = coerce(ctx, &r.0, &r.1, DataType::Decimal)?;
    let mut node = AlgorithmNode::new(node_id.clone(), component);
    node.inputs.insert("SLOT0".to_string(), vec![format!("{l_id}#{l_handle}")]);
    node.inputs.insert("SLOT1".to_string(), vec![format!("{r_id}#{r_handle}")]);
    ctx.push(node);
    ctx.output_types.insert((node_id.clone(), "result".to_string()), DataType::Decimal);
    let _ = span;
    Ok((node_id, "result".to_string()))
}

/// Comparisons: parent-first id reservation like arithmetic, but wired
/// against the registered component's first two declared input ids rather
/// than a fixed `SLOT0`/`SLOT1` pair (§4.5).
fn visit_compare(ctx: &mut CompilationContext, left: &Expr, op: CmpOp, right: &Expr, span: strategy_ast::Span, consts: &HashMap<String, Constant>) -> Result<Handle, ScriptError> {
    let component = compare_component(op);
    let meta = lookup_meta(ctx, component, span)?;
    let node_id = ctx.fresh_id(component);
    let l = visit_expr(ctx, left, consts)?;
    let r = visit_expr(ctx, right, consts)?;
    let (lhs_wire, lhs_type) = first_two_inputs(meta, span)?;
    let (l_id, l_handle) = coerce(ctx, &l.0, &l.1, lhs_wire.1)?;
    let (r_id, r_handle) = coerce(ctx, &r.0, &r.1, lhs_type.1)?;
    let mut node = AlgorithmNode::new(node_id.clone(), component);
    node.inputs.insert(lhs_wire.0.clone(), vec![format!("{l_id}#{l_handle}")]);
    node.inputs.insert(lhs_type.0.clone(), vec![format!("{r_id}#{r_handle}")]);
    ctx.push(node);
    Ok((node_id, sole_output(meta, span)?))
}

fn first_two_inputs(meta: &ComponentMetadata, span: strategy_ast::Span) -> Result<((String, DataType), (String, DataType)), ScriptError> {
    if meta.inputs.len() < 2 {
        return Err(ScriptError::at(span, format!("component '{}' must declare at least two inputs", meta.name)));
    }
    Ok(((meta.inputs[0].wire_id(), meta.inputs[0].data_type), (meta.inputs[1].wire_id(), meta.inputs[1].data_type)))
}

/// `and`/`or` over N operands desugar to a left-associated chain of
/// 2-input nodes, child-first (§4.5).
fn visit_boolop(ctx: &mut CompilationContext, op: BoolOpKind, values: &[Expr], span: strategy_ast::Span, consts: &HashMap<String, Constant>) -> Result<Handle, ScriptError> {
    let component = match op {
        BoolOpKind::And => "logical_and",
        BoolOpKind::Or => "logical_or",
    };
    let mut values = values.iter();
    let first = values.next().ok_or_else(|| ScriptError::at(span, "boolean operation requires at least one operand"))?;
    let mut acc = visit_expr(ctx, first, consts)?;
    for next in values {
        let rhs = visit_expr(ctx, next, consts)?;
        acc = build_pairwise_node(ctx, component, acc, rhs, span)?;
    }
    Ok(acc)
}

fn build_pairwise_node(ctx: &mut CompilationContext, component: &str, lhs: Handle, rhs: Handle, span: strategy_ast::Span) -> Result<Handle, ScriptError> {
    let meta = lookup_meta(ctx, component, span)?;
    let (lhs_wire, rhs_wire) = first_two_inputs(meta, span)?;
    let (l_id, l_handle) = coerce(ctx, &lhs.0, &lhs.1, lhs_wire.1)?;
    let (r_id, r_handle) = coerce(ctx, &rhs.0, &rhs.1, rhs_wire.1)?;
    let node_id = ctx.fresh_id(component);
    let mut node = AlgorithmNode::new(node_id.clone(), component);
    node.inputs.insert(lhs_wire.0, vec![format!("{l_id}#{l_handle}")]);
    node.inputs.insert(rhs_wire.0, vec![format!("{r_id}#{r_handle}")]);
    ctx.push(node);
    Ok((node_id, sole_output(meta, span)?))
}

/// `not x`: child-first, a single fixed `SLOT` input. `+x` is the identity
/// and allocates nothing. `-x` materializes `-1` first, then the operand,
/// then a `mul` node (§4.5).
fn visit_unaryop(ctx: &mut CompilationContext, op: UnaryOpKind, operand: &Expr, span: strategy_ast::Span, consts: &HashMap<String, Constant>) -> Result<Handle, ScriptError> {
    match op {
        UnaryOpKind::UAdd => visit_expr(ctx, operand, consts),
        UnaryOpKind::Not => {
            let v = visit_expr(ctx, operand, consts)?;
            let (src_id, src_handle) = coerce(ctx, &v.0, &v.1, DataType::Boolean)?;
            let node_id = ctx.fresh_id("logical_not");
            let mut node = AlgorithmNode::new(node_id.clone(), "logical_not");
            node.inputs.insert("SLOT".to_string(), vec![format!("{src_id}#{src_handle}")]);
            ctx.push(node);
            Ok((node_id, "result".to_string()))
        }
        UnaryOpKind::USub => {
            let (neg_one_id, neg_one_handle) = crate::literals::materialize_number(ctx, -1.0);
            let v = visit_expr(ctx, operand, consts)?;
            let (operand_id, operand_handle) = coerce(ctx, &v.0, &v.1, DataType::Decimal)?;
            let node_id = ctx.fresh_id("mul");
            let mut node = AlgorithmNode::new(node_id.clone(), "mul");
            node.inputs.insert("SLOT0".to_string(), vec![format!("{neg_one_id}#{neg_one_handle}")]);
            node.inputs.insert("SLOT1".to_string(), vec![format!("{operand_id}#{operand_handle}")]);
            ctx.push(node);
            ctx.output_types.insert((node_id.clone(), "result".to_string()), DataType::Decimal);
            let _ = span;
            Ok((node_id, "result".to_string()))
        }
    }
}

/// `body if test else orelse` -> `boolean_select(condition, true, false)`,
/// child-first, fixed handle names. The result type tracks whichever type
/// `body` resolved to; `orelse` is coerced to match (§4.5, §4.7).
fn visit_ifexp(ctx: &mut CompilationContext, test: &Expr, body: &Expr, orelse: &Expr, span: strategy_ast::Span, consts: &HashMap<String, Constant>) -> Result<Handle, ScriptError> {
    let t = visit_expr(ctx, test, consts)?;
    let (test_id, test_handle) = coerce(ctx, &t.0, &t.1, DataType::Boolean)?;
    let b = visit_expr(ctx, body, consts)?;
    let o = visit_expr(ctx, orelse, consts)?;
    let body_type = crate::cast::node_output_type(ctx, &b.0, &b.1);
    let (orelse_id, orelse_handle) = coerce(ctx, &o.0, &o.1, body_type)?;

    let node_id = ctx.fresh_id("boolean_select");
    let mut node = AlgorithmNode::new(node_id.clone(), "boolean_select");
    node.inputs.insert("condition".to_string(), vec![format!("{test_id}#{test_handle}")]);
    node.inputs.insert("true".to_string(), vec![format!("{}#{}", b.0, b.1)]);
    node.inputs.insert("false".to_string(), vec![format!("{orelse_id}#{orelse_handle}")]);
    ctx.push(node);
    ctx.output_types.insert((node_id.clone(), "result".to_string()), body_type);
    let _ = span;
    Ok((node_id, "result".to_string()))
}

/// `expr[k]` with a constant non-zero integer `k` -> `lag(period=k)`,
/// child-first, a single fixed `SLOT` input (§4.5). By the time this runs,
/// constant folding has already rewritten any foldable slice into a literal.
fn visit_subscript(ctx: &mut CompilationContext, value: &Expr, slice: &Expr, span: strategy_ast::Span, consts: &HashMap<String, Constant>) -> Result<Handle, ScriptError> {
    let period = match slice {
        Expr::Constant { value: Constant::Int(k), .. } => *k,
        _ => return Err(ScriptError::at(span, "subscript index must be a constant integer")),
    };
    if period == 0 {
        return Err(ScriptError::at(span, "lag period must be non-zero"));
    }
    let v = visit_expr(ctx, value, consts)?;
    let node_id = ctx.fresh_id("lag");
    let mut node = AlgorithmNode::new(node_id.clone(), "lag");
    node.options.insert("period".to_string(), OptionValue::Number(period as f64));
    node.inputs.insert("SLOT".to_string(), vec![format!("{}#{}", v.0, v.1)]);
    ctx.push(node);
    Ok((node_id, "result".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use strategy_ast::builder::*;
    use strategy_core::data_type::DataType;
    use strategy_core::metadata::{ComponentMetadata, MapRegistry};
    use strategy_core::metadata::{IOSpec, OptionKind, OptionSpec};

    fn registry() -> MapRegistry {
        MapRegistry::new([
            ComponentMetadata::new("sma")
                .with_options([OptionSpec::new("period", OptionKind::Integer).with_range(1.0, 500.0).with_default(OptionValue::Number(14.0))])
                .with_inputs([IOSpec::new("*", DataType::Decimal)])
                .with_outputs([IOSpec::new("result", DataType::Decimal)]),
            ComponentMetadata::new("add").with_inputs([IOSpec::new("*0", DataType::Decimal), IOSpec::new("*1", DataType::Decimal)]).with_outputs([IOSpec::new("result", DataType::Decimal)]),
            ComponentMetadata::new("gt").with_inputs([IOSpec::new("*0", DataType::Decimal), IOSpec::new("*1", DataType::Decimal)]).with_outputs([IOSpec::new("result", DataType::Boolean)]),
            ComponentMetadata::new("logical_and").with_inputs([IOSpec::new("*0", DataType::Boolean), IOSpec::new("*1", DataType::Boolean)]).with_outputs([IOSpec::new("result", DataType::Boolean)]),
            ComponentMetadata::new("lag").with_options([OptionSpec::new("period", OptionKind::Integer)]).with_inputs([IOSpec::new("*", DataType::Decimal)]).with_outputs([IOSpec::new("result", DataType::Decimal)]),
            ComponentMetadata::new("boolean_select")
                .with_inputs([IOSpec::new("condition", DataType::Boolean), IOSpec::new("true", DataType::Any), IOSpec::new("false", DataType::Any)])
                .with_outputs([IOSpec::new("result", DataType::Any)]),
            ComponentMetadata::new("trade_signal_executor").with_inputs([IOSpec::new("signal", DataType::Boolean)]),
        ])
    }

    #[test]
    fn constructor_assignment_creates_a_node_named_after_the_target() {
        let registry = registry();
        let mut ctx = CompilationContext::new(&registry);
        let consts = HashMap::new();
        let module = Module::new(vec![assign(
            vec![name("s", 1, 1)],
            call(name("sma", 1, 5), vec![], vec![keyword("period", int(20, 1, 14))], 1, 5),
            1,
            1,
        )]);
        compile_module(&mut ctx, &module, &consts).unwrap();
        assert!(ctx.node("s").is_some());
        assert_eq!(ctx.node("s").unwrap().node_type, "sma");
    }

    #[test]
    fn shorthand_feed_call_wires_positional_input() {
        let registry = registry();
        let mut ctx = CompilationContext::new(&registry);
        let consts = HashMap::new();
        let module = Module::new(vec![assign(
            vec![name("s", 1, 1)],
            call(name("sma", 1, 5), vec![attribute(name("src", 1, 9), "c", 1, 9)], vec![], 1, 5),
            1,
            1,
        )]);
        compile_module(&mut ctx, &module, &consts).unwrap();
        let node = ctx.node("s").unwrap();
        assert_eq!(node.inputs.get("SLOT"), Some(&vec!["src#c".to_string()]));
        assert_eq!(node.options.get("period"), Some(&OptionValue::Number(14.0)));
    }

    #[test]
    fn two_step_chain_wires_both_options_and_feed() {
        let registry = registry();
        let mut ctx = CompilationContext::new(&registry);
        let consts = HashMap::new();
        let module = Module::new(vec![assign(
            vec![name("s", 1, 1)],
            call(
                call(name("sma", 1, 1), vec![], vec![keyword("period", int(20, 1, 1))], 1, 1),
                vec![attribute(name("src", 1, 1), "c", 1, 1)],
                vec![],
                1,
                1,
            ),
            1,
            1,
        )]);
        compile_module(&mut ctx, &module, &consts).unwrap();
        let node = ctx.node("s").unwrap();
        assert_eq!(node.options.get("period"), Some(&OptionValue::Number(20.0)));
        assert_eq!(node.inputs.get("SLOT"), Some(&vec!["src#c".to_string()]));
    }

    #[test]
    fn bare_name_feed_is_treated_as_an_external_reference() {
        let registry = registry();
        let mut ctx = CompilationContext::new(&registry);
        let consts = HashMap::new();
        let module = Module::new(vec![expr_stmt(
            call(
                call(name("trade_signal_executor", 1, 1), vec![], vec![], 1, 1),
                vec![attribute(name("src", 1, 20), "c", 1, 20)],
                vec![],
                1,
                1,
            ),
            1,
            1,
        )]);
        compile_module(&mut ctx, &module, &consts).unwrap();
        let node = ctx.nodes.iter().find(|n| n.node_type == "trade_signal_executor").unwrap();
        assert_eq!(node.inputs.get("signal"), Some(&vec!["src#c".to_string()]));
    }

    #[test]
    fn binop_reserves_a_lower_id_than_its_operands() {
        let registry = registry();
        let mut ctx = CompilationContext::new(&registry);
        let consts = HashMap::new();
        // a feed argument wired through `sma` so the lowered nodes land in
        // `ctx.nodes` for inspection (a bare expression statement is only
        // valid when it's itself a sink component call).
        let module = Module::new(vec![assign(
            vec![name("s", 1, 1)],
            call(
                name("sma", 1, 1),
                vec![bin_op(BinOpKind::Add, bin_op(BinOpKind::Add, int(1, 1, 1), int(2, 1, 3), 1, 1), int(3, 1, 5), 1, 1)],
                vec![],
                1,
                1,
            ),
            1,
            1,
        )]);
        compile_module(&mut ctx, &module, &consts).unwrap();
        let outer = ctx.node("add_0").unwrap();
        let inner = ctx.node("add_1").unwrap();
        assert!(outer.id < inner.id);
    }

    #[test]
    fn comparison_and_boolop_chain_through_registered_inputs() {
        let registry = registry();
        let mut ctx = CompilationContext::new(&registry);
        let consts = HashMap::new();
        let module = Module::new(vec![expr_stmt(
            call(
                call(name("trade_signal_executor", 1, 1), vec![], vec![], 1, 1),
                vec![bool_op(
                    BoolOpKind::And,
                    vec![compare(attribute(name("src", 1, 1), "c", 1, 1), CmpOp::Gt, int(100, 1, 1), 1, 1), bool_lit(true, 1, 1)],
                    1,
                    1,
                )],
                vec![],
                1,
                1,
            ),
            1,
            1,
        )]);
        compile_module(&mut ctx, &module, &consts).unwrap();
        let executor = ctx.nodes.iter().find(|n| n.node_type == "trade_signal_executor").unwrap();
        assert!(executor.inputs.get("signal").is_some());
        assert!(ctx.nodes.iter().any(|n| n.node_type == "logical_and"));
        assert!(ctx.nodes.iter().any(|n| n.node_type == "gt"));
    }

    #[test]
    fn subscript_desugars_to_lag() {
        let registry = registry();
        let mut ctx = CompilationContext::new(&registry);
        let consts = HashMap::new();
        let module = Module::new(vec![assign(
            vec![name("s", 1, 1)],
            call(name("sma", 1, 1), vec![subscript(attribute(name("src", 1, 1), "c", 1, 1), int(-5, 1, 1), 1, 1)], vec![], 1, 1),
            1,
            1,
        )]);
        compile_module(&mut ctx, &module, &consts).unwrap();
        let lag = ctx.nodes.iter().find(|n| n.node_type == "lag").unwrap();
        assert_eq!(lag.options.get("period").and_then(OptionValue::as_number), Some(-5.0));
    }

    #[test]
    fn boolean_source_into_arithmetic_inserts_a_cast() {
        let registry = registry();
        let mut ctx = CompilationContext::new(&registry);
        let consts = HashMap::new();
        let module = Module::new(vec![assign(
            vec![name("s", 1, 1)],
            call(name("sma", 1, 1), vec![bin_op(BinOpKind::Add, bool_lit(true, 1, 1), int(1, 1, 1), 1, 1)], vec![], 1, 1),
            1,
            1,
        )]);
        compile_module(&mut ctx, &module, &consts).unwrap();
        assert!(ctx.nodes.iter().any(|n| n.node_type == "boolean_select"));
    }
}
