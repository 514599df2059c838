//! strategy_script — the script-compilation pipeline: `compile_script`
//! single-pass-compiles a Python-subset AST into `PartialTradeSignalMetaData`
//! (§1 dataflow: "source → parser → AST → C6 → C7 (uses C1, C2, C8, C9) →
//! C10 → C12 → C11 → IR").
//!
//! This crate does not parse — `strategy_ast::Module` is handed in already
//! built, per §1's framing of the tree-sitter front end as an external
//! collaborator. Everything downstream of that AST lives here: constant
//! folding (C6), the expression/constructor compiler (C7, which in turn
//! leans on `cast` for C8 and `special_params` for C9), timeframe
//! resolution (C10), a shared topological sort (C12), and CSE (C11).

mod cast;
mod constant_fold;
mod context;
mod cse;
mod error;
mod expr_compiler;
mod literals;
mod special_params;
mod timeframe_resolve;

pub use context::{Binding, CompilationContext};
pub use error::ScriptError;

use strategy_ast::Module;
use strategy_core::ir::{AlgorithmNode, PartialTradeSignalMetaData};
use strategy_core::metadata::ComponentRegistry;
use strategy_core::timeframe::Timeframe;
use strategy_core::toposort::kahn_topo_sort;

const EXECUTOR_TYPE: &str = "trade_signal_executor";

/// `compile_script(module, registry, base_timeframe)` (§1, §4.4-§4.9):
/// the single entry point a caller who already has an AST in hand drives.
///
/// Unlike `validate_ui_data`, this throws on the first offending statement
/// (§7: "scripts are source code, so line-accurate diagnostics are more
/// useful than batched ones") rather than batching every issue.
pub fn compile_script(
    module: &Module,
    registry: &dyn ComponentRegistry,
    base_timeframe: Option<&Timeframe>,
) -> Result<PartialTradeSignalMetaData, ScriptError> {
    log::debug!("compiling script: {} top-level statement(s)", module.body.len());

    let consts = constant_fold::bind_top_level_constants(module);
    let module = constant_fold::fold_subscripts(module.clone(), &consts);

    let mut ctx = CompilationContext::new(registry);
    expr_compiler::compile_module(&mut ctx, &module, &consts)?;

    special_params::verify_session_dependencies(&mut ctx);

    timeframe_resolve::resolve_all(&mut ctx, base_timeframe);

    topo_sort_in_place(&mut ctx)?;

    cse::run(&mut ctx);

    split_executor(ctx.nodes)
}

/// C12: reorder `ctx.nodes` into the topological order Kahn's algorithm
/// produces over the node-level graph induced by `inputs`, then rebuild the
/// id index so every later stage keeps seeing the right position.
fn topo_sort_in_place(ctx: &mut CompilationContext) -> Result<(), ScriptError> {
    let ids: Vec<String> = ctx.nodes.iter().map(|n| n.id.clone()).collect();
    let order = kahn_topo_sort(&ids, |id| {
        ctx.node(id)
            .map(|n| n.input_refs().map(strategy_core::handle::node_id_of).map(str::to_string).collect())
            .unwrap_or_default()
    })
    .map_err(|e| ScriptError::general(format!("cycle detected among node(s): {}", e.remaining.join(", "))))?;

    let mut by_id: std::collections::HashMap<String, AlgorithmNode> =
        ctx.nodes.drain(..).map(|n| (n.id.clone(), n)).collect();
    for id in &order {
        if let Some(node) = by_id.remove(id) {
            ctx.push(node);
        }
    }
    Ok(())
}

/// Split the single `trade_signal_executor` node out of the compiled,
/// sorted, deduplicated node vector to form `PartialTradeSignalMetaData`
/// (§3.4, §4.2's executor split, mirrored here for the script path). A
/// script has no UI-exposed options to hoist, so `options` is always empty.
fn split_executor(nodes: Vec<AlgorithmNode>) -> Result<PartialTradeSignalMetaData, ScriptError> {
    let mut executor = None;
    let mut algorithm = Vec::with_capacity(nodes.len().saturating_sub(1));
    for node in nodes {
        if node.node_type == EXECUTOR_TYPE {
            if executor.is_some() {
                return Err(ScriptError::general(format!(
                    "script produced more than one {EXECUTOR_TYPE} node: '{}'",
                    node.id
                )));
            }
            executor = Some(node);
        } else {
            algorithm.push(node);
        }
    }
    let executor = executor.ok_or_else(|| ScriptError::general(format!("script produced no {EXECUTOR_TYPE} node")))?;
    Ok(PartialTradeSignalMetaData { options: Vec::new(), algorithm, executor })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strategy_ast::builder::*;
    use strategy_ast::{BinOpKind, CmpOp};
    use strategy_core::data_type::DataType;
    use strategy_core::metadata::{ComponentMetadata, IOSpec, MapRegistry, OptionKind, OptionSpec};
    use strategy_core::option_value::OptionValue;

    fn registry() -> MapRegistry {
        MapRegistry::new([
            ComponentMetadata::new("ema")
                .with_options([OptionSpec::new("period", OptionKind::Integer).with_range(1.0, 500.0)])
                .with_inputs([IOSpec::new("*", DataType::Decimal)])
                .with_outputs([IOSpec::new("result", DataType::Decimal)]),
            ComponentMetadata::new("sma")
                .with_options([OptionSpec::new("period", OptionKind::Integer).with_range(1.0, 500.0)])
                .with_inputs([IOSpec::new("*", DataType::Decimal)])
                .with_outputs([IOSpec::new("result", DataType::Decimal)]),
            ComponentMetadata::new("gt")
                .with_inputs([IOSpec::new("*0", DataType::Decimal), IOSpec::new("*1", DataType::Decimal)])
                .with_outputs([IOSpec::new("result", DataType::Boolean)]),
            ComponentMetadata::new("lag")
                .with_options([OptionSpec::new("period", OptionKind::Integer)])
                .with_inputs([IOSpec::new("*", DataType::Decimal)])
                .with_outputs([IOSpec::new("result", DataType::Decimal)]),
            ComponentMetadata::new("trade_signal_executor").with_inputs([IOSpec::new("signal", DataType::Boolean)]),
        ])
    }

    /// S4 — script CSE: two distinct `ema` periods, three `gt`s, but only
    /// two surviving `ema` nodes and the 20-period ones sharing one id.
    #[test]
    fn cse_collapses_identical_ema_calls() {
        let registry = registry();
        let src_c = || attribute(name("src", 1, 1), "c", 1, 1);
        let ema = |period: i64, line: u32| call(name("ema", line, 1), vec![src_c()], vec![keyword("period", int(period, line, 1))], line, 1);

        let module = Module::new(vec![
            assign(vec![name("signal1", 1, 1)], compare(ema(20, 1), CmpOp::Gt, int(100, 1, 1), 1, 1), 1, 1),
            assign(vec![name("signal2", 2, 1)], compare(ema(20, 2), CmpOp::Gt, ema(50, 2), 2, 1), 2, 1),
            assign(vec![name("signal3", 3, 1)], compare(src_c(), CmpOp::Gt, ema(20, 3), 3, 1), 3, 1),
            expr_stmt(
                call(
                    call(name("trade_signal_executor", 4, 1), vec![], vec![], 4, 1),
                    vec![name("signal1", 4, 1)],
                    vec![],
                    4,
                    1,
                ),
                4,
                1,
            ),
        ]);

        let result = compile_script(&module, &registry, None).unwrap();
        let emas: Vec<_> = result.algorithm.iter().filter(|n| n.node_type == "ema").collect();
        assert_eq!(emas.len(), 2);

        let gts: Vec<_> = result.algorithm.iter().filter(|n| n.node_type == "gt").collect();
        let ema20_id = emas.iter().find(|n| n.options.get("period") == Some(&OptionValue::Number(20.0))).unwrap().id.clone();
        let referencing_ema20: Vec<_> = gts
            .iter()
            .filter(|n| n.input_refs().any(|r| strategy_core::handle::node_id_of(r) == ema20_id))
            .collect();
        assert!(referencing_ema20.len() >= 2);
    }

    /// S5 — constant fold into subscript: exactly one `lag` node, `period == 15`.
    #[test]
    fn constant_fold_feeds_lag_period() {
        let registry = registry();
        let module = Module::new(vec![
            assign(vec![name("lookback_period", 1, 1)], bin_op(BinOpKind::Add, int(10, 1, 1), int(5, 1, 1), 1, 1), 1, 1),
            assign(
                vec![name("x", 2, 1)],
                subscript(attribute(name("src", 2, 1), "c", 2, 1), name("lookback_period", 2, 1), 2, 1),
                2,
                1,
            ),
            expr_stmt(
                call(call(name("trade_signal_executor", 3, 1), vec![], vec![], 3, 1), vec![bool_lit(true, 3, 1)], vec![], 3, 1),
                3,
                1,
            ),
        ]);

        let result = compile_script(&module, &registry, None).unwrap();
        let lags: Vec<_> = result.algorithm.iter().filter(|n| n.node_type == "lag").collect();
        assert_eq!(lags.len(), 1);
        assert_eq!(lags[0].options.get("period"), Some(&OptionValue::Number(15.0)));
    }

    /// S6 — boolean -> number coercion inserts `boolean_select`.
    #[test]
    fn boolean_arithmetic_inserts_boolean_select_cast() {
        let registry = registry();
        let module = Module::new(vec![
            assign(
                vec![name("a", 1, 1)],
                compare(attribute(name("src", 1, 1), "c", 1, 1), CmpOp::Gt, int(100, 1, 1), 1, 1),
                1,
                1,
            ),
            assign(vec![name("b", 2, 1)], bin_op(BinOpKind::Add, name("a", 2, 1), int(1, 2, 1), 2, 1), 2, 1),
            expr_stmt(
                call(call(name("trade_signal_executor", 3, 1), vec![], vec![], 3, 1), vec![name("a", 3, 1)], vec![], 3, 1),
                3,
                1,
            ),
        ]);

        let result = compile_script(&module, &registry, None).unwrap();
        assert!(result.algorithm.iter().any(|n| n.node_type == "boolean_select"));
    }

    #[test]
    fn missing_executor_is_an_error() {
        let registry = registry();
        let module = Module::new(vec![assign(
            vec![name("a", 1, 1)],
            call(name("sma", 1, 1), vec![attribute(name("src", 1, 1), "c", 1, 1)], vec![keyword("period", int(14, 1, 1))], 1, 1),
            1,
            1,
        )]);
        let err = compile_script(&module, &registry, None).unwrap_err();
        assert!(err.message.contains("trade_signal_executor"));
    }

    #[test]
    fn session_dependency_is_synthesized_and_survives_topo_sort() {
        let registry = registry();
        let module = Module::new(vec![expr_stmt(
            call(
                call(
                    name("trade_signal_executor", 1, 1),
                    vec![],
                    vec![keyword("session", str_lit("NewYork", 1, 1))],
                    1,
                    1,
                ),
                vec![bool_lit(true, 1, 1)],
                vec![],
                1,
                1,
            ),
            1,
            1,
        )]);
        let result = compile_script(&module, &registry, None).unwrap();
        assert_eq!(result.executor.session, Some(strategy_core::session::Session::NewYork));
        assert!(result.algorithm.iter().any(|n| n.node_type == "sessions"));
    }

    #[test]
    fn topological_order_is_respected_in_the_output() {
        let registry = registry();
        let module = Module::new(vec![
            assign(
                vec![name("s", 1, 1)],
                call(name("sma", 1, 1), vec![attribute(name("src", 1, 1), "c", 1, 1)], vec![keyword("period", int(14, 1, 1))], 1, 1),
                1,
                1,
            ),
            assign(
                vec![name("signal", 2, 1)],
                compare(name("s", 2, 1), CmpOp::Gt, int(0, 2, 1), 2, 1),
                2,
                1,
            ),
            expr_stmt(
                call(call(name("trade_signal_executor", 3, 1), vec![], vec![], 3, 1), vec![name("signal", 3, 1)], vec![], 3, 1),
                3,
                1,
            ),
        ]);
        let result = compile_script(&module, &registry, None).unwrap();
        let position: std::collections::HashMap<&str, usize> =
            result.algorithm.iter().enumerate().map(|(i, n)| (n.id.as_str(), i)).collect();
        for node in &result.algorithm {
            for r in node.input_refs() {
                let src_id = strategy_core::handle::node_id_of(r);
                if let Some(&src_pos) = position.get(src_id) {
                    let this_pos = position[node.id.as_str()];
                    assert!(src_pos < this_pos, "'{}' must come before '{}'", src_id, node.id);
                }
            }
        }
    }
}
