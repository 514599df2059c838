//! Timeframe resolution (C10, §4.8): every node without an explicit
//! `timeframe` inherits the coarsest timeframe among its resolved inputs,
//! falling back to the compilation's `base_timeframe` when that set is
//! empty — whether because the node has no inputs at all, or because none
//! of its inputs resolved to a timeframe either.

use std::collections::HashMap;

use strategy_core::timeframe::{coarsest, Timeframe};

use crate::context::CompilationContext;

/// Resolve every node's effective timeframe and write it back onto
/// `AlgorithmNode.timeframe` for nodes that didn't already declare one
/// explicitly. Memoized per node id with a recursion guard so a node
/// referenced by many downstream nodes is only resolved once, and a cyclic
/// reference (caught properly by the later topological sort) doesn't spin
/// forever here.
pub fn resolve_all(ctx: &mut CompilationContext, base_timeframe: Option<&Timeframe>) {
    let ids: Vec<String> = ctx.nodes.iter().map(|n| n.id.clone()).collect();
    let mut cache: HashMap<String, Option<Timeframe>> = HashMap::new();
    let mut in_progress: Vec<String> = Vec::new();
    for id in &ids {
        resolve_one(ctx, id, base_timeframe, &mut cache, &mut in_progress);
    }
    for id in &ids {
        if ctx.node(id).and_then(|n| n.timeframe.clone()).is_some() {
            continue;
        }
        if let Some(Some(resolved)) = cache.get(id) {
            ctx.node_mut(id).unwrap().timeframe = Some(resolved.clone());
        }
    }
}

fn resolve_one(
    ctx: &CompilationContext,
    id: &str,
    base_timeframe: Option<&Timeframe>,
    cache: &mut HashMap<String, Option<Timeframe>>,
    in_progress: &mut Vec<String>,
) -> Option<Timeframe> {
    if let Some(cached) = cache.get(id) {
        return cached.clone();
    }
    if in_progress.contains(&id.to_string()) {
        // Part of a reference cycle. Leave unresolved here; the
        // topological sort that runs later is what actually reports this.
        return None;
    }
    let Some(node) = ctx.node(id) else { return None };
    if let Some(explicit) = &node.timeframe {
        cache.insert(id.to_string(), Some(explicit.clone()));
        return Some(explicit.clone());
    }

    in_progress.push(id.to_string());
    let input_ids: Vec<String> = node.input_refs().filter_map(|r| r.split('#').next().map(str::to_string)).collect();
    let resolved_inputs: Vec<Timeframe> = input_ids
        .iter()
        .filter_map(|input_id| resolve_one(ctx, input_id, base_timeframe, cache, in_progress))
        .collect();
    in_progress.pop();

    let result = match coarsest(&resolved_inputs) {
        Some(tf) => Some(tf.clone()),
        None => base_timeframe.cloned(),
    };
    cache.insert(id.to_string(), result.clone());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use strategy_core::ir::AlgorithmNode;
    use strategy_core::metadata::MapRegistry;
    use strategy_core::timeframe::{TimeframeType, Timeframe};

    #[test]
    fn node_with_no_inputs_falls_back_to_base_timeframe() {
        let registry = MapRegistry::new([]);
        let mut ctx = CompilationContext::new(&registry);
        ctx.push(AlgorithmNode::new("a", "number"));
        let base = Timeframe::simple(TimeframeType::Hour, 1);
        resolve_all(&mut ctx, Some(&base));
        assert_eq!(ctx.node("a").unwrap().timeframe, Some(base));
    }

    #[test]
    fn node_inherits_the_coarsest_resolved_input() {
        let registry = MapRegistry::new([]);
        let mut ctx = CompilationContext::new(&registry);
        let mut minute_src = AlgorithmNode::new("src_minute", "number");
        minute_src.timeframe = Some(Timeframe::simple(TimeframeType::Minute, 5));
        ctx.push(minute_src);
        let mut day_src = AlgorithmNode::new("src_day", "number");
        day_src.timeframe = Some(Timeframe::simple(TimeframeType::Day, 1));
        ctx.push(day_src);
        let mut consumer = AlgorithmNode::new("c", "add");
        consumer.inputs.insert("SLOT0".to_string(), vec!["src_minute#result".to_string()]);
        consumer.inputs.insert("SLOT1".to_string(), vec!["src_day#result".to_string()]);
        ctx.push(consumer);

        resolve_all(&mut ctx, None);

        assert_eq!(ctx.node("c").unwrap().timeframe, Some(Timeframe::simple(TimeframeType::Day, 1)));
    }

    #[test]
    fn explicit_timeframe_is_never_overwritten() {
        let registry = MapRegistry::new([]);
        let mut ctx = CompilationContext::new(&registry);
        let mut n = AlgorithmNode::new("a", "number");
        n.timeframe = Some(Timeframe::simple(TimeframeType::Week, 1));
        ctx.push(n);
        resolve_all(&mut ctx, Some(&Timeframe::simple(TimeframeType::Minute, 1)));
        assert_eq!(ctx.node("a").unwrap().timeframe, Some(Timeframe::simple(TimeframeType::Week, 1)));
    }
}
