//! Common-subexpression elimination (C11, §4.9): after timeframe
//! resolution, any two nodes that are structurally identical — same
//! `node_type`, same options, same inputs (resolved to their *current*
//! canonical id, so chains of duplicates collapse in one pass), and, for
//! anything other than a bare scalar literal, the same `timeframe`/
//! `session` — collapse to one, and every reference to the dropped node is
//! rewritten to the surviving one. Executors are never deduplicated (§4.9:
//! a script may legitimately contain more than one identical-looking
//! executor call).

use std::collections::HashMap;

use strategy_core::ir::AlgorithmNode;
use strategy_core::option_value::OptionValue;

use crate::context::CompilationContext;

/// Node types exempt from the timeframe/session half of the equality check
/// (§4.9): a numeric or boolean or text constant, or `null`, means the same
/// thing on every timeframe, so two otherwise-identical literals collapse
/// even if one sits on an hourly branch and the other on a daily one.
const SCALAR_TYPES: [&str; 5] = ["number", "bool_true", "bool_false", "text", "null"];

fn should_exclude_from_cse(node: &AlgorithmNode, ctx: &CompilationContext) -> bool {
    ctx.registry.lookup(&node.node_type).map(|m| m.is_executor()).unwrap_or(false)
}

fn is_scalar_type(node_type: &str) -> bool {
    SCALAR_TYPES.contains(&node_type)
}

/// FNV-style combine used to fold a node's structural fields into one hash
/// bucket key (§4.9).
fn hash_combine(seed: u64, h: u64) -> u64 {
    seed ^ h.wrapping_add(0x9e3779b9).wrapping_add(seed << 6).wrapping_add(seed >> 2)
}

fn hash_str(s: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

fn hash_option(v: &OptionValue) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    match v {
        OptionValue::Number(n) => n.to_bits().hash(&mut hasher),
        OptionValue::Bool(b) => b.hash(&mut hasher),
        OptionValue::Text(s) => s.hash(&mut hasher),
        OptionValue::Ref { ref_name } => ref_name.hash(&mut hasher),
        OptionValue::Time(h, m, s) => (h, m, s).hash(&mut hasher),
        OptionValue::Sql(s) => s.hash(&mut hasher),
        OptionValue::CardSchema(j) => j.to_string().hash(&mut hasher),
        OptionValue::Sequence(items) => {
            for item in items {
                hash_option(item).hash(&mut hasher);
            }
        }
    }
    hasher.finish()
}

/// Structural hash of a node, given the *already-canonicalized* ids its
/// inputs currently point at. Resolves to the same bucket key used by
/// `structurally_equal` below.
fn structural_hash(node: &AlgorithmNode, canonical_ref: impl Fn(&str) -> String) -> u64 {
    let mut seed = hash_str(&node.node_type);
    for (handle, refs) in &node.options_and_inputs_in_order(&canonical_ref) {
        seed = hash_combine(seed, hash_str(handle));
        for r in refs {
            seed = hash_combine(seed, hash_str(r));
        }
    }
    if !is_scalar_type(&node.node_type) {
        if let Some(tf) = &node.timeframe {
            seed = hash_combine(seed, hash_str(&tf.to_scalar()));
        }
        if let Some(session) = node.session {
            seed = hash_combine(seed, hash_str(session.as_str()));
        }
    }
    seed
}

fn structurally_equal(a: &AlgorithmNode, b: &AlgorithmNode, canonical_ref: impl Fn(&str) -> String) -> bool {
    if a.node_type != b.node_type {
        return false;
    }
    if a.options != b.options {
        return false;
    }
    let a_inputs: HashMap<&str, Vec<String>> = a.inputs.iter().map(|(k, v)| (k.as_str(), v.iter().map(|r| canonical_ref(r)).collect())).collect();
    let b_inputs: HashMap<&str, Vec<String>> = b.inputs.iter().map(|(k, v)| (k.as_str(), v.iter().map(|r| canonical_ref(r)).collect())).collect();
    if a_inputs != b_inputs {
        return false;
    }
    if is_scalar_type(&a.node_type) {
        return true;
    }
    a.timeframe == b.timeframe && a.session == b.session
}

/// Collapse structurally identical nodes and rewrite every surviving
/// reference. Runs to a fixed point: eliminating one layer of duplicates
/// can make a second layer identical (two `add` nodes whose distinct
/// `sma` inputs just got merged), so the bucket-and-scan pass repeats
/// until nothing new is merged.
pub fn run(ctx: &mut CompilationContext) {
    loop {
        let mut canonical: HashMap<String, String> = HashMap::new();
        let canonical_ref = |r: &str| -> String {
            match r.split_once('#') {
                Some((id, handle)) => format!("{}#{handle}", canonical.get(id).cloned().unwrap_or_else(|| id.to_string())),
                None => r.to_string(),
            }
        };

        let mut buckets: HashMap<u64, Vec<usize>> = HashMap::new();
        let mut merged_any = false;

        for (idx, node) in ctx.nodes.iter().enumerate() {
            if should_exclude_from_cse(node, ctx) {
                continue;
            }
            let key = structural_hash(node, |r| canonical_ref_closure(&canonical, r));
            let bucket = buckets.entry(key).or_default();
            let mut survivor = None;
            for &existing_idx in bucket.iter() {
                if structurally_equal(&ctx.nodes[existing_idx], node, |r| canonical_ref_closure(&canonical, r)) {
                    survivor = Some(ctx.nodes[existing_idx].id.clone());
                    break;
                }
            }
            match survivor {
                Some(survivor_id) => {
                    canonical.insert(node.id.clone(), survivor_id);
                    merged_any = true;
                }
                None => bucket.push(idx),
            }
        }

        if !merged_any {
            break;
        }

        rewrite_references(ctx, &canonical);
        drop_merged_nodes(ctx, &canonical);
    }
}

fn canonical_ref_closure(canonical: &HashMap<String, String>, r: &str) -> String {
    match r.split_once('#') {
        Some((id, handle)) => format!("{}#{handle}", canonical.get(id).cloned().unwrap_or_else(|| id.to_string())),
        None => r.to_string(),
    }
}

fn rewrite_references(ctx: &mut CompilationContext, canonical: &HashMap<String, String>) {
    for node in &mut ctx.nodes {
        for refs in node.inputs.values_mut() {
            for r in refs.iter_mut() {
                if let Some((id, handle)) = r.split_once('#') {
                    if let Some(survivor) = canonical.get(id) {
                        *r = format!("{survivor}#{handle}");
                    }
                }
            }
        }
    }
}

fn drop_merged_nodes(ctx: &mut CompilationContext, canonical: &HashMap<String, String>) {
    ctx.nodes.retain(|n| !canonical.contains_key(&n.id));
    ctx.index.clear();
    for (idx, node) in ctx.nodes.iter().enumerate() {
        ctx.index.insert(node.id.clone(), idx);
    }
}

trait NodeFieldsInOrder {
    fn options_and_inputs_in_order(&self, canonical_ref: impl Fn(&str) -> String) -> Vec<(String, Vec<String>)>;
}

impl NodeFieldsInOrder for AlgorithmNode {
    fn options_and_inputs_in_order(&self, canonical_ref: impl Fn(&str) -> String) -> Vec<(String, Vec<String>)> {
        let mut out: Vec<(String, Vec<String>)> = Vec::new();
        for (k, v) in &self.options {
            out.push((k.clone(), vec![format!("{:?}", hash_option(v))]));
        }
        for (k, v) in &self.inputs {
            out.push((k.clone(), v.iter().map(|r| canonical_ref(r)).collect()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use strategy_core::metadata::{ComponentMetadata, ComponentRegistry, MapRegistry};

    fn registry() -> MapRegistry {
        MapRegistry::new([ComponentMetadata::new("trade_signal_executor")])
    }

    fn ctx_of_literals(values: &[f64]) -> CompilationContext<'static> {
        // Leaked so the borrow can outlive this helper; tests are short-lived
        // processes and the registry is tiny, so this is a fine trade for a
        // proptest helper that needs a `'static` context.
        let registry: &'static dyn ComponentRegistry = Box::leak(Box::new(registry()));
        let mut ctx = CompilationContext::new(registry);
        for (i, v) in values.iter().enumerate() {
            let mut node = AlgorithmNode::new(format!("number_{i}"), "number");
            node.options.insert("value".to_string(), OptionValue::Number(*v));
            ctx.push(node);
        }
        ctx
    }

    #[test]
    fn identical_sibling_literals_collapse_to_one() {
        let registry = registry();
        let mut ctx = CompilationContext::new(&registry);
        let mut a = AlgorithmNode::new("number_0", "number");
        a.options.insert("value".to_string(), OptionValue::Number(5.0));
        ctx.push(a);
        let mut b = AlgorithmNode::new("number_1", "number");
        b.options.insert("value".to_string(), OptionValue::Number(5.0));
        ctx.push(b);
        let mut consumer = AlgorithmNode::new("add_0", "add");
        consumer.inputs.insert("SLOT0".to_string(), vec!["number_0#result".to_string()]);
        consumer.inputs.insert("SLOT1".to_string(), vec!["number_1#result".to_string()]);
        ctx.push(consumer);

        run(&mut ctx);

        assert_eq!(ctx.nodes.iter().filter(|n| n.node_type == "number").count(), 1);
        let consumer = ctx.nodes.iter().find(|n| n.node_type == "add").unwrap();
        let slot0 = &consumer.inputs["SLOT0"][0];
        let slot1 = &consumer.inputs["SLOT1"][0];
        assert_eq!(slot0, slot1);
    }

    #[test]
    fn distinct_literal_values_are_kept_separate() {
        let registry = registry();
        let mut ctx = CompilationContext::new(&registry);
        let mut a = AlgorithmNode::new("number_0", "number");
        a.options.insert("value".to_string(), OptionValue::Number(5.0));
        ctx.push(a);
        let mut b = AlgorithmNode::new("number_1", "number");
        b.options.insert("value".to_string(), OptionValue::Number(6.0));
        ctx.push(b);

        run(&mut ctx);

        assert_eq!(ctx.nodes.len(), 2);
    }

    #[test]
    fn executors_are_never_merged_even_when_identical() {
        let registry = registry();
        let mut ctx = CompilationContext::new(&registry);
        ctx.push(AlgorithmNode::new("exec_0", "trade_signal_executor"));
        ctx.push(AlgorithmNode::new("exec_1", "trade_signal_executor"));

        run(&mut ctx);

        assert_eq!(ctx.nodes.iter().filter(|n| n.node_type == "trade_signal_executor").count(), 2);
    }

    proptest! {
        /// CSE never merges nodes with different scalar values, and a second
        /// pass over an already-reduced context is a no-op: the survivor set
        /// it picks the first time is already a fixed point.
        #[test]
        fn distinct_literals_survive_and_a_second_pass_changes_nothing(values in prop::collection::vec(-1000.0f64..1000.0, 1..12)) {
            let mut ctx = ctx_of_literals(&values);
            run(&mut ctx);

            let distinct_values: std::collections::BTreeSet<u64> = values.iter().map(|v| v.to_bits()).collect();
            prop_assert_eq!(ctx.nodes.len(), distinct_values.len());

            let before = ctx.nodes.clone();
            run(&mut ctx);
            prop_assert_eq!(ctx.nodes, before);
        }
    }
}
