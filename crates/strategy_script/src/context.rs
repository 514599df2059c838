//! The single mutable `CompilationContext` the script pipeline threads
//! through every stage (§5, §9): the node vector, a stable id index, the
//! variable binding table, and the output-type override table. Vector
//! growth can relocate nodes, so every lookup re-resolves by id through
//! `index` rather than holding a reference across a `push`.

use std::collections::HashMap;

use strategy_core::data_type::DataType;
use strategy_core::ir::AlgorithmNode;
use strategy_core::metadata::ComponentRegistry;

/// What a script-level name is bound to (§4.5).
#[derive(Debug, Clone)]
pub enum Binding {
    /// `name -> "node_id.handle"`.
    Handle { node_id: String, handle: String },
    /// `name -> <component>`: resolve the sole declared output via metadata
    /// when the name is read.
    Component { node_id: String, component: String },
}

pub struct CompilationContext<'a> {
    pub registry: &'a dyn ComponentRegistry,
    pub nodes: Vec<AlgorithmNode>,
    pub index: HashMap<String, usize>,
    pub variables: HashMap<String, Binding>,
    /// Explicit output-type overrides (§4.7), populated by the cast inserter
    /// for the synthetic nodes it creates.
    pub output_types: HashMap<(String, String), DataType>,
    id_counters: HashMap<String, u64>,
}

impl<'a> CompilationContext<'a> {
    pub fn new(registry: &'a dyn ComponentRegistry) -> Self {
        Self {
            registry,
            nodes: Vec::new(),
            index: HashMap::new(),
            variables: HashMap::new(),
            output_types: HashMap::new(),
            id_counters: HashMap::new(),
        }
    }

    /// `base_k` for the smallest `k >= 0` not yet used (§4.5).
    pub fn fresh_id(&mut self, base: &str) -> String {
        let counter = self.id_counters.entry(base.to_string()).or_insert(0);
        loop {
            let candidate = format!("{base}_{counter}");
            *counter += 1;
            if !self.index.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    pub fn push(&mut self, node: AlgorithmNode) {
        let idx = self.nodes.len();
        self.index.insert(node.id.clone(), idx);
        self.nodes.push(node);
    }

    pub fn node(&self, id: &str) -> Option<&AlgorithmNode> {
        let idx = *self.index.get(id)?;
        self.nodes.get(idx)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut AlgorithmNode> {
        let idx = *self.index.get(id)?;
        self.nodes.get_mut(idx)
    }
}
