//! The private cache phase 1 builds and later phases consume (§4.1: "earlier
//! phases populate a private cache consumed by later ones").

use std::collections::{HashMap, HashSet};
use strategy_core::metadata::ComponentMetadata;
use strategy_core::timeframe::Timeframe;
use strategy_core::ui::{UiData, UiVertex};

/// `node_id -> handle_id -> [source vertex, ...]`, built once from
/// `graph.edges` before any edge is itself validated (§4.1 phase 1).
pub type ReverseIndex = HashMap<String, HashMap<String, Vec<UiVertex>>>;

pub struct ValidationCache {
    pub metadata: HashMap<String, Option<ComponentMetadata>>,
    pub input_refs: ReverseIndex,
    pub output_refs: ReverseIndex,
    pub touched: HashSet<String>,
    pub topo_order: Vec<String>,
    pub timeframes: HashMap<String, Option<Timeframe>>,
}

impl ValidationCache {
    pub fn new() -> Self {
        Self {
            metadata: HashMap::new(),
            input_refs: HashMap::new(),
            output_refs: HashMap::new(),
            touched: HashSet::new(),
            topo_order: Vec::new(),
            timeframes: HashMap::new(),
        }
    }

    pub fn bound_sources(&self, node_id: &str) -> Vec<&str> {
        self.input_refs
            .get(node_id)
            .map(|handles| handles.values().flat_map(|v| v.iter().map(|vx| vx.node_id.as_str())).collect())
            .unwrap_or_default()
    }
}

/// Build `input_refs`/`output_refs`/`touched` from the graph's raw edge
/// list, before any edge has been checked for validity. This is
/// deliberately tolerant of malformed edges (dangling node ids, unknown
/// handles) — it only organizes what is there; the edge phase is what
/// judges it.
pub fn build_reverse_index(graph: &UiData) -> (ReverseIndex, ReverseIndex, HashSet<String>) {
    let mut input_refs: ReverseIndex = HashMap::new();
    let mut output_refs: ReverseIndex = HashMap::new();
    let mut touched = HashSet::new();

    for edge in &graph.edges {
        input_refs
            .entry(edge.target.node_id.clone())
            .or_default()
            .entry(edge.target.handle.clone())
            .or_default()
            .push(edge.source.clone());
        output_refs
            .entry(edge.source.node_id.clone())
            .or_default()
            .entry(edge.source.handle.clone())
            .or_default()
            .push(edge.target.clone());
        touched.insert(edge.source.node_id.clone());
        touched.insert(edge.target.node_id.clone());
    }

    (input_refs, output_refs, touched)
}
