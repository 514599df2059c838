//! The algorithm IR (§3.4): `AlgorithmNode` and `PartialTradeSignalMetaData`,
//! the one canonical shape both the UI-graph path and the script path
//! compile down to.

use crate::metadata::OptionSpec;
use crate::option_value::OptionValue;
use crate::session::Session;
use crate::timeframe::Timeframe;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `AlgorithmNode` (§3.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,
    /// `target_handle -> [source_id#source_handle, ...]` (§3.4).
    #[serde(default)]
    pub inputs: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<Timeframe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

impl AlgorithmNode {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            options: BTreeMap::new(),
            inputs: BTreeMap::new(),
            timeframe: None,
            session: None,
        }
    }

    /// All `src_id#handle` references this node consumes, across every
    /// input handle, in a stable (handle-sorted) order. Used by the
    /// topological sorter and the CSE rewrite pass.
    pub fn input_refs(&self) -> impl Iterator<Item = &str> {
        self.inputs.values().flat_map(|v| v.iter().map(String::as_str))
    }
}

/// `PartialTradeSignalMetaData` (§3.4): the finished IR — the executor
/// split out from the rest, plus any options hoisted for exposure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialTradeSignalMetaData {
    #[serde(default)]
    pub options: Vec<OptionSpec>,
    pub algorithm: Vec<AlgorithmNode>,
    pub executor: AlgorithmNode,
}
