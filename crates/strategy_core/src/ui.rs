//! The UI graph (§3.3, §6): the JSON-shaped input both the validator and
//! the graph compiler walk. Field names mirror the wire shape described in
//! §6 ("UI graph in") rather than the internal snake_case the rest of this
//! crate favours, since this is the one module that has to round-trip
//! somebody else's JSON.

use crate::option_value::{self, OptionValue};
use crate::timeframe::{self, Timeframe};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// `UiNode.metadata` (§3.3): `{parent_id?, pos, size}`, wire-named per §6
/// (`parentId`, `position{x,y}`, `width`, `height`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    #[serde(default, rename = "parentId", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub position: Position,
    pub width: f64,
    pub height: f64,
}

/// A `UiOption` (§3.3): `{id, value?, display_name?, exposed}`, wire-named
/// `{id, value?, name?, isExposed?}` per §6.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiOption {
    pub id: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "option_value::deserialize_literal_opt"
    )]
    pub value: Option<OptionValue>,
    #[serde(default, rename = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, rename = "isExposed")]
    pub exposed: bool,
}

/// `UiNode { id, type, options[], metadata, timeframe? }` (§3.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub options: Vec<UiOption>,
    pub metadata: NodeMetadata,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "timeframe::deserialize_opt"
    )]
    pub timeframe: Option<Timeframe>,
}

impl UiNode {
    pub fn option(&self, option_id: &str) -> Option<&UiOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

/// `UiVertex { node_id, handle }` (§3.3), wire-named `{id, handle}` per §6.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiVertex {
    #[serde(rename = "id")]
    pub node_id: String,
    pub handle: String,
}

/// `UiEdge { source, target }` (§3.3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiEdge {
    pub source: UiVertex,
    pub target: UiVertex,
}

/// Layout-only group box; not part of compile logic (§3.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiGroupNode {
    pub id: String,
    #[serde(default, rename = "parentId", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Layout-only free-text annotation; not part of compile logic (§3.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiAnnotation {
    pub id: String,
    pub text: String,
    #[serde(default, rename = "parentId", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// `UiData { nodes, edges, groups, annotations }` (§3.3): the whole graph
/// as the validator and graph compiler receive it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UiData {
    #[serde(default)]
    pub nodes: Vec<UiNode>,
    #[serde(default)]
    pub edges: Vec<UiEdge>,
    #[serde(default)]
    pub groups: Vec<UiGroupNode>,
    #[serde(default)]
    pub annotations: Vec<UiAnnotation>,
}

impl UiData {
    pub fn node(&self, node_id: &str) -> Option<&UiNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_scalar_and_structured_timeframe() {
        let json = serde_json::json!({
            "id": "n1",
            "type": "sma",
            "options": [],
            "metadata": {"position": {"x": 0.0, "y": 0.0}, "width": 10.0, "height": 10.0},
            "timeframe": "1H"
        });
        let node: UiNode = serde_json::from_value(json).unwrap();
        assert_eq!(node.timeframe.unwrap().to_scalar(), "1H");

        let json2 = serde_json::json!({
            "id": "n2",
            "type": "sma",
            "options": [],
            "metadata": {"position": {"x": 0.0, "y": 0.0}, "width": 10.0, "height": 10.0},
            "timeframe": {"type": "hour", "interval": 1}
        });
        let node2: UiNode = serde_json::from_value(json2).unwrap();
        assert_eq!(node2.timeframe.unwrap().to_scalar(), "1H");
    }

    #[test]
    fn option_exposure_flag_maps_from_wire_name() {
        let json = serde_json::json!({"id": "period", "value": 20.0, "name": "Period", "isExposed": true});
        let opt: UiOption = serde_json::from_value(json).unwrap();
        assert!(opt.exposed);
        assert_eq!(opt.display_name.as_deref(), Some("Period"));
    }
}
