//! Component metadata (§3.1) and the read-only registry facade (C1).
//!
//! The registry itself — how `ComponentMetadata` gets populated — is an
//! external collaborator (§1). This module only defines the shape the
//! registry hands back and a trivial in-memory implementation good enough
//! to drive the rest of the workspace's tests.

use crate::data_type::DataType;
use crate::handle::normalize_handle_id;
use crate::option_value::OptionValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Option-value kind enumeration (§3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    Integer,
    Decimal,
    Boolean,
    String,
    Select,
    NumericList,
    StringList,
    Time,
    SqlStatement,
    CardSchema,
    EventMarkerSchema,
}

impl OptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::Integer => "Integer",
            OptionKind::Decimal => "Decimal",
            OptionKind::Boolean => "Boolean",
            OptionKind::String => "String",
            OptionKind::Select => "Select",
            OptionKind::NumericList => "NumericList",
            OptionKind::StringList => "StringList",
            OptionKind::Time => "Time",
            OptionKind::SqlStatement => "SqlStatement",
            OptionKind::CardSchema => "CardSchema",
            OptionKind::EventMarkerSchema => "EventMarkerSchema",
        }
    }
}

/// `OptionSpec` (§3.1): one declared option on a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    pub id: String,
    pub display_name: String,
    pub kind: OptionKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<OptionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_values: Option<Vec<String>>,
}

impl OptionSpec {
    pub fn new(id: impl Into<String>, kind: OptionKind) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            kind,
            required: false,
            default: None,
            min: None,
            max: None,
            step: None,
            select_values: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, v: OptionValue) -> Self {
        self.default = Some(v);
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_select_values(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.select_values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// `IOSpec` (§3.1): one declared input or output handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IOSpec {
    pub id: String,
    pub data_type: DataType,
    #[serde(default)]
    pub allow_multiple: bool,
}

impl IOSpec {
    pub fn new(id: impl Into<String>, data_type: DataType) -> Self {
        Self { id: id.into(), data_type, allow_multiple: false }
    }

    pub fn allow_multiple(mut self) -> Self {
        self.allow_multiple = true;
        self
    }

    /// The handle id as it appears on the wire, with slot rewriting applied
    /// (`*` -> `SLOT`, `*N` -> `SLOTN`).
    pub fn wire_id(&self) -> String {
        normalize_handle_id(&self.id)
    }
}

/// `ComponentMetadata` (§3.1): a registered component's full signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub options: Vec<OptionSpec>,
    #[serde(default)]
    pub inputs: Vec<IOSpec>,
    #[serde(default)]
    pub outputs: Vec<IOSpec>,
    #[serde(default)]
    pub at_least_one_input_required: bool,
    #[serde(default)]
    pub is_cross_sectional: bool,
}

impl ComponentMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            desc: String::new(),
            tags: Vec::new(),
            options: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            at_least_one_input_required: false,
            is_cross_sectional: false,
        }
    }

    pub fn with_options(mut self, options: impl IntoIterator<Item = OptionSpec>) -> Self {
        self.options = options.into_iter().collect();
        self
    }

    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = IOSpec>) -> Self {
        self.inputs = inputs.into_iter().collect();
        self
    }

    pub fn with_outputs(mut self, outputs: impl IntoIterator<Item = IOSpec>) -> Self {
        self.outputs = outputs.into_iter().collect();
        self
    }

    pub fn at_least_one_input_required(mut self) -> Self {
        self.at_least_one_input_required = true;
        self
    }

    pub fn option(&self, id: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|o| o.id == id)
    }

    /// Find a declared input by its wire id (post slot-rewriting).
    pub fn input_by_wire_id(&self, wire_id: &str) -> Option<&IOSpec> {
        self.inputs.iter().find(|i| i.wire_id() == wire_id)
    }

    /// Find a declared output by its wire id (post slot-rewriting).
    pub fn output_by_wire_id(&self, wire_id: &str) -> Option<&IOSpec> {
        self.outputs.iter().find(|o| o.wire_id() == wire_id)
    }

    /// A node is an executor either by the one name every registry is
    /// expected to carry, or by declaring the `executor` tag — the general
    /// escape hatch for registry-declared executor types beyond
    /// `trade_signal_executor` (e.g. a `trade_manager_executor`).
    pub fn is_executor(&self) -> bool {
        self.name == "trade_signal_executor" || self.tags.iter().any(|t| t == "executor")
    }
}

/// Read-only registry facade (C1): look up a component by name, or
/// enumerate everything known. The registry is populated by an external
/// collaborator; this crate only consumes it.
pub trait ComponentRegistry {
    fn lookup(&self, component_name: &str) -> Option<&ComponentMetadata>;
    fn all(&self) -> Box<dyn Iterator<Item = &ComponentMetadata> + '_>;
}

/// A trivial immutable, in-memory registry, sufficient for tests and for
/// embedders that already have their metadata in hand as a `Vec`.
#[derive(Debug, Clone, Default)]
pub struct MapRegistry {
    by_name: HashMap<String, ComponentMetadata>,
}

impl MapRegistry {
    pub fn new(components: impl IntoIterator<Item = ComponentMetadata>) -> Self {
        let by_name = components.into_iter().map(|c| (c.name.clone(), c)).collect();
        Self { by_name }
    }
}

impl ComponentRegistry for MapRegistry {
    fn lookup(&self, component_name: &str) -> Option<&ComponentMetadata> {
        self.by_name.get(component_name)
    }

    fn all(&self) -> Box<dyn Iterator<Item = &ComponentMetadata> + '_> {
        Box::new(self.by_name.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_inputs_resolve_by_wire_id() {
        let sma = ComponentMetadata::new("sma")
            .with_inputs([IOSpec::new("*", DataType::Decimal)])
            .with_outputs([IOSpec::new("result", DataType::Decimal)]);
        assert!(sma.input_by_wire_id("SLOT").is_some());
        assert!(sma.input_by_wire_id("*").is_none());
    }

    #[test]
    fn executor_tag_generalizes_beyond_the_builtin_name() {
        let tagged = ComponentMetadata::new("trade_manager_executor").with_options([]);
        assert!(!tagged.is_executor());
        let tagged = ComponentMetadata { tags: vec!["executor".to_string()], ..ComponentMetadata::new("trade_manager_executor") };
        assert!(tagged.is_executor());
        assert!(ComponentMetadata::new("trade_signal_executor").is_executor());
    }

    #[test]
    fn registry_lookup_roundtrip() {
        let reg = MapRegistry::new([ComponentMetadata::new("sma")]);
        assert!(reg.lookup("sma").is_some());
        assert!(reg.lookup("ema").is_none());
        assert_eq!(reg.all().count(), 1);
    }
}
