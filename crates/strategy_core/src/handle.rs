//! Handle ids and "node_id#handle" references (§3, glossary).

use crate::errors::CoreError;
use std::fmt;

/// Rewrite a declared input/output id per §3.1: a leading `*` becomes the
/// positional slot name `SLOT`, `*N` becomes `SLOTN`. Ids that don't start
/// with `*` pass through unchanged.
pub fn normalize_handle_id(declared_id: &str) -> String {
    match declared_id.strip_prefix('*') {
        Some(rest) => format!("SLOT{rest}"),
        None => declared_id.to_string(),
    }
}

/// A fully-qualified reference into another node's output, the wire form
/// used inside `AlgorithmNode.inputs`: `"source_id#source_handle"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef {
    pub node_id: String,
    pub handle: String,
}

impl NodeRef {
    pub fn new(node_id: impl Into<String>, handle: impl Into<String>) -> Self {
        Self { node_id: node_id.into(), handle: handle.into() }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.node_id, self.handle)
    }
}

impl std::str::FromStr for NodeRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (node_id, handle) = s
            .split_once('#')
            .ok_or_else(|| CoreError::MalformedReference(s.to_string()))?;
        if node_id.is_empty() || handle.is_empty() {
            return Err(CoreError::MalformedReference(s.to_string()));
        }
        Ok(NodeRef::new(node_id, handle))
    }
}

/// Extract just the node-id prefix of a `"node_id#handle"` reference,
/// without validating the handle. Used by the CSE rewrite pass and the
/// topological sorter, which only care about the source node.
pub fn node_id_of(reference: &str) -> &str {
    reference.split_once('#').map(|(id, _)| id).unwrap_or(reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_rewriting() {
        assert_eq!(normalize_handle_id("*"), "SLOT");
        assert_eq!(normalize_handle_id("*0"), "SLOT0");
        assert_eq!(normalize_handle_id("*1"), "SLOT1");
        assert_eq!(normalize_handle_id("condition"), "condition");
    }

    #[test]
    fn parses_valid_reference() {
        let r: NodeRef = "sma_0#result".parse().unwrap();
        assert_eq!(r.node_id, "sma_0");
        assert_eq!(r.handle, "result");
        assert_eq!(r.to_string(), "sma_0#result");
    }

    #[test]
    fn rejects_malformed_reference() {
        assert!("no_hash_here".parse::<NodeRef>().is_err());
        assert!("#result".parse::<NodeRef>().is_err());
        assert!("sma_0#".parse::<NodeRef>().is_err());
    }

    #[test]
    fn node_id_of_extracts_prefix() {
        assert_eq!(node_id_of("sma_0#result"), "sma_0");
        assert_eq!(node_id_of("bare"), "bare");
    }
}
