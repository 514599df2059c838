//! Special-parameter handling (C9, §4.6). `timeframe` and `session` never
//! enter a node's `options` map — they're canonicalized separately and
//! written directly onto `AlgorithmNode.timeframe` / `.session`. Once the
//! main AST walk is done, `verify_session_dependencies` synthesizes the
//! `sessions` node any session-bearing node implicitly depends on.

use std::collections::BTreeSet;
use std::str::FromStr;

use strategy_core::ir::AlgorithmNode;
use strategy_core::option_value::OptionValue;
use strategy_core::session::Session;
use strategy_core::timeframe::{self, Timeframe};

use crate::context::CompilationContext;
use crate::error::ScriptError;

const SESSIONS_TYPE: &str = "sessions";

/// An empty string is silently dropped (§4.6): no timeframe is set.
pub fn canonicalize_timeframe(raw: &str) -> Result<Option<Timeframe>, ScriptError> {
    if raw.is_empty() {
        return Ok(None);
    }
    timeframe::parse_scalar(raw).map(Some).map_err(|e| ScriptError::general(format!("invalid timeframe {raw:?}: {e}")))
}

/// The eight session names parse exact-case (§3.3); anything else is rejected.
pub fn canonicalize_session(raw: &str) -> Result<Session, ScriptError> {
    Session::from_str(raw).map_err(|e| ScriptError::general(format!("invalid session {raw:?}: {e}")))
}

/// Write a parsed `timeframe`/`session` pair directly onto a node's fields.
pub fn apply_special_fields(node: &mut AlgorithmNode, timeframe_raw: Option<&str>, session_raw: Option<&str>) -> Result<(), ScriptError> {
    if let Some(raw) = timeframe_raw {
        node.timeframe = canonicalize_timeframe(raw)?;
    }
    if let Some(raw) = session_raw {
        node.session = Some(canonicalize_session(raw)?);
    }
    Ok(())
}

/// `VerifySessionDependencies` (§4.6): group every non-`sessions` node that
/// carries a `session` by `(session, timeframe)`, and synthesize a matching
/// `sessions` node for any group that doesn't already have one. The
/// synthesized id comes from the ordinary `fresh_id("sessions")` allocator,
/// which already counts per base name from zero independently of every
/// other base — no separate counter is needed to get "starts at 0".
pub fn verify_session_dependencies(ctx: &mut CompilationContext) {
    let mut groups: BTreeSet<(String, String)> = BTreeSet::new();
    for node in &ctx.nodes {
        if node.node_type == SESSIONS_TYPE {
            continue;
        }
        if let Some(session) = node.session {
            let tf_key = node.timeframe.as_ref().map(Timeframe::to_scalar).unwrap_or_default();
            groups.insert((session.as_str().to_string(), tf_key));
        }
    }

    for (session_name, tf_key) in groups {
        let exists = ctx.nodes.iter().any(|n| {
            n.node_type == SESSIONS_TYPE
                && n.options.get("session_type").and_then(OptionValue::as_text) == Some(session_name.as_str())
                && n.timeframe.as_ref().map(Timeframe::to_scalar).unwrap_or_default() == tf_key
        });
        if exists {
            continue;
        }
        let id = ctx.fresh_id(SESSIONS_TYPE);
        log::debug!("synthesizing session dependency node '{id}' for session '{session_name}'");
        let mut node = AlgorithmNode::new(id, SESSIONS_TYPE);
        node.options.insert("session_type".to_string(), OptionValue::Text(session_name));
        if !tf_key.is_empty() {
            node.timeframe = timeframe::parse_scalar(&tf_key).ok();
        }
        ctx.push(node);
    }
}
