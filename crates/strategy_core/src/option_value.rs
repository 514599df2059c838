//! The option-value tagged union (§3.2) and metadata-driven coercion (C2, §4.3).

use crate::metadata::{ComponentMetadata, OptionKind, OptionSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeSet;

/// `OptionValue` (§3.2): the tagged union every option binds to, whether it
/// arrived as a UI-graph literal or was parsed out of a script's keyword
/// argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OptionValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Ref { ref_name: String },
    /// Hour/minute/second time-of-day literal.
    Time(u8, u8, u8),
    Sql(String),
    /// JSON payload for `CardSchema` / `EventMarkerSchema` options.
    CardSchema(Json),
    Sequence(Vec<OptionValue>),
}

impl OptionValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            OptionValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            OptionValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, OptionValue::Ref { .. })
    }

    /// Interpret a raw JSON literal (as a UI graph's `UiOption.value` or a
    /// folded script constant arrives) as an untagged `OptionValue`, before
    /// `parse_option` coerces it against an `OptionSpec.kind`. `null` has
    /// no `OptionValue` representation and maps to `None`.
    pub fn from_json_literal(value: &Json) -> Option<OptionValue> {
        match value {
            Json::Number(n) => n.as_f64().map(OptionValue::Number),
            Json::Bool(b) => Some(OptionValue::Bool(*b)),
            Json::String(s) => Some(OptionValue::Text(s.clone())),
            Json::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(OptionValue::from_json_literal(item)?);
                }
                Some(OptionValue::Sequence(out))
            }
            Json::Object(_) => Some(OptionValue::CardSchema(value.clone())),
            Json::Null => None,
        }
    }
}

/// `serde(deserialize_with = ...)` helper for a `UiOption.value` field: the
/// wire shape is a bare JSON literal, not this crate's tagged `OptionValue`
/// encoding.
pub fn deserialize_literal_opt<'de, D>(deserializer: D) -> Result<Option<OptionValue>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<Json> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|v| OptionValue::from_json_literal(&v)))
}

/// One coercion failure, carrying a human-readable message and a ready-to-
/// display suggestion per §7 (`"Change option 'period' of node 'sma_0' to a
/// value between 1 and 10000. Suggested value: 14."`). Callers (the
/// validator, the script compiler) translate `kind` into the appropriate
/// `IssueCode`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionError {
    pub kind: CoercionErrorKind,
    pub option_id: String,
    pub message: String,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CoercionErrorKind {
    WrongValueType,
    OutOfRange,
    NotInSelectValues,
    InvalidTimeFormat,
    InvalidSlotReference,
    OutputCountMismatch,
    MissingRequired,
}

fn err(
    kind: CoercionErrorKind,
    option_id: &str,
    message: impl Into<String>,
    suggestion: Option<String>,
) -> CoercionError {
    CoercionError { kind, option_id: option_id.to_string(), message: message.into(), suggestion }
}

/// Parse `HH:MM[:SS]` into an `(h, m, s)` triple, per §4.3.
pub fn parse_time_literal(raw: &str) -> Option<(u8, u8, u8)> {
    let mut parts = raw.split(':');
    let h: u8 = parts.next()?.parse().ok()?;
    let m: u8 = parts.next()?.parse().ok()?;
    let s: u8 = match parts.next() {
        Some(s) => s.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() || h > 23 || m > 59 || s > 59 {
        return None;
    }
    Some((h, m, s))
}

/// Scan `text` for `SLOT<digits>` tokens and return the set of slot indices
/// referenced. Used to validate `SqlStatement`/`CardSchema`/
/// `EventMarkerSchema` option values against a component's declared output
/// count (§4.3): every referenced slot must address a real output, and no
/// output may go unaddressed.
pub fn extract_slot_references(text: &str) -> BTreeSet<usize> {
    let bytes = text.as_bytes();
    let mut out = BTreeSet::new();
    let mut i = 0;
    while i + 4 < bytes.len() {
        if &bytes[i..i + 4] == b"SLOT" {
            let mut j = i + 4;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > i + 4 {
                if let Ok(n) = text[i + 4..j].parse::<usize>() {
                    out.insert(n);
                }
            }
            i = j;
        } else {
            i += 1;
        }
    }
    out
}

fn validate_slot_references(
    option_id: &str,
    text: &str,
    declared_outputs: usize,
) -> Result<(), CoercionError> {
    let refs = extract_slot_references(text);
    if let Some(&max) = refs.iter().max() {
        if max + 1 > declared_outputs {
            return Err(err(
                CoercionErrorKind::OutputCountMismatch,
                option_id,
                format!(
                    "references SLOT{max} but the component only declares {declared_outputs} output(s)"
                ),
                Some(format!("use only SLOT0..SLOT{}", declared_outputs.saturating_sub(1))),
            ));
        }
    }
    Ok(())
}

/// `parse_option` (C2, §4.3): the registry-driven coercion shared by the
/// UI-graph path and the script path. `raw` is the value as supplied by the
/// caller (already `OptionValue`-shaped — the UI graph and the script
/// keyword-argument evaluator both produce `OptionValue` before calling
/// here); `spec` is the declared option; `comp` supplies `outputs.len()`
/// for `SqlStatement`/schema validation.
pub fn parse_option(
    raw: &OptionValue,
    spec: &OptionSpec,
    comp: &ComponentMetadata,
) -> Result<OptionValue, CoercionError> {
    match spec.kind {
        OptionKind::Integer | OptionKind::Decimal => {
            let n = raw.as_number().ok_or_else(|| {
                err(
                    CoercionErrorKind::WrongValueType,
                    &spec.id,
                    format!("option '{}' expects a number", spec.id),
                    None,
                )
            })?;
            let min = spec.min.unwrap_or(f64::NEG_INFINITY);
            let max = spec.max.unwrap_or(f64::INFINITY);
            let clamped = n.clamp(min, max);
            let clamped = if spec.kind == OptionKind::Integer { clamped.trunc() } else { clamped };
            Ok(OptionValue::Number(clamped))
        }
        OptionKind::Boolean => {
            let b = raw.as_bool().ok_or_else(|| {
                err(
                    CoercionErrorKind::WrongValueType,
                    &spec.id,
                    format!("option '{}' expects a boolean", spec.id),
                    None,
                )
            })?;
            Ok(OptionValue::Bool(b))
        }
        OptionKind::String => {
            let s = raw.as_text().ok_or_else(|| {
                err(
                    CoercionErrorKind::WrongValueType,
                    &spec.id,
                    format!("option '{}' expects a string", spec.id),
                    None,
                )
            })?;
            Ok(OptionValue::Text(s.to_string()))
        }
        OptionKind::Select => {
            let s = raw.as_text().ok_or_else(|| {
                err(
                    CoercionErrorKind::WrongValueType,
                    &spec.id,
                    format!("option '{}' expects a string", spec.id),
                    None,
                )
            })?;
            let allowed = spec.select_values.as_deref().unwrap_or(&[]);
            if !allowed.iter().any(|v| v == s) {
                return Err(err(
                    CoercionErrorKind::NotInSelectValues,
                    &spec.id,
                    format!(
                        "option '{}' value {:?} is not one of the allowed values",
                        spec.id, s
                    ),
                    Some(format!("choose one of: {}", allowed.join(", "))),
                ));
            }
            Ok(OptionValue::Text(s.to_string()))
        }
        OptionKind::Time => {
            let s = raw.as_text().ok_or_else(|| {
                err(
                    CoercionErrorKind::WrongValueType,
                    &spec.id,
                    format!("option '{}' expects a time string", spec.id),
                    None,
                )
            })?;
            let (h, m, sec) = parse_time_literal(s).ok_or_else(|| {
                err(
                    CoercionErrorKind::InvalidTimeFormat,
                    &spec.id,
                    format!("option '{}' value {:?} is not HH:MM[:SS]", spec.id, s),
                    Some("use HH:MM or HH:MM:SS, 24-hour clock".to_string()),
                )
            })?;
            Ok(OptionValue::Time(h, m, sec))
        }
        OptionKind::NumericList => {
            let seq = expect_sequence(raw, &spec.id)?;
            for item in &seq {
                if item.as_number().is_none() {
                    return Err(err(
                        CoercionErrorKind::WrongValueType,
                        &spec.id,
                        format!("option '{}' must contain only numbers", spec.id),
                        None,
                    ));
                }
            }
            Ok(OptionValue::Sequence(seq))
        }
        OptionKind::StringList => {
            let seq = expect_sequence(raw, &spec.id)?;
            for item in &seq {
                if item.as_text().is_none() {
                    return Err(err(
                        CoercionErrorKind::WrongValueType,
                        &spec.id,
                        format!("option '{}' must contain only strings", spec.id),
                        None,
                    ));
                }
            }
            Ok(OptionValue::Sequence(seq))
        }
        OptionKind::SqlStatement => {
            let s = raw.as_text().ok_or_else(|| {
                err(
                    CoercionErrorKind::WrongValueType,
                    &spec.id,
                    format!("option '{}' expects a SQL string", spec.id),
                    None,
                )
            })?;
            validate_slot_references(&spec.id, s, comp.outputs.len())?;
            Ok(OptionValue::Sql(s.to_string()))
        }
        OptionKind::CardSchema | OptionKind::EventMarkerSchema => {
            let json = match raw {
                OptionValue::CardSchema(v) => v.clone(),
                OptionValue::Text(s) => {
                    let trimmed = s.trim();
                    serde_json::from_str(trimmed).map_err(|e| {
                        err(
                            CoercionErrorKind::WrongValueType,
                            &spec.id,
                            format!("option '{}' is not valid JSON: {e}", spec.id),
                            None,
                        )
                    })?
                }
                _ => {
                    return Err(err(
                        CoercionErrorKind::WrongValueType,
                        &spec.id,
                        format!("option '{}' expects JSON text or a pre-parsed schema", spec.id),
                        None,
                    ))
                }
            };
            let text = json.to_string();
            validate_slot_references(&spec.id, &text, comp.outputs.len())?;
            if let Some(sql) = json.get("sql").and_then(|v| v.as_str()) {
                validate_slot_references(&spec.id, sql, comp.outputs.len())?;
            }
            Ok(OptionValue::CardSchema(json))
        }
    }
}

fn expect_sequence(raw: &OptionValue, option_id: &str) -> Result<Vec<OptionValue>, CoercionError> {
    match raw {
        OptionValue::Sequence(items) => Ok(items.clone()),
        _ => Err(err(
            CoercionErrorKind::WrongValueType,
            option_id,
            format!("option '{option_id}' expects a list"),
            None,
        )),
    }
}

/// Apply an option spec's default, if present, to `raw` being absent.
/// Defaults are applied **before** validation (§4.3): a missing required
/// option with a default is "default supplied", not an error.
pub fn resolve_with_default<'a>(
    raw: Option<&'a OptionValue>,
    spec: &'a OptionSpec,
) -> Result<&'a OptionValue, CoercionError> {
    match raw.or(spec.default.as_ref()) {
        Some(v) => Ok(v),
        None => Err(err(
            CoercionErrorKind::MissingRequired,
            &spec.id,
            format!("required option '{}' is missing and has no default", spec.id),
            None,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ComponentMetadata, IOSpec};
    use crate::data_type::DataType;

    fn sma_period_spec() -> OptionSpec {
        OptionSpec::new("period", OptionKind::Integer).required().with_range(1.0, 10000.0)
    }

    #[test]
    fn integer_clamps_and_truncates() {
        let comp = ComponentMetadata::new("sma");
        let spec = sma_period_spec();
        let got = parse_option(&OptionValue::Number(99999.7), &spec, &comp).unwrap();
        assert_eq!(got, OptionValue::Number(10000.0));
        let got = parse_option(&OptionValue::Number(3.9), &spec, &comp).unwrap();
        assert_eq!(got, OptionValue::Number(3.0));
    }

    #[test]
    fn boolean_rejects_non_bool() {
        let comp = ComponentMetadata::new("x");
        let spec = OptionSpec::new("flag", OptionKind::Boolean);
        assert!(parse_option(&OptionValue::Number(1.0), &spec, &comp).is_err());
        assert!(parse_option(&OptionValue::Bool(true), &spec, &comp).is_ok());
    }

    #[test]
    fn select_enforces_allowed_values() {
        let comp = ComponentMetadata::new("x");
        let spec = OptionSpec::new("mode", OptionKind::Select).with_select_values(["a", "b"]);
        assert!(parse_option(&OptionValue::Text("c".into()), &spec, &comp).is_err());
        assert!(parse_option(&OptionValue::Text("a".into()), &spec, &comp).is_ok());
    }

    #[test]
    fn time_parses_hh_mm_ss() {
        assert_eq!(parse_time_literal("09:30"), Some((9, 30, 0)));
        assert_eq!(parse_time_literal("23:59:59"), Some((23, 59, 59)));
        assert_eq!(parse_time_literal("24:00"), None);
        assert_eq!(parse_time_literal("bogus"), None);
    }

    #[test]
    fn sql_statement_checks_output_count() {
        let comp = ComponentMetadata::new("custom_sql").with_outputs([
            IOSpec::new("a", DataType::Decimal),
            IOSpec::new("b", DataType::Decimal),
        ]);
        let spec = OptionSpec::new("query", OptionKind::SqlStatement);
        let ok = OptionValue::Text("select SLOT0, SLOT1 from bars".into());
        assert!(parse_option(&ok, &spec, &comp).is_ok());
        let bad = OptionValue::Text("select SLOT2 from bars".into());
        assert!(parse_option(&bad, &spec, &comp).is_err());
    }

    #[test]
    fn default_applied_before_validation() {
        let spec = OptionSpec::new("period", OptionKind::Integer).required().with_default(OptionValue::Number(14.0));
        let resolved = resolve_with_default(None, &spec).unwrap();
        assert_eq!(resolved, &OptionValue::Number(14.0));
    }

    #[test]
    fn missing_required_without_default_errors() {
        let spec = OptionSpec::new("period", OptionKind::Integer).required();
        assert!(resolve_with_default(None, &spec).is_err());
    }

    proptest::proptest! {
        #[test]
        fn numeric_coercion_always_clamps_into_range(n in -1.0e9f64..1.0e9f64, min in -100.0f64..0.0, max in 1.0f64..100.0) {
            let comp = ComponentMetadata::new("x");
            let spec = OptionSpec::new("v", OptionKind::Decimal).with_range(min, max);
            let got = parse_option(&OptionValue::Number(n), &spec, &comp).unwrap();
            let v = got.as_number().unwrap();
            proptest::prop_assert!(v >= min && v <= max);
        }
    }
}
