//! The I/O data-type lattice (§3.1) and its compatibility/cast rules (§4.7).

use serde::{Deserialize, Serialize};
use std::fmt;

/// `data_type` enumeration for component inputs/outputs (§3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Boolean,
    Integer,
    Decimal,
    Number,
    String,
    Any,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Boolean => "Boolean",
            DataType::Integer => "Integer",
            DataType::Decimal => "Decimal",
            DataType::Number => "Number",
            DataType::String => "String",
            DataType::Any => "Any",
        }
    }

    /// Integer/Decimal/Number form one mutually-compatible numeric family.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Decimal | DataType::Number)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Any` is compatible with anything, exact matches are compatible, and the
/// numeric family is mutually compatible. `Boolean`/`String` must match
/// themselves exactly (or `Any`). §4.1 phase 2 and §4.7 share this rule.
pub fn is_compatible(src: DataType, tgt: DataType) -> bool {
    tgt == DataType::Any || src == DataType::Any || src == tgt || (src.is_numeric() && tgt.is_numeric())
}

/// The direction a cast must run to reconcile an incompatible edge, per
/// §4.7. `None` means no cast is needed (`is_compatible` already holds);
/// `Incompatible` means no cast exists (String cannot become a number, etc).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastDirection {
    BoolToNumber,
    NumberToBool,
    Incompatible,
}

/// Decide which cast (if any) reconciles `src -> tgt`. Callers should check
/// `is_compatible` first; this function assumes the caller already knows a
/// cast is required.
pub fn needs_cast(src: DataType, tgt: DataType) -> CastDirection {
    match (src, tgt) {
        (DataType::Boolean, t) if t.is_numeric() => CastDirection::BoolToNumber,
        (s, DataType::Boolean) if s.is_numeric() => CastDirection::NumberToBool,
        _ => CastDirection::Incompatible,
    }
}
