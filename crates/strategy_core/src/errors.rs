//! Shared error type for core-level parsing and domain validation.

/// Errors raised while parsing or constructing core domain values
/// (timeframes, sessions, option values). These are distinct from the
/// batched `Issue` model: a `CoreError` means a caller handed us a value
/// that cannot be represented at all, not a semantic mismatch against a
/// component's metadata.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid handle id: {0:?}")]
    InvalidHandle(String),
    #[error("invalid timeframe string: {0:?}")]
    InvalidTimeframe(String),
    #[error("invalid session name: {0:?}")]
    InvalidSession(String),
    #[error("invalid time literal: {0:?}")]
    InvalidTime(String),
    #[error("invalid option value for kind {kind}: {detail}")]
    InvalidOptionValue { kind: String, detail: String },
    #[error("malformed node reference: {0:?}")]
    MalformedReference(String),
}
