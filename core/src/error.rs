//! Error and diagnostic types for schema resolution.
//!
//! Fatal precondition failures are [`EngineError`] values returned through
//! [`Result`]. Degraded-but-usable outcomes (an unresolvable `$ref`, an
//! `allOf` that could not be folded) are collected as [`Diagnostic`]s on the
//! [`CompiledSchema`](crate::CompiledSchema) instead, so callers can tell the
//! two apart.

use serde::Serialize;
use thiserror::Error;

use crate::Pointer;

/// Errors that stop a resolution or configuration load.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The top-level schema was not a JSON object.
    #[error("schema must be an object, found {found}")]
    SchemaNotObject {
        /// JSON type name of the value that was supplied.
        found: &'static str,
    },

    /// A `$ref` node carried sibling keywords while the configured policy is
    /// [`RefSiblingPolicy::Reject`](crate::RefSiblingPolicy::Reject).
    #[error("$ref at '{at}' has sibling keywords: {keywords:?}")]
    RefWithSiblings {
        /// Schema pointer of the offending node.
        at: Pointer,
        /// The sibling keywords found next to `$ref`.
        keywords: Vec<String>,
    },

    /// A string could not be parsed as a JSON pointer.
    #[error("invalid JSON pointer: {0:?}")]
    InvalidPointer(String),

    /// File I/O failure while loading or saving configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience alias for results with [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// A non-fatal degradation observed while compiling a schema.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A `$ref` target could not be found; the node was left uninlined.
    UnresolvedReference {
        /// Schema pointer of the `$ref` node.
        at: Pointer,
        /// The raw `$ref` value.
        reference: String,
    },
    /// Sibling keywords next to a `$ref` were discarded.
    DroppedRefSiblings {
        /// Schema pointer of the `$ref` node.
        at: Pointer,
        /// The discarded keywords.
        keywords: Vec<String>,
    },
    /// An `allOf` could not be merged losslessly and was kept as-is.
    UncombinedAllOf {
        /// Schema pointer of the node holding the `allOf`.
        at: Pointer,
    },
}

impl Diagnostic {
    /// Schema pointer the diagnostic refers to.
    pub fn pointer(&self) -> &Pointer {
        match self {
            Diagnostic::UnresolvedReference { at, .. }
            | Diagnostic::DroppedRefSiblings { at, .. }
            | Diagnostic::UncombinedAllOf { at } => at,
        }
    }
}

/// Returns the JSON type name of `value`, for error messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
