//! Validation failure records.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Number, Value};

/// Why a value failed a validator.
///
/// Serializes as a single-key map from the failing keyword to the
/// configured limit and the observed value, e.g.
/// `{"minLength": {"minimumLength": 3, "currentLength": 1}}`, which is the
/// shape form controls display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ErrorRecord {
    Required(bool),
    Type {
        required_type: Value,
        current_value: Value,
    },
    Enum {
        allowed_values: Vec<Value>,
        current_value: Value,
    },
    Const {
        required_value: Value,
        current_value: Value,
    },
    MinLength {
        minimum_length: usize,
        current_length: usize,
    },
    MaxLength {
        maximum_length: usize,
        current_length: usize,
    },
    Pattern {
        required_pattern: String,
        current_value: Value,
    },
    Format {
        required_format: String,
        current_value: Value,
    },
    Minimum {
        minimum_value: Number,
        current_value: Value,
    },
    ExclusiveMinimum {
        exclusive_minimum_value: Number,
        current_value: Value,
    },
    Maximum {
        maximum_value: Number,
        current_value: Value,
    },
    ExclusiveMaximum {
        exclusive_maximum_value: Number,
        current_value: Value,
    },
    MultipleOf {
        multiple_of_value: Number,
        current_value: Value,
    },
    MinProperties {
        minimum_properties: usize,
        current_properties: usize,
    },
    MaxProperties {
        maximum_properties: usize,
        current_properties: usize,
    },
    /// Failures keyed by the property whose presence triggered the
    /// dependency.
    Dependencies(BTreeMap<String, DependencyError>),
    MinItems {
        minimum_items: usize,
        current_items: usize,
    },
    MaxItems {
        maximum_items: usize,
        current_items: usize,
    },
    UniqueItems {
        duplicate_items: Vec<Value>,
    },
    Contains {
        required_item: Value,
        current_value: Value,
    },
    /// The value was matched against the `false` schema.
    FalseSchema(bool),
    /// The value satisfied a validator that was expected to fail, and the
    /// validator has no finer record to give. Holds the validator's keyword.
    Matched(String),
    /// Failure of the schema for one property of an object.
    Property {
        property: String,
        error: Box<ErrorRecord>,
    },
    /// Failure of the schema for one item of an array.
    Item {
        index: usize,
        error: Box<ErrorRecord>,
    },
    AllOf(Vec<ErrorRecord>),
    AnyOf(Vec<ErrorRecord>),
    OneOf(Vec<ErrorRecord>),
}

impl ErrorRecord {
    /// The schema keyword this record reports on.
    pub fn keyword(&self) -> &'static str {
        match self {
            ErrorRecord::Required(_) => "required",
            ErrorRecord::Type { .. } => "type",
            ErrorRecord::Enum { .. } => "enum",
            ErrorRecord::Const { .. } => "const",
            ErrorRecord::MinLength { .. } => "minLength",
            ErrorRecord::MaxLength { .. } => "maxLength",
            ErrorRecord::Pattern { .. } => "pattern",
            ErrorRecord::Format { .. } => "format",
            ErrorRecord::Minimum { .. } => "minimum",
            ErrorRecord::ExclusiveMinimum { .. } => "exclusiveMinimum",
            ErrorRecord::Maximum { .. } => "maximum",
            ErrorRecord::ExclusiveMaximum { .. } => "exclusiveMaximum",
            ErrorRecord::MultipleOf { .. } => "multipleOf",
            ErrorRecord::MinProperties { .. } => "minProperties",
            ErrorRecord::MaxProperties { .. } => "maxProperties",
            ErrorRecord::Dependencies(_) => "dependencies",
            ErrorRecord::MinItems { .. } => "minItems",
            ErrorRecord::MaxItems { .. } => "maxItems",
            ErrorRecord::UniqueItems { .. } => "uniqueItems",
            ErrorRecord::Contains { .. } => "contains",
            ErrorRecord::FalseSchema(_) => "falseSchema",
            ErrorRecord::Matched(_) => "matched",
            ErrorRecord::Property { .. } => "properties",
            ErrorRecord::Item { .. } => "items",
            ErrorRecord::AllOf(_) => "allOf",
            ErrorRecord::AnyOf(_) => "anyOf",
            ErrorRecord::OneOf(_) => "oneOf",
        }
    }

    /// Records nested inside a combinator record, or an empty slice.
    pub fn members(&self) -> &[ErrorRecord] {
        match self {
            ErrorRecord::AllOf(members) | ErrorRecord::AnyOf(members) | ErrorRecord::OneOf(members) => members,
            _ => &[],
        }
    }
}

/// A failed dependency of one property.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyError {
    /// Properties required by the dependency but absent.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
    /// Failure of a schema-form dependency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid: Option<Box<ErrorRecord>>,
}
