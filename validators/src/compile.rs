//! Compiles a whole schema node into one validator.

use serde_json::{Map, Value};

use crate::combinators::{all_of, any_of, at_index, at_property, every_item, not, one_of, verdict};
use crate::error::ErrorRecord;
use crate::factory::{exclusive_maximum, exclusive_minimum, from_keyword, required};
use crate::validator::Validator;
use crate::value::is_empty;

/// Builds the validator for a schema node: the keyword validators of the
/// node, its `properties`/`items` sub-schemas applied to the matching
/// children, and its `allOf`/`anyOf`/`oneOf`/`not` members, all of which
/// must hold.
///
/// `true` and `{}` compile to [`Validator::null`]; `false` rejects every
/// non-empty value.
///
/// # Examples
///
/// ```
/// use form_schema_validators::schema_validator;
/// use serde_json::json;
///
/// let validator = schema_validator(&json!({
///     "type": "object",
///     "required": ["name"],
///     "properties": { "name": { "minLength": 2 } }
/// }));
/// assert!(validator.is_valid(&json!({ "name": "Ada" })));
/// assert!(!validator.is_valid(&json!({ "name": "A" })));
/// assert!(!validator.is_valid(&json!({ "age": 3 })));
/// ```
pub fn schema_validator(schema: &Value) -> Validator {
    match schema {
        Value::Bool(true) => Validator::null(),
        Value::Bool(false) => false_schema(),
        Value::Object(node) => node_validator(node),
        _ => Validator::null(),
    }
}

fn false_schema() -> Validator {
    Validator::new("falseSchema", |value, invert| {
        let present = !is_empty(value);
        (present && !invert).then_some(ErrorRecord::FalseSchema(true))
    })
}

fn node_validator(node: &Map<String, Value>) -> Validator {
    let flag = |keyword: &str| node.get(keyword).and_then(Value::as_bool).unwrap_or(false);
    let mut validators = Vec::new();

    for (keyword, config) in node {
        let validator = match (keyword.as_str(), config) {
            ("exclusiveMinimum" | "exclusiveMaximum", Value::Bool(_)) => continue,
            ("minimum", Value::Number(limit)) if flag("exclusiveMinimum") => exclusive_minimum(limit.clone()),
            ("maximum", Value::Number(limit)) if flag("exclusiveMaximum") => exclusive_maximum(limit.clone()),
            ("required", Value::Array(names)) => all_of(
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|name| at_property(name, required(true)))
                    .collect(),
            ),
            ("properties", Value::Object(properties)) => all_of(
                properties
                    .iter()
                    .map(|(name, schema)| at_property(name.as_str(), schema_validator(schema)))
                    .collect(),
            ),
            ("additionalProperties", schema) => additional_properties(node, schema),
            ("items", Value::Array(tuple)) => {
                let mut slots: Vec<Validator> = tuple
                    .iter()
                    .enumerate()
                    .map(|(index, schema)| at_index(index, schema_validator(schema)))
                    .collect();
                if let Some(additional) = node.get("additionalItems") {
                    slots.push(every_item(tuple.len(), schema_validator(additional)));
                }
                all_of(slots)
            }
            ("items", schema @ (Value::Object(_) | Value::Bool(_))) => every_item(0, schema_validator(schema)),
            ("allOf", Value::Array(members)) => all_of(members.iter().map(schema_validator).collect()),
            ("anyOf", Value::Array(members)) => any_of(members.iter().map(schema_validator).collect()),
            ("oneOf", Value::Array(members)) => one_of(members.iter().map(schema_validator).collect()),
            ("not", schema) => not(schema_validator(schema)),
            (keyword, config) => match from_keyword(keyword, config) {
                Some(validator) => validator,
                None => continue,
            },
        };
        validators.push(validator);
    }

    all_of(validators)
}

/// Applies `schema` to every property the node's `properties` does not
/// name.
fn additional_properties(node: &Map<String, Value>, schema: &Value) -> Validator {
    let extra = schema_validator(schema);
    if extra.is_null() {
        return extra;
    }
    let known: Vec<String> = node
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| properties.keys().cloned().collect())
        .unwrap_or_default();

    Validator::new("additionalProperties", move |value, invert| {
        let Some(object) = value.and_then(Value::as_object) else {
            return verdict("additionalProperties", value, true, invert, Vec::new(), ErrorRecord::AllOf);
        };
        let extras = object.iter().filter(|(name, _)| !known.contains(*name));
        let check = |invert: bool| -> Vec<ErrorRecord> {
            extras
                .clone()
                .filter_map(|(name, item)| {
                    extra.check(Some(item), invert).map(|error| ErrorRecord::Property {
                        property: name.clone(),
                        error: Box::new(error),
                    })
                })
                .collect()
        };
        let failures = check(false);
        let valid = failures.is_empty();
        let records = if valid { check(true) } else { failures };
        verdict("additionalProperties", value, valid, invert, records, ErrorRecord::AllOf)
    })
}
