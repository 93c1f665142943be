//! Validator factories, one per schema keyword.
//!
//! Every factory returns a [`Validator`] following the same contract:
//!
//! - empty values (see [`is_empty`]) are accepted, except by [`required`],
//! - keywords about one JSON type accept values of any other type, so
//!   `minimum` says nothing about a string,
//! - `invert` flips the verdict of non-empty values only,
//! - a failure records the configured limit and the observed value.

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::compile::schema_validator;
use crate::error::{DependencyError, ErrorRecord};
use crate::format::check_format;
use crate::validator::Validator;
use crate::value::{has_value, is_empty, is_type, loose_equal};

/// Builds a validator for a single keyword/value pair, as written in a
/// schema. Returns `None` for keywords without a validator and for
/// malformed configuration.
///
/// `exclusiveMinimum`/`exclusiveMaximum` are read in their numeric form
/// here; the boolean draft-4 form modifies `minimum`/`maximum` and is
/// handled by [`schema_validator`].
///
/// # Examples
///
/// ```
/// use form_schema_validators::from_keyword;
/// use serde_json::json;
///
/// let validator = from_keyword("maxItems", &json!(2)).unwrap();
/// assert!(validator.is_valid(&json!([1, 2])));
/// assert!(!validator.is_valid(&json!([1, 2, 3])));
/// assert!(from_keyword("title", &json!("Name")).is_none());
/// ```
pub fn from_keyword(keyword: &str, config: &Value) -> Option<Validator> {
    let count = || config.as_u64().and_then(|n| usize::try_from(n).ok());
    let number = || match config {
        Value::Number(number) => Some(number.clone()),
        _ => None,
    };
    let validator = match keyword {
        "required" => required(config.as_bool()?),
        "type" => {
            let names_ok = match config {
                Value::String(_) => true,
                Value::Array(names) => names.iter().all(Value::is_string),
                _ => false,
            };
            if !names_ok {
                return None;
            }
            type_of(config.clone())
        }
        "enum" => enum_values(config.as_array()?.clone()),
        "const" => const_value(config.clone()),
        "minLength" => min_length(count()?),
        "maxLength" => max_length(count()?),
        "pattern" => pattern(config.as_str()?, false),
        "format" => format(config.as_str()?),
        "minimum" => minimum(number()?),
        "exclusiveMinimum" => exclusive_minimum(number()?),
        "maximum" => maximum(number()?),
        "exclusiveMaximum" => exclusive_maximum(number()?),
        "multipleOf" => multiple_of(number()?),
        "minProperties" => min_properties(count()?),
        "maxProperties" => max_properties(count()?),
        "dependencies" => dependencies(config.as_object()?),
        "minItems" => min_items(count()?),
        "maxItems" => max_items(count()?),
        "uniqueItems" => unique_items(config.as_bool()?),
        "contains" => contains(config.clone()),
        "allOf" | "anyOf" | "oneOf" | "not" => {
            let mut wrapper = Map::new();
            wrapper.insert(keyword.to_string(), config.clone());
            schema_validator(&Value::Object(wrapper))
        }
        _ => return None,
    };
    Some(validator)
}

/// Shared shape of the non-`required` validators: accept empty values, then
/// compare the predicate's verdict with `invert`.
fn leaf<C, R>(label: &'static str, holds: C, report: R) -> Validator
where
    C: Fn(&Value) -> bool + Send + Sync + 'static,
    R: Fn(&Value) -> ErrorRecord + Send + Sync + 'static,
{
    Validator::new(label, move |value, invert| {
        let value = value.filter(|value| !is_empty(Some(*value)))?;
        if holds(value) != invert { None } else { Some(report(value)) }
    })
}

/// Fails for absent values, `null` and `""`. `required(false)` accepts
/// everything.
///
/// # Examples
///
/// ```
/// use form_schema_validators::required;
/// use serde_json::json;
///
/// let validator = required(true);
/// assert!(validator.validate(None).is_some());
/// assert!(validator.validate(Some(&json!(""))).is_some());
/// assert!(validator.validate(Some(&json!(0))).is_none());
/// ```
pub fn required(required: bool) -> Validator {
    if !required {
        return Validator::null();
    }
    Validator::new("required", |value, invert| {
        if has_value(value) != invert {
            None
        } else {
            Some(ErrorRecord::Required(true))
        }
    })
}

/// Checks the JSON type against a type name or a list of names.
pub fn type_of(required_type: Value) -> Validator {
    let names: Vec<String> = match &required_type {
        Value::String(name) => vec![name.clone()],
        Value::Array(names) => names.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        _ => Vec::new(),
    };
    leaf(
        "type",
        move |value| names.iter().any(|name| is_type(value, name)),
        move |value| ErrorRecord::Type {
            required_type: required_type.clone(),
            current_value: value.clone(),
        },
    )
}

/// The value must equal one of `allowed`. An array value is checked element
/// by element, so multi-select controls validate against the option list.
pub fn enum_values(allowed: Vec<Value>) -> Validator {
    let reported = allowed.clone();
    let is_allowed = move |item: &Value| allowed.iter().any(|option| loose_equal(option, item));
    leaf(
        "enum",
        move |value| match value {
            Value::Array(items) => items.iter().all(&is_allowed),
            single => is_allowed(single),
        },
        move |value| ErrorRecord::Enum {
            allowed_values: reported.clone(),
            current_value: value.clone(),
        },
    )
}

pub fn const_value(required_value: Value) -> Validator {
    let expected = required_value.clone();
    leaf(
        "const",
        move |value| loose_equal(&expected, value),
        move |value| ErrorRecord::Const {
            required_value: required_value.clone(),
            current_value: value.clone(),
        },
    )
}

fn char_count(value: &Value) -> Option<usize> {
    value.as_str().map(|text| text.chars().count())
}

/// Minimum string length, counted in characters.
pub fn min_length(minimum_length: usize) -> Validator {
    leaf(
        "minLength",
        move |value| char_count(value).is_none_or(|length| length >= minimum_length),
        move |value| ErrorRecord::MinLength {
            minimum_length,
            current_length: char_count(value).unwrap_or(0),
        },
    )
}

/// Maximum string length, counted in characters.
pub fn max_length(maximum_length: usize) -> Validator {
    leaf(
        "maxLength",
        move |value| char_count(value).is_none_or(|length| length <= maximum_length),
        move |value| ErrorRecord::MaxLength {
            maximum_length,
            current_length: char_count(value).unwrap_or(0),
        },
    )
}

/// Strings must match `pattern`. With `whole_line` the pattern is anchored
/// at both ends; otherwise it may match anywhere, as JSON Schema specifies.
///
/// An invalid pattern is logged and yields [`Validator::null`].
pub fn pattern(pattern: &str, whole_line: bool) -> Validator {
    let source = if whole_line { format!("^(?:{pattern})$") } else { pattern.to_string() };
    let regex = match Regex::new(&source) {
        Ok(regex) => regex,
        Err(err) => {
            warn!(pattern, error = %err, "ignoring invalid pattern");
            return Validator::null();
        }
    };
    let required_pattern = pattern.to_string();
    leaf(
        "pattern",
        move |value| value.as_str().is_none_or(|text| regex.is_match(text)),
        move |value| ErrorRecord::Pattern {
            required_pattern: required_pattern.clone(),
            current_value: value.clone(),
        },
    )
}

/// Strings must satisfy a named format (see [`check_format`]). Unknown
/// formats are logged and accept everything.
pub fn format(required_format: &str) -> Validator {
    if check_format(required_format, "").is_none() {
        warn!(format = required_format, "unknown format, values will not be checked");
        return Validator::null();
    }
    let name = required_format.to_string();
    leaf(
        "format",
        move |value| {
            value
                .as_str()
                .is_none_or(|text| check_format(&name, text).unwrap_or(true))
        },
        {
            let required_format = required_format.to_string();
            move |value| ErrorRecord::Format {
                required_format: required_format.clone(),
                current_value: value.clone(),
            }
        },
    )
}

fn bound<C, R>(label: &'static str, limit: Number, holds: C, report: R) -> Validator
where
    C: Fn(f64, f64) -> bool + Send + Sync + 'static,
    R: Fn(Number, Value) -> ErrorRecord + Send + Sync + 'static,
{
    let Some(threshold) = limit.as_f64() else {
        return Validator::null();
    };
    leaf(
        label,
        move |value| value.as_f64().is_none_or(|current| holds(current, threshold)),
        move |value| report(limit.clone(), value.clone()),
    )
}

pub fn minimum(minimum_value: Number) -> Validator {
    bound("minimum", minimum_value, |current, limit| current >= limit, |minimum_value, current_value| {
        ErrorRecord::Minimum {
            minimum_value,
            current_value,
        }
    })
}

pub fn exclusive_minimum(exclusive_minimum_value: Number) -> Validator {
    bound(
        "exclusiveMinimum",
        exclusive_minimum_value,
        |current, limit| current > limit,
        |exclusive_minimum_value, current_value| ErrorRecord::ExclusiveMinimum {
            exclusive_minimum_value,
            current_value,
        },
    )
}

pub fn maximum(maximum_value: Number) -> Validator {
    bound("maximum", maximum_value, |current, limit| current <= limit, |maximum_value, current_value| {
        ErrorRecord::Maximum {
            maximum_value,
            current_value,
        }
    })
}

pub fn exclusive_maximum(exclusive_maximum_value: Number) -> Validator {
    bound(
        "exclusiveMaximum",
        exclusive_maximum_value,
        |current, limit| current < limit,
        |exclusive_maximum_value, current_value| ErrorRecord::ExclusiveMaximum {
            exclusive_maximum_value,
            current_value,
        },
    )
}

/// Numbers must be an integer multiple of `multiple_of_value`, which must be
/// positive. Float quotients are compared with a small relative tolerance so
/// `0.3` counts as a multiple of `0.1`.
pub fn multiple_of(multiple_of_value: Number) -> Validator {
    let divisor = multiple_of_value.as_f64().filter(|d| d.is_finite() && *d > 0.0);
    let Some(divisor) = divisor else {
        warn!(multiple_of = %multiple_of_value, "ignoring non-positive multipleOf");
        return Validator::null();
    };
    bound(
        "multipleOf",
        multiple_of_value,
        move |current, _| {
            let quotient = current / divisor;
            (quotient - quotient.round()).abs() <= 1e-9 * quotient.abs().max(1.0)
        },
        |multiple_of_value, current_value| ErrorRecord::MultipleOf {
            multiple_of_value,
            current_value,
        },
    )
}

fn property_count(value: &Value) -> Option<usize> {
    value.as_object().map(Map::len)
}

pub fn min_properties(minimum_properties: usize) -> Validator {
    leaf(
        "minProperties",
        move |value| property_count(value).is_none_or(|count| count >= minimum_properties),
        move |value| ErrorRecord::MinProperties {
            minimum_properties,
            current_properties: property_count(value).unwrap_or(0),
        },
    )
}

pub fn max_properties(maximum_properties: usize) -> Validator {
    leaf(
        "maxProperties",
        move |value| property_count(value).is_none_or(|count| count <= maximum_properties),
        move |value| ErrorRecord::MaxProperties {
            maximum_properties,
            current_properties: property_count(value).unwrap_or(0),
        },
    )
}

enum Dependency {
    Properties(Vec<String>),
    Schema(Validator),
}

/// Property dependencies. For each configured property holding a value in an
/// object, an array entry lists properties that must also be present and
/// an object entry is a schema the whole object must satisfy. `null` and
/// `""` count as absent, the same as for `required`.
///
/// # Examples
///
/// ```
/// use form_schema_validators::dependencies;
/// use serde_json::json;
///
/// let config = json!({ "card": ["billing"] });
/// let validator = dependencies(config.as_object().unwrap());
/// assert!(validator.is_valid(&json!({ "name": "x" })));
/// assert!(!validator.is_valid(&json!({ "card": "4111" })));
/// ```
pub fn dependencies(config: &Map<String, Value>) -> Validator {
    let rules: Vec<(String, Dependency)> = config
        .iter()
        .filter_map(|(property, dependency)| {
            let rule = match dependency {
                Value::Array(names) => {
                    Dependency::Properties(names.iter().filter_map(Value::as_str).map(str::to_string).collect())
                }
                Value::Object(_) | Value::Bool(_) => Dependency::Schema(schema_validator(dependency)),
                _ => return None,
            };
            Some((property.clone(), rule))
        })
        .collect();
    if rules.is_empty() {
        return Validator::null();
    }

    Validator::new("dependencies", move |value, invert| {
        let value = value.filter(|value| !is_empty(Some(*value)))?;
        let Some(object) = value.as_object() else {
            return invert.then(|| ErrorRecord::Dependencies(BTreeMap::new()));
        };

        let mut failures = BTreeMap::new();
        for (property, rule) in rules.iter().filter(|(property, _)| has_value(object.get(property))) {
            let failure = match rule {
                Dependency::Properties(names) => {
                    let missing: Vec<String> =
                        names.iter().filter(|name| !has_value(object.get(*name))).cloned().collect();
                    (!missing.is_empty()).then(|| DependencyError { missing, invalid: None })
                }
                Dependency::Schema(validator) => validator.validate(Some(value)).map(|record| DependencyError {
                    missing: Vec::new(),
                    invalid: Some(Box::new(record)),
                }),
            };
            if let Some(failure) = failure {
                failures.insert(property.clone(), failure);
            }
        }

        if failures.is_empty() != invert {
            None
        } else {
            Some(ErrorRecord::Dependencies(failures))
        }
    })
}

fn item_count(value: &Value) -> Option<usize> {
    value.as_array().map(Vec::len)
}

pub fn min_items(minimum_items: usize) -> Validator {
    leaf(
        "minItems",
        move |value| item_count(value).is_none_or(|count| count >= minimum_items),
        move |value| ErrorRecord::MinItems {
            minimum_items,
            current_items: item_count(value).unwrap_or(0),
        },
    )
}

pub fn max_items(maximum_items: usize) -> Validator {
    leaf(
        "maxItems",
        move |value| item_count(value).is_none_or(|count| count <= maximum_items),
        move |value| ErrorRecord::MaxItems {
            maximum_items,
            current_items: item_count(value).unwrap_or(0),
        },
    )
}

fn duplicate_items(items: &[Value]) -> Vec<Value> {
    let mut duplicates: Vec<Value> = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let repeated = items[index + 1..].iter().any(|other| loose_equal(item, other));
        if repeated && !duplicates.iter().any(|seen| loose_equal(seen, item)) {
            duplicates.push(item.clone());
        }
    }
    duplicates
}

/// Array items must be pairwise distinct. `unique_items(false)` accepts
/// everything.
pub fn unique_items(unique: bool) -> Validator {
    if !unique {
        return Validator::null();
    }
    leaf(
        "uniqueItems",
        |value| value.as_array().is_none_or(|items| duplicate_items(items).is_empty()),
        |value| ErrorRecord::UniqueItems {
            duplicate_items: value.as_array().map(|items| duplicate_items(items)).unwrap_or_default(),
        },
    )
}

/// At least one array item must satisfy `required_item`, a schema.
pub fn contains(required_item: Value) -> Validator {
    let item_validator = schema_validator(&required_item);
    leaf(
        "contains",
        move |value| {
            value
                .as_array()
                .is_none_or(|items| items.iter().any(|item| item_validator.is_valid(item)))
        },
        move |value| ErrorRecord::Contains {
            required_item: required_item.clone(),
            current_value: value.clone(),
        },
    )
}
