//! Schema merging with per-keyword conflict resolution.
//!
//! [`merge_schemas`] computes a single schema equivalent to the conjunction
//! of its inputs. Each keyword present in more than one input is combined by
//! a keyword-specific rule (intersect `enum`, union `required`, keep the
//! tighter numeric bound, ...). When any keyword cannot be combined, the
//! whole merge falls back to `{"allOf": [inputs...]}`, which is always a
//! correct conjunction even though it is not flattened.
//!
//! # Example
//!
//! ```
//! use form_schema_core::merge_schemas;
//! use serde_json::json;
//!
//! let merged = merge_schemas([
//!     json!({ "type": "object", "required": ["a"], "maximum": 10 }),
//!     json!({ "required": ["b"], "maximum": 5 }),
//! ]);
//! assert_eq!(merged, json!({ "type": "object", "required": ["a", "b"], "maximum": 5 }));
//!
//! let conflict = merge_schemas([json!({ "type": "string" }), json!({ "type": "number" })]);
//! assert_eq!(conflict, json!({ "allOf": [{ "type": "string" }, { "type": "number" }] }));
//! ```

use std::borrow::Cow;
use std::collections::BTreeSet;

use serde_json::{Map, Number, Value, json};
use tracing::debug;

/// Merges schemas into one equivalent to their conjunction.
///
/// `{}` and `true` are identity elements and are skipped. No input yields
/// `{}`; a single input is returned as is. Non-object inputs, or keywords
/// that conflict, produce the `allOf` fallback.
pub fn merge_schemas<I>(schemas: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    try_merge(schemas).unwrap_or_else(|inputs| json!({ "allOf": inputs }))
}

/// Like [`merge_schemas`], but hands the (identity-filtered) inputs back
/// instead of building the `allOf` fallback.
pub fn try_merge<I>(schemas: I) -> Result<Value, Vec<Value>>
where
    I: IntoIterator<Item = Value>,
{
    let mut inputs: Vec<Value> = schemas.into_iter().filter(|schema| !is_identity(schema)).collect();
    match inputs.len() {
        0 => return Ok(Value::Object(Map::new())),
        1 => return Ok(inputs.remove(0)),
        _ => {}
    }

    let objects: Option<Vec<&Map<String, Value>>> = inputs.iter().map(Value::as_object).collect();
    let merged = match objects {
        Some(objects) => merge_objects(&objects),
        None => {
            debug!(inputs = inputs.len(), "cannot merge non-object schemas");
            None
        }
    };
    merged.map(Value::Object).ok_or(inputs)
}

/// Returns `true` for schemas that accept everything: `{}` and `true`.
pub fn is_identity(schema: &Value) -> bool {
    match schema {
        Value::Bool(accepts) => *accepts,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

struct Conflict;

enum Merged {
    Keep(Value),
    Drop,
}

/// `additionalProperties` that restricts properties left out of `properties`.
fn restricts_unlisted(additional: Option<&Value>) -> bool {
    matches!(additional, Some(Value::Bool(false) | Value::Object(_)))
}

fn merge_objects(schemas: &[&Map<String, Value>]) -> Option<Map<String, Value>> {
    let mut combined = Map::new();
    let mut dropped = BTreeSet::new();
    for schema in schemas {
        let earlier_additional = combined.get("additionalProperties").cloned();
        // A side without `properties` lists none, so its `additionalProperties`
        // applies to every property of the other side.
        let lists_properties = schema.contains_key("properties");
        if lists_properties && restricts_unlisted(earlier_additional.as_ref()) {
            combined.entry("properties").or_insert_with(|| Value::Object(Map::new()));
        }
        let schema: Cow<'_, Map<String, Value>> = if !lists_properties
            && restricts_unlisted(schema.get("additionalProperties"))
            && combined.contains_key("properties")
        {
            let mut listed = (*schema).clone();
            listed.insert("properties".to_string(), Value::Object(Map::new()));
            Cow::Owned(listed)
        } else {
            Cow::Borrowed(*schema)
        };

        for (key, value) in schema.iter() {
            if dropped.contains(key.as_str()) {
                continue;
            }
            let outcome = match combined.get(key) {
                None => Merged::Keep(value.clone()),
                Some(current) if current == value => continue,
                Some(current) => match merge_keyword(key, current, value, earlier_additional.as_ref(), &schema) {
                    Ok(outcome) => outcome,
                    Err(Conflict) => {
                        debug!(keyword = %key, "schema merge fell back to allOf");
                        return None;
                    }
                },
            };
            match outcome {
                Merged::Keep(merged) => {
                    combined.insert(key.clone(), merged);
                }
                Merged::Drop => {
                    combined.remove(key);
                    dropped.insert(key.clone());
                }
            }
        }
    }
    Some(combined)
}

fn merge_keyword(
    key: &str,
    current: &Value,
    incoming: &Value,
    earlier_additional: Option<&Value>,
    schema: &Map<String, Value>,
) -> Result<Merged, Conflict> {
    match key {
        "allOf" => {
            let (Value::Array(left), Value::Array(right)) = (current, incoming) else {
                return Err(Conflict);
            };
            let members = left.iter().chain(right).cloned();
            let merged = match try_merge(members) {
                Ok(single) => vec![single],
                Err(members) => members,
            };
            Ok(Merged::Keep(Value::Array(merged)))
        }
        "additionalItems" | "additionalProperties" | "contains" | "propertyNames" => {
            merge_subschemas(current, incoming).map(Merged::Keep)
        }
        "anyOf" | "oneOf" | "enum" => {
            let (Value::Array(left), Value::Array(right)) = (current, incoming) else {
                return Err(Conflict);
            };
            let common = intersect(left, right);
            if common.is_empty() {
                return Err(Conflict);
            }
            Ok(Merged::Keep(Value::Array(common)))
        }
        "const" => Err(Conflict),
        "$schema" | "$id" | "id" => Ok(Merged::Drop),
        "title" | "description" | "$comment" => Ok(Merged::Keep(incoming.clone())),
        "definitions" | "$defs" => union_objects(current, incoming, |_, _| Err(Conflict)),
        "patternProperties" => union_objects(current, incoming, merge_subschemas),
        "dependencies" => union_objects(current, incoming, merge_dependency),
        "properties" => merge_properties(current, incoming, earlier_additional, schema),
        "items" => merge_items(current, incoming),
        "not" => merge_not(current, incoming),
        "type" => merge_types(current, incoming),
        "required" => match (current, incoming) {
            (Value::Array(left), Value::Array(right)) => Ok(Merged::Keep(Value::Array(union(left, right)))),
            (Value::Bool(left), Value::Bool(right)) => Ok(Merged::Keep(Value::Bool(*left || *right))),
            _ => Err(Conflict),
        },
        "uniqueItems" => match (current, incoming) {
            (Value::Bool(left), Value::Bool(right)) => Ok(Merged::Keep(Value::Bool(*left || *right))),
            _ => Err(Conflict),
        },
        "multipleOf" => {
            let (Value::Number(left), Value::Number(right)) = (current, incoming) else {
                return Err(Conflict);
            };
            least_common_multiple(left, right)
                .map(|lcm| Merged::Keep(Value::Number(lcm)))
                .ok_or(Conflict)
        }
        "maximum" | "exclusiveMaximum" | "maxLength" | "maxItems" | "maxProperties" => {
            tighter_bound(current, incoming, true)
        }
        "minimum" | "exclusiveMinimum" | "minLength" | "minItems" | "minProperties" => {
            tighter_bound(current, incoming, false)
        }
        _ => Err(Conflict),
    }
}

/// Conjunction of two subschema-valued keywords, where `true` accepts
/// everything and `false` accepts nothing.
fn merge_subschemas(current: &Value, incoming: &Value) -> Result<Value, Conflict> {
    match (current, incoming) {
        (Value::Bool(false), _) | (_, Value::Bool(false)) => Ok(Value::Bool(false)),
        (Value::Bool(true), other) | (other, Value::Bool(true)) => Ok(other.clone()),
        (Value::Object(_), Value::Object(_)) => Ok(merge_schemas([current.clone(), incoming.clone()])),
        _ => Err(Conflict),
    }
}

fn merge_dependency(current: &Value, incoming: &Value) -> Result<Value, Conflict> {
    let as_schema = |dependency: &Value| match dependency {
        Value::Array(names) => Some(json!({ "required": names })),
        Value::Object(_) => Some(dependency.clone()),
        _ => None,
    };
    match (current, incoming) {
        (Value::Array(left), Value::Array(right)) => Ok(Value::Array(union(left, right))),
        _ => {
            let (Some(left), Some(right)) = (as_schema(current), as_schema(incoming)) else {
                return Err(Conflict);
            };
            Ok(merge_schemas([left, right]))
        }
    }
}

fn union_objects<F>(current: &Value, incoming: &Value, on_collision: F) -> Result<Merged, Conflict>
where
    F: Fn(&Value, &Value) -> Result<Value, Conflict>,
{
    let (Value::Object(left), Value::Object(right)) = (current, incoming) else {
        return Err(Conflict);
    };
    let mut merged = left.clone();
    for (key, value) in right {
        let resolved = match merged.get(key) {
            None => value.clone(),
            Some(existing) if existing == value => continue,
            Some(existing) => on_collision(existing, value)?,
        };
        merged.insert(key.clone(), resolved);
    }
    Ok(Merged::Keep(Value::Object(merged)))
}

/// Merges two `properties` maps, honoring each side's
/// `additionalProperties`: a property one side does not list is only
/// allowed (and constrained) by that side's `additionalProperties`.
/// `earlier_additional` is the value accumulated from the schemas merged
/// before `schema`.
fn merge_properties(
    current: &Value,
    incoming: &Value,
    earlier_additional: Option<&Value>,
    schema: &Map<String, Value>,
) -> Result<Merged, Conflict> {
    let (Value::Object(existing), Value::Object(added)) = (current, incoming) else {
        return Err(Conflict);
    };

    let mut merged = existing.clone();
    match schema.get("additionalProperties") {
        Some(Value::Bool(false)) => {
            let unlisted: Vec<String> = merged.keys().filter(|key| !added.contains_key(*key)).cloned().collect();
            for key in unlisted {
                merged.remove(&key);
            }
        }
        Some(extra @ Value::Object(_)) => {
            for (key, property) in merged.iter_mut() {
                if !added.contains_key(key) {
                    *property = merge_schemas([property.clone(), extra.clone()]);
                }
            }
        }
        _ => {}
    }

    for (key, property) in added {
        let resolved = match (merged.get(key), earlier_additional) {
            (Some(existing), _) if existing == property => continue,
            (Some(existing), _) => merge_subschemas(existing, property)?,
            (None, Some(Value::Bool(false))) => continue,
            (None, Some(extra @ Value::Object(_))) => merge_schemas([extra.clone(), property.clone()]),
            (None, _) => property.clone(),
        };
        merged.insert(key.clone(), resolved);
    }
    Ok(Merged::Keep(Value::Object(merged)))
}

fn merge_items(current: &Value, incoming: &Value) -> Result<Merged, Conflict> {
    let merged = match (current, incoming) {
        (Value::Array(left), Value::Array(right)) => {
            let common = intersect(left, right);
            if common.is_empty() {
                return Err(Conflict);
            }
            Value::Array(common)
        }
        (Value::Object(_), Value::Object(_)) => merge_schemas([current.clone(), incoming.clone()]),
        (Value::Array(tuple), list @ Value::Object(_)) | (list @ Value::Object(_), Value::Array(tuple)) => {
            if tuple.is_empty() {
                return Err(Conflict);
            }
            Value::Array(tuple.iter().map(|slot| merge_schemas([slot.clone(), list.clone()])).collect())
        }
        _ => return Err(Conflict),
    };
    Ok(Merged::Keep(merged))
}

/// `not A` and `not B` combine to `not (anyOf [A, B])`.
fn merge_not(current: &Value, incoming: &Value) -> Result<Merged, Conflict> {
    if !(current.is_object() && incoming.is_object()) {
        return Err(Conflict);
    }
    let mut members: Vec<Value> = Vec::new();
    for side in [current, incoming] {
        let nested = side
            .as_object()
            .filter(|map| map.len() == 1)
            .and_then(|map| map.get("anyOf"))
            .and_then(Value::as_array);
        let candidates = nested.map_or_else(|| vec![side.clone()], Vec::clone);
        for candidate in candidates {
            if !members.contains(&candidate) {
                members.push(candidate);
            }
        }
    }
    Ok(Merged::Keep(json!({ "anyOf": members })))
}

fn merge_types(current: &Value, incoming: &Value) -> Result<Merged, Conflict> {
    fn type_names(value: &Value) -> Option<Vec<&str>> {
        match value {
            Value::String(name) => Some(vec![name.as_str()]),
            Value::Array(names) => names.iter().map(Value::as_str).collect(),
            _ => None,
        }
    }
    let (Some(left), Some(right)) = (type_names(current), type_names(incoming)) else {
        return Err(Conflict);
    };
    let mut common: Vec<&str> = Vec::new();
    for name in left {
        let shared = if right.contains(&name) {
            Some(name)
        } else if (name == "integer" && right.contains(&"number")) || (name == "number" && right.contains(&"integer")) {
            Some("integer")
        } else {
            None
        };
        if let Some(shared) = shared.filter(|shared| !common.contains(shared)) {
            common.push(shared);
        }
    }
    match common.as_slice() {
        [] => Err(Conflict),
        [single] => Ok(Merged::Keep(Value::String((*single).to_string()))),
        many => Ok(Merged::Keep(json!(many))),
    }
}

fn tighter_bound(current: &Value, incoming: &Value, keep_smaller: bool) -> Result<Merged, Conflict> {
    let (Some(left), Some(right)) = (current.as_f64(), incoming.as_f64()) else {
        return Err(Conflict);
    };
    let take_incoming = if keep_smaller { right < left } else { right > left };
    Ok(Merged::Keep(if take_incoming { incoming.clone() } else { current.clone() }))
}

fn least_common_multiple(left: &Number, right: &Number) -> Option<Number> {
    if let (Some(a), Some(b)) = (left.as_u64(), right.as_u64()) {
        if a == 0 || b == 0 {
            return None;
        }
        return (a / gcd(a, b)).checked_mul(b).map(Number::from);
    }

    let (a, b) = (left.as_f64()?, right.as_f64()?);
    if !(a > 0.0 && b > 0.0) {
        return None;
    }
    let scale = 10u64.checked_pow(decimal_places(left).max(decimal_places(right)))?;
    let scaled_a = (a * scale as f64).round() as u64;
    let scaled_b = (b * scale as f64).round() as u64;
    if scaled_a == 0 || scaled_b == 0 {
        return None;
    }
    let scaled = (scaled_a / gcd(scaled_a, scaled_b)).checked_mul(scaled_b)?;
    Number::from_f64(scaled as f64 / scale as f64)
}

fn decimal_places(number: &Number) -> u32 {
    let text = number.to_string();
    let places = text.split_once('.').map_or(0, |(_, fraction)| {
        fraction.bytes().take_while(u8::is_ascii_digit).count()
    });
    u32::try_from(places).unwrap_or(u32::MAX).min(12)
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn intersect(left: &[Value], right: &[Value]) -> Vec<Value> {
    let mut common = Vec::new();
    for item in left {
        if right.contains(item) && !common.contains(item) {
            common.push(item.clone());
        }
    }
    common
}

fn union(left: &[Value], right: &[Value]) -> Vec<Value> {
    let mut all = Vec::with_capacity(left.len() + right.len());
    for item in left.iter().chain(right) {
        if !all.contains(item) {
            all.push(item.clone());
        }
    }
    all
}
