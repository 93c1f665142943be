//! Value predicates shared by the validator factories.

use serde_json::Value;

/// Returns `true` for values a form treats as "not filled in": absent,
/// `null`, `""`, `[]` and `{}`.
///
/// Every validator except [`required`](crate::required) accepts empty
/// values, so an untouched optional control never shows an error.
///
/// # Examples
///
/// ```
/// use form_schema_validators::is_empty;
/// use serde_json::json;
///
/// assert!(is_empty(None));
/// assert!(is_empty(Some(&json!(""))));
/// assert!(is_empty(Some(&json!({}))));
/// assert!(!is_empty(Some(&json!(0))));
/// assert!(!is_empty(Some(&json!(false))));
/// ```
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Bool(_) | Value::Number(_)) => false,
    }
}

/// Returns `true` if a value satisfies `required`: present, not `null` and
/// not the empty string. Empty arrays and objects count as values.
pub fn has_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(text)) => !text.is_empty(),
        Some(_) => true,
    }
}

/// Checks `value` against a JSON Schema type name. `integer` accepts any
/// number without a fractional part, including `2.0`.
pub fn is_type(value: &Value, type_name: &str) -> bool {
    match type_name {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => match value {
            Value::Number(number) => {
                number.is_i64() || number.is_u64() || number.as_f64().is_some_and(|n| n.is_finite() && n.fract() == 0.0)
            }
            _ => false,
        },
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => false,
    }
}

/// Structural equality where numbers compare by value, so `1` equals `1.0`.
pub fn loose_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a == b || a.as_f64() == b.as_f64(),
        (Value::Array(a), Value::Array(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| loose_equal(x, y)),
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len() && a.iter().all(|(key, x)| b.get(key).is_some_and(|y| loose_equal(x, y)))
        }
        _ => left == right,
    }
}
