//! Translation between schema pointers and data pointers.
//!
//! A schema pointer addresses a node of the schema document
//! (`/properties/tags/items`); a data pointer addresses the position in a
//! conforming instance that node describes (`/tags/-`).

use serde_json::Value;

use crate::pointer::{GENERIC_INDEX, Pointer, array_index};

/// Converts a schema pointer to the generic data pointer it describes.
///
/// `properties/<key>` contributes `<key>`, list-form `items` and
/// `additionalItems` contribute `-`, positional `items/<i>` contributes `<i>`,
/// and `allOf`/`anyOf`/`oneOf` members describe the same data position as
/// their parent. Any other keyword (`definitions`, `not`, ...) has no data
/// counterpart and yields `None`, as does a path missing from `schema`.
///
/// # Examples
///
/// ```
/// use form_schema_core::{Pointer, to_data_pointer};
/// use serde_json::json;
///
/// let schema = json!({
///     "properties": { "tags": { "type": "array", "items": { "type": "string" } } }
/// });
/// let at = Pointer::parse("/properties/tags/items").unwrap();
/// assert_eq!(to_data_pointer(&at, &schema).unwrap().to_string(), "/tags/-");
/// ```
pub fn to_data_pointer(schema_pointer: &Pointer, schema: &Value) -> Option<Pointer> {
    let mut data_pointer = Pointer::root();
    let mut node = schema;
    let mut tokens = schema_pointer.tokens().iter();
    while let Some(keyword) = tokens.next() {
        match keyword.as_str() {
            "properties" => {
                let key = tokens.next()?;
                node = node.get("properties")?.get(key.as_str())?;
                data_pointer.push(key.clone());
            }
            "items" => match node.get("items")? {
                Value::Array(tuple) => {
                    let index = tokens.next()?;
                    node = tuple.get(array_index(index)?)?;
                    data_pointer.push(index.clone());
                }
                items => {
                    node = items;
                    data_pointer.push(GENERIC_INDEX);
                }
            },
            "additionalItems" => {
                node = node.get("additionalItems")?;
                data_pointer.push(GENERIC_INDEX);
            }
            "allOf" | "anyOf" | "oneOf" => {
                let index = tokens.next()?;
                node = node.get(keyword.as_str())?.get(array_index(index)?)?;
            }
            _ => return None,
        }
    }
    Some(data_pointer)
}

/// Converts a data pointer to the schema pointer of the node that governs
/// it, following `properties`, `additionalProperties`, `items` and
/// `additionalItems`.
///
/// Pass a pointer already normalized with
/// [`RecursiveRefMap::normalize`](crate::RecursiveRefMap::normalize) so it
/// never has to walk through a recursive `$ref`.
pub fn to_schema_pointer(data_pointer: &Pointer, schema: &Value) -> Option<Pointer> {
    let mut schema_pointer = Pointer::root();
    let mut node = schema;
    for key in data_pointer.tokens() {
        let (steps, next) = schema_step(node, key)?;
        for step in steps {
            schema_pointer.push(step);
        }
        node = next;
    }
    Some(schema_pointer)
}

fn schema_step<'a>(node: &'a Value, key: &str) -> Option<(Vec<String>, &'a Value)> {
    if let Some(property) = node.get("properties").and_then(|properties| properties.get(key)) {
        return Some((vec!["properties".into(), key.into()], property));
    }

    let index = array_index(key);
    if index.is_some() || key == GENERIC_INDEX {
        match node.get("items") {
            Some(Value::Array(tuple)) => {
                if let Some(slot) = index.and_then(|index| tuple.get(index)) {
                    return Some((vec!["items".into(), key.into()], slot));
                }
                if let Some(extra) = node.get("additionalItems").filter(|extra| extra.is_object()) {
                    return Some((vec!["additionalItems".into()], extra));
                }
            }
            Some(items) if items.is_object() => return Some((vec!["items".into()], items)),
            _ => {}
        }
    }

    node.get("additionalProperties")
        .filter(|extra| extra.is_object())
        .map(|extra| (vec!["additionalProperties".into()], extra))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ptr(raw: &str) -> Pointer {
        Pointer::parse(raw).unwrap()
    }

    fn sample() -> Value {
        json!({
            "type": "object",
            "properties": {
                "pair": {
                    "type": "array",
                    "items": [{ "type": "string" }, { "type": "number" }],
                    "additionalItems": { "type": "boolean" }
                },
                "tags": { "type": "array", "items": { "type": "string" } },
                "choice": { "anyOf": [{ "properties": { "x": { "type": "string" } } }] }
            },
            "additionalProperties": { "type": "integer" },
            "definitions": { "unused": { "type": "null" } }
        })
    }

    #[test]
    fn test_to_data_pointer() {
        let schema = sample();
        let cases = [
            ("", Some("")),
            ("/properties/pair/items/1", Some("/pair/1")),
            ("/properties/pair/additionalItems", Some("/pair/-")),
            ("/properties/tags/items", Some("/tags/-")),
            ("/properties/choice/anyOf/0/properties/x", Some("/choice/x")),
            ("/definitions/unused", None),
            ("/properties/missing", None),
        ];
        for (schema_pointer, expected) in cases {
            let actual = to_data_pointer(&ptr(schema_pointer), &schema).map(|p| p.compile());
            assert_eq!(actual.as_deref(), expected, "schema pointer {schema_pointer:?}");
        }
    }

    #[test]
    fn test_to_schema_pointer() {
        let schema = sample();
        let cases = [
            ("/pair/0", Some("/properties/pair/items/0")),
            ("/pair/-", Some("/properties/pair/additionalItems")),
            ("/pair/7", Some("/properties/pair/additionalItems")),
            ("/tags/3", Some("/properties/tags/items")),
            ("/anything", Some("/additionalProperties")),
            ("/tags/0/deeper", None),
        ];
        for (data_pointer, expected) in cases {
            let actual = to_schema_pointer(&ptr(data_pointer), &schema).map(|p| p.compile());
            assert_eq!(actual.as_deref(), expected, "data pointer {data_pointer:?}");
        }
    }
}
