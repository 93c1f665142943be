//! Sub-schema extraction with `$ref` inlining.
//!
//! A [`SubschemaResolver`] returns a standalone copy of the schema node at a
//! pointer. Given the reference library and recursive map built by the
//! [`ReferenceResolver`](crate::ReferenceResolver), it also inlines every
//! `$ref` that is not recursive, folds `allOf` arrays and moves misplaced
//! array `required` lists into the item schema.
//!
//! Inlining tracks the pointers already expanded on the current path. A
//! `$ref` whose target contains one of them, or contains the `$ref` itself,
//! is recursive and stays in place; every other `$ref` is expanded with its
//! target added to the path, so expansion always terminates.

use serde_json::{Map, Value};
use tracing::warn;

use crate::config::{RefSiblingPolicy, ResolveOptions};
use crate::error::{Diagnostic, EngineError, Result};
use crate::maps::{ArrayMap, RecursiveRefMap, RefLibrary};
use crate::merge::{merge_schemas, try_merge};
use crate::pointer::{Pointer, Traversal, get_copy, get_first_copy, try_map_deep};

/// Keywords next to a `$ref` that are kept regardless of
/// [`RefSiblingPolicy`].
const STRUCTURAL_SIBLINGS: &[&str] = &["definitions", "$defs", "$schema", "$id", "id", "$comment"];

/// Extracts sub-schemas from a schema document.
#[derive(Debug, Clone, Copy)]
pub struct SubschemaResolver<'a> {
    schema: &'a Value,
    references: Option<(&'a RefLibrary, &'a RecursiveRefMap)>,
    options: ResolveOptions,
}

impl<'a> SubschemaResolver<'a> {
    /// A resolver that only copies subtrees.
    pub fn new(schema: &'a Value) -> Self {
        Self {
            schema,
            references: None,
            options: ResolveOptions::default(),
        }
    }

    /// Enables `$ref` inlining using a reference library and the
    /// schema-flavored recursive reference map.
    pub fn with_references(mut self, library: &'a RefLibrary, recursive: &'a RecursiveRefMap) -> Self {
        self.references = Some((library, recursive));
        self
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the resolved sub-schema at `pointer`, or `None` if nothing
    /// exists there. Degradations are appended to `diagnostics`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RefWithSiblings`] when an inlined `$ref` has
    /// sibling keywords and the policy is [`RefSiblingPolicy::Reject`].
    ///
    /// # Examples
    ///
    /// ```
    /// use form_schema_core::{Pointer, SubschemaResolver};
    /// use serde_json::json;
    ///
    /// let schema = json!({ "properties": { "name": { "type": "string" } } });
    /// let pointer = Pointer::parse("/properties/name").unwrap();
    /// let mut diagnostics = Vec::new();
    /// let name = SubschemaResolver::new(&schema).resolve(&pointer, &mut diagnostics).unwrap();
    /// assert_eq!(name, Some(json!({ "type": "string" })));
    /// ```
    pub fn resolve(&self, pointer: &Pointer, diagnostics: &mut Vec<Diagnostic>) -> Result<Option<Value>> {
        self.resolve_along(pointer, &[], diagnostics)
    }

    fn resolve_along(&self, pointer: &Pointer, used: &[Pointer], diagnostics: &mut Vec<Diagnostic>) -> Result<Option<Value>> {
        let Some((library, recursive)) = self.references else {
            return Ok(get_copy(self.schema, pointer));
        };

        let mut used = used.to_vec();
        used.push(pointer.clone());
        let found = if pointer.is_root() {
            Some(self.schema.clone())
        } else {
            let short = recursive.normalize(pointer, &ArrayMap::new());
            let found = library
                .get(&short)
                .cloned()
                .or_else(|| get_first_copy([(self.schema, pointer), (self.schema, &short)]).map(|(node, _)| node));
            if short != *pointer {
                used.push(short);
            }
            found
        };
        let Some(node) = found else {
            return Ok(None);
        };

        try_map_deep(node, pointer, Traversal::PostOrder, |node, at| self.rewrite(node, at, &used, diagnostics)).map(Some)
    }

    fn rewrite(&self, node: Value, at: &Pointer, used: &[Pointer], diagnostics: &mut Vec<Diagnostic>) -> Result<Value> {
        let Value::Object(mut map) = node else {
            return Ok(node);
        };

        if let Some(target) = inline_target(&map, at, used, diagnostics) {
            return match self.resolve_along(&target, used, diagnostics)? {
                Some(resolved) => self.attach_siblings(resolved, map, at, diagnostics),
                None => {
                    warn!(at = %at, target = %target, "unresolvable $ref");
                    diagnostics.push(Diagnostic::UnresolvedReference {
                        at: at.clone(),
                        reference: target.to_fragment(),
                    });
                    Ok(Value::Object(map))
                }
            };
        }

        if self.options.combine_all_of && map.get("allOf").is_some_and(Value::is_array) {
            match fold_all_of(map) {
                Ok(folded) => match folded {
                    Value::Object(folded) => map = folded,
                    other => return Ok(other),
                },
                Err(original) => {
                    diagnostics.push(Diagnostic::UncombinedAllOf { at: at.clone() });
                    map = original;
                }
            }
        }

        if self.options.relocate_array_required {
            relocate_array_required(&mut map);
        }
        Ok(Value::Object(map))
    }

    fn attach_siblings(
        &self,
        resolved: Value,
        mut node: Map<String, Value>,
        at: &Pointer,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Value> {
        node.remove("$ref");
        if node.is_empty() {
            return Ok(resolved);
        }

        let keywords: Vec<String> = node
            .keys()
            .filter(|key| !STRUCTURAL_SIBLINGS.contains(&key.as_str()))
            .cloned()
            .collect();
        if !keywords.is_empty() {
            match self.options.ref_siblings {
                RefSiblingPolicy::Merge => {}
                RefSiblingPolicy::Ignore => {
                    for keyword in &keywords {
                        node.remove(keyword);
                    }
                    diagnostics.push(Diagnostic::DroppedRefSiblings { at: at.clone(), keywords });
                }
                RefSiblingPolicy::Reject => {
                    return Err(EngineError::RefWithSiblings { at: at.clone(), keywords });
                }
            }
        }
        Ok(merge_schemas([resolved, Value::Object(node)]))
    }
}

/// The `$ref` target to inline at `at`, or `None` when the node has no
/// `$ref`, or the reference is recursive or malformed.
fn inline_target(
    node: &Map<String, Value>,
    at: &Pointer,
    used: &[Pointer],
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Pointer> {
    let reference = node.get("$ref")?.as_str()?;
    let Some(target) = Pointer::parse(reference) else {
        diagnostics.push(Diagnostic::UnresolvedReference {
            at: at.clone(),
            reference: reference.to_string(),
        });
        return None;
    };
    let recursive = target.is_root()
        || at.is_sub_pointer(&target, false)
        || used.iter().any(|pointer| pointer.is_sub_pointer(&target, false));
    (!recursive).then_some(target)
}

/// Folds an `allOf` array and the keywords beside it into one schema.
///
/// A schema without an `allOf` array is returned unchanged. When the members
/// cannot be merged without loss the original schema is kept as-is.
///
/// # Examples
///
/// ```
/// use form_schema_core::combine_all_of;
/// use serde_json::json;
///
/// let schema = json!({
///     "title": "Person",
///     "allOf": [{ "required": ["name"] }, { "required": ["age"] }]
/// });
/// assert_eq!(combine_all_of(schema), json!({ "title": "Person", "required": ["name", "age"] }));
///
/// let conflicting = json!({ "allOf": [{ "type": "string" }, { "type": "number" }] });
/// assert_eq!(combine_all_of(conflicting.clone()), conflicting);
/// ```
pub fn combine_all_of(schema: Value) -> Value {
    match schema {
        Value::Object(map) if map.get("allOf").is_some_and(Value::is_array) => {
            fold_all_of(map).unwrap_or_else(Value::Object)
        }
        other => other,
    }
}

fn fold_all_of(mut map: Map<String, Value>) -> std::result::Result<Value, Map<String, Value>> {
    let Some(Value::Array(members)) = map.remove("allOf") else {
        return Ok(Value::Object(map));
    };
    let mut inputs = members.clone();
    if !map.is_empty() {
        inputs.push(Value::Object(map.clone()));
    }
    try_merge(inputs).map_err(|_| {
        map.insert("allOf".to_string(), Value::Array(members));
        map
    })
}

/// Moves `required` from an array schema into its `items` (or
/// `additionalItems`) when every listed name is a property there and the
/// item schema has no `required` of its own.
fn relocate_array_required(map: &mut Map<String, Value>) {
    let is_array = match map.get("type") {
        Some(Value::String(name)) => name == "array",
        Some(Value::Array(names)) => names.iter().any(|name| name == "array"),
        _ => false,
    };
    let Some(Value::Array(required)) = map.get("required").filter(|_| is_array) else {
        return;
    };
    let target = ["items", "additionalItems"].into_iter().find(|keyword| {
        map.get(*keyword).is_some_and(|item| {
            let properties = item.get("properties").and_then(Value::as_object);
            item.get("required").is_none()
                && properties.is_some_and(|properties| {
                    required
                        .iter()
                        .all(|name| name.as_str().is_some_and(|name| properties.contains_key(name)))
                })
        })
    });
    let Some(target) = target else {
        return;
    };
    if let Some(required) = map.remove("required") {
        if let Some(Value::Object(item)) = map.get_mut(target) {
            item.insert("required".to_string(), required);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::graph::{RefGraph, recursive_ref_map};

    fn ptr(raw: &str) -> Pointer {
        Pointer::parse(raw).unwrap()
    }

    struct Prepared {
        library: RefLibrary,
        recursive: RecursiveRefMap,
    }

    fn prepare(schema: &Value) -> Prepared {
        let graph = RefGraph::collect(schema);
        let mut diagnostics = Vec::new();
        let library = graph.library(schema, &mut diagnostics);
        Prepared {
            library,
            recursive: recursive_ref_map(&graph.closure()),
        }
    }

    #[test]
    fn test_plain_copy_without_references() {
        let schema = json!({ "properties": { "a": { "$ref": "#/definitions/x" } }, "definitions": { "x": {} } });
        let mut diagnostics = Vec::new();
        let copy = SubschemaResolver::new(&schema).resolve(&ptr("/properties/a"), &mut diagnostics).unwrap();
        assert_eq!(copy, Some(json!({ "$ref": "#/definitions/x" })));
        assert!(SubschemaResolver::new(&schema).resolve(&ptr("/nope"), &mut diagnostics).unwrap().is_none());
    }

    #[test]
    fn test_inlines_non_recursive_refs_with_siblings() {
        let schema = json!({
            "properties": { "a": { "$ref": "#/definitions/x", "title": "A" } },
            "definitions": { "x": { "type": "string" } }
        });
        let prepared = prepare(&schema);
        let mut diagnostics = Vec::new();
        let resolved = SubschemaResolver::new(&schema)
            .with_references(&prepared.library, &prepared.recursive)
            .resolve(&ptr("/properties/a"), &mut diagnostics)
            .unwrap();
        assert_eq!(resolved, Some(json!({ "type": "string", "title": "A" })));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_sibling_policies() {
        let schema = json!({
            "properties": { "a": { "$ref": "#/definitions/x", "minLength": 2 } },
            "definitions": { "x": { "type": "string" } }
        });
        let prepared = prepare(&schema);
        let resolver = SubschemaResolver::new(&schema).with_references(&prepared.library, &prepared.recursive);

        let ignore = ResolveOptions { ref_siblings: RefSiblingPolicy::Ignore, ..ResolveOptions::default() };
        let mut diagnostics = Vec::new();
        let resolved = resolver.with_options(ignore).resolve(&ptr("/properties/a"), &mut diagnostics).unwrap();
        assert_eq!(resolved, Some(json!({ "type": "string" })));
        assert_eq!(
            diagnostics,
            [Diagnostic::DroppedRefSiblings { at: ptr("/properties/a"), keywords: vec!["minLength".into()] }]
        );

        let reject = ResolveOptions { ref_siblings: RefSiblingPolicy::Reject, ..ResolveOptions::default() };
        let result = resolver.with_options(reject).resolve(&ptr("/properties/a"), &mut Vec::new());
        assert!(matches!(result, Err(EngineError::RefWithSiblings { .. })));
    }

    #[test]
    fn test_recursive_ref_is_kept() {
        let schema = json!({
            "definitions": {
                "node": { "properties": { "next": { "$ref": "#/definitions/node" } } }
            }
        });
        let prepared = prepare(&schema);
        let mut diagnostics = Vec::new();
        let resolved = SubschemaResolver::new(&schema)
            .with_references(&prepared.library, &prepared.recursive)
            .resolve(&ptr("/definitions/node"), &mut diagnostics)
            .unwrap()
            .unwrap();
        assert_eq!(resolved["properties"]["next"], json!({ "$ref": "#/definitions/node" }));
    }

    #[test]
    fn test_unresolvable_ref_is_reported_and_kept() {
        let schema = json!({ "properties": { "a": { "$ref": "#/definitions/missing" } } });
        let prepared = prepare(&schema);
        let mut diagnostics = Vec::new();
        let resolved = SubschemaResolver::new(&schema)
            .with_references(&prepared.library, &prepared.recursive)
            .resolve(&Pointer::root(), &mut diagnostics)
            .unwrap()
            .unwrap();
        assert_eq!(resolved, schema);
        assert!(matches!(diagnostics.as_slice(), [Diagnostic::UnresolvedReference { .. }]));
    }

    #[test]
    fn test_all_of_conflict_is_kept_and_reported() {
        let schema = json!({ "properties": { "a": { "allOf": [{ "type": "string" }, { "type": "number" }] } } });
        let prepared = prepare(&schema);
        let mut diagnostics = Vec::new();
        let resolved = SubschemaResolver::new(&schema)
            .with_references(&prepared.library, &prepared.recursive)
            .resolve(&Pointer::root(), &mut diagnostics)
            .unwrap()
            .unwrap();
        assert_eq!(resolved, schema);
        assert_eq!(diagnostics, [Diagnostic::UncombinedAllOf { at: ptr("/properties/a") }]);
    }

    #[test]
    fn test_relocate_array_required() {
        let mut map = json!({
            "type": "array",
            "required": ["x"],
            "items": { "type": "object", "properties": { "x": {}, "y": {} } }
        })
        .as_object()
        .cloned()
        .unwrap();
        relocate_array_required(&mut map);
        assert_eq!(
            Value::Object(map),
            json!({ "type": "array", "items": { "type": "object", "properties": { "x": {}, "y": {} }, "required": ["x"] } })
        );

        let mut unknown = json!({ "type": "array", "required": ["z"], "items": { "properties": { "x": {} } } })
            .as_object()
            .cloned()
            .unwrap();
        let before = unknown.clone();
        relocate_array_required(&mut unknown);
        assert_eq!(unknown, before);
    }
}
