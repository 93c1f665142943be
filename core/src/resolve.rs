//! Compilation of a schema into a reference-free [`CompiledSchema`].
//!
//! Resolution runs in phases:
//!
//! 1. collect every `$ref` edge and copy its target into a library,
//! 2. close the edge set under composition and derive the recursive
//!    reference map,
//! 3. inline every non-recursive `$ref` from the root down,
//! 4. walk the result once more to canonicalize the surviving recursive
//!    `$ref`s and build the lookup maps the layout builder needs.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::{EngineConfig, ResolveOptions};
use crate::error::{Diagnostic, EngineError, Result, json_type_name};
use crate::graph::{RefGraph, recursive_ref_map};
use crate::maps::{ArrayMap, RecursiveRefMap, RefLibrary};
use crate::pointer::{Pointer, for_each_deep, get, get_copy, get_mut};
use crate::subschema::SubschemaResolver;
use crate::translate::{to_data_pointer, to_schema_pointer};

/// The output of [`ReferenceResolver::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompiledSchema {
    /// The schema with every non-recursive `$ref` inlined. Remaining `$ref`s
    /// point at an ancestor in this document (or could not be resolved; see
    /// `diagnostics`).
    pub schema: Value,
    /// Recursive `$ref` positions to their targets, as schema pointers.
    pub schema_recursive_refs: RecursiveRefMap,
    /// The same references as generic data pointers.
    pub data_recursive_refs: RecursiveRefMap,
    /// Every array in the data, with its tuple arity.
    pub array_map: ArrayMap,
    /// Copies of every remaining `$ref` target in `schema`.
    pub ref_library: RefLibrary,
    /// Non-fatal problems met during resolution.
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledSchema {
    /// Returns `true` if resolution had to leave something unresolved or
    /// unmerged.
    pub fn is_degraded(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Shortest generic data pointer equivalent to `data_pointer`.
    pub fn normalize_data_pointer(&self, data_pointer: &Pointer) -> Pointer {
        self.data_recursive_refs.normalize(data_pointer, &self.array_map)
    }

    /// The compiled schema node governing the value at `data_pointer`.
    ///
    /// # Examples
    ///
    /// ```
    /// use form_schema_core::{Pointer, resolve_schema_references};
    /// use serde_json::json;
    ///
    /// let compiled = resolve_schema_references(&json!({
    ///     "type": "object",
    ///     "properties": {
    ///         "name": { "type": "string" },
    ///         "children": { "type": "array", "items": { "$ref": "#" } }
    ///     }
    /// }))
    /// .unwrap();
    ///
    /// let deep = Pointer::parse("/children/2/children/0/name").unwrap();
    /// assert_eq!(compiled.schema_at_data_pointer(&deep), Some(&json!({ "type": "string" })));
    /// ```
    pub fn schema_at_data_pointer(&self, data_pointer: &Pointer) -> Option<&Value> {
        let short = self.normalize_data_pointer(data_pointer);
        let schema_pointer = to_schema_pointer(&short, &self.schema)?;
        get(&self.schema, &schema_pointer)
    }
}

/// Compiles schemas with a fixed set of [`ResolveOptions`].
#[derive(Debug, Clone, Default)]
pub struct ReferenceResolver {
    options: ResolveOptions,
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ResolveOptions) -> Self {
        Self { options }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_options(config.resolve)
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Compiles `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SchemaNotObject`] if `schema` is not a JSON
    /// object, and [`EngineError::RefWithSiblings`] if the sibling policy
    /// rejects an inlined `$ref`.
    pub fn resolve(&self, schema: &Value) -> Result<CompiledSchema> {
        if !schema.is_object() {
            let found = json_type_name(schema);
            error!(found, "cannot resolve schema references: schema must be an object");
            return Err(EngineError::SchemaNotObject { found });
        }

        let mut diagnostics = Vec::new();
        let graph = RefGraph::collect(schema);
        let library = graph.library(schema, &mut diagnostics);
        let closure = graph.closure();
        let recursive = recursive_ref_map(&closure);
        debug!(
            references = graph.edges().len(),
            closure = closure.len(),
            recursive = recursive.len(),
            "built reference graph"
        );

        let inlined = SubschemaResolver::new(schema)
            .with_references(&library, &recursive)
            .with_options(self.options)
            .resolve(&Pointer::root(), &mut diagnostics)?
            // the root pointer always resolves
            .unwrap_or_else(|| schema.clone());

        let mut compiled = index_compiled(inlined, &recursive);
        diagnostics.sort();
        diagnostics.dedup();
        compiled.diagnostics = diagnostics;
        debug!(
            schema_refs = compiled.schema_recursive_refs.len(),
            data_refs = compiled.data_recursive_refs.len(),
            arrays = compiled.array_map.len(),
            diagnostics = compiled.diagnostics.len(),
            "compiled schema"
        );
        Ok(compiled)
    }
}

/// Compiles `schema` with default options.
pub fn resolve_schema_references(schema: &Value) -> Result<CompiledSchema> {
    ReferenceResolver::new().resolve(schema)
}

/// Canonicalizes the remaining `$ref`s of an inlined schema and builds the
/// recursive reference maps, array map and reference library for it.
fn index_compiled(mut schema: Value, recursive: &RecursiveRefMap) -> CompiledSchema {
    let mut rewrites: Vec<(Pointer, Pointer)> = Vec::new();
    let mut references: Vec<(Pointer, Pointer)> = Vec::new();
    let mut array_map = ArrayMap::new();
    let no_arrays = ArrayMap::new();

    for_each_deep(&schema, &Pointer::root(), |node, at| {
        if let Some(mut target) = node.get("$ref").and_then(Value::as_str).and_then(Pointer::parse) {
            if !at.is_sub_pointer(&target, false) {
                let normalized = recursive.normalize(at, &no_arrays);
                if normalized != *at {
                    rewrites.push((at.clone(), normalized.clone()));
                    target = normalized;
                }
            }
            references.push((at.clone(), target));
        }

        if is_array_schema(node) && (node.get("items").is_some() || node.get("additionalItems").is_some()) {
            if let Some(data_pointer) = to_data_pointer(at, &schema) {
                let arity = node.get("items").and_then(Value::as_array).map_or(0, Vec::len);
                array_map.insert_if_absent(data_pointer, arity);
            }
        }
    });

    for (at, target) in rewrites {
        if let Some(Value::Object(node)) = get_mut(&mut schema, &at) {
            node.insert("$ref".to_string(), Value::String(target.to_fragment()));
        }
    }

    let mut schema_recursive_refs = RecursiveRefMap::new();
    let mut data_recursive_refs = RecursiveRefMap::new();
    let mut targets = BTreeSet::new();
    for (at, target) in references {
        if get(&schema, &target).is_none() {
            continue;
        }
        if let (Some(data_from), Some(data_to)) = (to_data_pointer(&at, &schema), to_data_pointer(&target, &schema)) {
            data_recursive_refs.insert_if_absent(data_from, data_to);
        }
        schema_recursive_refs.insert_if_absent(at, target.clone());
        targets.insert(target);
    }
    let ref_library = targets
        .into_iter()
        .filter_map(|target| get_copy(&schema, &target).map(|node| (target, node)))
        .collect();

    CompiledSchema {
        schema,
        schema_recursive_refs,
        data_recursive_refs,
        array_map,
        ref_library,
        diagnostics: Vec::new(),
    }
}

fn is_array_schema(node: &Value) -> bool {
    match node.get("type") {
        Some(Value::String(name)) => name == "array",
        Some(Value::Array(names)) => names.iter().any(|name| name == "array"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ptr(raw: &str) -> Pointer {
        Pointer::parse(raw).unwrap()
    }

    #[test]
    fn test_rejects_non_object_schema() {
        for schema in [json!(null), json!([]), json!("x"), json!(true)] {
            let err = resolve_schema_references(&schema).unwrap_err();
            assert!(matches!(err, EngineError::SchemaNotObject { .. }), "{schema}");
        }
    }

    #[test]
    fn test_acyclic_schema_without_refs_is_unchanged() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "tags": { "type": "array", "items": { "type": "string" } }
            }
        });
        let compiled = resolve_schema_references(&schema).unwrap();
        assert_eq!(compiled.schema, schema);
        assert!(compiled.schema_recursive_refs.is_empty());
        assert!(compiled.data_recursive_refs.is_empty());
        assert!(compiled.ref_library.is_empty());
        assert_eq!(compiled.array_map.arity(&ptr("/tags")), Some(0));
        assert!(!compiled.is_degraded());
    }

    #[test]
    fn test_tuple_arrays_record_their_arity() {
        let schema = json!({
            "properties": {
                "point": {
                    "type": "array",
                    "items": [{ "type": "number" }, { "type": "number" }],
                    "additionalItems": { "type": "string" }
                }
            }
        });
        let compiled = resolve_schema_references(&schema).unwrap();
        assert_eq!(compiled.array_map.arity(&ptr("/point")), Some(2));
        assert_eq!(compiled.schema_at_data_pointer(&ptr("/point/1")), Some(&json!({ "type": "number" })));
        assert_eq!(compiled.schema_at_data_pointer(&ptr("/point/5")), Some(&json!({ "type": "string" })));
    }

    #[test]
    fn test_shared_definition_is_inlined_at_every_use() {
        let schema = json!({
            "properties": {
                "home": { "$ref": "#/definitions/address" },
                "work": { "$ref": "#/definitions/address" }
            },
            "definitions": {
                "address": { "type": "object", "properties": { "city": { "type": "string" } } }
            }
        });
        let compiled = resolve_schema_references(&schema).unwrap();
        assert_eq!(compiled.schema["properties"]["home"], schema["definitions"]["address"]);
        assert_eq!(compiled.schema["properties"]["work"], schema["definitions"]["address"]);
        assert!(compiled.schema_recursive_refs.is_empty());
    }

    #[test]
    fn test_unresolvable_ref_is_a_diagnostic() {
        let schema = json!({ "properties": { "a": { "$ref": "#/definitions/missing" } } });
        let compiled = resolve_schema_references(&schema).unwrap();
        assert_eq!(compiled.schema, schema);
        assert!(compiled.is_degraded());
        assert!(compiled.schema_recursive_refs.is_empty());
        assert!(
            compiled
                .diagnostics
                .iter()
                .all(|d| d.pointer() == &ptr("/properties/a"))
        );
    }

    #[test]
    fn test_resolver_honors_config() {
        let config = EngineConfig::from_yaml_str("resolve:\n  combine_all_of: false\n").unwrap();
        let schema = json!({ "allOf": [{ "required": ["a"] }, { "required": ["b"] }] });
        let compiled = ReferenceResolver::from_config(&config).resolve(&schema).unwrap();
        assert_eq!(compiled.schema, schema);

        let combined = ReferenceResolver::new().resolve(&schema).unwrap();
        assert_eq!(combined.schema, json!({ "required": ["a", "b"] }));
    }
}
