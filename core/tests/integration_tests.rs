use std::io::Write;

use form_schema_core::{
    ArrayMap, CompiledSchema, Diagnostic, EngineConfig, EngineError, Pointer, RecursiveRefMap, RefSiblingPolicy,
    ReferenceResolver, for_each_deep, get, merge_schemas, normalize_recursive_pointer, resolve_schema_references,
};
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ptr(raw: &str) -> Pointer {
    Pointer::parse(raw).unwrap()
}

fn tree_schema() -> Value {
    json!({
        "$ref": "#/definitions/node",
        "definitions": {
            "node": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "children": { "type": "array", "items": { "$ref": "#/definitions/node" } }
                }
            }
        }
    })
}

fn mutual_schema() -> Value {
    json!({
        "$ref": "#/definitions/a",
        "definitions": {
            "a": { "type": "object", "properties": { "b": { "$ref": "#/definitions/b" } } },
            "b": { "type": "object", "properties": { "a": { "$ref": "#/definitions/a" } } }
        }
    })
}

/// Collects `(location, target)` for every `$ref` left in a compiled schema.
fn surviving_refs(compiled: &CompiledSchema) -> Vec<(Pointer, Pointer)> {
    let mut refs = Vec::new();
    for_each_deep(&compiled.schema, &Pointer::root(), |node, at| {
        if let Some(target) = node.get("$ref").and_then(Value::as_str) {
            refs.push((at.clone(), Pointer::parse(target).unwrap()));
        }
    });
    refs
}

fn assert_only_recursive_refs(compiled: &CompiledSchema) {
    for (at, target) in surviving_refs(compiled) {
        assert!(
            at.is_sub_pointer(&target, false),
            "$ref at {at} points to {target}, which is not an ancestor"
        );
        assert!(get(&compiled.schema, &target).is_some(), "$ref at {at} points nowhere");
    }
}

// ---------------------------------------------------------------------------
// Reference resolution
// ---------------------------------------------------------------------------

#[test]
fn test_self_referencing_tree_compiles_to_finite_schema() {
    let compiled = resolve_schema_references(&tree_schema()).unwrap();

    assert_eq!(compiled.schema["type"], json!("object"));
    assert_eq!(compiled.schema["properties"]["children"]["items"], json!({ "$ref": "#" }));
    assert_eq!(
        compiled.schema_recursive_refs.get(&ptr("/properties/children/items")),
        Some(&Pointer::root())
    );
    assert_eq!(compiled.data_recursive_refs.get(&ptr("/children/-")), Some(&Pointer::root()));
    assert_eq!(compiled.array_map.arity(&ptr("/children")), Some(0));
    assert!(compiled.ref_library.contains(&Pointer::root()));
    assert!(!compiled.is_degraded());
    assert_only_recursive_refs(&compiled);
}

#[test]
fn test_deep_data_pointers_map_to_schema_nodes() {
    let compiled = resolve_schema_references(&tree_schema()).unwrap();

    let deep = ptr("/children/3/children/0/children/12/name");
    assert_eq!(compiled.normalize_data_pointer(&deep), ptr("/name"));
    assert_eq!(compiled.schema_at_data_pointer(&deep), Some(&json!({ "type": "string" })));

    let child = compiled.schema_at_data_pointer(&ptr("/children/1")).unwrap();
    assert_eq!(child["type"], json!("object"));
}

#[test]
fn test_mutual_recursion_terminates_and_canonicalizes() {
    let compiled = resolve_schema_references(&mutual_schema()).unwrap();

    assert_eq!(
        compiled.schema["properties"]["b"]["properties"]["a"],
        json!({ "$ref": "#" })
    );
    assert_eq!(
        compiled.schema["definitions"]["a"]["properties"]["b"]["properties"]["a"]["properties"]["b"],
        json!({ "$ref": "#/definitions/a/properties/b" })
    );
    assert_only_recursive_refs(&compiled);

    let data = ptr("/b/a/b/a/b");
    assert_eq!(compiled.normalize_data_pointer(&data), ptr("/b"));
}

#[test]
fn test_acyclic_schema_is_a_no_op() {
    let schema = json!({
        "type": "object",
        "required": ["title"],
        "properties": {
            "title": { "type": "string", "minLength": 1 },
            "scores": { "type": "array", "items": { "type": "number", "minimum": 0 } }
        }
    });
    let compiled = resolve_schema_references(&schema).unwrap();
    assert_eq!(compiled.schema, schema);
    assert!(compiled.schema_recursive_refs.is_empty());
    assert!(compiled.diagnostics.is_empty());
}

#[test]
fn test_non_object_schema_is_fatal() {
    let err = resolve_schema_references(&json!([{ "type": "string" }])).unwrap_err();
    assert!(matches!(err, EngineError::SchemaNotObject { found: "array" }));
    assert_eq!(err.to_string(), "schema must be an object, found array");
}

#[test]
fn test_unresolvable_reference_degrades() {
    let schema = json!({
        "properties": {
            "remote": { "$ref": "https://example.com/schema.json#/x" },
            "local": { "$ref": "#/definitions/gone" }
        }
    });
    let compiled = resolve_schema_references(&schema).unwrap();
    assert_eq!(compiled.schema, schema);
    let at: Vec<&Pointer> = compiled.diagnostics.iter().map(Diagnostic::pointer).collect();
    assert!(at.contains(&&ptr("/properties/remote")));
    assert!(at.contains(&&ptr("/properties/local")));
}

#[test]
fn test_ref_sibling_policy_from_config() {
    let schema = json!({
        "properties": { "nick": { "$ref": "#/definitions/short", "title": "Nickname" } },
        "definitions": { "short": { "type": "string", "maxLength": 8 } }
    });

    let merged = resolve_schema_references(&schema).unwrap();
    assert_eq!(
        merged.schema["properties"]["nick"],
        json!({ "type": "string", "maxLength": 8, "title": "Nickname" })
    );

    let config = EngineConfig::from_yaml_str("resolve:\n  ref_siblings: reject\n").unwrap();
    assert_eq!(config.resolve.ref_siblings, RefSiblingPolicy::Reject);
    let err = ReferenceResolver::from_config(&config).resolve(&schema).unwrap_err();
    assert!(matches!(err, EngineError::RefWithSiblings { .. }));
}

#[test]
fn test_compiled_schema_serializes_maps_as_objects() {
    let compiled = resolve_schema_references(&tree_schema()).unwrap();
    let encoded = serde_json::to_value(&compiled).unwrap();
    assert_eq!(encoded["schema_recursive_refs"]["/properties/children/items"], json!(""));
    assert_eq!(encoded["array_map"]["/children"], json!(0));
    assert_eq!(encoded["diagnostics"], json!([]));
}

// ---------------------------------------------------------------------------
// Pointer normalization
// ---------------------------------------------------------------------------

#[test]
fn test_normalization_is_idempotent_over_compiled_maps() {
    let compiled = resolve_schema_references(&tree_schema()).unwrap();
    for raw in ["", "/name", "/children/0", "/children/9/children/2/name", "/children/-/children/-"] {
        let once = compiled.normalize_data_pointer(&ptr(raw));
        assert_eq!(compiled.normalize_data_pointer(&once), once, "{raw}");
    }
}

#[test]
fn test_normalization_without_maps_only_genericizes() {
    let arrays: ArrayMap = [(ptr("/list"), 0)].into_iter().collect();
    let normalized = normalize_recursive_pointer(&ptr("/list/4/x"), &RecursiveRefMap::new(), &arrays);
    assert_eq!(normalized, ptr("/list/-/x"));
}

// ---------------------------------------------------------------------------
// Schema merging
// ---------------------------------------------------------------------------

#[test]
fn test_merge_identity_elements() {
    let schema = json!({ "type": "object", "properties": { "a": { "type": "string" } } });
    assert_eq!(merge_schemas([schema.clone(), json!({})]), schema);
    assert_eq!(merge_schemas([json!(true), schema.clone()]), schema);
    assert_eq!(merge_schemas([schema.clone(), schema.clone()]), schema);
}

#[test]
fn test_merge_is_commutative_for_order_free_keywords() {
    let pairs = [
        (json!({ "minimum": 3, "maximum": 9 }), json!({ "minimum": 5, "exclusiveMaximum": 8 })),
        (json!({ "type": ["string", "null"] }), json!({ "type": "string" })),
        (json!({ "multipleOf": 4 }), json!({ "multipleOf": 6 })),
        (json!({ "additionalProperties": false }), json!({ "additionalProperties": { "type": "string" } })),
        (json!({ "uniqueItems": true }), json!({ "uniqueItems": false })),
    ];
    for (left, right) in pairs {
        assert_eq!(
            merge_schemas([left.clone(), right.clone()]),
            merge_schemas([right.clone(), left.clone()]),
            "merging {left} and {right}"
        );
    }
}

#[test]
fn test_merge_conflicts_fall_back_to_all_of() {
    let inputs = [json!({ "type": "string" }), json!({ "type": "number" })];
    assert_eq!(merge_schemas(inputs.clone()), json!({ "allOf": inputs }));

    let mixed = merge_schemas([json!({ "type": "string" }), json!(false)]);
    assert_eq!(mixed, json!({ "allOf": [{ "type": "string" }, false] }));
}

#[test]
fn test_merge_numeric_and_required_rules() {
    let merged = merge_schemas([
        json!({ "required": ["a", "b"], "minLength": 2, "maxLength": 10, "multipleOf": 4 }),
        json!({ "required": ["b", "c"], "minLength": 5, "maxLength": 20, "multipleOf": 6 }),
    ]);
    assert_eq!(
        merged,
        json!({ "required": ["a", "b", "c"], "minLength": 5, "maxLength": 10, "multipleOf": 12 })
    );
}

#[test]
fn test_merge_closed_object_drops_foreign_properties() {
    let merged = merge_schemas([
        json!({ "properties": { "a": { "type": "string" } }, "additionalProperties": false }),
        json!({ "properties": { "b": { "type": "number" } } }),
    ]);
    assert_eq!(merged["properties"], json!({ "a": { "type": "string" } }));
    assert_eq!(merged["additionalProperties"], json!(false));
}

#[test]
fn test_merge_closed_object_without_properties_in_either_order() {
    let closed = json!({ "type": "object", "additionalProperties": false });
    let open = json!({ "properties": { "b": { "type": "number" } } });
    for merged in [
        merge_schemas([closed.clone(), open.clone()]),
        merge_schemas([open.clone(), closed.clone()]),
    ] {
        assert_eq!(merged["properties"], json!({}));
        assert_eq!(merged["additionalProperties"], json!(false));
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn test_config_loads_from_yaml_file() {
    let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
    writeln!(file, "version: \"1.0\"").unwrap();
    writeln!(file, "resolve:").unwrap();
    writeln!(file, "  ref_siblings: ignore").unwrap();
    writeln!(file, "  relocate_array_required: false").unwrap();
    file.flush().unwrap();

    let config = EngineConfig::load(file.path()).unwrap();
    assert_eq!(config.resolve.ref_siblings, RefSiblingPolicy::Ignore);
    assert!(config.resolve.combine_all_of);
    assert!(!config.resolve.relocate_array_required);
}

#[test]
fn test_config_load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = EngineConfig::load(dir.path().join("absent.yml")).unwrap_err();
    assert!(matches!(err, EngineError::Io(_)));
}
