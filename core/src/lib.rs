//! Schema engine for JSON-Schema-driven forms.
//!
//! This crate compiles a JSON-Schema-like document into a form the layout
//! builder can walk without chasing references:
//!
//! - [`ReferenceResolver`] turns a schema into a [`CompiledSchema`]: every
//!   non-recursive `$ref` inlined, recursive ones canonicalized, plus the
//!   lookup maps ([`RecursiveRefMap`], [`ArrayMap`], [`RefLibrary`]) that let
//!   any data position be mapped back to its schema node.
//! - [`SubschemaResolver`] extracts and inlines a single sub-schema.
//! - [`merge_schemas`] combines schema fragments with per-keyword conflict
//!   resolution, falling back to `allOf` when a pair cannot be reconciled.
//! - [`Pointer`] and the functions beside it implement JSON pointer parsing,
//!   generic (array-agnostic) pointers and deep traversal.
//!
//! Fatal problems are reported as [`EngineError`]; degraded results carry
//! [`Diagnostic`]s. Behavior choices live in [`EngineConfig`].
//!
//! # Example
//!
//! ```
//! use form_schema_core::*;
//! use serde_json::json;
//!
//! let schema = json!({
//!     "$ref": "#/definitions/node",
//!     "definitions": {
//!         "node": {
//!             "type": "object",
//!             "properties": {
//!                 "name": { "type": "string" },
//!                 "children": { "type": "array", "items": { "$ref": "#/definitions/node" } }
//!             }
//!         }
//!     }
//! });
//!
//! let compiled = ReferenceResolver::new().resolve(&schema).unwrap();
//! assert_eq!(compiled.schema["properties"]["children"]["items"], json!({ "$ref": "#" }));
//!
//! let name = Pointer::parse("/children/0/children/1/name").unwrap();
//! assert_eq!(compiled.schema_at_data_pointer(&name), Some(&json!({ "type": "string" })));
//! ```

mod config;
mod error;
mod graph;
mod maps;
mod merge;
mod pointer;
mod recursion;
mod resolve;
mod subschema;
mod translate;

pub use config::{EngineConfig, RefSiblingPolicy, ResolveOptions};
pub use error::{Diagnostic, EngineError, Result};
pub use graph::{RefGraph, ReferenceEdge, recursive_ref_map};
pub use maps::{ArrayMap, RecursiveRefMap, RefLibrary};
pub use merge::{is_identity, merge_schemas, try_merge};
pub use pointer::{
    GENERIC_INDEX, Pointer, Traversal, escape, for_each_deep, get, get_copy, get_first_copy, get_mut, map_deep,
    set, try_map_deep, unescape,
};
pub use recursion::normalize_recursive_pointer;
pub use resolve::{CompiledSchema, ReferenceResolver, resolve_schema_references};
pub use subschema::{SubschemaResolver, combine_all_of};
pub use translate::{to_data_pointer, to_schema_pointer};
