//! The `$ref` graph of a schema and its transitive closure.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Diagnostic;
use crate::maps::{RecursiveRefMap, RefLibrary};
use crate::pointer::{Pointer, for_each_deep, get_copy};

/// A `$ref` at `from` pointing to `to`, both schema pointers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ReferenceEdge {
    pub from: Pointer,
    pub to: Pointer,
}

impl ReferenceEdge {
    pub fn new(from: Pointer, to: Pointer) -> Self {
        Self { from, to }
    }

    /// An edge is recursive when its target contains (or is) its source.
    pub fn is_recursive(&self) -> bool {
        self.from.is_sub_pointer(&self.to, false)
    }

    /// Follows `self` (A → B) and then `next` (C → D), which is possible when
    /// C lies inside B. The composite edge is `A ++ (C − B) → D`: the
    /// position of C as seen through A.
    pub fn compose(&self, next: &ReferenceEdge) -> Option<ReferenceEdge> {
        let from = next.from.rebase(&self.to, &self.from)?;
        Some(ReferenceEdge::new(from, next.to.clone()))
    }
}

/// Every `$ref` found in a schema, in document order.
#[derive(Debug, Clone, Default)]
pub struct RefGraph {
    edges: Vec<ReferenceEdge>,
    malformed: Vec<(Pointer, String)>,
}

impl RefGraph {
    /// Walks `schema` and records an edge for every string-valued `$ref`.
    pub fn collect(schema: &Value) -> Self {
        let mut graph = Self::default();
        for_each_deep(schema, &Pointer::root(), |node, at| {
            let Some(reference) = node.get("$ref").and_then(Value::as_str) else {
                return;
            };
            match Pointer::parse(reference) {
                Some(target) => graph.edges.push(ReferenceEdge::new(at.clone(), target)),
                None => graph.malformed.push((at.clone(), reference.to_string())),
            }
        });
        debug!(edges = graph.edges.len(), malformed = graph.malformed.len(), "collected $ref graph");
        graph
    }

    pub fn edges(&self) -> &[ReferenceEdge] {
        &self.edges
    }

    /// Copies every reachable `$ref` target out of `schema`. References that
    /// are not local JSON pointers, or whose target does not exist, are
    /// reported in `diagnostics`.
    pub fn library(&self, schema: &Value, diagnostics: &mut Vec<Diagnostic>) -> RefLibrary {
        let mut library = RefLibrary::new();
        for edge in &self.edges {
            if library.contains(&edge.to) {
                continue;
            }
            match get_copy(schema, &edge.to) {
                Some(target) => {
                    library.insert_if_absent(edge.to.clone(), target);
                }
                None => {
                    warn!(at = %edge.from, target = %edge.to, "unresolvable $ref");
                    diagnostics.push(Diagnostic::UnresolvedReference {
                        at: edge.from.clone(),
                        reference: edge.to.to_fragment(),
                    });
                }
            }
        }
        for (at, reference) in &self.malformed {
            warn!(at = %at, reference = %reference, "$ref is not a local JSON pointer");
            diagnostics.push(Diagnostic::UnresolvedReference {
                at: at.clone(),
                reference: reference.clone(),
            });
        }
        library
    }

    /// Transitive closure of the edges under [`ReferenceEdge::compose`].
    ///
    /// Each composite edge corresponds to a path through the base edges.
    /// A path never repeats a base edge and is never extended past a
    /// recursive edge, so the set of paths is finite even for cyclic
    /// schemas.
    pub fn closure(&self) -> BTreeSet<ReferenceEdge> {
        let mut closure: BTreeSet<ReferenceEdge> = self.edges.iter().cloned().collect();
        let mut pending: Vec<(ReferenceEdge, Vec<usize>)> = self
            .edges
            .iter()
            .enumerate()
            .map(|(index, edge)| (edge.clone(), vec![index]))
            .collect();

        while let Some((edge, path)) = pending.pop() {
            if edge.is_recursive() {
                continue;
            }
            for (index, next) in self.edges.iter().enumerate() {
                if path.contains(&index) {
                    continue;
                }
                let Some(composite) = edge.compose(next) else {
                    continue;
                };
                if closure.insert(composite.clone()) {
                    let mut extended = path.clone();
                    extended.push(index);
                    pending.push((composite, extended));
                }
            }
        }
        closure
    }
}

/// Builds the schema-flavored recursive reference map from a closure.
///
/// Recursive closure edges seed the map. Each seeded entry `C → D` that lives
/// inside the target B of a non-recursive edge `A → B` (with D inside B too)
/// is then copied to the position the inlining of B at A gives it:
/// `A ++ (C − B) → A ++ (D − B)`.
pub fn recursive_ref_map(closure: &BTreeSet<ReferenceEdge>) -> RecursiveRefMap {
    let mut map = RecursiveRefMap::new();
    for edge in closure.iter().filter(|edge| edge.is_recursive()) {
        map.insert_if_absent(edge.from.clone(), edge.to.clone());
    }

    let seeded: Vec<(Pointer, Pointer)> = map.iter().map(|(from, to)| (from.clone(), to.clone())).collect();
    for edge in closure.iter().filter(|edge| !edge.is_recursive()) {
        if seeded.iter().any(|(source, _)| edge.from.is_sub_pointer(source, true)) {
            continue;
        }
        for (source, target) in &seeded {
            if !source.is_sub_pointer(&edge.to, true) || !target.is_sub_pointer(&edge.to, false) {
                continue;
            }
            if let (Some(from), Some(to)) = (source.rebase(&edge.to, &edge.from), target.rebase(&edge.to, &edge.from)) {
                map.insert_if_absent(from, to);
            }
        }
    }
    map
}
