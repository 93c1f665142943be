//! Canonicalization of pointers that run through recursive references.

use crate::maps::{ArrayMap, RecursiveRefMap};
use crate::pointer::Pointer;

/// Returns the shortest pointer equivalent to `pointer`.
///
/// The pointer is first made generic (array indices past a tuple's arity
/// become `-`). Then every map entry whose target is a strict ancestor of its
/// source collapses the matching prefix: a pointer that walks through a
/// recursive `$ref` is rewritten to walk through the node the `$ref` points
/// back to. This repeats until no entry applies. Every rewrite strictly
/// shortens the pointer, so the loop terminates, and the result is a fixed
/// point: normalizing it again returns it unchanged.
///
/// Entries whose target is not an ancestor of their source describe
/// cross-branch references and never shorten anything; they are skipped.
///
/// # Examples
///
/// ```
/// use form_schema_core::{ArrayMap, Pointer, RecursiveRefMap, normalize_recursive_pointer};
///
/// let p = |raw: &str| Pointer::parse(raw).unwrap();
/// let refs: RecursiveRefMap = [(p("/children/-"), Pointer::root())].into_iter().collect();
/// let arrays: ArrayMap = [(p("/children"), 0)].into_iter().collect();
///
/// let deep = p("/children/0/children/3/name");
/// assert_eq!(normalize_recursive_pointer(&deep, &refs, &arrays), p("/name"));
/// ```
pub fn normalize_recursive_pointer(pointer: &Pointer, recursive: &RecursiveRefMap, arrays: &ArrayMap) -> Pointer {
    let mut candidate = pointer.to_generic(arrays);
    loop {
        let mut changed = false;
        for (from, to) in recursive.iter() {
            if !from.is_sub_pointer(to, true) {
                continue;
            }
            while let Some(shorter) = candidate.rebase(from, to) {
                candidate = shorter.to_generic(arrays);
                changed = true;
            }
        }
        if !changed {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ptr(raw: &str) -> Pointer {
        Pointer::parse(raw).unwrap()
    }

    fn tree_refs() -> (RecursiveRefMap, ArrayMap) {
        let refs = [
            (ptr("/properties/children/items"), Pointer::root()),
            (ptr("/definitions/node/properties/children/items"), ptr("/definitions/node")),
        ]
        .into_iter()
        .collect();
        (refs, ArrayMap::new())
    }

    #[test]
    fn test_collapses_nested_recursion() {
        let (refs, arrays) = tree_refs();
        let deep = ptr("/properties/children/items/properties/children/items/properties/name");
        assert_eq!(normalize_recursive_pointer(&deep, &refs, &arrays), ptr("/properties/name"));
    }

    #[test]
    fn test_pointer_at_ref_collapses_to_target() {
        let (refs, arrays) = tree_refs();
        let at_ref = ptr("/definitions/node/properties/children/items");
        assert_eq!(normalize_recursive_pointer(&at_ref, &refs, &arrays), ptr("/definitions/node"));
    }

    #[test]
    fn test_unrelated_pointer_is_unchanged() {
        let (refs, arrays) = tree_refs();
        let plain = ptr("/properties/name");
        assert_eq!(normalize_recursive_pointer(&plain, &refs, &arrays), plain);
        assert_eq!(normalize_recursive_pointer(&plain, &RecursiveRefMap::new(), &arrays), plain);
    }

    #[test]
    fn test_non_ancestor_entries_are_ignored() {
        let refs: RecursiveRefMap = [(ptr("/a/ref"), ptr("/b"))].into_iter().collect();
        let pointer = ptr("/a/ref/x");
        assert_eq!(normalize_recursive_pointer(&pointer, &refs, &ArrayMap::new()), pointer);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let refs: RecursiveRefMap = [(ptr("/children/-"), Pointer::root()), (ptr("/meta/parent"), ptr("/meta"))]
            .into_iter()
            .collect();
        let arrays: ArrayMap = [(ptr("/children"), 0), (ptr("/pair"), 2)].into_iter().collect();
        for raw in ["/children/4/meta/parent/parent/x", "/pair/3", "/pair/1", "", "/children/0/children/0"] {
            let once = normalize_recursive_pointer(&ptr(raw), &refs, &arrays);
            let twice = normalize_recursive_pointer(&once, &refs, &arrays);
            assert_eq!(once, twice, "normalizing {raw:?} twice changed the result");
        }
        assert_eq!(normalize_recursive_pointer(&ptr("/children/0/children/0"), &refs, &arrays), Pointer::root());
    }
}
