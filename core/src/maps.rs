//! Lookup tables produced by reference resolution.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde::Serialize;
use serde_json::Value;

use crate::pointer::Pointer;
use crate::recursion::normalize_recursive_pointer;

/// Maps the location of a recursive `$ref` to the location it refers back
/// to. Keys and values are either both schema pointers or both generic data
/// pointers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RecursiveRefMap(BTreeMap<Pointer, Pointer>);

impl RecursiveRefMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `from → to` unless `from` already has a target. Returns
    /// `true` if the entry was added.
    pub fn insert_if_absent(&mut self, from: Pointer, to: Pointer) -> bool {
        match self.0.entry(from) {
            Entry::Vacant(slot) => {
                slot.insert(to);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, from: &Pointer) -> Option<&Pointer> {
        self.0.get(from)
    }

    pub fn contains(&self, from: &Pointer) -> bool {
        self.0.contains_key(from)
    }

    /// Entries in pointer order.
    pub fn iter(&self) -> impl Iterator<Item = (&Pointer, &Pointer)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shortest equivalent form of `pointer`; see
    /// [`normalize_recursive_pointer`].
    pub fn normalize(&self, pointer: &Pointer, arrays: &ArrayMap) -> Pointer {
        normalize_recursive_pointer(pointer, self, arrays)
    }
}

impl FromIterator<(Pointer, Pointer)> for RecursiveRefMap {
    fn from_iter<I: IntoIterator<Item = (Pointer, Pointer)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (from, to) in iter {
            map.insert_if_absent(from, to);
        }
        map
    }
}

/// Maps the generic data pointer of every array to its tuple arity: the
/// length of a positional `items` list, or 0 for list-form `items`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArrayMap(BTreeMap<Pointer, usize>);

impl ArrayMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_if_absent(&mut self, array: Pointer, arity: usize) -> bool {
        match self.0.entry(array) {
            Entry::Vacant(slot) => {
                slot.insert(arity);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Tuple arity of the array at `array`, if it is a known array.
    pub fn arity(&self, array: &Pointer) -> Option<usize> {
        self.0.get(array).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Pointer, usize)> {
        self.0.iter().map(|(pointer, arity)| (pointer, *arity))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Pointer, usize)> for ArrayMap {
    fn from_iter<I: IntoIterator<Item = (Pointer, usize)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (array, arity) in iter {
            map.insert_if_absent(array, arity);
        }
        map
    }
}

/// Copies of every `$ref` target, keyed by the target's schema pointer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RefLibrary(BTreeMap<Pointer, Value>);

impl RefLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_if_absent(&mut self, target: Pointer, schema: Value) -> bool {
        match self.0.entry(target) {
            Entry::Vacant(slot) => {
                slot.insert(schema);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, target: &Pointer) -> Option<&Value> {
        self.0.get(target)
    }

    pub fn contains(&self, target: &Pointer) -> bool {
        self.0.contains_key(target)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Pointer, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Pointer, Value)> for RefLibrary {
    fn from_iter<I: IntoIterator<Item = (Pointer, Value)>>(iter: I) -> Self {
        let mut library = Self::new();
        for (target, schema) in iter {
            library.insert_if_absent(target, schema);
        }
        library
    }
}
