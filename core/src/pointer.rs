//! JSON pointers over schema trees.
//!
//! A [`Pointer`] is an ordered list of reference tokens. It comes in two
//! flavors that share one type:
//!
//! - *exact* pointers carry literal array indices (`/children/3/name`),
//! - *generic* pointers replace array indices with [`GENERIC_INDEX`]
//!   (`/children/-/name`), so positions can be compared regardless of which
//!   array element is being visited.
//!
//! Besides the pointer type this module holds the tree helpers the resolver
//! is built on: lookup ([`get`], [`get_first_copy`]), insertion ([`set`]) and
//! deep traversal ([`for_each_deep`], [`map_deep`]).
//!
//! # Examples
//!
//! ```
//! use form_schema_core::{ArrayMap, Pointer};
//!
//! let pointer = Pointer::parse("#/definitions/a~1b").unwrap();
//! assert_eq!(pointer.tokens(), ["definitions", "a/b"]);
//! assert_eq!(pointer.to_string(), "/definitions/a~1b");
//!
//! let arrays: ArrayMap = [(Pointer::parse("/tags").unwrap(), 0)].into_iter().collect();
//! let generic = Pointer::parse("/tags/4").unwrap().to_generic(&arrays);
//! assert_eq!(generic.to_string(), "/tags/-");
//! ```

use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::EngineError;
use crate::maps::ArrayMap;

/// Token that stands for "any array index" in a generic pointer.
pub const GENERIC_INDEX: &str = "-";

/// A parsed JSON pointer (RFC 6901), stored as unescaped tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pointer(Vec<String>);

impl Pointer {
    /// The empty pointer, addressing the whole document.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Builds a pointer from already-unescaped tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    /// Parses a pointer in plain (`/a/b`) or fragment (`#/a/b`) form.
    ///
    /// Returns `None` for malformed input: a non-empty pointer that does not
    /// start with `/`, or a `~` not followed by `0` or `1`.
    ///
    /// # Examples
    ///
    /// ```
    /// use form_schema_core::Pointer;
    ///
    /// assert!(Pointer::parse("").unwrap().is_root());
    /// assert!(Pointer::parse("#").unwrap().is_root());
    /// assert_eq!(Pointer::parse("/a/0").unwrap().depth(), 2);
    /// assert!(Pointer::parse("a/b").is_none());
    /// assert!(Pointer::parse("/a~2").is_none());
    /// ```
    pub fn parse(input: &str) -> Option<Self> {
        let body = input.strip_prefix('#').unwrap_or(input);
        if body.is_empty() {
            return Some(Self::root());
        }
        let rest = body.strip_prefix('/')?;
        rest.split('/')
            .map(unescape)
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }

    /// Unescaped tokens, outermost first.
    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// Number of tokens.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the empty pointer.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if any token is the [`GENERIC_INDEX`] wildcard.
    pub fn is_generic(&self) -> bool {
        self.0.iter().any(|token| token == GENERIC_INDEX)
    }

    /// Last token, if any.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Pointer to the enclosing node, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.0.split_last()?;
        Some(Self(parent.to_vec()))
    }

    /// Returns a new pointer with `token` appended.
    pub fn child(&self, token: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.push(token);
        child
    }

    /// Appends an unescaped token.
    pub fn push(&mut self, token: impl Into<String>) {
        self.0.push(token.into());
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }

    /// Compiles the pointer to its canonical string form (`/a/b`).
    pub fn compile(&self) -> String {
        self.to_string()
    }

    /// Compiles the pointer as a URI fragment (`#/a/b`), the form used in
    /// `$ref` values.
    pub fn to_fragment(&self) -> String {
        format!("#{self}")
    }

    /// Returns `true` if `prefix` is a token-wise prefix of `self`.
    ///
    /// With `strict`, `prefix` must also be shorter than `self`.
    ///
    /// # Examples
    ///
    /// ```
    /// use form_schema_core::Pointer;
    ///
    /// let node = Pointer::parse("/definitions/node").unwrap();
    /// let items = Pointer::parse("/definitions/node/properties/children/items").unwrap();
    /// assert!(items.is_sub_pointer(&node, true));
    /// assert!(node.is_sub_pointer(&node, false));
    /// assert!(!node.is_sub_pointer(&node, true));
    /// assert!(!Pointer::parse("/definitions/nodes").unwrap().is_sub_pointer(&node, false));
    /// ```
    pub fn is_sub_pointer(&self, prefix: &Pointer, strict: bool) -> bool {
        self.0.starts_with(&prefix.0) && (!strict || self.0.len() > prefix.0.len())
    }

    /// Tokens remaining after `prefix`, if `prefix` is a prefix of `self`.
    pub fn strip_prefix(&self, prefix: &Pointer) -> Option<&[String]> {
        self.0.strip_prefix(prefix.0.as_slice())
    }

    /// Replaces the `from` prefix of `self` with `to`.
    pub fn rebase(&self, from: &Pointer, to: &Pointer) -> Option<Self> {
        let suffix = self.strip_prefix(from)?;
        let mut tokens = to.0.clone();
        tokens.extend_from_slice(suffix);
        Some(Self(tokens))
    }

    /// Canonicalizes the pointer by replacing array indices with
    /// [`GENERIC_INDEX`].
    ///
    /// A token is treated as an index when the pointer up to it (in its
    /// already-generic form) is a known array in `arrays` and the index is at
    /// or beyond that array's tuple arity. Indices inside a tuple keep their
    /// literal value, since each tuple position has its own schema.
    pub fn to_generic(&self, arrays: &ArrayMap) -> Self {
        let mut generic = Self::root();
        for token in &self.0 {
            let past_tuple = array_index(token)
                .zip(arrays.arity(&generic))
                .is_some_and(|(index, arity)| index >= arity);
            if past_tuple {
                generic.push(GENERIC_INDEX);
            } else {
                generic.push(token.clone());
            }
        }
        generic
    }

    /// Fills the wildcard tokens of a generic pointer with `indices`, left to
    /// right. Wildcards beyond the supplied indices are kept.
    ///
    /// # Examples
    ///
    /// ```
    /// use form_schema_core::Pointer;
    ///
    /// let generic = Pointer::parse("/rows/-/cells/-").unwrap();
    /// assert_eq!(generic.to_indexed(&[2, 5]).to_string(), "/rows/2/cells/5");
    /// ```
    pub fn to_indexed(&self, indices: &[usize]) -> Self {
        let mut remaining = indices.iter();
        Self(
            self.0
                .iter()
                .map(|token| {
                    if token == GENERIC_INDEX {
                        remaining
                            .next()
                            .map_or_else(|| token.clone(), |index| index.to_string())
                    } else {
                        token.clone()
                    }
                })
                .collect(),
        )
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.0 {
            write!(f, "/{}", escape(token))?;
        }
        Ok(())
    }
}

impl FromStr for Pointer {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| EngineError::InvalidPointer(s.to_string()))
    }
}

impl Serialize for Pointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid JSON pointer: {raw:?}")))
    }
}

/// Escapes a single token (`~` → `~0`, `/` → `~1`).
pub fn escape(token: &str) -> Cow<'_, str> {
    if token.contains(['~', '/']) {
        Cow::Owned(token.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(token)
    }
}

/// Unescapes a single token, or `None` if it holds an invalid `~` escape.
pub fn unescape(token: &str) -> Option<String> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(ch) = chars.next() {
        if ch == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                _ => return None,
            }
        } else {
            out.push(ch);
        }
    }
    Some(out)
}

/// Parses a token as an array index (`0`, `17`; no sign, no leading zeros).
pub(crate) fn array_index(token: &str) -> Option<usize> {
    let canonical = !token.is_empty()
        && token.bytes().all(|b| b.is_ascii_digit())
        && (token == "0" || !token.starts_with('0'));
    if canonical { token.parse().ok() } else { None }
}

fn child_of<'a>(node: &'a Value, token: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(token),
        Value::Array(items) => array_index(token).and_then(|index| items.get(index)),
        _ => None,
    }
}

/// Returns the value at `pointer`, if it exists.
pub fn get<'a>(tree: &'a Value, pointer: &Pointer) -> Option<&'a Value> {
    pointer
        .tokens()
        .iter()
        .try_fold(tree, |node, token| child_of(node, token))
}

/// Mutable variant of [`get`].
pub fn get_mut<'a>(tree: &'a mut Value, pointer: &Pointer) -> Option<&'a mut Value> {
    let mut node = tree;
    for token in pointer.tokens() {
        node = match node {
            Value::Object(map) => map.get_mut(token.as_str())?,
            Value::Array(items) => items.get_mut(array_index(token)?)?,
            _ => return None,
        };
    }
    Some(node)
}

/// Returns an owned copy of the value at `pointer`.
pub fn get_copy(tree: &Value, pointer: &Pointer) -> Option<Value> {
    get(tree, pointer).cloned()
}

/// Returns an owned copy of the first candidate that resolves, together with
/// the pointer that resolved it. Candidates are tried in order.
pub fn get_first_copy<'a, I>(candidates: I) -> Option<(Value, Pointer)>
where
    I: IntoIterator<Item = (&'a Value, &'a Pointer)>,
{
    candidates
        .into_iter()
        .find_map(|(tree, pointer)| get_copy(tree, pointer).map(|value| (value, pointer.clone())))
}

/// Writes `value` at `pointer`, creating intermediate objects for missing
/// (or `null`) nodes. A [`GENERIC_INDEX`] token appends to an array.
///
/// Returns `false` when the path runs through a scalar or an out-of-range
/// array index.
pub fn set(tree: &mut Value, pointer: &Pointer, value: Value) -> bool {
    let Some((last, parents)) = pointer.tokens().split_last() else {
        *tree = value;
        return true;
    };

    let mut node = tree;
    for token in parents {
        if node.is_null() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map.entry(token.clone()).or_insert(Value::Null),
            Value::Array(items) => {
                let index = if token == GENERIC_INDEX {
                    items.push(Value::Null);
                    items.len() - 1
                } else {
                    match array_index(token).filter(|index| *index < items.len()) {
                        Some(index) => index,
                        None => return false,
                    }
                };
                &mut items[index]
            }
            _ => return false,
        };
    }

    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            true
        }
        Value::Array(items) if last == GENERIC_INDEX => {
            items.push(value);
            true
        }
        Value::Array(items) => match array_index(last) {
            Some(index) if index < items.len() => {
                items[index] = value;
                true
            }
            Some(index) if index == items.len() => {
                items.push(value);
                true
            }
            _ => false,
        },
        _ => false,
    }
}

/// Visiting order for [`map_deep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Traversal {
    /// Parent first; children are taken from the parent's rewritten value.
    #[default]
    PreOrder,
    /// Children first; the parent sees its already-rewritten children.
    PostOrder,
}

/// Depth-first pre-order walk calling `visit(node, pointer)` for every node.
///
/// `start` is the pointer reported for `tree` itself, so a subtree can be
/// walked in the coordinates of its enclosing document.
pub fn for_each_deep<F>(tree: &Value, start: &Pointer, mut visit: F)
where
    F: FnMut(&Value, &Pointer),
{
    fn walk<F: FnMut(&Value, &Pointer)>(node: &Value, pointer: &mut Pointer, visit: &mut F) {
        visit(node, pointer);
        match node {
            Value::Object(map) => {
                for (key, child) in map {
                    pointer.push(key.clone());
                    walk(child, pointer, visit);
                    pointer.pop();
                }
            }
            Value::Array(items) => {
                for (index, child) in items.iter().enumerate() {
                    pointer.push(index.to_string());
                    walk(child, pointer, visit);
                    pointer.pop();
                }
            }
            _ => {}
        }
    }

    let mut pointer = start.clone();
    walk(tree, &mut pointer, &mut visit);
}

/// Consumes `tree` and rebuilds it from the return value of `f` at every
/// node. This is the copy-on-write counterpart of [`for_each_deep`]: the
/// caller's data is never aliased, and structural rewrites need no mutation.
pub fn map_deep<F>(tree: Value, start: &Pointer, order: Traversal, mut f: F) -> Value
where
    F: FnMut(Value, &Pointer) -> Value,
{
    match try_map_deep(tree, start, order, |node, pointer| Ok::<_, Infallible>(f(node, pointer))) {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// Fallible form of [`map_deep`]; the first error aborts the walk.
pub fn try_map_deep<F, E>(tree: Value, start: &Pointer, order: Traversal, mut f: F) -> Result<Value, E>
where
    F: FnMut(Value, &Pointer) -> Result<Value, E>,
{
    fn rebuild<F, E>(node: Value, pointer: &mut Pointer, order: Traversal, f: &mut F) -> Result<Value, E>
    where
        F: FnMut(Value, &Pointer) -> Result<Value, E>,
    {
        let node = match order {
            Traversal::PreOrder => f(node, pointer)?,
            Traversal::PostOrder => node,
        };
        let node = match node {
            Value::Object(map) => {
                let mut rebuilt = Map::new();
                for (key, child) in map {
                    pointer.push(key.clone());
                    let child = rebuild(child, pointer, order, f);
                    pointer.pop();
                    rebuilt.insert(key, child?);
                }
                Value::Object(rebuilt)
            }
            Value::Array(items) => {
                let mut rebuilt = Vec::with_capacity(items.len());
                for (index, child) in items.into_iter().enumerate() {
                    pointer.push(index.to_string());
                    let child = rebuild(child, pointer, order, f);
                    pointer.pop();
                    rebuilt.push(child?);
                }
                Value::Array(rebuilt)
            }
            leaf => leaf,
        };
        match order {
            Traversal::PreOrder => Ok(node),
            Traversal::PostOrder => f(node, pointer),
        }
    }

    let mut pointer = start.clone();
    rebuild(tree, &mut pointer, order, &mut f)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ptr(raw: &str) -> Pointer {
        Pointer::parse(raw).unwrap()
    }

    #[test]
    fn test_parse_and_compile_escapes() {
        let pointer = ptr("/a~0b/c~1d/");
        assert_eq!(pointer.tokens(), ["a~b", "c/d", ""]);
        assert_eq!(pointer.compile(), "/a~0b/c~1d/");
        assert_eq!(pointer.to_fragment(), "#/a~0b/c~1d/");
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(Pointer::parse("properties/a").is_none());
        assert!(Pointer::parse("#anchor").is_none());
        assert!(Pointer::parse("/bad~").is_none());
        assert!("/ok".parse::<Pointer>().is_ok());
        assert!(matches!("nope".parse::<Pointer>(), Err(EngineError::InvalidPointer(_))));
    }

    #[test]
    fn test_get_walks_objects_and_arrays() {
        let tree = json!({ "a": [{ "b": 1 }, { "b": 2 }] });
        assert_eq!(get(&tree, &ptr("/a/1/b")), Some(&json!(2)));
        assert_eq!(get(&tree, &ptr("/a/01/b")), None);
        assert_eq!(get(&tree, &ptr("/a/-")), None);
        assert_eq!(get(&tree, &Pointer::root()), Some(&tree));
    }

    #[test]
    fn test_get_first_copy_prefers_earlier_candidates() {
        let first = json!({ "x": 1 });
        let second = json!({ "y": 2 });
        let missing = ptr("/y");
        let found = ptr("/y");
        let (value, pointer) = get_first_copy([(&first, &missing), (&second, &found)]).unwrap();
        assert_eq!(value, json!(2));
        assert_eq!(pointer, found);
        assert!(get_first_copy([(&first, &ptr("/z"))]).is_none());
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut tree = json!({});
        assert!(set(&mut tree, &ptr("/a/b"), json!(1)));
        assert!(set(&mut tree, &ptr("/list"), json!([])));
        assert!(set(&mut tree, &ptr("/list/-"), json!("x")));
        assert!(set(&mut tree, &ptr("/list/0"), json!("y")));
        assert!(!set(&mut tree, &ptr("/list/5"), json!("z")));
        assert!(!set(&mut tree, &ptr("/a/b/c"), json!(true)));
        assert_eq!(tree, json!({ "a": { "b": 1 }, "list": ["y"] }));
    }

    #[test]
    fn test_set_walks_through_arrays() {
        let mut tree = json!({ "rows": [{ "id": 1 }] });
        assert!(set(&mut tree, &ptr("/rows/0/name"), json!("first")));
        assert!(set(&mut tree, &ptr("/rows/-/id"), json!(2)));
        assert!(!set(&mut tree, &ptr("/rows/7/id"), json!(3)));
        assert!(!set(&mut tree, &ptr("/rows/x/id"), json!(3)));
        assert_eq!(tree, json!({ "rows": [{ "id": 1, "name": "first" }, { "id": 2 }] }));
    }

    #[test]
    fn test_to_generic_respects_tuple_arity() {
        let arrays: ArrayMap = [(ptr("/pair"), 2), (ptr("/rows"), 0), (ptr("/rows/-/cells"), 0)]
            .into_iter()
            .collect();
        assert_eq!(ptr("/pair/1").to_generic(&arrays), ptr("/pair/1"));
        assert_eq!(ptr("/pair/2").to_generic(&arrays), ptr("/pair/-"));
        assert_eq!(ptr("/rows/3/cells/0").to_generic(&arrays), ptr("/rows/-/cells/-"));
        assert_eq!(ptr("/other/3").to_generic(&arrays), ptr("/other/3"));
    }

    #[test]
    fn test_rebase_and_strip_prefix() {
        let pointer = ptr("/definitions/node/properties/x");
        let rebased = pointer.rebase(&ptr("/definitions/node"), &Pointer::root()).unwrap();
        assert_eq!(rebased, ptr("/properties/x"));
        assert!(pointer.rebase(&ptr("/properties"), &Pointer::root()).is_none());
        assert_eq!(ptr("/a/b").parent(), Some(ptr("/a")));
        assert_eq!(Pointer::root().parent(), None);
    }

    #[test]
    fn test_for_each_deep_is_pre_order() {
        let tree = json!({ "a": { "b": [true] } });
        let mut seen = Vec::new();
        for_each_deep(&tree, &Pointer::root(), |_, pointer| seen.push(pointer.compile()));
        assert_eq!(seen, ["", "/a", "/a/b", "/a/b/0"]);
    }

    #[test]
    fn test_map_deep_orders_and_start_pointer() {
        let tree = json!({ "a": { "b": 1 } });
        let mut pre = Vec::new();
        let mut post = Vec::new();
        map_deep(tree.clone(), &ptr("/root"), Traversal::PreOrder, |node, pointer| {
            pre.push(pointer.compile());
            node
        });
        map_deep(tree, &ptr("/root"), Traversal::PostOrder, |node, pointer| {
            post.push(pointer.compile());
            node
        });
        assert_eq!(pre, ["/root", "/root/a", "/root/a/b"]);
        assert_eq!(post, ["/root/a/b", "/root/a", "/root"]);
    }

    #[test]
    fn test_map_deep_pre_order_descends_into_rewritten_nodes() {
        let tree = json!({ "swap": 0 });
        let rewritten = map_deep(tree, &Pointer::root(), Traversal::PreOrder, |node, pointer| {
            if pointer.last() == Some("swap") {
                json!({ "inner": 1 })
            } else if node == json!(1) {
                json!(2)
            } else {
                node
            }
        });
        assert_eq!(rewritten, json!({ "swap": { "inner": 2 } }));
    }

    #[test]
    fn test_try_map_deep_stops_on_error() {
        let tree = json!({ "a": 1, "b": 2 });
        let result: Result<Value, String> =
            try_map_deep(tree, &Pointer::root(), Traversal::PostOrder, |node, pointer| {
                if pointer.last() == Some("b") {
                    Err(format!("stopped at {pointer}"))
                } else {
                    Ok(node)
                }
            });
        assert_eq!(result.unwrap_err(), "stopped at /b");
    }

    #[test]
    fn test_pointer_serializes_as_string() {
        let encoded = serde_json::to_string(&ptr("/a~1b/0")).unwrap();
        assert_eq!(encoded, "\"/a~1b/0\"");
        let decoded: Pointer = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, ptr("/a~1b/0"));
    }
}
