//! Path-addressed access to configuration trees.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::key::{HierarchicKey, Segment};
use crate::value::{Node, Provenance};

/// Most null entries `set` pads a list with before it stores the index as a
/// map key instead.
pub const MAX_LIST_GAP: usize = 1024;

impl Node {
    fn child(&self, segment: &Segment) -> Option<&Node> {
        match self {
            Node::Map(map) => map.get(segment.as_key().as_ref()),
            Node::List(items) => items.get(segment.as_index()?),
            Node::Scalar(_) => None,
        }
    }

    fn child_mut(&mut self, segment: &Segment) -> Option<&mut Node> {
        match self {
            Node::Map(map) => map.get_mut(segment.as_key().as_ref()),
            Node::List(items) => items.get_mut(segment.as_index()?),
            Node::Scalar(_) => None,
        }
    }

    /// Descend along `key`, returning `None` at the first missing segment.
    pub fn lookup(&self, key: &HierarchicKey) -> Option<&Node> {
        key.segments()
            .iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    pub fn lookup_mut(&mut self, key: &HierarchicKey) -> Option<&mut Node> {
        key.segments()
            .iter()
            .try_fold(self, |node, segment| node.child_mut(segment))
    }

    /// Strict lookup.
    ///
    /// ```
    /// use libhiconf::{parse_str, Format, HierarchicKey, Provenance};
    ///
    /// let tree = parse_str("a.b=1", Format::Properties, &Provenance::default()).unwrap();
    /// assert_eq!(tree.get(&"a.b".into()).unwrap().as_i64(), Some(1));
    /// assert!(tree.get(&HierarchicKey::parse("a.c")).is_err());
    /// ```
    pub fn get(&self, key: &HierarchicKey) -> Result<&Node> {
        self.lookup(key)
            .ok_or_else(|| ConfigError::path_not_found(key))
    }

    /// Strict mutable lookup.
    pub fn get_mut(&mut self, key: &HierarchicKey) -> Result<&mut Node> {
        self.lookup_mut(key)
            .ok_or_else(|| ConfigError::path_not_found(key))
    }

    /// Lookup that falls back to `default` when any segment is missing.
    pub fn get_or<'a>(&'a self, key: &HierarchicKey, default: &'a Node) -> &'a Node {
        self.lookup(key).unwrap_or(default)
    }

    /// Assign `value` at `key`, creating intermediate containers.
    ///
    /// A missing intermediate becomes a list when the segment after it is an
    /// index and a map otherwise. Scalars in the way are replaced.
    pub fn set(&mut self, key: &HierarchicKey, value: Node) {
        let Some((last, parents)) = key.segments().split_last() else {
            *self = value;
            return;
        };

        let mut node = self;
        for (i, segment) in parents.iter().enumerate() {
            let next_is_index = key.segments()[i + 1].is_index();
            let slot = node.slot_mut(segment);
            if !slot.is_container() {
                *slot = if next_is_index {
                    Node::list()
                } else {
                    Node::map()
                };
            }
            node = slot;
        }
        *node.slot_mut(last) = value;
    }

    /// Remove the value at `key`, returning it. Absent paths are a no-op.
    pub fn delete(&mut self, key: &HierarchicKey) -> Option<Node> {
        let last = key.last()?;
        let parent = self.lookup_mut(&key.parent()?)?;
        match parent {
            Node::Map(map) => map.shift_remove(last.as_key().as_ref()),
            Node::List(items) => {
                let index = last.as_index()?;
                (index < items.len()).then(|| items.remove(index))
            }
            Node::Scalar(_) => None,
        }
    }

    /// The child slot for `segment`, created as null if missing.
    ///
    /// A list addressed by name, or by an index more than [`MAX_LIST_GAP`]
    /// past its end, turns into a map keyed by index strings. A scalar turns
    /// into an empty map.
    fn slot_mut(&mut self, segment: &Segment) -> &mut Node {
        let index = segment.as_index();
        let as_map = match (&*self, index) {
            (Node::Scalar(_), _) => true,
            (Node::List(_), None) => true,
            (Node::List(items), Some(index)) if index.saturating_sub(items.len()) > MAX_LIST_GAP => {
                debug!(index, len = items.len(), "index far past list end, keeping as map key");
                true
            }
            (Node::List(_), Some(_)) | (Node::Map(_), _) => false,
        };
        if as_map {
            self.convert_to_map();
        }

        match (self, index) {
            (Node::List(items), Some(index)) => {
                if items.len() <= index {
                    items.resize_with(index + 1, || Node::null(&Provenance::default()));
                }
                &mut items[index]
            }
            (Node::Map(map), _) => map
                .entry(segment.as_key().into_owned())
                .or_insert_with(|| Node::null(&Provenance::default())),
            _ => unreachable!("slot_mut normalizes the container shape first"),
        }
    }

    fn convert_to_map(&mut self) {
        let map: IndexMap<String, Node> = match std::mem::replace(self, Node::map()) {
            Node::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), item))
                .collect(),
            Node::Map(map) => map,
            Node::Scalar(_) => IndexMap::new(),
        };
        *self = Node::Map(map);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(json: serde_json::Value) -> Node {
        Node::from_json(&json, &Provenance::literal("test"))
    }

    #[test]
    fn test_get_strict_and_default() {
        let t = tree(json!({"a": {"b": [10, 20]}}));
        assert_eq!(t.get(&"a.b[1]".into()).unwrap().as_i64(), Some(20));
        let err = t.get(&"a.x.y".into()).unwrap_err();
        assert!(matches!(err, ConfigError::PathNotFound { .. }));
        assert_eq!(err.to_string(), "Path not found: a.x.y");

        let fallback = Node::from("none");
        assert_eq!(t.get_or(&"a.x".into(), &fallback).as_str(), Some("none"));
    }

    #[test]
    fn test_set_creates_maps_and_lists() {
        let mut t = Node::map();
        t.set(&"a.b.c".into(), Node::from(1i64));
        t.set(&"a.list[1].name".into(), Node::from("x"));
        assert_eq!(
            t.to_json(),
            json!({"a": {"b": {"c": 1}, "list": [null, {"name": "x"}]}})
        );
    }

    #[test]
    fn test_set_replaces_scalar_in_the_way() {
        let mut t = tree(json!({"a": 5}));
        t.set(&"a.b".into(), Node::from(true));
        assert_eq!(t.to_json(), json!({"a": {"b": true}}));
    }

    #[test]
    fn test_set_name_on_list_converts_to_map() {
        let mut t = tree(json!({"a": ["x", "y"]}));
        t.set(&"a.extra".into(), Node::from(1i64));
        assert_eq!(t.to_json(), json!({"a": {"0": "x", "1": "y", "extra": 1}}));
    }

    #[test]
    fn test_set_far_index_becomes_map_key() {
        let mut t = Node::map();
        t.set(&"a[2]".into(), Node::from(1i64));
        assert_eq!(t.to_json(), json!({"a": [null, null, 1]}));

        t.set(&"a[100000000]".into(), Node::from(2i64));
        assert_eq!(t.to_json(), json!({"a": {"0": null, "1": null, "2": 1, "100000000": 2}}));
        assert_eq!(t.get(&"a[100000000]".into()).unwrap().as_i64(), Some(2));

        let mut t = Node::map();
        t.set(&"b[18446744073709551615].c".into(), Node::from(true));
        assert_eq!(t.to_json(), json!({"b": {"18446744073709551615": {"c": true}}}));
    }

    #[test]
    fn test_set_root() {
        let mut t = tree(json!({"a": 1}));
        t.set(&HierarchicKey::root(), Node::from(2i64));
        assert_eq!(t.as_i64(), Some(2));
    }

    #[test]
    fn test_delete() {
        let mut t = tree(json!({"a": {"b": 1, "c": 2}, "l": [1, 2, 3]}));
        assert_eq!(t.delete(&"a.b".into()).and_then(|n| n.as_i64()), Some(1));
        assert!(t.delete(&"a.missing.deeper".into()).is_none());
        assert!(t.delete(&"l[7]".into()).is_none());
        t.delete(&"l[0]".into());
        assert_eq!(t.to_json(), json!({"a": {"c": 2}, "l": [2, 3]}));
    }
}
