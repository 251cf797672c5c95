//! Index-addressed node storage and cycle-safe flattening.
//!
//! [`Node`] trees own their children and cannot loop, but flattening also
//! works over graphs: a container may be linked under one of its own
//! descendants. Walks keep the chain of ancestor ids and scan it; a child
//! already on the chain is reported as [`LeafPath::Cycle`] instead of being
//! descended into.

use indexmap::IndexMap;
use std::borrow::Cow;

use crate::key::{HierarchicKey, Segment};
use crate::value::{Node, Scalar};

/// Stable identity of a node inside a [`NodeArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Clone, Debug)]
enum Slot {
    Scalar(Scalar),
    List(Vec<NodeId>),
    Map(IndexMap<String, NodeId>),
}

/// Graph-shaped storage for configuration nodes.
#[derive(Clone, Debug, Default)]
pub struct NodeArena {
    slots: Vec<Slot>,
}

/// One item of a leaf enumeration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeafPath {
    /// A scalar, or a container with no children.
    Leaf(HierarchicKey),
    /// A node that is already being descended into.
    Cycle(HierarchicKey),
}

impl LeafPath {
    pub fn key(&self) -> &HierarchicKey {
        match self {
            LeafPath::Leaf(key) | LeafPath::Cycle(key) => key,
        }
    }

    pub fn is_cycle(&self) -> bool {
        matches!(self, LeafPath::Cycle(_))
    }
}

/// A value in a flattened tree.
#[derive(Clone, Debug, PartialEq)]
pub enum FlatValue {
    Scalar(Scalar),
    /// An explicitly empty map, kept so it is distinguishable from absence.
    EmptyMap,
    /// An explicitly empty list.
    EmptyList,
    /// Marker for a path that closes a cycle.
    Cycle,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy a tree into a fresh arena, returning the arena and the root id.
    pub fn from_node(node: &Node) -> (Self, NodeId) {
        let mut arena = Self::new();
        let root = arena.lower(node);
        (arena, root)
    }

    fn lower(&mut self, node: &Node) -> NodeId {
        match node {
            Node::Scalar(s) => self.insert_scalar(s.clone()),
            Node::List(items) => {
                let ids = items.iter().map(|item| self.lower(item)).collect();
                self.push(Slot::List(ids))
            }
            Node::Map(map) => {
                let ids = map
                    .iter()
                    .map(|(k, v)| (k.clone(), self.lower(v)))
                    .collect();
                self.push(Slot::Map(ids))
            }
        }
    }

    fn push(&mut self, slot: Slot) -> NodeId {
        self.slots.push(slot);
        NodeId(self.slots.len() - 1)
    }

    pub fn insert_scalar(&mut self, scalar: Scalar) -> NodeId {
        self.push(Slot::Scalar(scalar))
    }

    pub fn insert_map(&mut self) -> NodeId {
        self.push(Slot::Map(IndexMap::new()))
    }

    pub fn insert_list(&mut self) -> NodeId {
        self.push(Slot::List(Vec::new()))
    }

    /// Attach `child` under `parent`. Any existing node may be linked,
    /// including an ancestor of `parent`.
    ///
    /// Index segments on a list set that position (appending when it is
    /// past the end); names on a map insert. Returns `false` when `parent`
    /// is a scalar or the segment does not fit the container.
    pub fn link(&mut self, parent: NodeId, segment: impl Into<Segment>, child: NodeId) -> bool {
        let segment = segment.into();
        match &mut self.slots[parent.0] {
            Slot::Map(map) => {
                map.insert(segment.as_key().into_owned(), child);
                true
            }
            Slot::List(items) => match segment.as_index() {
                Some(i) if i < items.len() => {
                    items[i] = child;
                    true
                }
                Some(_) => {
                    items.push(child);
                    true
                }
                None => false,
            },
            Slot::Scalar(_) => false,
        }
    }

    fn child_at(&self, id: NodeId, position: usize) -> Option<(Segment, NodeId)> {
        match &self.slots[id.0] {
            Slot::Scalar(_) => None,
            Slot::List(items) => items.get(position).map(|c| (Segment::Index(position), *c)),
            Slot::Map(map) => map
                .get_index(position)
                .map(|(k, c)| (Segment::Name(k.clone()), *c)),
        }
    }

    /// Lazily enumerate every leaf path below `root`.
    pub fn leaf_paths(&self, root: NodeId) -> LeafPaths<'_> {
        LeafPaths {
            walk: Walk::new(Cow::Borrowed(self), root),
        }
    }

    /// Flatten the graph below `root` into `encoded path -> value`.
    pub fn implode(&self, root: NodeId) -> IndexMap<String, FlatValue> {
        implode_walk(Walk::new(Cow::Borrowed(self), root))
    }
}

struct Frame {
    id: NodeId,
    key: HierarchicKey,
    next: usize,
}

/// Depth-first walk with an explicit stack; the stack doubles as the
/// ancestor chain for cycle detection.
struct Walk<'a> {
    arena: Cow<'a, NodeArena>,
    stack: Vec<Frame>,
    start: Option<NodeId>,
}

impl<'a> Walk<'a> {
    fn new(arena: Cow<'a, NodeArena>, root: NodeId) -> Self {
        Self {
            arena,
            stack: Vec::new(),
            start: Some(root),
        }
    }

    /// Report `id` if it is a leaf or closes a cycle, otherwise descend.
    fn visit(&mut self, id: NodeId, key: HierarchicKey) -> Option<(HierarchicKey, FlatValue)> {
        if self.stack.iter().any(|frame| frame.id == id) {
            return Some((key, FlatValue::Cycle));
        }
        let leaf = match &self.arena.slots[id.0] {
            Slot::Scalar(s) => Some(FlatValue::Scalar(s.clone())),
            Slot::List(items) if items.is_empty() => Some(FlatValue::EmptyList),
            Slot::Map(map) if map.is_empty() => Some(FlatValue::EmptyMap),
            Slot::List(_) | Slot::Map(_) => None,
        };
        match leaf {
            Some(value) => Some((key, value)),
            None => {
                self.stack.push(Frame { id, key, next: 0 });
                None
            }
        }
    }
}

impl Iterator for Walk<'_> {
    type Item = (HierarchicKey, FlatValue);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(root) = self.start.take() {
            if let Some(found) = self.visit(root, HierarchicKey::root()) {
                return Some(found);
            }
        }
        loop {
            let frame = self.stack.last_mut()?;
            match self.arena.child_at(frame.id, frame.next) {
                None => {
                    self.stack.pop();
                }
                Some((segment, child)) => {
                    frame.next += 1;
                    let key = frame.key.child(segment);
                    if let Some(found) = self.visit(child, key) {
                        return Some(found);
                    }
                }
            }
        }
    }
}

/// Single-pass iterator over the leaf paths of a tree or graph.
pub struct LeafPaths<'a> {
    walk: Walk<'a>,
}

impl Iterator for LeafPaths<'_> {
    type Item = LeafPath;

    fn next(&mut self) -> Option<LeafPath> {
        self.walk.next().map(|(key, value)| match value {
            FlatValue::Cycle => LeafPath::Cycle(key),
            _ => LeafPath::Leaf(key),
        })
    }
}

fn implode_walk(walk: Walk<'_>) -> IndexMap<String, FlatValue> {
    walk.map(|(key, value)| (key.to_string(), value)).collect()
}

impl Node {
    /// Lazily enumerate the path of every scalar and every empty container.
    pub fn leaf_paths(&self) -> LeafPaths<'static> {
        let (arena, root) = NodeArena::from_node(self);
        LeafPaths {
            walk: Walk::new(Cow::Owned(arena), root),
        }
    }

    /// Flatten into `encoded path -> value`, keeping empty containers.
    pub fn implode(&self) -> IndexMap<String, FlatValue> {
        let (arena, root) = NodeArena::from_node(self);
        implode_walk(Walk::new(Cow::Owned(arena), root))
    }
}
