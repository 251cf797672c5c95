//! Structural merging of configuration trees.
//!
//! [`merge`] folds an "updates" tree into a "current" tree in place. Per key
//! of the updates, in order:
//!
//! 1. An empty value (null, `""`, `[]`, and `{}` unless `keep_empty`) deletes
//!    the key from the current tree.
//! 2. A key `@+name` / `@-name` holding a list adds its items to, or removes
//!    them from, the list at `name` (compared by value, provenance ignored).
//! 3. Two maps, or two lists, are merged recursively.
//! 4. Anything else overwrites.
//!
//! Keys are visited in source order, so `@+x` followed by `@-x` in the same
//! update is not the same as the reverse.

use indexmap::IndexMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::error::{ConfigError, Result};
use crate::source::parse_file;
use crate::value::{Node, ScalarValue};

static ARRAY_OPERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@([+-])(.+)$").expect("valid array operator regex"));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArrayOp {
    Add,
    Remove,
}

/// Options for [`merge_sources`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MergeOptions {
    /// Treat `{}` in an update as a value rather than a deletion.
    pub keep_empty: bool,
    /// Fail on a missing source instead of skipping it.
    pub strict_missing: bool,
}

/// Merge `updates` into `current` and return `current` for chaining.
///
/// ```
/// use libhiconf::{merge, Node, Provenance};
/// use serde_json::json;
///
/// let prov = Provenance::default();
/// let mut current = Node::from_json(&json!({"a": 1, "b": 2}), &prov);
/// let updates = Node::from_json(&json!({"a": null}), &prov);
/// merge(&mut current, &updates, false);
/// assert_eq!(current.to_json(), json!({"b": 2}));
/// ```
pub fn merge<'a>(current: &'a mut Node, updates: &Node, keep_empty: bool) -> &'a mut Node {
    match (&mut *current, updates) {
        (Node::Map(cur), Node::Map(upd)) => merge_maps(cur, upd, keep_empty),
        (Node::List(cur), Node::List(upd)) => merge_lists(cur, upd, keep_empty),
        _ => *current = updates.clone(),
    }
    current
}

fn merge_maps(
    current: &mut IndexMap<String, Node>,
    updates: &IndexMap<String, Node>,
    keep_empty: bool,
) {
    for (key, update) in updates {
        if is_empty(update, keep_empty) {
            current.shift_remove(key);
            continue;
        }

        if let (Some((op, base)), Node::List(items)) = (array_operator(key), update) {
            if apply_array_op(current, op, base, items) {
                continue;
            }
        }

        match (current.get_mut(key), update) {
            (Some(Node::Map(cur)), Node::Map(upd)) => merge_maps(cur, upd, keep_empty),
            (Some(Node::List(cur)), Node::List(upd)) => merge_lists(cur, upd, keep_empty),
            _ => {
                current.insert(key.clone(), update.clone());
            }
        }
    }
}

/// Lists merge position by position. Deleted positions are removed after
/// the pass so the remaining updates still line up.
fn merge_lists(current: &mut Vec<Node>, updates: &[Node], keep_empty: bool) {
    let mut removals = Vec::new();
    for (i, update) in updates.iter().enumerate() {
        if is_empty(update, keep_empty) {
            if i < current.len() {
                removals.push(i);
            }
            continue;
        }
        match (current.get_mut(i), update) {
            (Some(Node::Map(cur)), Node::Map(upd)) => merge_maps(cur, upd, keep_empty),
            (Some(Node::List(cur)), Node::List(upd)) => merge_lists(cur, upd, keep_empty),
            (Some(slot), _) => *slot = update.clone(),
            (None, _) => current.push(update.clone()),
        }
    }
    for i in removals.into_iter().rev() {
        current.remove(i);
    }
}

fn array_operator(key: &str) -> Option<(ArrayOp, &str)> {
    let caps = ARRAY_OPERATOR.captures(key)?;
    let op = if &caps[1] == "+" {
        ArrayOp::Add
    } else {
        ArrayOp::Remove
    };
    Some((op, caps.get(2)?.as_str()))
}

/// Returns `false` when the base exists but is not a list, in which case
/// the operator key is assigned like any other key.
fn apply_array_op(
    current: &mut IndexMap<String, Node>,
    op: ArrayOp,
    base: &str,
    items: &[Node],
) -> bool {
    match (current.get_mut(base), op) {
        (Some(Node::List(existing)), ArrayOp::Add) => add_items(existing, items),
        (Some(Node::List(existing)), ArrayOp::Remove) => {
            existing.retain(|e| !items.contains(e));
        }
        (None, ArrayOp::Add) => {
            let mut created = Vec::new();
            add_items(&mut created, items);
            current.insert(base.to_string(), Node::List(created));
        }
        (None, ArrayOp::Remove) => {}
        (Some(_), _) => return false,
    }
    true
}

fn add_items(existing: &mut Vec<Node>, items: &[Node]) {
    for item in items {
        if !existing.contains(item) {
            existing.push(item.clone());
        }
    }
}

fn is_empty(node: &Node, keep_empty: bool) -> bool {
    match node {
        Node::Scalar(s) => match &s.value {
            ScalarValue::Null => true,
            ScalarValue::String(text) => text.is_empty(),
            _ => false,
        },
        Node::List(items) => items.is_empty(),
        Node::Map(map) => map.is_empty() && !keep_empty,
    }
}

/// The part of `b` that differs from `a`, or `None` if they are equal.
///
/// Maps are compared key by key (recursively); any other difference yields
/// the whole of `b`. Keys only present in `a` are not reported.
pub fn diff(a: &Node, b: &Node) -> Option<Node> {
    if a == b {
        return None;
    }
    match (a, b) {
        (Node::Map(am), Node::Map(bm)) => {
            let mut changed = IndexMap::new();
            for (key, bv) in bm {
                let delta = match am.get(key) {
                    Some(av) => match diff(av, bv) {
                        Some(Node::Map(m)) if m.is_empty() => None,
                        other => other,
                    },
                    None => Some(bv.clone()),
                };
                if let Some(delta) = delta {
                    changed.insert(key.clone(), delta);
                }
            }
            Some(Node::Map(changed))
        }
        _ => Some(b.clone()),
    }
}

/// Strip null, `""`, `[]` and `{}` everywhere, bottom-up.
///
/// Returns `None` when nothing is left.
pub fn remove_empty(node: &Node) -> Option<Node> {
    match node {
        Node::Scalar(_) => (!is_empty(node, false)).then(|| node.clone()),
        Node::List(items) => {
            let kept: Vec<Node> = items.iter().filter_map(remove_empty).collect();
            (!kept.is_empty()).then_some(Node::List(kept))
        }
        Node::Map(map) => {
            let kept: IndexMap<String, Node> = map
                .iter()
                .filter_map(|(k, v)| remove_empty(v).map(|v| (k.clone(), v)))
                .collect();
            (!kept.is_empty()).then_some(Node::Map(kept))
        }
    }
}

/// Parse each source in order and fold it into one effective tree.
///
/// Later sources override earlier ones. Missing sources are skipped unless
/// `options.strict_missing` is set.
pub fn merge_sources<P: AsRef<Path>>(paths: &[P], options: &MergeOptions) -> Result<Node> {
    let mut merged = Node::map();
    for path in paths {
        let path = path.as_ref();
        if !path.exists() {
            if options.strict_missing {
                return Err(ConfigError::MissingSource {
                    path: path.to_path_buf(),
                });
            }
            debug!(path = %path.display(), "skipping missing configuration source");
            continue;
        }
        let tree = parse_file(path)?;
        info!(path = %path.display(), "merging configuration source");
        merge(&mut merged, &tree, options.keep_empty);
    }
    Ok(merged)
}
