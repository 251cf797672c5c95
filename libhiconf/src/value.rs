//! Configuration tree values.

use indexmap::IndexMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Where a scalar came from: a source file or a literal description.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Provenance(Arc<str>);

impl Provenance {
    /// Provenance for values read from `path`.
    pub fn file(path: &Path) -> Self {
        Provenance(Arc::from(path.to_string_lossy().as_ref()))
    }

    /// Provenance for values that did not come from a file.
    pub fn literal(description: &str) -> Self {
        Provenance(Arc::from(description))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Provenance {
    fn default() -> Self {
        Provenance::literal("<string>")
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

/// The payload of a leaf.
#[derive(Clone)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScalarValue::Null, ScalarValue::Null) => true,
            (ScalarValue::Bool(a), ScalarValue::Bool(b)) => a == b,
            (ScalarValue::Integer(a), ScalarValue::Integer(b)) => a == b,
            (ScalarValue::Float(a), ScalarValue::Float(b)) => a == b,
            // Numbers compare numerically, whatever their source spelling.
            (ScalarValue::Integer(a), ScalarValue::Float(b))
            | (ScalarValue::Float(b), ScalarValue::Integer(a)) => (*a as f64) == *b,
            (ScalarValue::String(a), ScalarValue::String(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "null"),
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Integer(n) => write!(f, "{}", n),
            ScalarValue::Float(n) => write!(f, "{:?}", n),
            ScalarValue::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl fmt::Display for ScalarValue {
    /// Plain text form, as a property file would spell it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => Ok(()),
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Integer(n) => write!(f, "{}", n),
            ScalarValue::Float(n) => write!(f, "{}", n),
            ScalarValue::String(s) => f.write_str(s),
        }
    }
}

/// A leaf value together with the source that produced it.
///
/// Equality looks only at the value.
#[derive(Clone)]
pub struct Scalar {
    pub value: ScalarValue,
    pub provenance: Provenance,
}

impl Scalar {
    pub fn new(value: ScalarValue, provenance: Provenance) -> Self {
        Self { value, provenance }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.value, f)
    }
}

/// A configuration tree.
#[derive(Clone, PartialEq)]
pub enum Node {
    /// A leaf.
    Scalar(Scalar),
    /// An ordered list.
    List(Vec<Node>),
    /// A mapping from key to subtree, in insertion order.
    Map(IndexMap<String, Node>),
}

impl Node {
    pub fn scalar(value: ScalarValue, provenance: &Provenance) -> Self {
        Node::Scalar(Scalar::new(value, provenance.clone()))
    }

    pub fn null(provenance: &Provenance) -> Self {
        Node::scalar(ScalarValue::Null, provenance)
    }

    pub fn string(s: impl Into<String>, provenance: &Provenance) -> Self {
        Node::scalar(ScalarValue::String(s.into()), provenance)
    }

    /// An empty map.
    pub fn map() -> Self {
        Node::Map(IndexMap::new())
    }

    /// An empty list.
    pub fn list() -> Self {
        Node::List(Vec::new())
    }

    /// Returns `true` if this is a null scalar.
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Node::Scalar(Scalar {
                value: ScalarValue::Null,
                ..
            })
        )
    }

    /// Returns `true` for lists and maps.
    pub fn is_container(&self) -> bool {
        matches!(self, Node::List(_) | Node::Map(_))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.as_scalar()?.value {
            ScalarValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.as_scalar()?.value {
            ScalarValue::Integer(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.as_scalar()?.value {
            ScalarValue::Integer(n) => Some(n as f64),
            ScalarValue::Float(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.as_scalar()?.value {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Node>> {
        match self {
            Node::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Map(map) => Some(map),
            _ => None,
        }
    }

    /// The provenance of a scalar; containers have none of their own.
    pub fn provenance(&self) -> Option<&Provenance> {
        self.as_scalar().map(|s| &s.provenance)
    }

    /// Convert decoded JSON, tagging every scalar with `provenance`.
    pub fn from_json(json: &serde_json::Value, provenance: &Provenance) -> Self {
        match json {
            serde_json::Value::Null => Node::null(provenance),
            serde_json::Value::Bool(b) => Node::scalar(ScalarValue::Bool(*b), provenance),
            serde_json::Value::Number(n) => {
                let value = if let Some(i) = n.as_i64() {
                    ScalarValue::Integer(i)
                } else {
                    ScalarValue::Float(n.as_f64().unwrap_or(f64::NAN))
                };
                Node::scalar(value, provenance)
            }
            serde_json::Value::String(s) => Node::string(s.as_str(), provenance),
            serde_json::Value::Array(items) => Node::List(
                items
                    .iter()
                    .map(|item| Node::from_json(item, provenance))
                    .collect(),
            ),
            serde_json::Value::Object(obj) => Node::Map(
                obj.iter()
                    .map(|(k, v)| (k.clone(), Node::from_json(v, provenance)))
                    .collect(),
            ),
        }
    }

    /// Convert to JSON, dropping provenance. Non-finite floats become null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Node::Scalar(s) => match &s.value {
                ScalarValue::Null => serde_json::Value::Null,
                ScalarValue::Bool(b) => serde_json::Value::Bool(*b),
                ScalarValue::Integer(n) => serde_json::Value::from(*n),
                ScalarValue::Float(f) => serde_json::Number::from_f64(*f)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
                ScalarValue::String(s) => serde_json::Value::String(s.clone()),
            },
            Node::List(items) => serde_json::Value::Array(items.iter().map(Node::to_json).collect()),
            Node::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Scalar(s) => fmt::Debug::fmt(s, f),
            Node::List(items) => f.debug_list().entries(items).finish(),
            Node::Map(map) => f.debug_map().entries(map).finish(),
        }
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::scalar(ScalarValue::Bool(b), &Provenance::default())
    }
}

impl From<i64> for Node {
    fn from(n: i64) -> Self {
        Node::scalar(ScalarValue::Integer(n), &Provenance::default())
    }
}

impl From<f64> for Node {
    fn from(f: f64) -> Self {
        Node::scalar(ScalarValue::Float(f), &Provenance::default())
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::string(s, &Provenance::default())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::string(s, &Provenance::default())
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::List(items)
    }
}

impl From<IndexMap<String, Node>> for Node {
    fn from(map: IndexMap<String, Node>) -> Self {
        Node::Map(map)
    }
}
