//! YAML output.
//!
//! Mapping to YAML:
//!   - null, bool, string -> the YAML scalar of the same kind
//!   - integer, float     -> YAML number (including .nan, .inf, -.inf)
//!   - list               -> YAML sequence
//!   - map                -> YAML mapping, in source order

use libhiconf::{Node, ScalarValue};

/// Encode a configuration tree as a YAML string.
pub fn encode(node: &Node) -> Result<String, String> {
    serde_yaml::to_string(&node_to_yaml(node)).map_err(|e| format!("YAML encode error: {}", e))
}

fn node_to_yaml(node: &Node) -> serde_yaml::Value {
    match node {
        Node::Scalar(scalar) => match &scalar.value {
            ScalarValue::Null => serde_yaml::Value::Null,
            ScalarValue::Bool(b) => serde_yaml::Value::Bool(*b),
            ScalarValue::Integer(n) => serde_yaml::Value::Number(serde_yaml::Number::from(*n)),
            ScalarValue::Float(f) => serde_yaml::Value::Number(serde_yaml::Number::from(*f)),
            ScalarValue::String(s) => serde_yaml::Value::String(s.clone()),
        },
        Node::List(items) => serde_yaml::Value::Sequence(items.iter().map(node_to_yaml).collect()),
        Node::Map(map) => {
            let mut mapping = serde_yaml::Mapping::new();
            for (key, value) in map {
                mapping.insert(serde_yaml::Value::String(key.clone()), node_to_yaml(value));
            }
            serde_yaml::Value::Mapping(mapping)
        }
    }
}
