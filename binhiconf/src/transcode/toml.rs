//! TOML output.
//!
//! Lossy edges:
//!   - TOML has no null type; null values cause an error.
//!   - TOML requires the top-level value to be a table.
//!   - Maps inside lists become inline tables.

use libhiconf::{HierarchicKey, Node, ScalarValue};
use toml_edit::DocumentMut;

/// Encode a configuration tree as a TOML string.
pub fn encode(node: &Node) -> Result<String, String> {
    let Node::Map(map) = node else {
        return Err("TOML requires the top-level value to be a table".to_string());
    };
    let mut doc = DocumentMut::new();
    for (key, value) in map {
        doc[key.as_str()] = node_to_toml(value, &HierarchicKey::root().child(key.as_str()))?;
    }
    Ok(doc.to_string())
}

fn node_to_toml(node: &Node, path: &HierarchicKey) -> Result<toml_edit::Item, String> {
    match node {
        Node::Scalar(scalar) => {
            let value = match &scalar.value {
                ScalarValue::Null => return Err(format!("TOML has no null type (at {})", path)),
                ScalarValue::Bool(b) => toml_edit::Value::from(*b),
                ScalarValue::Integer(n) => toml_edit::Value::from(*n),
                ScalarValue::Float(f) => toml_edit::Value::from(*f),
                ScalarValue::String(s) => toml_edit::Value::from(s.as_str()),
            };
            Ok(toml_edit::Item::Value(value))
        }
        Node::List(items) => {
            let mut array = toml_edit::Array::new();
            for (i, item) in items.iter().enumerate() {
                let item = node_to_toml(item, &path.child(i))?;
                let value = item
                    .into_value()
                    .map_err(|_| format!("Unexpected TOML item type in array (at {})", path))?;
                array.push(value);
            }
            Ok(toml_edit::Item::Value(toml_edit::Value::Array(array)))
        }
        Node::Map(map) => {
            let mut table = toml_edit::Table::new();
            for (key, value) in map {
                table.insert(key, node_to_toml(value, &path.child(key.as_str()))?);
            }
            Ok(toml_edit::Item::Table(table))
        }
    }
}
