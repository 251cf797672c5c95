//! Flat `path=value` output, readable by the property parser.
//!
//! Strings that would read back as another type (`"42"`, `"true"`, text
//! with surrounding quotes) are written as JSON strings.

use libhiconf::{coerce_value, FlatValue, Node, Provenance, ScalarValue};

pub fn encode(node: &Node) -> String {
    let mut out = String::new();
    for (path, value) in node.implode() {
        let text = match value {
            FlatValue::Scalar(scalar) => scalar_text(&scalar.value),
            FlatValue::EmptyMap => "{}".to_string(),
            FlatValue::EmptyList => "[]".to_string(),
            FlatValue::Cycle => continue,
        };
        out.push_str(&path);
        out.push('=');
        out.push_str(&text);
        out.push('\n');
    }
    out
}

fn scalar_text(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Null => "null".to_string(),
        ScalarValue::String(s) => {
            let reads_back = coerce_value(s, &Provenance::default())
                .as_str()
                .is_some_and(|read| read == s);
            if reads_back && !s.contains('\n') {
                s.clone()
            } else {
                serde_json::Value::String(s.clone()).to_string()
            }
        }
        other => other.to_string(),
    }
}
