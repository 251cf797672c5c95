//! JSON sources, with `//` full-line comments allowed.

use crate::error::{ConfigError, Result};
use crate::value::{Node, Provenance};

/// Blank out `//` comment lines, keeping line numbers for error messages.
fn strip_comment_lines(source: &str) -> String {
    source
        .lines()
        .map(|line| {
            if line.trim_start().starts_with("//") {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn parse_json(source: &str, provenance: &Provenance) -> Result<Node> {
    let json: serde_json::Value =
        serde_json::from_str(&strip_comment_lines(source)).map_err(|source| ConfigError::Json {
            provenance: provenance.clone(),
            source,
        })?;
    Ok(Node::from_json(&json, provenance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_comment_lines_are_ignored() {
        let source = r#"// leading
{
  // inside
  "url": "http://example.com//path",
  "n": [1, 2.5]
}"#;
        let node = parse_json(source, &Provenance::literal("a.json")).unwrap();
        assert_eq!(node.to_json(), json!({"url": "http://example.com//path", "n": [1, 2.5]}));
    }

    #[test]
    fn test_error_names_source_and_line() {
        let err = parse_json("// c\n{\"a\": }", &Provenance::literal("bad.json")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bad.json"), "{}", message);
        assert!(message.contains("line 2"), "{}", message);
    }
}
