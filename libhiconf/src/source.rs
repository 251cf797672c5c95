//! Source formats and dispatch.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::json::parse_json;
use crate::parser::parse_block;
use crate::properties::{parse_properties, parse_settings};
use crate::value::{Node, Provenance};

/// The source formats hiconf reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `path=value` lines (`.conf`, `.properties`).
    Properties,
    /// Indentation-based YAML subset (`.yml`, `.yaml`).
    Block,
    /// JSON with `//` comment lines (`.json`).
    Json,
    /// Self-closing `<type name=".." value=".."/>` tags (`.cfg`, `.xml`).
    Settings,
}

impl Format {
    pub fn from_extension(extension: &str) -> Option<Format> {
        match extension.to_ascii_lowercase().as_str() {
            "conf" | "properties" => Some(Format::Properties),
            "yml" | "yaml" => Some(Format::Block),
            "json" => Some(Format::Json),
            "cfg" | "xml" => Some(Format::Settings),
            _ => None,
        }
    }

    /// Format selected by the file extension.
    pub fn from_path(path: &Path) -> Result<Format> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
            .ok_or_else(|| ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
    }

    /// Guess the format of extension-less content from its first
    /// meaningful line.
    pub fn sniff(text: &str) -> Format {
        let first = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'));
        let Some(line) = first else {
            return Format::Properties;
        };
        if line.starts_with('<') {
            return Format::Settings;
        }
        if line.starts_with('{') || line.starts_with('[') || line.starts_with("//") {
            return Format::Json;
        }
        match (line.find('='), line.find(':')) {
            (Some(eq), Some(colon)) if eq < colon => Format::Properties,
            (Some(_), None) => Format::Properties,
            _ => Format::Block,
        }
    }
}

/// Parse `text` as `format`, tagging every scalar with `provenance`.
pub fn parse_str(text: &str, format: Format, provenance: &Provenance) -> Result<Node> {
    match format {
        Format::Properties => Ok(parse_properties(text, provenance)),
        Format::Block => Ok(parse_block(text, provenance)),
        Format::Json => parse_json(text, provenance),
        Format::Settings => Ok(parse_settings(text, provenance)),
    }
}

/// Read and parse one source file. Files without an extension are sniffed.
pub fn parse_file(path: &Path) -> Result<Node> {
    let declared = match path.extension() {
        Some(_) => Some(Format::from_path(path)?),
        None => None,
    };
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = declared.unwrap_or_else(|| Format::sniff(&text));
    debug!(path = %path.display(), ?format, "parsing source");
    parse_str(&text, format, &Provenance::file(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_path() {
        assert_eq!(Format::from_path(Path::new("a/b.conf")).unwrap(), Format::Properties);
        assert_eq!(Format::from_path(Path::new("b.YAML")).unwrap(), Format::Block);
        assert_eq!(Format::from_path(Path::new("b.json")).unwrap(), Format::Json);
        assert_eq!(Format::from_path(Path::new("es_settings.cfg")).unwrap(), Format::Settings);
        let err = Format::from_path(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
        assert!(Format::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_sniff() {
        assert_eq!(Format::sniff("<config>"), Format::Settings);
        assert_eq!(Format::sniff("\n  {\"a\": 1}"), Format::Json);
        assert_eq!(Format::sniff("# c\na.b=http://x"), Format::Properties);
        assert_eq!(Format::sniff("a: b=c"), Format::Block);
        assert_eq!(Format::sniff("a:\n  b: 1"), Format::Block);
    }

    #[test]
    fn test_parse_file_tags_path() {
        let mut file = tempfile::Builder::new().suffix(".conf").tempfile().unwrap();
        writeln!(file, "a.b=1").unwrap();
        let node = parse_file(file.path()).unwrap();
        let leaf = node.lookup(&"a.b".into()).unwrap();
        assert_eq!(leaf.as_i64(), Some(1));
        assert_eq!(
            leaf.provenance().map(Provenance::as_str),
            Some(file.path().to_string_lossy().as_ref())
        );
    }

    #[test]
    fn test_parse_file_sniffs_extensionless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings");
        fs::write(&path, "<int name=\"x\" value=\"3\"/>").unwrap();
        let node = parse_file(&path).unwrap();
        assert_eq!(node.lookup(&"x".into()).and_then(Node::as_i64), Some(3));
    }

    #[test]
    fn test_parse_file_missing_is_io_error() {
        let err = parse_file(Path::new("/nonexistent/hiconf/a.conf")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
