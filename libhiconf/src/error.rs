//! Error types for loading and querying configuration trees.

use std::path::PathBuf;
use thiserror::Error;

use crate::key::HierarchicKey;
use crate::value::Provenance;

/// Result type for hiconf operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Error type for hiconf.
///
/// Malformed lines inside a source are not errors: parsers skip them and
/// log at debug level, so a hand-edited file with stray content still
/// loads.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A strict lookup hit a missing segment.
    #[error("Path not found: {key}")]
    PathNotFound { key: HierarchicKey },

    /// No parser is registered for the file's extension.
    #[error("Unsupported configuration format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    /// A source listed for merging does not exist (strict mode only).
    #[error("Missing configuration source: {}", path.display())]
    MissingSource { path: PathBuf },

    /// Reading a source failed.
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON source did not decode.
    #[error("Invalid JSON in {provenance}: {source}")]
    Json {
        provenance: Provenance,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub(crate) fn path_not_found(key: &HierarchicKey) -> Self {
        ConfigError::PathNotFound { key: key.clone() }
    }
}
