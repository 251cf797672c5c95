//! Output writers for configuration trees.

use clap::ValueEnum;
use libhiconf::Node;

pub mod conf;
pub mod toml;
pub mod yaml;

/// Formats the effective configuration can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
    Toml,
    /// Flat `path=value` lines.
    Conf,
}

/// Encode `node` as text in `format`.
pub fn encode(node: &Node, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&node.to_json())
            .map_err(|e| format!("JSON encode error: {}", e)),
        OutputFormat::Yaml => yaml::encode(node),
        OutputFormat::Toml => toml::encode(node),
        OutputFormat::Conf => Ok(conf::encode(node)),
    }
}
