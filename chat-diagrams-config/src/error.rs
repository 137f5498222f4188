//! Typed error variants for the chat-diagrams-config crate.

use std::path::PathBuf;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred reading the config file.
    #[error("I/O error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config contained invalid YAML that could not be parsed.
    #[error("YAML parse error in config: {0}")]
    Parse(#[from] serde_yaml_ng::Error),

    /// A field value failed semantic validation.
    ///
    /// The inner string names the field and why it is invalid.
    #[error("Config validation error: {0}")]
    Validation(String),
}
