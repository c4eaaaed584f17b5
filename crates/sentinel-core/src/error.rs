//! Error types for the core crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building classifier configuration.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A configured pattern failed to compile.
    #[error("invalid {group} pattern '{pattern}': {source}")]
    InvalidPattern {
        group: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A pattern configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A pattern configuration file could not be parsed.
    #[error("failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
