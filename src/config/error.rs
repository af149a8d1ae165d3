//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating `vouch.toml`.
///
/// These are fatal at construction time: a provider is never built from a
/// config that failed validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// `field` is the dotted path of the offending key
    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },
}
