//! Configuration module for Vouch
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`VOUCH_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use vouch::config::VouchConfig;
//!
//! let config = VouchConfig::default();
//! assert_eq!(config.provider.priority, 50);
//!
//! let toml = r#"
//! [provider]
//! allow_user_switch = true
//! "#;
//! let config: VouchConfig = toml::from_str(toml).unwrap();
//! assert!(config.provider.allow_user_switch);
//! ```

pub mod directory;
pub mod error;
pub mod logging;
pub mod provider;
pub mod server;

pub use directory::DirectoryConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use provider::{
    AttributeConfig, FilterRuleConfig, LegacyConfig, NameSourceConfig, ProviderConfig,
};
pub use server::ServerConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration for Vouch.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VouchConfig {
    /// Demo HTTP server
    pub server: ServerConfig,
    /// Remote identity provider
    pub provider: ProviderConfig,
    /// Bundled in-memory identity directory
    pub directory: DirectoryConfig,
    pub logging: LoggingConfig,
}

impl VouchConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports VOUCH_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("VOUCH_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(host) = std::env::var("VOUCH_HOST") {
            self.server.host = host;
        }

        if let Ok(level) = std::env::var("VOUCH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("VOUCH_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        if let Ok(priority) = std::env::var("VOUCH_PRIORITY") {
            if let Ok(p) = priority.parse() {
                self.provider.priority = p;
            }
        }
        if let Some(flag) = env_flag("VOUCH_AUTO_CREATE_USER") {
            self.provider.auto_create_user = flag;
        }
        if let Some(flag) = env_flag("VOUCH_ALLOW_USER_SWITCH") {
            self.provider.allow_user_switch = flag;
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation {
                field: "server.port".to_string(),
                message: "port must be non-zero".to_string(),
            });
        }
        if self.server.session_cookie.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "server.session_cookie".to_string(),
                message: "cookie name cannot be empty".to_string(),
            });
        }
        for (header, var) in &self.server.trusted_headers {
            if axum::http::HeaderName::from_bytes(header.as_bytes()).is_err() {
                return Err(ConfigError::Validation {
                    field: format!("server.trusted_headers.{}", header),
                    message: "not a valid header name".to_string(),
                });
            }
            if var.trim().is_empty() {
                return Err(ConfigError::Validation {
                    field: format!("server.trusted_headers.{}", header),
                    message: "variable name cannot be empty".to_string(),
                });
            }
        }

        self.logging.validate()?;
        self.provider.effective().validate()
    }
}

fn env_flag(name: &str) -> Option<bool> {
    match std::env::var(name).ok()?.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
