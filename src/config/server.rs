//! Server configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request headers set by the authenticating proxy, mapped to the
    /// server variable each one populates
    pub trusted_headers: BTreeMap<String, String>,
    /// Name of the cookie carrying the session ID
    pub session_cookie: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8300,
            trusted_headers: BTreeMap::from([(
                "x-remote-user".to_string(),
                "REMOTE_USER".to_string(),
            )]),
            session_cookie: "vouch_session".to_string(),
        }
    }
}
