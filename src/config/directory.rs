//! Built-in identity directory configuration

use serde::{Deserialize, Serialize};

/// `[directory]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Whether new accounts may be registered
    pub can_create_account: bool,
    /// Whether accounts may be created on first remote login
    pub can_auto_create_account: bool,
    /// Names that never map to an identity (compared case-insensitively)
    pub reserved_names: Vec<String>,
    /// Identities present at startup
    pub users: Vec<String>,
    /// Idle time after which a demo-server session is forgotten; 0 keeps
    /// sessions forever
    pub session_ttl_secs: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            can_create_account: true,
            can_auto_create_account: true,
            reserved_names: vec!["Maintenance script".to_string()],
            users: Vec::new(),
            session_ttl_secs: 86_400,
        }
    }
}
