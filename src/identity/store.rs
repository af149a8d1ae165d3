//! Interfaces to the host's identity store and fallback session mechanism

use super::error::StoreError;
use super::request::RequestContext;
use super::session::SessionState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Local identity identifier assigned by the store.
pub type UserId = u64;

/// Account creation capabilities, read live from the host on every use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_create_account: bool,
    pub can_auto_create_account: bool,
}

impl Capabilities {
    /// True if either creation path is currently open.
    pub fn permits_creation(&self) -> bool {
        self.can_create_account || self.can_auto_create_account
    }
}

/// Profile fields the synchronizer can write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub real_name: String,
    pub email: Option<String>,
    pub email_confirmed: bool,
    pub preferences: BTreeMap<String, String>,
}

/// The local identity/account database.
pub trait IdentityStore: Send + Sync {
    /// Canonical form of `name`, or `None` if it cannot name an identity
    /// (invalid characters, reserved, looks like a network address).
    fn canonical_name(&self, name: &str) -> Result<Option<String>, StoreError>;

    /// Local ID of an existing identity.
    fn user_id(&self, canonical_name: &str) -> Result<Option<UserId>, StoreError>;

    /// Current account creation capabilities.
    fn capabilities(&self) -> Result<Capabilities, StoreError>;

    fn load_profile(&self, canonical_name: &str) -> Result<UserProfile, StoreError>;

    fn save_profile(&self, canonical_name: &str, profile: &UserProfile) -> Result<(), StoreError>;

    /// Whether `email` is a well-formed address the host accepts.
    fn is_valid_email(&self, email: &str) -> bool {
        is_plausible_email(email)
    }
}

/// The session mechanism that runs underneath this provider (cookies).
pub trait FallbackSessions: Send + Sync {
    /// Session state the fallback mechanism derived for this request, if any.
    fn provide(&self, request: &RequestContext) -> Result<Option<SessionState>, StoreError>;
}

/// Structural email check: one `@`, non-empty local part, dotted domain.
pub fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_permit_creation_if_either_flag_set() {
        assert!(!Capabilities::default().permits_creation());
        assert!(Capabilities {
            can_create_account: true,
            can_auto_create_account: false,
        }
        .permits_creation());
        assert!(Capabilities {
            can_create_account: false,
            can_auto_create_account: true,
        }
        .permits_creation());
    }

    #[test]
    fn plausible_email_accepts_common_addresses() {
        assert!(is_plausible_email("jdoe@example.com"));
        assert!(is_plausible_email("j.doe+wiki@mail.example.org"));
    }

    #[test]
    fn plausible_email_rejects_malformed_addresses() {
        assert!(!is_plausible_email(""));
        assert!(!is_plausible_email("jdoe"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("jdoe@localhost"));
        assert!(!is_plausible_email("jdoe@@example.com"));
        assert!(!is_plausible_email("j doe@example.com"));
        assert!(!is_plausible_email("jdoe@example."));
    }
}
