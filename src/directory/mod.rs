//! In-memory identity directory
//!
//! A self-contained [`IdentityStore`] so the provider can run without a host
//! application: the CLI, the demo server and the tests all use it.

mod sessions;

pub use sessions::{MemorySessions, SESSION_PRIORITY};

use crate::config::DirectoryConfig;
use crate::identity::{Capabilities, IdentityStore, StoreError, UserId, UserProfile};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Longest accepted identity name, in bytes.
pub const MAX_NAME_LENGTH: usize = 255;

const FORBIDDEN_CHARS: &[char] = &['#', '<', '>', '[', ']', '|', '{', '}', '/', '@', ':'];

/// One stored identity.
#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub profile: UserProfile,
    pub registered_at: DateTime<Utc>,
}

/// Thread-safe identity directory backed by a concurrent map keyed by
/// canonical name.
///
/// # Examples
///
/// ```
/// use vouch::directory::Directory;
/// use vouch::identity::IdentityStore;
///
/// let directory = Directory::new();
/// directory.create_user("jdoe").unwrap();
///
/// assert_eq!(directory.canonical_name("jdoe").unwrap().as_deref(), Some("Jdoe"));
/// assert!(directory.user_id("Jdoe").unwrap().is_some());
/// ```
pub struct Directory {
    users: DashMap<String, UserRecord>,
    next_id: AtomicU64,
    can_create_account: AtomicBool,
    can_auto_create_account: AtomicBool,
    reserved_names: Vec<String>,
    profile_writes: AtomicU64,
}

impl Directory {
    /// Empty directory with both creation paths open.
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            next_id: AtomicU64::new(1),
            can_create_account: AtomicBool::new(true),
            can_auto_create_account: AtomicBool::new(true),
            reserved_names: Vec::new(),
            profile_writes: AtomicU64::new(0),
        }
    }

    /// Build from config, seeding the listed users.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidName` or `StoreError::AlreadyExists` for a
    /// bad seed entry.
    pub fn from_config(config: &DirectoryConfig) -> Result<Self, StoreError> {
        let directory = Self::new()
            .with_reserved_names(config.reserved_names.iter().cloned())
            .with_capabilities(Capabilities {
                can_create_account: config.can_create_account,
                can_auto_create_account: config.can_auto_create_account,
            });
        for user in &config.users {
            directory.create_user(user)?;
        }
        Ok(directory)
    }

    pub fn with_reserved_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_names
            .extend(names.into_iter().map(|n| n.into().to_lowercase()));
        self
    }

    pub fn with_capabilities(self, capabilities: Capabilities) -> Self {
        self.set_capabilities(capabilities);
        self
    }

    /// Change the live capabilities; takes effect on the next read.
    pub fn set_capabilities(&self, capabilities: Capabilities) {
        self.can_create_account
            .store(capabilities.can_create_account, Ordering::SeqCst);
        self.can_auto_create_account
            .store(capabilities.can_auto_create_account, Ordering::SeqCst);
    }

    /// Register an identity under the canonical form of `name`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidName` if `name` has no canonical form and
    /// `StoreError::AlreadyExists` if the identity is already present.
    pub fn create_user(&self, name: &str) -> Result<UserId, StoreError> {
        let canonical = self
            .canonicalize(name)
            .ok_or_else(|| StoreError::InvalidName(name.to_string()))?;

        match self.users.entry(canonical.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::AlreadyExists(canonical)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                slot.insert(UserRecord {
                    id,
                    name: canonical.clone(),
                    profile: UserProfile::default(),
                    registered_at: Utc::now(),
                });
                tracing::info!(user = %canonical, user_id = id, "Identity created");
                Ok(id)
            }
        }
    }

    /// Cloned record for `canonical_name`.
    pub fn get_user(&self, canonical_name: &str) -> Option<UserRecord> {
        self.users.get(canonical_name).map(|entry| entry.value().clone())
    }

    /// All records ordered by ID.
    pub fn users(&self) -> Vec<UserRecord> {
        let mut users: Vec<_> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        users
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of successful `save_profile` calls.
    pub fn profile_writes(&self) -> u64 {
        self.profile_writes.load(Ordering::SeqCst)
    }

    fn canonicalize(&self, name: &str) -> Option<String> {
        let name = name.trim().replace('_', " ");
        if name.is_empty()
            || name.len() > MAX_NAME_LENGTH
            || name.contains(FORBIDDEN_CHARS)
            || name.chars().any(char::is_control)
            || name.parse::<IpAddr>().is_ok()
        {
            return None;
        }

        let mut chars = name.chars();
        let first = chars.next()?;
        let canonical: String = first.to_uppercase().chain(chars).collect();

        if self.reserved_names.contains(&canonical.to_lowercase()) {
            return None;
        }
        Some(canonical)
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityStore for Directory {
    fn canonical_name(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.canonicalize(name))
    }

    fn user_id(&self, canonical_name: &str) -> Result<Option<UserId>, StoreError> {
        Ok(self.users.get(canonical_name).map(|entry| entry.id))
    }

    fn capabilities(&self) -> Result<Capabilities, StoreError> {
        Ok(Capabilities {
            can_create_account: self.can_create_account.load(Ordering::SeqCst),
            can_auto_create_account: self.can_auto_create_account.load(Ordering::SeqCst),
        })
    }

    fn load_profile(&self, canonical_name: &str) -> Result<UserProfile, StoreError> {
        self.users
            .get(canonical_name)
            .map(|entry| entry.profile.clone())
            .ok_or_else(|| StoreError::NotFound(canonical_name.to_string()))
    }

    fn save_profile(&self, canonical_name: &str, profile: &UserProfile) -> Result<(), StoreError> {
        let mut entry = self
            .users
            .get_mut(canonical_name)
            .ok_or_else(|| StoreError::NotFound(canonical_name.to_string()))?;
        entry.profile = profile.clone();
        self.profile_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
