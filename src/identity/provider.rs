//! Session provider facade
//!
//! [`RemoteIdentityProvider`] is what an embedding application talks to. It
//! owns one reconciliation engine, the profile attribute set and the pending
//! one-shot syncs for identities that did not exist yet when selected.

use super::engine::{EnginePolicy, ReconciliationEngine};
use super::error::IdentityError;
use super::filter::{FilterChain, GlobFilter, NameFilter, ReplaceFilter};
use super::metadata::{self, Metadata};
use super::policy::{PolicyInputs, PostReconciliationPolicy, UiAffordance};
use super::profile::{AttributeValue, ProfileSynchronizer};
use super::request::RequestContext;
use super::session::SessionState;
use super::source::{NameSource, NameSourceResolver};
use super::store::{FallbackSessions, IdentityStore};
use crate::config::{ConfigError, ProviderConfig};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// What happened after the host selected a session from this provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// UI affordances the host should hide
    pub suppressed: BTreeSet<UiAffordance>,
    /// The profile was written during this call
    pub profile_written: bool,
    /// The identity does not exist yet; its profile is applied on creation
    pub sync_deferred: bool,
}

pub struct RemoteIdentityProvider {
    engine: ReconciliationEngine,
    profile: ProfileSynchronizer,
    store: Arc<dyn IdentityStore>,
    force_profile_sync: bool,
    remove_auth_pages_and_links: bool,
    pending: DashMap<String, Metadata>,
}

impl RemoteIdentityProvider {
    pub fn builder(
        store: Arc<dyn IdentityStore>,
        sessions: Arc<dyn FallbackSessions>,
    ) -> ProviderBuilder {
        ProviderBuilder::new(store, sessions)
    }

    /// Build a provider from the `[provider]` config section.
    ///
    /// Legacy keys are folded in first. A filter rule whose pattern does not
    /// compile is kept (and vetoes every candidate), with a warning.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the effective config is invalid.
    pub fn from_config(
        config: &ProviderConfig,
        store: Arc<dyn IdentityStore>,
        sessions: Arc<dyn FallbackSessions>,
    ) -> Result<Self, ConfigError> {
        let config = config.effective();
        config.validate()?;

        let mut builder = Self::builder(store, sessions)
            .with_priority(config.priority)
            .with_auto_create_user(config.auto_create_user)
            .with_allow_user_switch(config.allow_user_switch)
            .with_force_profile_sync(config.force_profile_sync)
            .with_remove_auth_pages_and_links(config.remove_auth_pages_and_links);

        if let Some(sources) = &config.name_sources {
            builder = builder.with_name_sources(sources.iter().map(NameSource::from).collect());
        }

        for rule in &config.filter_rules {
            let filter = if rule.literal {
                ReplaceFilter::literal(&rule.pattern, rule.replacement.as_str())
            } else {
                ReplaceFilter::new(&rule.pattern, rule.replacement.as_str())
            };
            if let Some(error) = filter.pattern_error() {
                tracing::warn!(
                    pattern = %rule.pattern,
                    error = %error,
                    "Filter rule does not compile, it will veto every candidate"
                );
            }
            builder = builder.with_filter(Box::new(filter));
        }

        if !config.deny_names.is_empty() {
            let filter = GlobFilter::deny(&config.deny_names).map_err(|e| glob_error("deny_names", e))?;
            builder = builder.with_filter(Box::new(filter));
        }
        if let Some(allow) = &config.allow_names {
            let filter = GlobFilter::allow(allow).map_err(|e| glob_error("allow_names", e))?;
            builder = builder.with_filter(Box::new(filter));
        }

        for (name, value) in &config.profile_attributes {
            builder = builder.with_attribute(name.clone(), AttributeValue::from(value));
        }

        Ok(builder.build())
    }

    /// Run reconciliation for one request.
    ///
    /// `Ok(None)` leaves the decision to other session providers.
    pub fn resolve(&self, request: &RequestContext) -> Result<Option<SessionState>, IdentityError> {
        self.engine.reconcile(request)
    }

    /// Merge freshly provided metadata into what the session store kept.
    pub fn merge_metadata(&self, stored: &Metadata, provided: &Metadata) -> Metadata {
        metadata::merge(stored, provided)
    }

    /// Whether a session may carry a different identity than the asserted one.
    pub fn can_switch_identity(&self) -> bool {
        self.engine.policy().allow_user_switch
    }

    pub fn priority(&self) -> i32 {
        self.engine.policy().priority
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    pub fn profile(&self) -> &ProfileSynchronizer {
        &self.profile
    }

    pub fn policy_inputs(&self) -> PolicyInputs {
        PolicyInputs {
            switch_user_allowed: self.can_switch_identity(),
            remove_auth_pages_and_links: self.remove_auth_pages_and_links,
            forced_fields: if self.force_profile_sync {
                self.profile.names().map(str::to_string).collect()
            } else {
                BTreeSet::new()
            },
        }
    }

    /// Called once the host selected `state` for the request.
    ///
    /// Synchronizes the profile of the session identity: immediately if it
    /// exists and was just created or `force_profile_sync` is on, or on
    /// [`identity_created`](Self::identity_created) if it does not exist yet.
    pub fn on_selected(
        &self,
        state: &SessionState,
        request: &RequestContext,
        metadata: &Metadata,
    ) -> Result<Selection, IdentityError> {
        let mut selection = Selection {
            suppressed: PostReconciliationPolicy::suppressed(&self.policy_inputs()),
            ..Default::default()
        };

        let Some(name) = state.identity.name() else {
            return Ok(selection);
        };
        if self.profile.is_empty() {
            return Ok(selection);
        }

        if self.store.user_id(name)?.is_none() {
            self.pending.insert(name.to_string(), metadata.clone());
            selection.sync_deferred = true;
            tracing::debug!(
                request_id = %request.request_id(),
                user = %name,
                "Profile sync deferred until identity creation"
            );
        } else if self.force_profile_sync || state.is_new_identity() {
            self.pending.remove(name);
            selection.profile_written = self.profile.apply(self.store.as_ref(), name, metadata)?;
        }

        Ok(selection)
    }

    /// Fire the one-shot sync registered for `canonical_name`, if any.
    ///
    /// Returns `true` if the profile was written.
    pub fn identity_created(&self, canonical_name: &str) -> Result<bool, IdentityError> {
        let Some((_, metadata)) = self.pending.remove(canonical_name) else {
            return Ok(false);
        };
        self.profile.apply(self.store.as_ref(), canonical_name, &metadata)
    }

    /// Number of identities waiting for creation before their profile sync.
    pub fn pending_syncs(&self) -> usize {
        self.pending.len()
    }
}

fn glob_error(field: &str, error: globset::Error) -> ConfigError {
    ConfigError::Validation {
        field: format!("provider.{}", field),
        message: error.to_string(),
    }
}

/// Assembles a [`RemoteIdentityProvider`] programmatically.
///
/// Embedding applications use this to register deferred name sources,
/// closure filters and deferred attributes that a config file cannot express.
pub struct ProviderBuilder {
    store: Arc<dyn IdentityStore>,
    sessions: Arc<dyn FallbackSessions>,
    sources: Option<Vec<NameSource>>,
    filters: FilterChain,
    profile: ProfileSynchronizer,
    policy: EnginePolicy,
    force_profile_sync: bool,
    remove_auth_pages_and_links: bool,
}

impl ProviderBuilder {
    pub fn new(store: Arc<dyn IdentityStore>, sessions: Arc<dyn FallbackSessions>) -> Self {
        Self {
            store,
            sessions,
            sources: None,
            filters: FilterChain::default(),
            profile: ProfileSynchronizer::default(),
            policy: EnginePolicy::default(),
            force_profile_sync: true,
            remove_auth_pages_and_links: true,
        }
    }

    /// Replace the default `REMOTE_USER` / `REDIRECT_REMOTE_USER` sources.
    pub fn with_name_sources(mut self, sources: Vec<NameSource>) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Append a filter to the chain.
    pub fn with_filter(mut self, filter: Box<dyn NameFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.profile.insert(name, value);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.policy.priority = priority;
        self
    }

    pub fn with_auto_create_user(mut self, enabled: bool) -> Self {
        self.policy.auto_create_user = enabled;
        self
    }

    pub fn with_allow_user_switch(mut self, enabled: bool) -> Self {
        self.policy.allow_user_switch = enabled;
        self
    }

    pub fn with_force_profile_sync(mut self, enabled: bool) -> Self {
        self.force_profile_sync = enabled;
        self
    }

    pub fn with_remove_auth_pages_and_links(mut self, enabled: bool) -> Self {
        self.remove_auth_pages_and_links = enabled;
        self
    }

    pub fn build(self) -> RemoteIdentityProvider {
        let resolver = match self.sources {
            Some(sources) => NameSourceResolver::new(sources),
            None => NameSourceResolver::with_defaults(),
        };
        let engine = ReconciliationEngine::new(
            resolver,
            self.filters,
            Arc::clone(&self.store),
            self.sessions,
            self.policy,
        );
        RemoteIdentityProvider {
            engine,
            profile: self.profile,
            store: self.store,
            force_profile_sync: self.force_profile_sync,
            remove_auth_pages_and_links: self.remove_auth_pages_and_links,
            pending: DashMap::new(),
        }
    }
}
