//! Reconciliation engine
//!
//! Decides, once per request, which session the externally asserted identity
//! ends up in.
//!
//! # Algorithm
//! For each candidate name, in configured order:
//! 1. Filter and canonicalize; a veto or invalid name moves to the next candidate
//! 2. Unknown identity with auto-creation disabled moves to the next candidate
//! 3. Ask the fallback session mechanism for its session
//! 4. Stale-permission guard: drop that session if the identity must be created
//!    and live capabilities now allow creation
//! 5. No session left: synthesize one with a fresh ID and the configured priority
//! 6. Switch-user guard: force-override sessions that are anonymous, unresolved,
//!    or (switching disabled) bound to a different identity
//! 7. Attach fresh metadata and return
//!
//! The first candidate that gets through wins. Store errors abort the request.

use super::canonical::{CanonicalIdentity, Canonicalizer};
use super::error::IdentityError;
use super::filter::FilterChain;
use super::metadata::{self, Metadata};
use super::request::RequestContext;
use super::session::{SessionIdentity, SessionState};
use super::source::NameSourceResolver;
use super::store::{FallbackSessions, IdentityStore};
use crate::metrics::{CANDIDATES_REJECTED_TOTAL, DECISIONS_TOTAL};
use std::sync::Arc;
use uuid::Uuid;

/// Default provider priority, mid-range of the host's 1..=100 scale.
pub const DEFAULT_PRIORITY: i32 = 50;

/// Trust policy applied by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnginePolicy {
    /// Priority given to sessions this engine synthesizes
    pub priority: i32,
    /// Accept candidates that do not exist locally yet
    pub auto_create_user: bool,
    /// Let a session keep a different identity than the asserted one
    pub allow_user_switch: bool,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            auto_create_user: true,
            allow_user_switch: false,
        }
    }
}

pub struct ReconciliationEngine {
    resolver: NameSourceResolver,
    filters: FilterChain,
    canonicalizer: Canonicalizer,
    store: Arc<dyn IdentityStore>,
    sessions: Arc<dyn FallbackSessions>,
    policy: EnginePolicy,
}

impl ReconciliationEngine {
    pub fn new(
        resolver: NameSourceResolver,
        filters: FilterChain,
        store: Arc<dyn IdentityStore>,
        sessions: Arc<dyn FallbackSessions>,
        policy: EnginePolicy,
    ) -> Self {
        Self {
            resolver,
            filters,
            canonicalizer: Canonicalizer::new(Arc::clone(&store)),
            store,
            sessions,
            policy,
        }
    }

    pub fn policy(&self) -> &EnginePolicy {
        &self.policy
    }

    pub fn resolver(&self) -> &NameSourceResolver {
        &self.resolver
    }

    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// Reconcile one request.
    ///
    /// Returns `Ok(None)` when no candidate survived, leaving the decision to
    /// other session providers.
    pub fn reconcile(
        &self,
        request: &RequestContext,
    ) -> Result<Option<SessionState>, IdentityError> {
        for raw_name in self.resolver.candidates(request) {
            match self.reconcile_candidate(&raw_name, request) {
                Ok(state) => {
                    metrics::counter!(
                        DECISIONS_TOTAL,
                        "outcome" => if state.force_use { "forced" } else { "reused" },
                    )
                    .increment(1);

                    tracing::info!(
                        request_id = %request.request_id(),
                        raw_name = %raw_name,
                        user = state.identity.name().unwrap_or_default(),
                        session_id = %state.session_id,
                        force_use = state.force_use,
                        new_identity = state.is_new_identity(),
                        "Remote identity reconciled"
                    );
                    return Ok(Some(state));
                }
                Err(e) if e.is_soft() => {
                    metrics::counter!(
                        CANDIDATES_REJECTED_TOTAL,
                        "reason" => e.reason(),
                    )
                    .increment(1);

                    tracing::warn!(
                        request_id = %request.request_id(),
                        raw_name = %raw_name,
                        reason = e.reason(),
                        error = %e,
                        "Candidate rejected, trying next"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        request_id = %request.request_id(),
                        raw_name = %raw_name,
                        error = %e,
                        "Reconciliation aborted"
                    );
                    return Err(e);
                }
            }
        }

        metrics::counter!(DECISIONS_TOTAL, "outcome" => "none").increment(1);
        tracing::debug!(
            request_id = %request.request_id(),
            "No remote identity candidate succeeded"
        );
        Ok(None)
    }

    fn reconcile_candidate(
        &self,
        raw_name: &str,
        request: &RequestContext,
    ) -> Result<SessionState, IdentityError> {
        let filtered_name = self.filters.apply(raw_name)?;
        let identity = self.canonicalizer.canonicalize(raw_name, &filtered_name)?;

        if !identity.exists() && !self.policy.auto_create_user {
            return Err(IdentityError::CreationForbidden {
                canonical_name: identity.canonical_name().to_string(),
            });
        }

        // Nothing after this point rejects the candidate softly, so the
        // fallback mechanism is consulted at most once per request.
        let existing = match self.sessions.provide(request)? {
            Some(state) if !identity.exists() => self.stale_permission_guard(state, &identity)?,
            other => other,
        };

        let state = existing.unwrap_or_else(|| {
            SessionState::new(
                Uuid::new_v4().to_string(),
                self.policy.priority,
                SessionIdentity::Identified(identity.clone()),
            )
        });

        let state = if self.must_force(&state.identity, &identity) {
            state.force_override(identity.clone())
        } else {
            state
        };

        let provided = Metadata::for_decision(&identity, &state.identity);
        let metadata = metadata::merge(&state.metadata, &provided);
        Ok(SessionState { metadata, ..state })
    }

    /// Discard a fallback session whose embedded permission snapshot may be
    /// older than the live capabilities.
    fn stale_permission_guard(
        &self,
        state: SessionState,
        identity: &CanonicalIdentity,
    ) -> Result<Option<SessionState>, IdentityError> {
        let capabilities = self.store.capabilities()?;
        if capabilities.permits_creation() {
            tracing::debug!(
                session_id = %state.session_id,
                canonical_name = %identity.canonical_name(),
                "Discarding fallback session, identity needs creation under current capabilities"
            );
            Ok(None)
        } else {
            Ok(Some(state))
        }
    }

    fn must_force(&self, current: &SessionIdentity, resolved: &CanonicalIdentity) -> bool {
        if !current.is_established() {
            return true;
        }
        !self.policy.allow_user_switch && current.name() != Some(resolved.canonical_name())
    }
}
