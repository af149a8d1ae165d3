//! Cookie-keyed session store used as the fallback session mechanism

use crate::identity::{
    CanonicalIdentity, FallbackSessions, IdentityStore, Metadata, RequestContext, SessionIdentity,
    SessionState, StoreError,
};
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Priority reported for sessions restored from this store.
pub const SESSION_PRIORITY: i32 = 40;

/// What the store remembers about one session.
#[derive(Debug, Clone, Serialize)]
pub struct StoredSession {
    /// User name bound to the session, `None` for anonymous
    pub user: Option<String>,
    pub metadata: Metadata,
    pub updated_at: DateTime<Utc>,
}

impl StoredSession {
    fn is_expired(&self, ttl: Option<TimeDelta>, now: DateTime<Utc>) -> bool {
        ttl.is_some_and(|ttl| now - self.updated_at > ttl)
    }
}

/// In-memory session store keyed by session ID.
///
/// Sessions idle for longer than the configured TTL are treated as unknown
/// and dropped on the next write. Without a TTL the map only grows.
pub struct MemorySessions {
    store: Arc<dyn IdentityStore>,
    sessions: DashMap<String, StoredSession>,
    ttl: Option<TimeDelta>,
}

impl MemorySessions {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self {
            store,
            sessions: DashMap::new(),
            ttl: None,
        }
    }

    /// Expire sessions not written for `ttl`. A zero TTL disables expiry.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = if ttl.is_zero() {
            None
        } else {
            TimeDelta::from_std(ttl).ok()
        };
        self
    }

    /// Drop expired sessions, returning how many were removed.
    pub fn prune(&self) -> usize {
        if self.ttl.is_none() {
            return 0;
        }
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| !session.is_expired(self.ttl, now));
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.sessions.len(), "Expired sessions pruned");
        }
        removed
    }

    /// Start a session bound to `user` (or anonymous) and return its ID.
    pub fn open(&self, user: Option<&str>) -> String {
        let session_id = Uuid::new_v4().to_string();
        self.sessions.insert(
            session_id.clone(),
            StoredSession {
                user: user.map(str::to_string),
                metadata: Metadata::new(),
                updated_at: Utc::now(),
            },
        );
        session_id
    }

    /// Record a session decision so later requests presenting the same ID
    /// restore it.
    pub fn persist(&self, state: &SessionState) {
        self.prune();
        self.sessions.insert(
            state.session_id.clone(),
            StoredSession {
                user: state.identity.name().map(str::to_string),
                metadata: state.metadata.clone(),
                updated_at: Utc::now(),
            },
        );
        tracing::debug!(
            session_id = %state.session_id,
            user = state.identity.name().unwrap_or_default(),
            "Session persisted"
        );
    }

    pub fn get(&self, session_id: &str) -> Option<StoredSession> {
        let now = Utc::now();
        self.sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
            .filter(|session| !session.is_expired(self.ttl, now))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl FallbackSessions for MemorySessions {
    fn provide(&self, request: &RequestContext) -> Result<Option<SessionState>, StoreError> {
        let Some(session_id) = request.session_id() else {
            return Ok(None);
        };
        let Some(stored) = self.get(session_id) else {
            tracing::debug!(session_id = %session_id, "Unknown session ID presented");
            return Ok(None);
        };

        let identity = match stored.user {
            None => SessionIdentity::Anonymous,
            Some(name) => match self.store.user_id(&name)? {
                Some(id) => {
                    SessionIdentity::Identified(CanonicalIdentity::new(&name, &name, &name, Some(id)))
                }
                None => SessionIdentity::Unresolved { name },
            },
        };

        let mut state = SessionState::new(session_id, SESSION_PRIORITY, identity);
        state.metadata = stored.metadata;
        Ok(Some(state))
    }
}
