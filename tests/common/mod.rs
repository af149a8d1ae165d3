//! Shared test utilities for Vouch integration tests.
//!
//! Provides a directory + session store pair, request builders and a router
//! factory so each test file only spells out what it is checking.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::Request;
use std::sync::Arc;
use vouch::config::VouchConfig;
use vouch::directory::{Directory, MemorySessions};
use vouch::identity::{ProviderBuilder, RemoteIdentityProvider, RequestContext, StoreError};
use vouch::server::{create_router, AppState};

/// UUID v4 string length: "xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx"
pub const UUID_V4_STRING_LEN: usize = 36;

// =============================================================================
// Stores
// =============================================================================

/// In-memory directory and the session store backed by it.
pub struct Harness {
    pub directory: Arc<Directory>,
    pub sessions: Arc<MemorySessions>,
}

impl Harness {
    pub fn new() -> Self {
        let directory = Arc::new(Directory::new());
        let sessions = Arc::new(MemorySessions::new(directory.clone()));
        Self {
            directory,
            sessions,
        }
    }

    /// Harness whose directory already holds `users` (duplicates allowed).
    pub fn with_users(users: &[&str]) -> Self {
        let harness = Self::new();
        for user in users {
            match harness.directory.create_user(user) {
                Ok(_) | Err(StoreError::AlreadyExists(_)) => {}
                Err(e) => panic!("cannot seed {}: {}", user, e),
            }
        }
        harness
    }

    pub fn provider(&self) -> ProviderBuilder {
        RemoteIdentityProvider::builder(self.directory.clone(), self.sessions.clone())
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Request context carrying the given server variables.
pub fn request(vars: &[(&str, &str)]) -> RequestContext {
    vars.iter()
        .fold(RequestContext::new(), |request, (name, value)| {
            request.with_var(*name, *value)
        })
}

/// `GET /whoami` with optional proxy header and session cookie.
pub fn whoami(remote_user: Option<&str>, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/whoami");
    if let Some(user) = remote_user {
        builder = builder.header("x-remote-user", user);
    }
    if let Some(session_id) = session {
        builder = builder.header("cookie", format!("vouch_session={}", session_id));
    }
    builder.body(Body::empty()).unwrap()
}

// =============================================================================
// Router
// =============================================================================

/// Router over a fresh state built from `config`.
pub fn make_app(config: VouchConfig) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(Arc::new(config)).unwrap());
    (create_router(state.clone()), state)
}

/// Parse a response body as JSON.
pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
