//! Per-request context handed to the provider by the embedding framework

use std::collections::HashMap;

/// Request-scoped inputs for one reconciliation.
///
/// `vars` holds server variables already established by the authenticating
/// layer (for example `REMOTE_USER`). Environment-style name sources read
/// only these; the process environment is never consulted implicitly.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    session_id: Option<String>,
    vars: HashMap<String, String>,
}

impl RequestContext {
    /// Create an empty context with a fresh request ID.
    pub fn new() -> Self {
        Self {
            request_id: crate::logging::generate_request_id(),
            session_id: None,
            vars: HashMap::new(),
        }
    }

    /// Set a server variable.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Attach the session identifier presented by the client (cookie).
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Server variable set on this request, if any.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Environment-style lookup, scoped to this request's variables.
    pub fn lookup(&self, name: &str) -> Option<String> {
        self.var(name).map(str::to_string)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
