//! Candidate name sources
//!
//! Sources are configured once per provider and evaluated lazily per request:
//! a source is only consulted when every earlier candidate failed.

use super::request::RequestContext;
use std::fmt;
use std::sync::Arc;

/// Server variables consulted when no sources are configured.
pub const DEFAULT_NAME_VARS: [&str; 2] = ["REMOTE_USER", "REDIRECT_REMOTE_USER"];

/// Producer evaluated at request time.
pub type NameProducer = Arc<dyn Fn(&RequestContext) -> Option<String> + Send + Sync>;

/// One configured origin of a candidate identity name.
#[derive(Clone)]
pub enum NameSource {
    /// A fixed name
    Literal(String),
    /// A server variable of the current request, looked up when its turn comes
    Env(String),
    /// A variable of the host process environment. Shared by every request,
    /// so only suited to single-user tools such as the CLI.
    ProcessEnv(String),
    /// A closure supplied by the embedding application
    Deferred(NameProducer),
}

impl NameSource {
    pub fn env(var: impl Into<String>) -> Self {
        NameSource::Env(var.into())
    }

    pub fn process_env(var: impl Into<String>) -> Self {
        NameSource::ProcessEnv(var.into())
    }

    pub fn deferred<F>(producer: F) -> Self
    where
        F: Fn(&RequestContext) -> Option<String> + Send + Sync + 'static,
    {
        NameSource::Deferred(Arc::new(producer))
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            NameSource::Literal(_) => "literal".to_string(),
            NameSource::Env(var) => format!("env:{}", var),
            NameSource::ProcessEnv(var) => format!("process_env:{}", var),
            NameSource::Deferred(_) => "deferred".to_string(),
        }
    }

    fn produce(&self, request: &RequestContext) -> Option<String> {
        match self {
            NameSource::Literal(name) => Some(name.clone()),
            NameSource::Env(var) => request.lookup(var),
            NameSource::ProcessEnv(var) => std::env::var(var).ok(),
            NameSource::Deferred(producer) => producer(request),
        }
    }
}

impl fmt::Debug for NameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameSource::Literal(name) => f.debug_tuple("Literal").field(name).finish(),
            NameSource::Env(var) => f.debug_tuple("Env").field(var).finish(),
            NameSource::ProcessEnv(var) => f.debug_tuple("ProcessEnv").field(var).finish(),
            NameSource::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Ordered list of name sources.
#[derive(Debug, Clone)]
pub struct NameSourceResolver {
    sources: Vec<NameSource>,
}

impl NameSourceResolver {
    /// Resolver over exactly `sources`. An empty list never yields a candidate.
    pub fn new(sources: Vec<NameSource>) -> Self {
        Self { sources }
    }

    /// `REMOTE_USER` followed by `REDIRECT_REMOTE_USER`.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_NAME_VARS.iter().map(|v| NameSource::env(*v)).collect())
    }

    pub fn sources(&self) -> &[NameSource] {
        &self.sources
    }

    /// Lazily produce non-empty candidate names in configured order.
    ///
    /// Each source is evaluated at most once, when the iterator reaches it.
    pub fn candidates<'a>(
        &'a self,
        request: &'a RequestContext,
    ) -> impl Iterator<Item = String> + 'a {
        self.sources
            .iter()
            .enumerate()
            .filter_map(move |(position, source)| match source.produce(request) {
                Some(name) if !name.trim().is_empty() => Some(name),
                _ => {
                    tracing::debug!(
                        request_id = %request.request_id(),
                        position,
                        source = %source.describe(),
                        "Name source produced no candidate, skipping"
                    );
                    None
                }
            })
    }
}

impl Default for NameSourceResolver {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn defaults_are_remote_user_pair() {
        let resolver = NameSourceResolver::with_defaults();
        let vars: Vec<String> = resolver.sources().iter().map(|s| s.describe()).collect();
        assert_eq!(vars, vec!["env:REMOTE_USER", "env:REDIRECT_REMOTE_USER"]);
    }

    #[test]
    fn env_sources_read_request_vars_at_resolution_time() {
        let resolver = NameSourceResolver::new(vec![NameSource::env("VOUCH_TEST_USER")]);
        let request = RequestContext::new().with_var("VOUCH_TEST_USER", "asmith");

        let names: Vec<String> = resolver.candidates(&request).collect();
        assert_eq!(names, vec!["asmith"]);
    }

    #[test]
    fn env_sources_never_read_the_process_environment() {
        std::env::set_var("VOUCH_TEST_HOST_USER", "operator");
        let request = RequestContext::new();
        let scoped = NameSourceResolver::new(vec![NameSource::env("VOUCH_TEST_HOST_USER")]);
        let host = NameSourceResolver::new(vec![NameSource::process_env("VOUCH_TEST_HOST_USER")]);

        let scoped: Vec<String> = scoped.candidates(&request).collect();
        let host: Vec<String> = host.candidates(&request).collect();
        std::env::remove_var("VOUCH_TEST_HOST_USER");

        assert!(scoped.is_empty());
        assert_eq!(host, vec!["operator"]);
    }

    #[test]
    fn empty_candidates_are_skipped() {
        let resolver = NameSourceResolver::new(vec![
            NameSource::Literal(String::new()),
            NameSource::Literal("   ".to_string()),
            NameSource::deferred(|_| None),
            NameSource::Literal("jdoe".to_string()),
        ]);
        let request = RequestContext::new();

        let names: Vec<String> = resolver.candidates(&request).collect();
        assert_eq!(names, vec!["jdoe"]);
    }

    #[test]
    fn deferred_producers_run_only_when_reached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let resolver = NameSourceResolver::new(vec![
            NameSource::Literal("first".to_string()),
            NameSource::deferred(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Some("second".to_string())
            }),
        ]);
        let request = RequestContext::new();

        let mut candidates = resolver.candidates(&request);
        assert_eq!(candidates.next().as_deref(), Some("first"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(candidates.next().as_deref(), Some("second"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_resolver_yields_nothing() {
        let resolver = NameSourceResolver::new(vec![]);
        let request = RequestContext::new().with_var("REMOTE_USER", "jdoe");
        assert_eq!(resolver.candidates(&request).count(), 0);
    }
}
