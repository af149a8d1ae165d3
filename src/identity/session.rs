//! Session state exchanged with the fallback session mechanism

use super::canonical::CanonicalIdentity;
use super::metadata::Metadata;
use super::store::UserId;
use serde::Serialize;

/// Who a session currently belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionIdentity {
    /// No user attached
    Anonymous,
    /// A user name the fallback mechanism could not load
    Unresolved { name: String },
    /// A resolved identity (which may still need to be created)
    Identified(CanonicalIdentity),
}

impl SessionIdentity {
    pub fn name(&self) -> Option<&str> {
        match self {
            SessionIdentity::Anonymous => None,
            SessionIdentity::Unresolved { name } => Some(name),
            SessionIdentity::Identified(identity) => Some(identity.canonical_name()),
        }
    }

    pub fn local_id(&self) -> Option<UserId> {
        match self {
            SessionIdentity::Identified(identity) => identity.local_id(),
            _ => None,
        }
    }

    /// True only for an identity that exists in the local store.
    pub fn is_established(&self) -> bool {
        matches!(self, SessionIdentity::Identified(identity) if identity.exists())
    }
}

/// One session decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    /// Ranking among the host's session providers
    pub priority: i32,
    pub identity: SessionIdentity,
    pub session_id: String,
    /// Override the identity regardless of what the fallback mechanism chose
    pub force_use: bool,
    pub metadata: Metadata,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>, priority: i32, identity: SessionIdentity) -> Self {
        Self {
            priority,
            identity,
            session_id: session_id.into(),
            force_use: false,
            metadata: Metadata::new(),
        }
    }

    /// Copy of this session pinned to `identity`.
    pub fn force_override(&self, identity: CanonicalIdentity) -> Self {
        Self {
            identity: SessionIdentity::Identified(identity),
            force_use: true,
            ..self.clone()
        }
    }

    /// The resolved identity if the session has one.
    pub fn canonical_identity(&self) -> Option<&CanonicalIdentity> {
        match &self.identity {
            SessionIdentity::Identified(identity) => Some(identity),
            _ => None,
        }
    }

    /// True when the session identity still has to be created locally.
    pub fn is_new_identity(&self) -> bool {
        matches!(&self.identity, SessionIdentity::Identified(identity) if !identity.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_override_keeps_session_and_pins_identity() {
        let mut original = SessionState::new("sid-1", 40, SessionIdentity::Anonymous);
        original.metadata.insert("theme", "dark");

        let identity = CanonicalIdentity::new("jdoe", "jdoe", "Jdoe", Some(1));
        let forced = original.force_override(identity.clone());

        assert_eq!(forced.session_id, "sid-1");
        assert_eq!(forced.priority, 40);
        assert!(forced.force_use);
        assert_eq!(forced.canonical_identity(), Some(&identity));
        assert_eq!(forced.metadata.get("theme"), Some("dark"));
    }

    #[test]
    fn established_requires_existing_identity() {
        let existing = CanonicalIdentity::new("a", "a", "A", Some(1));
        let missing = CanonicalIdentity::new("b", "b", "B", None);

        assert!(SessionIdentity::Identified(existing).is_established());
        assert!(!SessionIdentity::Identified(missing.clone()).is_established());
        assert!(!SessionIdentity::Anonymous.is_established());
        assert!(!SessionIdentity::Unresolved {
            name: "C".to_string()
        }
        .is_established());

        let state = SessionState::new("sid", 50, SessionIdentity::Identified(missing));
        assert!(state.is_new_identity());
    }

    #[test]
    fn identity_names() {
        assert_eq!(SessionIdentity::Anonymous.name(), None);
        assert_eq!(
            SessionIdentity::Unresolved {
                name: "Ghost".to_string()
            }
            .name(),
            Some("Ghost")
        );
    }
}
