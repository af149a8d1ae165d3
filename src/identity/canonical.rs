//! Mapping filtered names onto local identities

use super::error::IdentityError;
use super::store::{IdentityStore, UserId};
use serde::Serialize;
use std::sync::Arc;

/// A candidate name as the local identity store understands it.
///
/// Built once per candidate per request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalIdentity {
    raw_name: String,
    filtered_name: String,
    canonical_name: String,
    local_id: Option<UserId>,
}

impl CanonicalIdentity {
    pub fn new(
        raw_name: impl Into<String>,
        filtered_name: impl Into<String>,
        canonical_name: impl Into<String>,
        local_id: Option<UserId>,
    ) -> Self {
        Self {
            raw_name: raw_name.into(),
            filtered_name: filtered_name.into(),
            canonical_name: canonical_name.into(),
            local_id,
        }
    }

    /// Name exactly as the source produced it.
    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    /// Name after the filter chain.
    pub fn filtered_name(&self) -> &str {
        &self.filtered_name
    }

    pub fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    pub fn local_id(&self) -> Option<UserId> {
        self.local_id
    }

    /// False when the identity would have to be created.
    pub fn exists(&self) -> bool {
        self.local_id.is_some()
    }
}

/// Resolves filtered names against an [`IdentityStore`].
pub struct Canonicalizer {
    store: Arc<dyn IdentityStore>,
}

impl Canonicalizer {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Build the canonical identity for one candidate.
    ///
    /// Unusable names yield the soft `InvalidCandidate`; store errors are
    /// returned as `StoreFailure`.
    pub fn canonicalize(
        &self,
        raw_name: &str,
        filtered_name: &str,
    ) -> Result<CanonicalIdentity, IdentityError> {
        let canonical_name = self.store.canonical_name(filtered_name)?.ok_or_else(|| {
            IdentityError::InvalidCandidate {
                raw_name: raw_name.to_string(),
                filtered_name: filtered_name.to_string(),
            }
        })?;

        let local_id = self.store.user_id(&canonical_name)?;

        tracing::trace!(
            raw_name = %raw_name,
            filtered_name = %filtered_name,
            canonical_name = %canonical_name,
            exists = local_id.is_some(),
            "Canonicalized candidate"
        );

        Ok(CanonicalIdentity::new(
            raw_name,
            filtered_name,
            canonical_name,
            local_id,
        ))
    }
}
