//! Error types for identity reconciliation

use thiserror::Error;

/// Errors raised by an identity store or fallback session store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("identity not found: {0}")]
    NotFound(String),

    #[error("identity already exists: {0}")]
    AlreadyExists(String),

    #[error("not a valid identity name: {0:?}")]
    InvalidName(String),

    #[error("identity store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur while reconciling a remote identity.
///
/// `InvalidCandidate`, `Vetoed` and `CreationForbidden` are soft: the engine
/// logs them and moves on to the next candidate name. `StoreFailure` aborts
/// reconciliation for the request.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The filtered name is not usable as a local identity
    #[error("'{filtered_name}' (from '{raw_name}') is not a valid identity name")]
    InvalidCandidate {
        raw_name: String,
        filtered_name: String,
    },

    /// A filter rule rejected the candidate
    #[error("candidate '{raw_name}' vetoed by filter '{filter}': {reason}")]
    Vetoed {
        raw_name: String,
        filter: String,
        reason: String,
    },

    /// The identity does not exist and provisioning is disabled
    #[error("identity '{canonical_name}' does not exist and auto-creation is disabled")]
    CreationForbidden { canonical_name: String },

    /// The local identity store itself failed
    #[error("identity store failure: {0}")]
    StoreFailure(#[from] StoreError),
}

impl IdentityError {
    /// Soft errors only disqualify the current candidate.
    pub fn is_soft(&self) -> bool {
        !matches!(self, IdentityError::StoreFailure(_))
    }

    /// Short label used for metrics and log fields.
    pub fn reason(&self) -> &'static str {
        match self {
            IdentityError::InvalidCandidate { .. } => "invalid_candidate",
            IdentityError::Vetoed { .. } => "vetoed",
            IdentityError::CreationForbidden { .. } => "creation_forbidden",
            IdentityError::StoreFailure(_) => "store_failure",
        }
    }
}
