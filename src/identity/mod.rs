//! Remote identity reconciliation
//!
//! Binds an identity asserted by an upstream authentication layer (a web
//! server module, an SSO proxy) to a local session:
//!
//! ```text
//! NameSourceResolver → FilterChain → Canonicalizer → ReconciliationEngine
//!                                                            │
//!                         FallbackSessions ──────────────────┤
//!                                                            ▼
//!                                                      SessionState
//!                                                            │
//!                  RemoteIdentityProvider::on_selected ◄─────┘
//!                  (ProfileSynchronizer, PostReconciliationPolicy)
//! ```
//!
//! The engine and its collaborators are synchronous: one decision per
//! request, no background work.

pub mod canonical;
pub mod engine;
pub mod error;
pub mod filter;
pub mod metadata;
pub mod policy;
pub mod profile;
pub mod provider;
pub mod request;
pub mod session;
pub mod source;
pub mod store;

pub use canonical::{CanonicalIdentity, Canonicalizer};
pub use engine::{EnginePolicy, ReconciliationEngine, DEFAULT_PRIORITY};
pub use error::{IdentityError, StoreError};
pub use filter::{FilterChain, FilterOutcome, FnFilter, GlobFilter, NameFilter, ReplaceFilter};
pub use metadata::{merge, Metadata};
pub use policy::{PolicyInputs, PostReconciliationPolicy, UiAffordance};
pub use profile::{AttributeValue, ProfileSynchronizer};
pub use provider::{ProviderBuilder, RemoteIdentityProvider, Selection};
pub use request::RequestContext;
pub use session::{SessionIdentity, SessionState};
pub use source::{NameSource, NameSourceResolver};
pub use store::{Capabilities, FallbackSessions, IdentityStore, UserId, UserProfile};
