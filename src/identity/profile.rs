//! Profile attribute synchronization
//!
//! Applies a declarative attribute set to a local identity. Every field is
//! dirty-checked against the stored profile and the store is written at most
//! once per application.

use super::error::IdentityError;
use super::metadata::Metadata;
use super::store::IdentityStore;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Attribute holding the display name.
pub const REAL_NAME: &str = "realname";
/// Attribute holding the email address.
pub const EMAIL: &str = "email";

/// Producer evaluated against the session metadata when the attribute is applied.
pub type AttributeProducer = Arc<dyn Fn(&Metadata) -> Option<String> + Send + Sync>;

/// Value of one profile attribute.
#[derive(Clone)]
pub enum AttributeValue {
    Literal(String),
    /// `{key}` placeholders replaced with metadata values
    Template(String),
    Deferred(AttributeProducer),
}

impl AttributeValue {
    pub fn deferred<F>(producer: F) -> Self
    where
        F: Fn(&Metadata) -> Option<String> + Send + Sync + 'static,
    {
        AttributeValue::Deferred(Arc::new(producer))
    }

    /// Evaluate against a read-only view of the session metadata.
    pub fn evaluate(&self, context: &Metadata) -> Option<String> {
        match self {
            AttributeValue::Literal(value) => Some(value.clone()),
            AttributeValue::Template(template) => context.render(template),
            AttributeValue::Deferred(producer) => producer(context),
        }
    }
}

impl fmt::Debug for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            AttributeValue::Template(t) => f.debug_tuple("Template").field(t).finish(),
            AttributeValue::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Literal(value.to_string())
    }
}

/// Applies profile attributes to identities in an [`IdentityStore`].
#[derive(Debug, Clone, Default)]
pub struct ProfileSynchronizer {
    attributes: BTreeMap<String, AttributeValue>,
}

impl ProfileSynchronizer {
    pub fn new(attributes: BTreeMap<String, AttributeValue>) -> Self {
        Self { attributes }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.attributes.insert(name.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Apply every attribute to `canonical_name`.
    ///
    /// Returns `true` if the profile changed and was saved.
    pub fn apply(
        &self,
        store: &dyn IdentityStore,
        canonical_name: &str,
        context: &Metadata,
    ) -> Result<bool, IdentityError> {
        if self.attributes.is_empty() {
            return Ok(false);
        }

        let mut profile = store.load_profile(canonical_name)?;
        let mut changed = Vec::new();

        for (name, value) in &self.attributes {
            let Some(value) = value.evaluate(context) else {
                tracing::debug!(
                    user = %canonical_name,
                    attribute = %name,
                    "Attribute produced no value, skipping"
                );
                continue;
            };

            match name.as_str() {
                REAL_NAME => {
                    if profile.real_name != value {
                        profile.real_name = value;
                        changed.push(name.as_str());
                    }
                }
                EMAIL => {
                    if !store.is_valid_email(&value) {
                        tracing::warn!(
                            user = %canonical_name,
                            email = %value,
                            "Rejected invalid email attribute"
                        );
                        continue;
                    }
                    if profile.email.as_deref() != Some(value.as_str()) {
                        profile.email = Some(value);
                        // The asserting layer vouches for the address
                        profile.email_confirmed = true;
                        changed.push(name.as_str());
                    }
                }
                _ => {
                    if profile.preferences.get(name) != Some(&value) {
                        profile.preferences.insert(name.clone(), value);
                        changed.push(name.as_str());
                    }
                }
            }
        }

        if changed.is_empty() {
            return Ok(false);
        }

        store.save_profile(canonical_name, &profile)?;
        metrics::counter!(crate::metrics::PROFILE_WRITES_TOTAL).increment(1);
        tracing::info!(
            user = %canonical_name,
            fields = ?changed,
            "Profile synchronized"
        );
        Ok(true)
    }
}
