//! Session metadata and its merge rule across requests
//!
//! The diagnostic keys record what the last reconciliation decided. Stored
//! values for them are never trusted: filter rules, the asserted name or the
//! effective identity may all have changed since the session was written.

use super::canonical::CanonicalIdentity;
use super::session::SessionIdentity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name as produced by the source.
pub const RAW_NAME: &str = "raw_name";
/// Name after the filter chain.
pub const FILTERED_NAME: &str = "filtered_name";
/// Name as canonicalized by the identity store.
pub const CANONICAL_NAME: &str = "canonical_name";
/// Local ID of the resolved identity (absent if not yet created).
pub const CANONICAL_ID: &str = "canonical_id";
/// Identity actually in effect for the session.
pub const EFFECTIVE_NAME: &str = "effective_name";
/// Local ID of the identity in effect.
pub const EFFECTIVE_ID: &str = "effective_id";

/// Keys always owned by the latest decision.
pub const DIAGNOSTIC_KEYS: [&str; 6] = [
    RAW_NAME,
    FILTERED_NAME,
    CANONICAL_NAME,
    CANONICAL_ID,
    EFFECTIVE_NAME,
    EFFECTIVE_ID,
];

/// Flat key/value record persisted with a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, String>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostic record for a decision on `identity`, with `effective`
    /// being the identity the session ends up using.
    pub fn for_decision(identity: &CanonicalIdentity, effective: &SessionIdentity) -> Self {
        let mut metadata = Self::new();
        metadata.insert(RAW_NAME, identity.raw_name());
        metadata.insert(FILTERED_NAME, identity.filtered_name());
        metadata.insert(CANONICAL_NAME, identity.canonical_name());
        if let Some(id) = identity.local_id() {
            metadata.insert(CANONICAL_ID, id.to_string());
        }
        if let Some(name) = effective.name() {
            metadata.insert(EFFECTIVE_NAME, name);
        }
        if let Some(id) = effective.local_id() {
            metadata.insert(EFFECTIVE_ID, id.to_string());
        }
        metadata
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Substitute `{key}` placeholders with metadata values.
    ///
    /// Returns `None` if a placeholder names a key that is not set.
    pub fn render(&self, template: &str) -> Option<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let end = after.find('}')?;
            out.push_str(self.get(&after[..end])?);
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Some(out)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Placeholder names used by a template, or an error for unbalanced braces.
pub fn template_placeholders(template: &str) -> Result<Vec<&str>, String> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find(['{', '}']) {
        if rest[start..].starts_with('}') {
            return Err(format!("unmatched '}}' in template '{}'", template));
        }
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| format!("unclosed '{{' in template '{}'", template))?;
        let name = &after[..end];
        if name.is_empty() || name.contains('{') {
            return Err(format!("empty or nested placeholder in template '{}'", template));
        }
        names.push(name);
        rest = &after[end + 1..];
    }
    Ok(names)
}

/// Merge freshly provided metadata into what the session store kept.
///
/// Diagnostic keys are taken from `provided` only (and dropped when
/// `provided` lacks them). Other keys keep their stored value unless
/// `provided` sets them too.
pub fn merge(stored: &Metadata, provided: &Metadata) -> Metadata {
    let mut merged = stored.clone();
    for key in DIAGNOSTIC_KEYS {
        merged.remove(key);
    }
    for (key, value) in provided.iter() {
        merged.insert(key, value);
    }
    merged
}
