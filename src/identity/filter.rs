//! Name filter chain
//!
//! Filters run in registration order, each receiving the output of the
//! previous one. Any filter may veto the candidate, which disqualifies it for
//! this request only; the engine then tries the next candidate.

use super::error::IdentityError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::Regex;

/// Result of applying one filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Continue with this (possibly rewritten) name
    Accept(String),
    /// Reject the candidate
    Veto { reason: String },
}

/// A single normalization or validation rule.
pub trait NameFilter: Send + Sync {
    /// Identifier used in logs and veto reasons.
    fn name(&self) -> &str;

    fn apply(&self, name: &str) -> FilterOutcome;
}

/// Regular-expression find/replace.
///
/// A pattern that fails to compile is kept and vetoes every candidate it
/// sees, so a broken rule never lets an unfiltered name through.
pub struct ReplaceFilter {
    label: String,
    pattern: Result<Regex, String>,
    replacement: String,
}

impl ReplaceFilter {
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Self {
        Self {
            label: format!("replace:{}", pattern),
            pattern: Regex::new(pattern).map_err(|e| e.to_string()),
            replacement: replacement.into(),
        }
    }

    /// Replace occurrences of `text` taken literally.
    pub fn literal(text: &str, replacement: impl Into<String>) -> Self {
        Self::new(&regex::escape(text), replacement)
    }

    /// Strip a Kerberos-style `@REALM` suffix.
    pub fn strip_realm_suffix(realm: &str) -> Self {
        Self::new(&format!("@{}$", regex::escape(realm)), "")
    }

    /// Strip an NTLM-style `DOMAIN\` prefix.
    pub fn strip_domain_prefix(domain: &str) -> Self {
        Self::new(&format!(r"^{}\\", regex::escape(domain)), "")
    }

    /// Compile error of the pattern, if any.
    pub fn pattern_error(&self) -> Option<&str> {
        self.pattern.as_ref().err().map(String::as_str)
    }
}

impl NameFilter for ReplaceFilter {
    fn name(&self) -> &str {
        &self.label
    }

    fn apply(&self, name: &str) -> FilterOutcome {
        match &self.pattern {
            Ok(regex) => {
                FilterOutcome::Accept(regex.replace_all(name, self.replacement.as_str()).into_owned())
            }
            Err(e) => FilterOutcome::Veto {
                reason: format!("malformed pattern: {}", e),
            },
        }
    }
}

/// Whether a glob list admits or rejects matching names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobMode {
    Allow,
    Deny,
}

/// Case-insensitive glob allow or deny list.
pub struct GlobFilter {
    label: String,
    mode: GlobMode,
    set: GlobSet,
}

impl GlobFilter {
    pub fn new(mode: GlobMode, patterns: &[String]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(GlobBuilder::new(pattern).case_insensitive(true).build()?);
        }
        let label = match mode {
            GlobMode::Allow => "allow_names",
            GlobMode::Deny => "deny_names",
        };
        Ok(Self {
            label: label.to_string(),
            mode,
            set: builder.build()?,
        })
    }

    pub fn deny(patterns: &[String]) -> Result<Self, globset::Error> {
        Self::new(GlobMode::Deny, patterns)
    }

    pub fn allow(patterns: &[String]) -> Result<Self, globset::Error> {
        Self::new(GlobMode::Allow, patterns)
    }
}

impl NameFilter for GlobFilter {
    fn name(&self) -> &str {
        &self.label
    }

    fn apply(&self, name: &str) -> FilterOutcome {
        let matched = self.set.is_match(name);
        match (self.mode, matched) {
            (GlobMode::Deny, true) => FilterOutcome::Veto {
                reason: format!("'{}' is on the deny list", name),
            },
            (GlobMode::Allow, false) => FilterOutcome::Veto {
                reason: format!("'{}' is not on the allow list", name),
            },
            _ => FilterOutcome::Accept(name.to_string()),
        }
    }
}

/// Filter backed by a closure supplied by the embedding application.
pub struct FnFilter {
    label: String,
    func: Box<dyn Fn(&str) -> FilterOutcome + Send + Sync>,
}

impl FnFilter {
    pub fn new<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str) -> FilterOutcome + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            func: Box::new(func),
        }
    }
}

impl NameFilter for FnFilter {
    fn name(&self) -> &str {
        &self.label
    }

    fn apply(&self, name: &str) -> FilterOutcome {
        (self.func)(name)
    }
}

/// Ordered sequence of filters owned by one provider.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn NameFilter>>,
}

impl FilterChain {
    pub fn new(filters: Vec<Box<dyn NameFilter>>) -> Self {
        Self { filters }
    }

    pub fn push(&mut self, filter: Box<dyn NameFilter>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Filter names in order, for diagnostics.
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Thread `raw_name` through every filter.
    ///
    /// Returns the filtered name, or `IdentityError::Vetoed` naming the filter
    /// that rejected it.
    pub fn apply(&self, raw_name: &str) -> Result<String, IdentityError> {
        let mut name = raw_name.to_string();
        for filter in &self.filters {
            match filter.apply(&name) {
                FilterOutcome::Accept(next) => {
                    if next != name {
                        tracing::trace!(
                            filter = filter.name(),
                            before = %name,
                            after = %next,
                            "Filter rewrote candidate"
                        );
                    }
                    name = next;
                }
                FilterOutcome::Veto { reason } => {
                    return Err(IdentityError::Vetoed {
                        raw_name: raw_name.to_string(),
                        filter: filter.name().to_string(),
                        reason,
                    });
                }
            }
        }
        Ok(name)
    }
}
