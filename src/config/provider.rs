//! Remote identity provider configuration
//!
//! Mirrors the runtime surface of [`crate::identity::RemoteIdentityProvider`].
//! Legacy keys under `[provider.legacy]` are translated into their modern
//! equivalents by [`ProviderConfig::effective`]; a modern key that is set
//! always wins over its legacy alias.

use crate::config::error::ConfigError;
use crate::identity::engine::DEFAULT_PRIORITY;
use crate::identity::metadata::{template_placeholders, DIAGNOSTIC_KEYS};
use crate::identity::profile::{AttributeValue, EMAIL, REAL_NAME};
use crate::identity::source::NameSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Preference keys driven by the legacy `notify` flag.
pub const NOTIFY_PREFERENCES: [&str; 4] = [
    "enotifminoredits",
    "enotifrevealaddr",
    "enotifusertalkpages",
    "enotifwatchlistpages",
];

/// A name source as written in the config file.
///
/// A bare string is a literal name; `{ env = "VAR" }` reads a request
/// variable and `{ process_env = "VAR" }` reads the host process environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NameSourceConfig {
    Literal(String),
    Env { env: String },
    ProcessEnv { process_env: String },
}

impl From<&NameSourceConfig> for NameSource {
    fn from(config: &NameSourceConfig) -> Self {
        match config {
            NameSourceConfig::Literal(name) => NameSource::Literal(name.clone()),
            NameSourceConfig::Env { env } => NameSource::env(env.clone()),
            NameSourceConfig::ProcessEnv { process_env } => {
                NameSource::process_env(process_env.clone())
            }
        }
    }
}

/// One find/replace rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRuleConfig {
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
    /// Treat `pattern` as plain text rather than a regular expression
    #[serde(default)]
    pub literal: bool,
}

impl FilterRuleConfig {
    pub fn regex(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
            literal: false,
        }
    }
}

/// A profile attribute value as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeConfig {
    Text(String),
    Flag(bool),
    Number(i64),
    /// Deferred value rendered from session metadata
    Template { template: String },
}

impl From<&AttributeConfig> for AttributeValue {
    fn from(config: &AttributeConfig) -> Self {
        match config {
            AttributeConfig::Text(text) => AttributeValue::Literal(text.clone()),
            AttributeConfig::Flag(flag) => {
                AttributeValue::Literal(if *flag { "1" } else { "0" }.to_string())
            }
            AttributeConfig::Number(n) => AttributeValue::Literal(n.to_string()),
            AttributeConfig::Template { template } => AttributeValue::Template(template.clone()),
        }
    }
}

/// Pre-rename configuration keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyConfig {
    /// `false` disables the provider entirely
    pub authz: Option<bool>,
    /// Realm/domain stripped from `user@DOMAIN` and `DOMAIN\user`
    pub domain: Option<String>,
    /// Email is `<canonical name>@<mail_domain>`
    pub mail_domain: Option<String>,
    pub real_name: Option<String>,
    pub mail: Option<String>,
    /// Value of the email notification preferences
    pub notify: Option<bool>,
}

impl LegacyConfig {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// `[provider]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Candidate name sources in priority order; unset means the
    /// `REMOTE_USER` / `REDIRECT_REMOTE_USER` pair
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_sources: Option<Vec<NameSourceConfig>>,
    pub filter_rules: Vec<FilterRuleConfig>,
    /// Glob patterns of names that are never bound
    pub deny_names: Vec<String>,
    /// If set, only names matching one of these globs are bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_names: Option<Vec<String>>,
    pub priority: i32,
    pub auto_create_user: bool,
    pub allow_user_switch: bool,
    pub remove_auth_pages_and_links: bool,
    pub profile_attributes: BTreeMap<String, AttributeConfig>,
    pub force_profile_sync: bool,
    #[serde(skip_serializing_if = "LegacyConfig::is_empty")]
    pub legacy: LegacyConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name_sources: None,
            filter_rules: Vec::new(),
            deny_names: Vec::new(),
            allow_names: None,
            priority: DEFAULT_PRIORITY,
            auto_create_user: true,
            allow_user_switch: false,
            remove_auth_pages_and_links: true,
            profile_attributes: BTreeMap::new(),
            force_profile_sync: true,
            legacy: LegacyConfig::default(),
        }
    }
}

impl ProviderConfig {
    /// Fold legacy keys into the modern ones.
    ///
    /// The returned config has an empty `legacy` section.
    pub fn effective(&self) -> ProviderConfig {
        let mut config = self.clone();
        let legacy = std::mem::take(&mut config.legacy);

        if legacy.authz == Some(false) && config.name_sources.is_none() {
            config.name_sources = Some(Vec::new());
        }

        if let Some(domain) = &legacy.domain {
            if config.filter_rules.is_empty() {
                config.filter_rules = vec![
                    FilterRuleConfig::regex(format!("@{}$", regex::escape(domain)), ""),
                    FilterRuleConfig::regex(format!(r"^{}\\", regex::escape(domain)), ""),
                ];
            } else {
                tracing::warn!(
                    domain = %domain,
                    "Ignoring legacy 'domain', filter_rules is set"
                );
            }
        }

        let attributes = &mut config.profile_attributes;
        if let Some(real_name) = legacy.real_name {
            attributes
                .entry(REAL_NAME.to_string())
                .or_insert(AttributeConfig::Text(real_name));
        }
        if let Some(mail) = legacy.mail {
            attributes
                .entry(EMAIL.to_string())
                .or_insert(AttributeConfig::Text(mail));
        }
        if let Some(mail_domain) = legacy.mail_domain {
            attributes
                .entry(EMAIL.to_string())
                .or_insert(AttributeConfig::Template {
                    template: format!("{{canonical_name}}@{}", mail_domain),
                });
        }
        if let Some(notify) = legacy.notify {
            for key in NOTIFY_PREFERENCES {
                attributes
                    .entry(key.to_string())
                    .or_insert(AttributeConfig::Flag(notify));
            }
        }

        config
    }

    /// Validate the effective configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.priority) {
            return Err(ConfigError::Validation {
                field: "provider.priority".to_string(),
                message: format!("must be between 1 and 100, got {}", self.priority),
            });
        }

        for (i, source) in self.name_sources.iter().flatten().enumerate() {
            let (key, var) = match source {
                NameSourceConfig::Literal(_) => continue,
                NameSourceConfig::Env { env } => ("env", env),
                NameSourceConfig::ProcessEnv { process_env } => ("process_env", process_env),
            };
            if var.trim().is_empty() {
                return Err(ConfigError::Validation {
                    field: format!("provider.name_sources[{}].{}", i, key),
                    message: "variable name cannot be empty".to_string(),
                });
            }
        }

        for (i, rule) in self.filter_rules.iter().enumerate() {
            if rule.pattern.is_empty() {
                return Err(ConfigError::Validation {
                    field: format!("provider.filter_rules[{}].pattern", i),
                    message: "pattern cannot be empty".to_string(),
                });
            }
        }

        validate_globs("provider.deny_names", &self.deny_names)?;
        if let Some(allow) = &self.allow_names {
            validate_globs("provider.allow_names", allow)?;
        }

        for (name, value) in &self.profile_attributes {
            let field = format!("provider.profile_attributes.{}", name);
            if name.trim().is_empty() {
                return Err(ConfigError::Validation {
                    field,
                    message: "attribute name cannot be empty".to_string(),
                });
            }
            match value {
                AttributeConfig::Flag(_) | AttributeConfig::Number(_)
                    if name == REAL_NAME || name == EMAIL =>
                {
                    return Err(ConfigError::Validation {
                        field,
                        message: "must be a string or a template".to_string(),
                    });
                }
                AttributeConfig::Template { template } => {
                    let placeholders = template_placeholders(template).map_err(|message| {
                        ConfigError::Validation {
                            field: field.clone(),
                            message,
                        }
                    })?;
                    if let Some(unknown) = placeholders
                        .iter()
                        .find(|p| !DIAGNOSTIC_KEYS.contains(p))
                    {
                        return Err(ConfigError::Validation {
                            field,
                            message: format!(
                                "unknown placeholder '{{{}}}', expected one of {:?}",
                                unknown, DIAGNOSTIC_KEYS
                            ),
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn validate_globs(field: &str, patterns: &[String]) -> Result<(), ConfigError> {
    for (i, pattern) in patterns.iter().enumerate() {
        globset::Glob::new(pattern).map_err(|e| ConfigError::Validation {
            field: format!("{}[{}]", field, i),
            message: e.to_string(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> ProviderConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn defaults() {
        let config = ProviderConfig::default();
        assert!(config.name_sources.is_none());
        assert!(config.filter_rules.is_empty());
        assert_eq!(config.priority, 50);
        assert!(config.auto_create_user);
        assert!(!config.allow_user_switch);
        assert!(config.remove_auth_pages_and_links);
        assert!(config.force_profile_sync);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_mixed_name_sources() {
        let config = parse(
            r#"
            name_sources = ["guest", { env = "HTTP_X_USER" }, { process_env = "USER" }]
            "#,
        );
        assert_eq!(
            config.name_sources.unwrap(),
            vec![
                NameSourceConfig::Literal("guest".to_string()),
                NameSourceConfig::Env {
                    env: "HTTP_X_USER".to_string()
                },
                NameSourceConfig::ProcessEnv {
                    process_env: "USER".to_string()
                },
            ]
        );
    }

    #[test]
    fn parses_attribute_kinds() {
        let config = parse(
            r#"
            [profile_attributes]
            realname = "John Doe"
            disablemail = true
            rows = 25
            email = { template = "{canonical_name}@example.com" }
            "#,
        );
        let attrs = &config.profile_attributes;
        assert_eq!(attrs["realname"], AttributeConfig::Text("John Doe".to_string()));
        assert_eq!(attrs["disablemail"], AttributeConfig::Flag(true));
        assert_eq!(attrs["rows"], AttributeConfig::Number(25));
        assert!(matches!(attrs["email"], AttributeConfig::Template { .. }));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_list_filter_rules() {
        let result: Result<ProviderConfig, _> = toml::from_str(r#"filter_rules = "DOMAIN""#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_out_of_range_priority() {
        let config = ProviderConfig {
            priority: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "provider.priority"
        ));
    }

    #[test]
    fn rejects_unknown_template_placeholder() {
        let config = parse(
            r#"
            [profile_attributes]
            email = { template = "{username}@example.com" }
            "#,
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { ref message, .. }) if message.contains("username")
        ));
    }

    #[test]
    fn rejects_boolean_email() {
        let config = parse(
            r#"
            [profile_attributes]
            email = true
            "#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_glob() {
        let config = ProviderConfig {
            deny_names: vec!["[unclosed".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "provider.deny_names[0]"
        ));
    }

    #[test]
    fn legacy_domain_becomes_two_filter_rules() {
        let config = parse(
            r#"
            [legacy]
            domain = "CORP.EXAMPLE"
            "#,
        )
        .effective();

        assert_eq!(
            config.filter_rules,
            vec![
                FilterRuleConfig::regex(r"@CORP\.EXAMPLE$", ""),
                FilterRuleConfig::regex(r"^CORP\.EXAMPLE\\", ""),
            ]
        );
        assert!(config.legacy.is_empty());
    }

    #[test]
    fn modern_filter_rules_win_over_legacy_domain() {
        let config = parse(
            r#"
            filter_rules = [{ pattern = "^x", replacement = "" }]
            [legacy]
            domain = "CORP"
            "#,
        )
        .effective();
        assert_eq!(config.filter_rules.len(), 1);
        assert_eq!(config.filter_rules[0].pattern, "^x");
    }

    #[test]
    fn legacy_authz_false_disables_sources() {
        let config = parse("[legacy]\nauthz = false").effective();
        assert_eq!(config.name_sources, Some(vec![]));
    }

    #[test]
    fn legacy_profile_keys_translate_with_modern_precedence() {
        let config = parse(
            r#"
            [profile_attributes]
            realname = "Modern Name"
            [legacy]
            real_name = "Legacy Name"
            mail_domain = "example.com"
            notify = true
            "#,
        )
        .effective();

        let attrs = &config.profile_attributes;
        assert_eq!(attrs["realname"], AttributeConfig::Text("Modern Name".to_string()));
        assert_eq!(
            attrs["email"],
            AttributeConfig::Template {
                template: "{canonical_name}@example.com".to_string()
            }
        );
        for key in NOTIFY_PREFERENCES {
            assert_eq!(attrs[key], AttributeConfig::Flag(true));
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn legacy_mail_beats_legacy_mail_domain() {
        let config = parse(
            r#"
            [legacy]
            mail = "fixed@example.com"
            mail_domain = "example.com"
            "#,
        )
        .effective();
        assert_eq!(
            config.profile_attributes["email"],
            AttributeConfig::Text("fixed@example.com".to_string())
        );
    }
}
