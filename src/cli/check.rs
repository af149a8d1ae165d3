//! Check command implementation

use crate::cli::output::{format_json, format_provider_table};
use crate::cli::CheckArgs;
use crate::config::{ProviderConfig, VouchConfig};
use crate::directory::{Directory, MemorySessions};
use crate::identity::RemoteIdentityProvider;
use colored::Colorize;
use serde::Serialize;
use std::sync::Arc;

/// Result of validating a configuration file.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub config: String,
    pub users: usize,
    pub filters: Vec<String>,
    /// Provider settings after legacy keys were folded in
    pub provider: ProviderConfig,
    pub warnings: Vec<String>,
}

/// Handle `vouch check`
///
/// Unlike `resolve`, a missing config file is an error here.
pub fn handle_check(args: &CheckArgs) -> anyhow::Result<String> {
    let config = VouchConfig::load(Some(args.config.as_path()))?.with_env_overrides();
    config.validate()?;

    let directory = Arc::new(Directory::from_config(&config.directory)?);
    let sessions = Arc::new(MemorySessions::new(directory.clone()));
    let provider =
        RemoteIdentityProvider::from_config(&config.provider, directory.clone(), sessions)?;

    let effective = config.provider.effective();
    let report = CheckReport {
        config: args.config.display().to_string(),
        users: directory.user_count(),
        filters: provider
            .engine()
            .filters()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        warnings: warnings(&config.provider, &effective),
        provider: effective,
    };

    if args.json {
        return Ok(format_json(&report)?);
    }

    Ok(format!(
        "{} {} is valid ({} seeded users)\n{}",
        "✓".green(),
        report.config,
        report.users,
        format_provider_table(&report.provider, &report.warnings)
    ))
}

fn warnings(configured: &ProviderConfig, effective: &ProviderConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !configured.legacy.is_empty() {
        warnings.push("[provider.legacy] is deprecated, move these keys to [provider]".to_string());
    }
    if configured.legacy.domain.is_some() && !configured.filter_rules.is_empty() {
        warnings.push("legacy 'domain' is ignored because filter_rules is set".to_string());
    }
    if matches!(&effective.name_sources, Some(sources) if sources.is_empty()) {
        warnings.push("no name sources, no session will ever be bound".to_string());
    }
    for (i, rule) in effective.filter_rules.iter().enumerate() {
        if rule.literal {
            continue;
        }
        if let Err(e) = regex::Regex::new(&rule.pattern) {
            warnings.push(format!(
                "filter_rules[{}] does not compile and rejects every name: {}",
                i,
                e.to_string().lines().last().unwrap_or_default().trim()
            ));
        }
    }
    if !effective.auto_create_user && effective.force_profile_sync {
        warnings.push(
            "auto_create_user is off, profiles are only synced for existing identities"
                .to_string(),
        );
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn check(toml: &str, json: bool) -> anyhow::Result<String> {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), toml).unwrap();
        handle_check(&CheckArgs {
            config: temp.path().to_path_buf(),
            json,
        })
    }

    #[test]
    fn test_check_missing_file() {
        let result = handle_check(&CheckArgs {
            config: PathBuf::from("/nonexistent/vouch.toml"),
            json: false,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_check_valid_config() {
        let output = check("[provider]\npriority = 60\n", false).unwrap();
        assert!(output.contains("is valid"));
        assert!(output.contains("priority"));
    }

    #[test]
    fn test_check_rejects_bad_priority() {
        assert!(check("[provider]\npriority = 0\n", false).is_err());
    }

    #[test]
    fn test_check_reports_legacy_translation() {
        let output = check(
            r#"
[provider.legacy]
domain = "CORP"
mail_domain = "corp.example"
"#,
            true,
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(json["provider"]["filter_rules"].as_array().unwrap().len(), 2);
        assert_eq!(
            json["provider"]["profile_attributes"]["email"]["template"],
            "{canonical_name}@corp.example"
        );
        assert!(json["provider"].get("legacy").is_none());
        assert!(json["warnings"][0]
            .as_str()
            .unwrap()
            .contains("deprecated"));
    }

    #[test]
    fn test_check_warns_on_uncompilable_pattern() {
        let output = check(
            r#"
[[provider.filter_rules]]
pattern = "(unclosed"
"#,
            true,
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        let warnings = json["warnings"].as_array().unwrap();
        assert!(warnings
            .iter()
            .any(|w| w.as_str().unwrap().contains("filter_rules[0]")));
        assert_eq!(json["filters"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_check_counts_seeded_users() {
        let output = check(
            r#"
[directory]
users = ["Alice", "bob"]
"#,
            true,
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["users"], 2);
    }
}
