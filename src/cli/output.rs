//! Output formatting helpers for CLI commands

use crate::config::{AttributeConfig, NameSourceConfig, ProviderConfig};
use crate::identity::source::DEFAULT_NAME_VARS;
use crate::identity::{Metadata, Selection, SessionState, UiAffordance};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde::Serialize;
use std::collections::BTreeSet;

/// View model for one dry-run reconciliation
#[derive(Debug, Clone, Serialize)]
pub struct ResolveView {
    pub request_id: String,
    /// `selected` or `none`
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub user: String,
    pub exists: bool,
    pub session_id: String,
    pub priority: i32,
    pub force_use: bool,
    pub suppressed: BTreeSet<UiAffordance>,
    pub sync_deferred: bool,
    pub metadata: Metadata,
}

impl ResolveView {
    pub fn new(request_id: &str, decision: Option<(&SessionState, &Selection)>) -> Self {
        let session = decision.map(|(state, selection)| SessionView {
            user: state.identity.name().unwrap_or_default().to_string(),
            exists: !state.is_new_identity(),
            session_id: state.session_id.clone(),
            priority: state.priority,
            force_use: state.force_use,
            suppressed: selection.suppressed.clone(),
            sync_deferred: selection.sync_deferred,
            metadata: state.metadata.clone(),
        });
        Self {
            request_id: request_id.to_string(),
            outcome: if session.is_some() { "selected" } else { "none" }.to_string(),
            session,
        }
    }
}

/// Format a reconciliation result as a table
pub fn format_resolve_table(view: &ResolveView) -> String {
    let Some(session) = &view.session else {
        return format!(
            "{} no candidate name could be bound (request {})",
            "✗".red(),
            view.request_id
        );
    };

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);

    let exists = if session.exists {
        "existing".green().to_string()
    } else {
        "to be created".yellow().to_string()
    };
    let forced = if session.force_use {
        "yes".yellow().to_string()
    } else {
        "no".to_string()
    };

    table.add_row(vec![Cell::new("User"), Cell::new(&session.user)]);
    table.add_row(vec![Cell::new("Identity"), Cell::new(exists)]);
    table.add_row(vec![Cell::new("Session"), Cell::new(&session.session_id)]);
    table.add_row(vec![Cell::new("Priority"), Cell::new(session.priority)]);
    table.add_row(vec![Cell::new("Forced"), Cell::new(forced)]);
    for (key, value) in session.metadata.iter() {
        table.add_row(vec![Cell::new(format!("meta.{}", key)), Cell::new(value)]);
    }
    let suppressed: Vec<String> = session
        .suppressed
        .iter()
        .map(affordance_label)
        .collect();
    table.add_row(vec![Cell::new("Hidden"), Cell::new(suppressed.join(", "))]);

    table.to_string()
}

fn affordance_label(affordance: &UiAffordance) -> String {
    match affordance {
        UiAffordance::Preference(key) => format!("preference:{}", key),
        other => format!("{:?}", other),
    }
}

/// Format the effective provider section as a table
pub fn format_provider_table(config: &ProviderConfig, warnings: &[String]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Setting", "Value"]);

    let sources = match &config.name_sources {
        None => DEFAULT_NAME_VARS
            .iter()
            .map(|v| format!("env:{}", v))
            .collect::<Vec<_>>()
            .join(", "),
        Some(sources) if sources.is_empty() => "(disabled)".red().to_string(),
        Some(sources) => sources
            .iter()
            .map(|s| match s {
                NameSourceConfig::Literal(name) => format!("\"{}\"", name),
                NameSourceConfig::Env { env } => format!("env:{}", env),
                NameSourceConfig::ProcessEnv { process_env } => {
                    format!("process_env:{}", process_env)
                }
            })
            .collect::<Vec<_>>()
            .join(", "),
    };
    table.add_row(vec![Cell::new("name_sources"), Cell::new(sources)]);

    for (i, rule) in config.filter_rules.iter().enumerate() {
        let kind = if rule.literal { "literal" } else { "regex" };
        table.add_row(vec![
            Cell::new(format!("filter_rules[{}]", i)),
            Cell::new(format!(
                "{} {:?} → {:?}",
                kind, rule.pattern, rule.replacement
            )),
        ]);
    }
    if !config.deny_names.is_empty() {
        table.add_row(vec![
            Cell::new("deny_names"),
            Cell::new(config.deny_names.join(", ")),
        ]);
    }
    if let Some(allow) = &config.allow_names {
        table.add_row(vec![Cell::new("allow_names"), Cell::new(allow.join(", "))]);
    }

    table.add_row(vec![Cell::new("priority"), Cell::new(config.priority)]);
    for (name, value) in [
        ("auto_create_user", config.auto_create_user),
        ("allow_user_switch", config.allow_user_switch),
        ("remove_auth_pages_and_links", config.remove_auth_pages_and_links),
        ("force_profile_sync", config.force_profile_sync),
    ] {
        table.add_row(vec![Cell::new(name), Cell::new(value)]);
    }

    for (name, value) in &config.profile_attributes {
        let value = match value {
            AttributeConfig::Text(text) => format!("\"{}\"", text),
            AttributeConfig::Flag(flag) => flag.to_string(),
            AttributeConfig::Number(n) => n.to_string(),
            AttributeConfig::Template { template } => format!("template \"{}\"", template),
        };
        table.add_row(vec![Cell::new(format!("profile.{}", name)), Cell::new(value)]);
    }

    let mut out = table.to_string();
    for warning in warnings {
        out.push_str(&format!("\n{} {}", "⚠".yellow(), warning));
    }
    out
}

/// Serialize any view as pretty JSON
pub fn format_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterRuleConfig;
    use crate::identity::{CanonicalIdentity, SessionIdentity};

    fn sample_state() -> SessionState {
        let identity = CanonicalIdentity::new("DOMAIN\\jdoe", "jdoe", "Jdoe", None);
        let mut state = SessionState::new("sid-1", 50, SessionIdentity::Identified(identity));
        state.force_use = true;
        state.metadata.insert("canonical_name", "Jdoe");
        state
    }

    #[test]
    fn test_resolve_view_selected() {
        let state = sample_state();
        let selection = Selection::default();
        let view = ResolveView::new("req-1", Some((&state, &selection)));

        assert_eq!(view.outcome, "selected");
        let session = view.session.as_ref().unwrap();
        assert_eq!(session.user, "Jdoe");
        assert!(!session.exists);

        let json: serde_json::Value = serde_json::from_str(&format_json(&view).unwrap()).unwrap();
        assert_eq!(json["session"]["force_use"], true);
        assert_eq!(json["session"]["metadata"]["canonical_name"], "Jdoe");
    }

    #[test]
    fn test_resolve_view_none() {
        let view = ResolveView::new("req-2", None);
        assert_eq!(view.outcome, "none");
        assert!(format_resolve_table(&view).contains("no candidate"));

        let json: serde_json::Value = serde_json::from_str(&format_json(&view).unwrap()).unwrap();
        assert!(json.get("session").is_none());
    }

    #[test]
    fn test_resolve_table_lists_metadata() {
        let state = sample_state();
        let view = ResolveView::new("req-3", Some((&state, &Selection::default())));
        let table = format_resolve_table(&view);
        assert!(table.contains("Jdoe"));
        assert!(table.contains("meta.canonical_name"));
    }

    #[test]
    fn test_provider_table_shows_defaults_and_warnings() {
        let config = ProviderConfig {
            filter_rules: vec![FilterRuleConfig::regex("^DOMAIN\\\\", "")],
            ..Default::default()
        };
        let table = format_provider_table(&config, &["bad pattern".to_string()]);
        assert!(table.contains("env:REMOTE_USER"));
        assert!(table.contains("filter_rules[0]"));
        assert!(table.contains("bad pattern"));
    }
}
