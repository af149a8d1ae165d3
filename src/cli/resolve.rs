//! Resolve command implementation
//!
//! Runs one reconciliation against a throwaway directory seeded from the
//! config file and `--existing`, as the demo server would for a request that
//! carries no session cookie.

use crate::cli::output::{format_json, format_resolve_table, ResolveView};
use crate::cli::{load_config_or_default, ResolveArgs};
use crate::directory::{Directory, MemorySessions};
use crate::identity::{RemoteIdentityProvider, RequestContext, StoreError};
use anyhow::Context;
use std::sync::Arc;

/// Handle `vouch resolve`
pub fn handle_resolve(args: &ResolveArgs) -> anyhow::Result<String> {
    let config = load_config_or_default(&args.config)?;
    config.validate()?;

    let directory = Arc::new(Directory::from_config(&config.directory)?);
    for name in &args.existing {
        match directory.create_user(name) {
            Ok(_) | Err(StoreError::AlreadyExists(_)) => {}
            Err(e) => return Err(e).with_context(|| format!("--existing {}", name)),
        }
    }
    let sessions = Arc::new(MemorySessions::new(directory.clone()));
    let provider =
        RemoteIdentityProvider::from_config(&config.provider, directory.clone(), sessions)?;

    let request = args
        .vars
        .iter()
        .fold(RequestContext::new(), |request, (name, value)| {
            request.with_var(name, value)
        });

    let decision = provider.resolve(&request)?;
    let selection = match &decision {
        Some(state) => Some(provider.on_selected(state, &request, &state.metadata)?),
        None => None,
    };

    let view = ResolveView::new(request.request_id(), decision.as_ref().zip(selection.as_ref()));
    if args.json {
        Ok(format_json(&view)?)
    } else {
        Ok(format_resolve_table(&view))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn args(vars: &[(&str, &str)], existing: &[&str]) -> ResolveArgs {
        ResolveArgs {
            config: PathBuf::from("/nonexistent/vouch.toml"),
            vars: vars
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            existing: existing.iter().map(|s| s.to_string()).collect(),
            json: true,
        }
    }

    fn run(args: &ResolveArgs) -> serde_json::Value {
        serde_json::from_str(&handle_resolve(args).unwrap()).unwrap()
    }

    #[test]
    fn test_resolve_new_identity() {
        let json = run(&args(&[("REMOTE_USER", "jdoe")], &[]));
        assert_eq!(json["outcome"], "selected");
        assert_eq!(json["session"]["user"], "Jdoe");
        assert_eq!(json["session"]["exists"], false);
        assert_eq!(json["session"]["force_use"], true);
    }

    #[test]
    fn test_resolve_existing_identity() {
        let json = run(&args(&[("REMOTE_USER", "jdoe")], &["Jdoe"]));
        assert_eq!(json["session"]["exists"], true);
        assert_eq!(json["session"]["metadata"]["canonical_name"], "Jdoe");
    }

    #[test]
    fn test_resolve_without_variables() {
        let json = run(&args(&[], &[]));
        assert_eq!(json["outcome"], "none");
    }

    #[test]
    fn test_resolve_falls_back_to_redirect_variable() {
        let json = run(&args(&[("REDIRECT_REMOTE_USER", "asmith")], &[]));
        assert_eq!(json["session"]["user"], "Asmith");
    }

    #[test]
    fn test_resolve_applies_filter_rules() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(
            temp.path(),
            r#"
[[provider.filter_rules]]
pattern = "@CORP\\.EXAMPLE$"
replacement = ""
"#,
        )
        .unwrap();

        let mut resolve_args = args(&[("REMOTE_USER", "jdoe@CORP.EXAMPLE")], &[]);
        resolve_args.config = temp.path().to_path_buf();
        let json = run(&resolve_args);
        assert_eq!(json["session"]["user"], "Jdoe");
        assert_eq!(json["session"]["metadata"]["raw_name"], "jdoe@CORP.EXAMPLE");
    }

    #[test]
    fn test_resolve_rejects_invalid_existing_name() {
        let result = handle_resolve(&args(&[("REMOTE_USER", "jdoe")], &["a#b"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_table_output() {
        let mut resolve_args = args(&[("REMOTE_USER", "jdoe")], &[]);
        resolve_args.json = false;
        let output = handle_resolve(&resolve_args).unwrap();
        assert!(output.contains("Jdoe"));
    }
}
