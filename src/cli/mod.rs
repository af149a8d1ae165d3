//! CLI module for Vouch
//!
//! Command-line interface definitions and handlers.
//!
//! # Commands
//!
//! - `serve` - Start the demo HTTP server
//! - `resolve` - Dry-run one reconciliation from server variables
//! - `check` - Validate a configuration file and show the effective provider settings
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Which identity would a Kerberos-authenticated request get?
//! vouch resolve --var REMOTE_USER=jdoe@CORP.EXAMPLE
//!
//! # Validate a config file
//! vouch check -c /etc/vouch/vouch.toml
//! ```

pub mod check;
pub mod completions;
pub mod config;
pub mod output;
pub mod resolve;
pub mod serve;

pub use check::handle_check;
pub use completions::handle_completions;
pub use config::handle_config_init;
pub use resolve::handle_resolve;

use crate::config::{ConfigError, VouchConfig};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Vouch - Remote identity session reconciliation
#[derive(Parser, Debug)]
#[command(
    name = "vouch",
    version,
    about = "Binds upstream-asserted user names to application sessions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the demo HTTP server
    Serve(ServeArgs),
    /// Run one reconciliation against the built-in directory
    Resolve(ResolveArgs),
    /// Validate a configuration file
    Check(CheckArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "vouch.toml")]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long, env = "VOUCH_PORT")]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long, env = "VOUCH_HOST")]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "VOUCH_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "vouch.toml")]
    pub config: PathBuf,

    /// Server variable set by the authenticating layer (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Identity that already exists in the directory (repeatable)
    #[arg(long = "existing", value_name = "NAME")]
    pub existing: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "vouch.toml")]
    pub config: PathBuf,

    /// Print the effective provider section as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "vouch.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}

/// Load the config file if present (defaults otherwise) and apply `VOUCH_*`
/// overrides.
pub fn load_config_or_default(path: &Path) -> Result<VouchConfig, ConfigError> {
    let config = if path.exists() {
        VouchConfig::load(Some(path))?
    } else {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        VouchConfig::default()
    };
    Ok(config.with_env_overrides())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["vouch", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.config, PathBuf::from("vouch.toml"));
                assert!(args.port.is_none());
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_serve_with_port() {
        let cli = Cli::try_parse_from(["vouch", "serve", "-p", "9000"]).unwrap();
        match cli.command {
            Commands::Serve(args) => assert_eq!(args.port, Some(9000)),
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_resolve_vars() {
        let cli = Cli::try_parse_from([
            "vouch",
            "resolve",
            "--var",
            "REMOTE_USER=jdoe",
            "--var",
            "HTTP_X_USER=a=b",
            "--existing",
            "Asmith",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Resolve(args) => {
                assert_eq!(
                    args.vars,
                    vec![
                        ("REMOTE_USER".to_string(), "jdoe".to_string()),
                        ("HTTP_X_USER".to_string(), "a=b".to_string()),
                    ]
                );
                assert_eq!(args.existing, vec!["Asmith"]);
                assert!(args.json);
            }
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_cli_parse_resolve_rejects_bad_var() {
        let result = Cli::try_parse_from(["vouch", "resolve", "--var", "no-equals"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_check() {
        let cli = Cli::try_parse_from(["vouch", "check", "-c", "custom.toml"]).unwrap();
        match cli.command {
            Commands::Check(args) => assert_eq!(args.config, PathBuf::from("custom.toml")),
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_parse_config_init() {
        let cli = Cli::try_parse_from(["vouch", "config", "init", "--force"]).unwrap();
        match cli.command {
            Commands::Config(ConfigCommands::Init(args)) => assert!(args.force),
            _ => panic!("Expected Config Init command"),
        }
    }

    #[test]
    fn test_load_config_or_default_missing_file() {
        let config = load_config_or_default(Path::new("/nonexistent/vouch.toml")).unwrap();
        assert_eq!(config.provider.priority, 50);
    }
}
