//! Global CLI options shared across all commands

use folio::config::Overrides;

use crate::cli::{Cli, OutputFormat};

/// Global CLI options passed to all command handlers.
///
/// Precedence is CLI flag > environment variable > config file > default.
/// This struct captures the CLI/env layer; the config file is merged in
/// `CommandContext`.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.folio/config.yaml)
    pub config: Option<String>,

    /// Bypass the profile cache
    pub no_cache: bool,

    pub github_token: Option<String>,
    pub api_base_url: Option<String>,
    pub raw_base_url: Option<String>,
}

impl GlobalOptions {
    /// Called once in main.rs after parsing
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            no_cache: cli.no_cache,
            github_token: cli.github_token.clone(),
            api_base_url: cli.api_base_url.clone(),
            raw_base_url: cli.raw_base_url.clone(),
        }
    }

    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }

    pub fn overrides(&self) -> Overrides {
        Overrides {
            github_token: self.github_token.clone(),
            api_base_url: self.api_base_url.clone(),
            raw_base_url: self.raw_base_url.clone(),
        }
    }
}
