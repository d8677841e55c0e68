//! CLI command definitions and handlers

use clap::{Parser, Subcommand};

pub mod args;
pub mod cache;
pub mod context;
pub mod enrich;
pub mod profile;
pub mod readme;

pub use args::{GlobalOptions, OutputFormat};
pub use context::CommandContext;

/// folio - keep profiles current from the repositories they point at
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, json)
    #[arg(
        long,
        global = true,
        env = "FOLIO_FORMAT",
        default_value = "pretty",
        hide_env = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "FOLIO_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "FOLIO_DEBUG", hide_env = true)]
    pub debug: bool,

    /// Bypass the profile cache and read the durable store directly
    #[arg(long, global = true, env = "FOLIO_NO_CACHE", hide_env = true)]
    pub no_cache: bool,

    /// GitHub token for authenticated requests
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub API base URL
    #[arg(long, global = true, env = "FOLIO_API_BASE_URL", hide_env = true)]
    pub api_base_url: Option<String>,

    /// Raw content base URL
    #[arg(long, global = true, env = "FOLIO_RAW_BASE_URL", hide_env = true)]
    pub raw_base_url: Option<String>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read and write profiles
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Add a repository to a profile's projects
    Enrich {
        /// Profile owner key
        owner_key: String,

        /// Repository URL, e.g. https://github.com/owner/repo
        repo: String,
    },

    /// Fetch the best available README for a repository
    Readme {
        /// Repository URL, e.g. https://github.com/owner/repo/tree/dev
        repo: String,
    },

    /// Manage the local profile cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Display version information
    Version,
}

/// Profile subcommands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Show a profile
    Get {
        owner_key: String,
    },

    /// Create a profile, empty unless a document is given
    Create {
        owner_key: String,

        /// JSON document to store ("-" reads stdin)
        #[arg(long, short)]
        file: Option<String>,
    },

    /// Write a profile, creating it if missing
    Put {
        owner_key: String,

        /// JSON document to store ("-" reads stdin)
        #[arg(long, short)]
        file: String,
    },

    /// Delete a profile
    Delete {
        owner_key: String,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cache statistics
    Status,

    /// Remove every cache entry
    Clear,
}
