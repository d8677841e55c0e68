//! Common CLI types shared across commands

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-oriented tables and headings
    #[default]
    Pretty,
    /// Structured output for scripts
    Json,
}
