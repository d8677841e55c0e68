//! Readme command: run the acquisition cascade for one repository

use colored::Colorize;

use folio::error::Result;
use folio::github::{AttemptOutcome, Provenance};

use crate::cli::context::interrupt_token;
use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::output::print_json;

pub async fn run(opts: &GlobalOptions, repo: &str) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let cascade = ctx.cascade()?;
    let cancel = interrupt_token();

    let acquisition = cascade.acquire_str(repo, &cancel).await?;

    if ctx.format == OutputFormat::Json {
        return print_json(&acquisition);
    }

    for attempt in &acquisition.attempts {
        let mark = match attempt.outcome {
            AttemptOutcome::Success => "✓".green(),
            _ => "·".dimmed(),
        };
        eprintln!(
            "{} {} {}",
            mark,
            attempt.strategy.provenance(),
            attempt.target.dimmed()
        );
    }

    if acquisition.artifact.provenance == Provenance::None {
        eprintln!("{}", "No README or metadata available".yellow());
    } else {
        println!("{}", acquisition.artifact.text);
    }
    Ok(())
}
