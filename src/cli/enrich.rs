//! Enrich command: add a repository to a profile

use colored::Colorize;
use serde::Serialize;

use folio::enrich::Enrichment;
use folio::error::Result;
use folio::github::Provenance;
use folio::profile::Project;

use crate::cli::context::interrupt_token;
use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::output::print_json;

#[derive(Serialize)]
struct EnrichOutput<'a> {
    owner_key: &'a str,
    provenance: Provenance,
    project: &'a Project,
    project_count: usize,
}

pub async fn run(opts: &GlobalOptions, owner_key: &str, repo: &str) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let assembler = ctx.assembler()?;
    let cancel = interrupt_token();

    let Enrichment {
        profile,
        project,
        acquisition,
    } = assembler.enrich(owner_key, repo, &cancel).await?;

    match ctx.format {
        OutputFormat::Json => print_json(&EnrichOutput {
            owner_key,
            provenance: acquisition.artifact.provenance,
            project: &project,
            project_count: profile.projects.len(),
        }),
        OutputFormat::Pretty => {
            println!(
                "{} Added {} to {}",
                "✓".green(),
                project.name.bold(),
                owner_key.cyan()
            );
            if acquisition.artifact.provenance == Provenance::None {
                println!(
                    "  {}",
                    "No README or metadata found; project recorded by name only".yellow()
                );
            } else {
                println!("  Source: {}", acquisition.artifact.provenance);
            }
            if !project.description.is_empty() {
                println!("  {}", project.description.dimmed());
            }
            println!("  Profile now lists {} project(s)", profile.projects.len());
            Ok(())
        }
    }
}
