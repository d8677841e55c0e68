//! Profile command implementations

use std::io::Read;

use colored::Colorize;
use dialoguer::{Confirm, theme::ColorfulTheme};
use tabled::Tabled;

use folio::error::{Result, StoreError};
use folio::profile::{ProfileDocument, Project};

use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::output::{print_json, table::format_table};

/// Table row for a project entry
#[derive(Debug, Tabled)]
pub struct ProjectRow {
    #[tabled(rename = "PROJECT")]
    pub name: String,
    #[tabled(rename = "ROLE")]
    pub role: String,
    #[tabled(rename = "STACK")]
    pub tech_stack: String,
}

impl From<&Project> for ProjectRow {
    fn from(project: &Project) -> Self {
        Self {
            name: project.name.clone(),
            role: project.role.clone(),
            tech_stack: project.tech_stack.join(", "),
        }
    }
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "WHERE")]
    place: String,
    #[tabled(rename = "WHAT")]
    what: String,
    #[tabled(rename = "WHEN")]
    when: String,
}

fn span(start: &str, end: &str) -> String {
    match (start.is_empty(), end.is_empty()) {
        (true, true) => String::new(),
        (false, true) => format!("{} -", start),
        _ => format!("{} - {}", start, end),
    }
}

/// Print a profile in the requested format
pub fn render(doc: &ProfileDocument, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(doc);
    }

    println!("{} {}", "Profile".bold(), doc.owner_key.cyan());
    for info in &doc.basic_info {
        let headline = [info.name.as_str(), info.title.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        if !headline.is_empty() {
            println!("  {}", headline);
        }
        for detail in [&info.email, &info.phone, &info.location] {
            if !detail.is_empty() {
                println!("  {}", detail.dimmed());
            }
        }
    }

    println!();
    println!("{}", "Experience".bold());
    let experience: Vec<HistoryRow> = doc
        .experience
        .iter()
        .map(|e| HistoryRow {
            place: e.company.clone(),
            what: e.position.clone(),
            when: span(&e.start_date, &e.end_date),
        })
        .collect();
    println!("{}", format_table(&experience, "No experience recorded."));

    println!();
    println!("{}", "Education".bold());
    let education: Vec<HistoryRow> = doc
        .education
        .iter()
        .map(|e| HistoryRow {
            place: e.school.clone(),
            what: [e.degree.as_str(), e.major.as_str()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
            when: span(&e.start_date, &e.end_date),
        })
        .collect();
    println!("{}", format_table(&education, "No education recorded."));

    println!();
    println!("{}", "Projects".bold());
    let projects: Vec<ProjectRow> = doc.projects.iter().map(ProjectRow::from).collect();
    println!("{}", format_table(&projects, "No projects recorded."));

    if !doc.skills.is_empty() {
        println!();
        println!(
            "{} {}",
            "Skills:".bold(),
            doc.skills.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    Ok(())
}

/// Read a document from a path, or stdin for "-", keyed to `owner_key`
fn read_document(owner_key: &str, file: &str) -> Result<ProfileDocument> {
    let contents = if file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(file)?
    };

    // The owner key may be omitted from the file; the argument supplies it
    let mut value: serde_json::Value = serde_json::from_str(&contents)?;
    if let Some(object) = value.as_object_mut() {
        let existing = object
            .get("owner_key")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if !existing.is_empty() && existing != owner_key {
            return Err(StoreError::OwnerMismatch {
                expected: owner_key.to_string(),
                found: existing.to_string(),
            }
            .into());
        }
        object.insert("owner_key".to_string(), owner_key.into());
    }

    let doc: ProfileDocument = serde_json::from_value(value)?;
    Ok(doc)
}

pub fn get(opts: &GlobalOptions, owner_key: &str) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let doc = ctx.store()?.get(owner_key)?;
    render(&doc, ctx.format)
}

pub fn create(opts: &GlobalOptions, owner_key: &str, file: Option<&str>) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let doc = match file {
        Some(file) => read_document(owner_key, file)?,
        None => ProfileDocument::new(owner_key),
    };
    ctx.store()?.create(&doc)?;

    match ctx.format {
        OutputFormat::Json => print_json(&doc),
        OutputFormat::Pretty => {
            println!("{} Created profile {}", "✓".green(), owner_key.cyan());
            Ok(())
        }
    }
}

pub fn put(opts: &GlobalOptions, owner_key: &str, file: &str) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let doc = read_document(owner_key, file)?;
    ctx.store()?.update(&doc)?;

    match ctx.format {
        OutputFormat::Json => print_json(&doc),
        OutputFormat::Pretty => {
            println!("{} Saved profile {}", "✓".green(), owner_key.cyan());
            Ok(())
        }
    }
}

pub fn delete(opts: &GlobalOptions, owner_key: &str, yes: bool) -> Result<()> {
    let ctx = CommandContext::new(opts)?;

    if !yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Delete profile {}?", owner_key))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    ctx.store()?.delete(owner_key)?;

    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "owner_key": owner_key,
            "deleted": true,
        })),
        OutputFormat::Pretty => {
            println!("{} Deleted profile {}", "✓".green(), owner_key.cyan());
            Ok(())
        }
    }
}
