//! Profile enrichment from a repository
//!
//! Acquires the repository's README (or a metadata summary), turns it into a
//! [`Project`] and appends it to the owner's profile. Absence of a README never
//! fails enrichment; only a malformed reference, cancellation or a durable
//! store error does.

use std::sync::Arc;

use log::info;

use crate::error::Result;
use crate::github::{
    AcquiredArtifact, Acquisition, AcquisitionCascade, CancellationToken, Provenance,
    RepoReference,
};
use crate::profile::{ProfileDocument, Project};
use crate::store::CacheAsideStore;

/// Role recorded for projects sourced from a public repository
pub const OPEN_SOURCE_ROLE: &str = "Open source project";

const MAX_HIGHLIGHTS: usize = 5;

/// Turns an acquired artifact into a project entry
pub trait ProjectSummarizer: Send + Sync {
    fn summarize(&self, reference: &RepoReference, artifact: &AcquiredArtifact) -> Project;
}

/// Markdown heuristics: heading, first paragraph, top-level bullets
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadmeSummarizer;

impl ProjectSummarizer for ReadmeSummarizer {
    fn summarize(&self, reference: &RepoReference, artifact: &AcquiredArtifact) -> Project {
        let text = artifact.text.as_str();

        // Metadata summaries are titled with the full name and list facts, not features
        if artifact.provenance == Provenance::MetadataSummary {
            return Project {
                name: reference.repo.clone(),
                role: OPEN_SOURCE_ROLE.to_string(),
                description: first_paragraph(text).unwrap_or_default(),
                tech_stack: summary_tech_stack(text),
                highlights: Vec::new(),
            };
        }

        Project {
            name: first_heading(text).unwrap_or(reference.repo.as_str()).to_string(),
            role: OPEN_SOURCE_ROLE.to_string(),
            description: first_paragraph(text).unwrap_or_default(),
            tech_stack: Vec::new(),
            highlights: bullets(text).take(MAX_HIGHLIGHTS).collect(),
        }
    }
}

fn first_heading(text: &str) -> Option<&str> {
    text.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(str::trim)
        .filter(|h| !h.is_empty())
}

/// First block of prose lines, skipping headings, lists, badges, HTML and code fences
fn first_paragraph(text: &str) -> Option<String> {
    let mut paragraph: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in text.lines().map(str::trim) {
        if line.starts_with("```") {
            in_fence = !in_fence;
            if !paragraph.is_empty() {
                break;
            }
            continue;
        }
        if in_fence {
            continue;
        }

        let prose = !line.is_empty()
            && !line.starts_with('#')
            && !line.starts_with('<')
            && !line.starts_with("[!")
            && !line.starts_with("![")
            && !line.starts_with('|')
            && !is_bullet(line);

        if prose {
            paragraph.push(line);
        } else if !paragraph.is_empty() {
            break;
        }
    }

    (!paragraph.is_empty()).then(|| paragraph.join(" "))
}

fn is_bullet(line: &str) -> bool {
    line.starts_with("- ") || line.starts_with("* ")
}

/// Top-level bullet items outside code fences
fn bullets(text: &str) -> impl Iterator<Item = String> + '_ {
    let mut in_fence = false;
    text.lines().filter_map(move |line| {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            return None;
        }
        if in_fence {
            return None;
        }
        line.strip_prefix("- ")
            .or_else(|| line.strip_prefix("* "))
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
    })
}

/// Language and topics from a metadata summary block
fn summary_tech_stack(text: &str) -> Vec<String> {
    let mut stack = Vec::new();
    for line in text.lines() {
        if let Some(language) = line.strip_prefix("- Language: ") {
            if language != "unknown" {
                stack.push(language.trim().to_string());
            }
        } else if let Some(topics) = line.strip_prefix("- Topics: ") {
            stack.extend(
                topics
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
            );
        }
    }
    stack
}

/// Outcome of one enrichment
#[derive(Debug)]
pub struct Enrichment {
    pub profile: ProfileDocument,
    pub project: Project,
    pub acquisition: Acquisition,
}

/// Appends repository-derived projects to profiles
pub struct ProfileAssembler {
    store: Arc<CacheAsideStore>,
    cascade: Arc<AcquisitionCascade>,
    summarizer: Arc<dyn ProjectSummarizer>,
}

impl ProfileAssembler {
    pub fn new(store: Arc<CacheAsideStore>, cascade: Arc<AcquisitionCascade>) -> Self {
        Self {
            store,
            cascade,
            summarizer: Arc::new(ReadmeSummarizer),
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn ProjectSummarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    /// Acquire `reference`, summarize it and append the project to `owner_key`'s
    /// profile, creating the profile if it does not exist.
    pub async fn enrich(
        &self,
        owner_key: &str,
        reference: &str,
        cancel: &CancellationToken,
    ) -> Result<Enrichment> {
        let reference = RepoReference::parse(reference)?;
        let acquisition = self.cascade.acquire(&reference, cancel).await?;
        let project = self.summarizer.summarize(&reference, &acquisition.artifact);

        let (profile, _) = self.store.modify(owner_key, |doc| {
            doc.projects.push(project.clone());
        })?;

        info!(
            "Added project {:?} to {} ({} from {})",
            project.name, owner_key, acquisition.artifact.provenance, reference
        );

        Ok(Enrichment {
            profile,
            project,
            acquisition,
        })
    }
}
