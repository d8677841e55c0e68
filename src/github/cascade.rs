//! README acquisition cascade
//!
//! Strategies run in a fixed order and the first one that yields text wins:
//!
//! 1. `Api` - `GET /repos/{owner}/{repo}/readme[?ref=branch]`, base64-decoded
//! 2. `RawContent` - raw file lookups over branch x filename candidates
//! 3. `MetadataSummary` - `GET /repos/{owner}/{repo}` rendered as a short summary
//!
//! Failures inside a strategy are recorded in the attempt log and never abort
//! the cascade. When every strategy is exhausted the artifact is empty with
//! provenance `None`. Only cancellation is returned as an error.

use std::fmt;
use std::sync::Arc;

use log::{debug, info};
use serde::Serialize;

use super::cancel::CancellationToken;
use super::fetcher::{FetchRequest, Fetcher, GITHUB_JSON};
use super::models::{ReadmeResponse, RepoMetadata};
use super::reference::RepoReference;
use crate::error::{Error, FetchError, Result};

/// Default GitHub REST API base
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default raw content host
pub const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";

/// Branches tried after any branch named in the reference
pub const FALLBACK_BRANCHES: [&str; 3] = ["main", "master", "develop"];

/// README file names tried on each branch, in order
pub const README_FILENAMES: [&str; 3] = ["README.md", "readme.md", "Readme.md"];

/// Which strategy produced an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    Api,
    RawContent,
    MetadataSummary,
    None,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provenance::Api => "api",
            Provenance::RawContent => "raw-content",
            Provenance::MetadataSummary => "metadata-summary",
            Provenance::None => "none",
        };
        f.write_str(s)
    }
}

/// Best available text for a repository. Never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcquiredArtifact {
    pub text: String,
    pub provenance: Provenance,
}

impl AcquiredArtifact {
    fn none() -> Self {
        Self {
            text: String::new(),
            provenance: Provenance::None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// One acquisition strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Api,
    RawContent,
    MetadataSummary,
}

impl Strategy {
    /// Default order: most reliable single call first, guaranteed signal last
    pub const ORDER: [Strategy; 3] = [
        Strategy::Api,
        Strategy::RawContent,
        Strategy::MetadataSummary,
    ];

    pub fn provenance(self) -> Provenance {
        match self {
            Strategy::Api => Provenance::Api,
            Strategy::RawContent => Provenance::RawContent,
            Strategy::MetadataSummary => Provenance::MetadataSummary,
        }
    }
}

/// Result of a single request inside a strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AttemptOutcome {
    Success,
    /// 200 with no usable content
    Empty,
    NotFound,
    RemoteError { status: u16 },
    TransportError { message: String },
    DecodeError { message: String },
}

impl AttemptOutcome {
    fn from_fetch_error(err: FetchError) -> Self {
        match err {
            FetchError::NotFound => AttemptOutcome::NotFound,
            FetchError::Remote { status } => AttemptOutcome::RemoteError { status },
            FetchError::Transport(message) => AttemptOutcome::TransportError { message },
            // Cancellation is lifted out before outcomes are recorded
            FetchError::Cancelled => AttemptOutcome::TransportError {
                message: "cancelled".to_string(),
            },
        }
    }
}

/// Diagnostic log entry. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcquisitionAttempt {
    pub strategy: Strategy,
    /// `branch/filename` for raw lookups, the request URL otherwise
    pub target: String,
    pub outcome: AttemptOutcome,
}

/// Artifact plus the attempts that led to it
#[derive(Debug, Clone, Serialize)]
pub struct Acquisition {
    pub artifact: AcquiredArtifact,
    pub attempts: Vec<AcquisitionAttempt>,
}

/// Base URLs for the API and raw content hosts
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub api_base: String,
    pub raw_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            raw_base: DEFAULT_RAW_BASE.to_string(),
        }
    }
}

impl Endpoints {
    fn readme_url(&self, reference: &RepoReference) -> String {
        let url = format!(
            "{}/repos/{}/{}/readme",
            self.api_base.trim_end_matches('/'),
            reference.owner,
            reference.repo
        );
        match &reference.branch {
            Some(branch) => format!("{}?ref={}", url, urlencoding::encode(branch)),
            None => url,
        }
    }

    fn metadata_url(&self, reference: &RepoReference) -> String {
        format!(
            "{}/repos/{}/{}",
            self.api_base.trim_end_matches('/'),
            reference.owner,
            reference.repo
        )
    }

    fn raw_url(&self, reference: &RepoReference, branch: &str, filename: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.raw_base.trim_end_matches('/'),
            reference.owner,
            reference.repo,
            urlencoding::encode(branch),
            filename
        )
    }
}

/// Ordered, deduplicated (branch, filename) pairs for the raw-content strategy.
///
/// A branch named in the reference comes first; each branch appears once.
pub fn raw_candidates(reference: &RepoReference) -> Vec<(String, &'static str)> {
    let mut branches: Vec<&str> = Vec::with_capacity(FALLBACK_BRANCHES.len() + 1);
    for branch in reference
        .branch
        .as_deref()
        .into_iter()
        .chain(FALLBACK_BRANCHES)
    {
        if !branches.contains(&branch) {
            branches.push(branch);
        }
    }

    branches
        .into_iter()
        .flat_map(|branch| {
            README_FILENAMES
                .iter()
                .map(move |filename| (branch.to_string(), *filename))
        })
        .collect()
}

enum StrategyOutcome {
    Found(String),
    Exhausted,
}

enum Fetched {
    Body(String),
    Failed(AttemptOutcome),
}

/// Finds the best obtainable text for a repository reference.
pub struct AcquisitionCascade {
    fetcher: Arc<dyn Fetcher>,
    endpoints: Endpoints,
    token: Option<String>,
    strategies: Vec<Strategy>,
}

impl AcquisitionCascade {
    /// Cascade over `fetcher` with default endpoints and strategy order
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            endpoints: Endpoints::default(),
            token: None,
            strategies: Strategy::ORDER.to_vec(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Token attached to every outbound request. Empty tokens are ignored.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_strategies(mut self, strategies: Vec<Strategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Parse `input` and acquire its README.
    pub async fn acquire_str(&self, input: &str, cancel: &CancellationToken) -> Result<Acquisition> {
        let reference = RepoReference::parse(input)?;
        self.acquire(&reference, cancel).await
    }

    /// Run the strategies in order, stopping at the first that yields text.
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires; no request is started afterwards.
    pub async fn acquire(
        &self,
        reference: &RepoReference,
        cancel: &CancellationToken,
    ) -> Result<Acquisition> {
        let mut attempts = Vec::new();

        for &strategy in &self.strategies {
            debug!("Trying {:?} strategy for {}", strategy, reference);
            let outcome = match strategy {
                Strategy::Api => self.try_api(reference, &mut attempts, cancel).await?,
                Strategy::RawContent => self.try_raw(reference, &mut attempts, cancel).await?,
                Strategy::MetadataSummary => {
                    self.try_metadata(reference, &mut attempts, cancel).await?
                }
            };

            if let StrategyOutcome::Found(text) = outcome {
                let provenance = strategy.provenance();
                info!(
                    "Acquired {} chars for {} via {} after {} attempts",
                    text.len(),
                    reference,
                    provenance,
                    attempts.len()
                );
                return Ok(Acquisition {
                    artifact: AcquiredArtifact { text, provenance },
                    attempts,
                });
            }
        }

        info!(
            "No content found for {} after {} attempts",
            reference,
            attempts.len()
        );
        Ok(Acquisition {
            artifact: AcquiredArtifact::none(),
            attempts,
        })
    }

    async fn try_api(
        &self,
        reference: &RepoReference,
        attempts: &mut Vec<AcquisitionAttempt>,
        cancel: &CancellationToken,
    ) -> Result<StrategyOutcome> {
        let url = self.endpoints.readme_url(reference);
        let outcome = match self.get(&url, true, cancel).await? {
            Fetched::Failed(outcome) => outcome,
            Fetched::Body(body) => match serde_json::from_str::<ReadmeResponse>(&body)
                .map_err(|e| e.to_string())
                .and_then(|resp| resp.decoded())
            {
                Ok(text) if !text.is_empty() => {
                    record(attempts, Strategy::Api, url, AttemptOutcome::Success);
                    return Ok(StrategyOutcome::Found(text));
                }
                Ok(_) => AttemptOutcome::Empty,
                Err(message) => AttemptOutcome::DecodeError { message },
            },
        };

        record(attempts, Strategy::Api, url, outcome);
        Ok(StrategyOutcome::Exhausted)
    }

    async fn try_raw(
        &self,
        reference: &RepoReference,
        attempts: &mut Vec<AcquisitionAttempt>,
        cancel: &CancellationToken,
    ) -> Result<StrategyOutcome> {
        for (branch, filename) in raw_candidates(reference) {
            let url = self.endpoints.raw_url(reference, &branch, filename);
            let target = format!("{}/{}", branch, filename);

            let outcome = match self.get(&url, false, cancel).await? {
                Fetched::Body(body) if !body.is_empty() => {
                    record(attempts, Strategy::RawContent, target, AttemptOutcome::Success);
                    return Ok(StrategyOutcome::Found(body));
                }
                Fetched::Body(_) => AttemptOutcome::Empty,
                Fetched::Failed(outcome) => outcome,
            };
            record(attempts, Strategy::RawContent, target, outcome);
        }

        Ok(StrategyOutcome::Exhausted)
    }

    async fn try_metadata(
        &self,
        reference: &RepoReference,
        attempts: &mut Vec<AcquisitionAttempt>,
        cancel: &CancellationToken,
    ) -> Result<StrategyOutcome> {
        let url = self.endpoints.metadata_url(reference);
        let outcome = match self.get(&url, true, cancel).await? {
            Fetched::Failed(outcome) => outcome,
            Fetched::Body(body) => match serde_json::from_str::<RepoMetadata>(&body) {
                Ok(metadata) => {
                    record(
                        attempts,
                        Strategy::MetadataSummary,
                        url,
                        AttemptOutcome::Success,
                    );
                    return Ok(StrategyOutcome::Found(metadata.summary()));
                }
                Err(e) => AttemptOutcome::DecodeError {
                    message: e.to_string(),
                },
            },
        };

        record(attempts, Strategy::MetadataSummary, url, outcome);
        Ok(StrategyOutcome::Exhausted)
    }

    /// Issue one request. Cancellation becomes the outer error; any other
    /// failure is handed back for the strategy to record.
    async fn get(&self, url: &str, json: bool, cancel: &CancellationToken) -> Result<Fetched> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut request = FetchRequest::new(url).token(self.token.as_deref());
        if json {
            request = request.accept(GITHUB_JSON);
        }

        match self.fetcher.fetch(request, cancel).await {
            Ok(body) => Ok(Fetched::Body(body)),
            Err(FetchError::Cancelled) => Err(Error::Cancelled),
            Err(err) => {
                debug!("  {} failed: {}", url, err);
                Ok(Fetched::Failed(AttemptOutcome::from_fetch_error(err)))
            }
        }
    }
}

fn record(
    attempts: &mut Vec<AcquisitionAttempt>,
    strategy: Strategy,
    target: String,
    outcome: AttemptOutcome,
) {
    debug!("  {:?} {} -> {:?}", strategy, target, outcome);
    attempts.push(AcquisitionAttempt {
        strategy,
        target,
        outcome,
    });
}
