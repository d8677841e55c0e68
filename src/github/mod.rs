//! GitHub README acquisition
//!
//! Resolves a repository reference and finds the best available text for it
//! through an ordered cascade of lookups.

pub mod cancel;
pub mod cascade;
pub mod fetcher;
pub mod models;
pub mod reference;

pub use cancel::CancellationToken;
pub use cascade::{
    AcquiredArtifact, Acquisition, AcquisitionAttempt, AcquisitionCascade, AttemptOutcome,
    DEFAULT_API_BASE, DEFAULT_RAW_BASE, Endpoints, Provenance, Strategy, raw_candidates,
};
pub use fetcher::{DEFAULT_TIMEOUT, FetchRequest, Fetcher, HttpFetcher};
pub use models::RepoMetadata;
pub use reference::RepoReference;
