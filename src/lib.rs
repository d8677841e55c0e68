//! folio: profiles kept current from the repositories they point at
//!
//! A cache-aside profile store in front of a durable backend, and a cascade
//! that finds the best available README text for a GitHub repository.

pub mod config;
pub mod enrich;
pub mod error;
pub mod github;
pub mod profile;
pub mod store;
