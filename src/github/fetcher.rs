//! Single authenticated GET with outcome classification
//!
//! No retries at this layer; the acquisition cascade decides what to try next.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client as HttpClient, StatusCode, header};

use super::cancel::CancellationToken;
use crate::error::FetchError;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Media type for GitHub REST v3 JSON responses
pub const GITHUB_JSON: &str = "application/vnd.github.v3+json";

/// A single GET request
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    /// Sent as `Authorization: token <token>` when present and non-empty
    pub token: Option<&'a str>,
    /// Optional `Accept` header
    pub accept: Option<&'a str>,
}

impl<'a> FetchRequest<'a> {
    pub fn new(url: &'a str) -> Self {
        Self {
            url,
            token: None,
            accept: None,
        }
    }

    pub fn token(mut self, token: Option<&'a str>) -> Self {
        self.token = token;
        self
    }

    pub fn accept(mut self, accept: &'a str) -> Self {
        self.accept = Some(accept);
        self
    }
}

/// Performs one GET and returns the body text or a typed failure.
///
/// An empty 200 body is a success, not an error.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        request: FetchRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError>;
}

/// reqwest-backed fetcher with a bounded per-request timeout
pub struct HttpFetcher {
    http: HttpClient,
}

impl HttpFetcher {
    /// Create a fetcher whose every request carries its own `timeout`
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self { http })
    }

    async fn send(&self, request: FetchRequest<'_>) -> Result<String, FetchError> {
        let mut builder = self.http.get(request.url);
        if let Some(token) = request.token.filter(|t| !t.is_empty()) {
            builder = builder.header(header::AUTHORIZATION, format!("token {}", token));
        }
        if let Some(accept) = request.accept {
            builder = builder.header(header::ACCEPT, accept);
        }

        let response = builder.send().await.map_err(FetchError::from)?;

        let status = response.status();
        debug!("GET {} -> {}", request.url, status);
        match status {
            StatusCode::NOT_FOUND => Err(FetchError::NotFound),
            status if status.is_success() => response.text().await.map_err(FetchError::from),
            status => Err(FetchError::Remote {
                status: status.as_u16(),
            }),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        request: FetchRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = self.send(request) => result,
        }
    }
}
