//! Fetch port and HTTP implementation
//!
//! The coordinator consumes fetching only through the `Fetch` trait, which
//! returns either a parse-ready document or a failure classified as
//! transient (retry the work item) or fatal (dead-letter it). The HTTP
//! implementation retries blocked responses (403/429) in place a fixed
//! number of times with a fixed delay before surfacing a transient error.

use crate::config::{CrawlerConfig, SourceConfig};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// A fetched entity document, ready for extraction
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// The reference that was fetched
    pub reference: String,

    /// Final URL after redirects
    pub final_url: String,

    /// Raw markup body
    pub body: String,
}

/// Fetch failure classification
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure, timeout, server error, or persistent blocking;
    /// the work item may be retried
    #[error("Transient fetch failure: {0}")]
    Transient(String),

    /// The reference can never succeed (e.g. 404); retrying reproduces it
    #[error("Fatal fetch failure: {0}")]
    Fatal(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Port for fetching one entity document by reference
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, reference: &str) -> Result<FetchedDocument, FetchError>;
}

/// Builds the HTTP client used by the crawler
///
/// The per-request timeout is mandatory: an unresponsive server surfaces as
/// a transient failure rather than an unbounded wait.
pub fn build_http_client(user_agent: &str, timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.to_string())
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// HTTP implementation of the fetch port
pub struct HttpFetcher {
    client: Client,
    base_url: String,
    blocked_retry_count: u32,
    blocked_retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(source: &SourceConfig, crawler: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&source.user_agent, crawler.fetch_timeout_secs)?;
        Ok(Self {
            client,
            base_url: source.base_url.trim_end_matches('/').to_string(),
            blocked_retry_count: crawler.blocked_retry_count,
            blocked_retry_delay: Duration::from_millis(crawler.blocked_retry_delay_ms),
        })
    }

    fn url_for(&self, reference: &str) -> String {
        format!("{}/{}", self.base_url, reference.trim_start_matches('/'))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, reference: &str) -> Result<FetchedDocument, FetchError> {
        let url = self.url_for(reference);

        let mut blocked_attempts = 0;
        loop {
            let response = match self.client.get(&url).send().await {
                Ok(r) => r,
                Err(e) if e.is_timeout() => {
                    return Err(FetchError::Transient(format!("timeout fetching {}", url)));
                }
                Err(e) if e.is_connect() => {
                    return Err(FetchError::Transient(format!(
                        "connection failure for {}: {}",
                        url, e
                    )));
                }
                Err(e) => {
                    return Err(FetchError::Transient(format!(
                        "request failure for {}: {}",
                        url, e
                    )));
                }
            };

            let status = response.status();

            if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
                if blocked_attempts < self.blocked_retry_count {
                    blocked_attempts += 1;
                    tracing::debug!(
                        "Blocked ({}) fetching {}, retry {}/{}",
                        status,
                        url,
                        blocked_attempts,
                        self.blocked_retry_count
                    );
                    tokio::time::sleep(self.blocked_retry_delay).await;
                    continue;
                }
                return Err(FetchError::Transient(format!(
                    "blocked ({}) after {} retries: {}",
                    status, blocked_attempts, url
                )));
            }

            if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
                return Err(FetchError::Fatal(format!("HTTP {} for {}", status, url)));
            }

            if status.is_server_error() {
                return Err(FetchError::Transient(format!(
                    "HTTP {} for {}",
                    status, url
                )));
            }

            if !status.is_success() {
                return Err(FetchError::Fatal(format!("HTTP {} for {}", status, url)));
            }

            let final_url = response.url().to_string();
            let body = response.text().await.map_err(|e| {
                FetchError::Transient(format!("failed reading body of {}: {}", url, e))
            })?;

            return Ok(FetchedDocument {
                reference: reference.to_string(),
                final_url,
                body,
            });
        }
    }
}
