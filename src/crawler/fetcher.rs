//! HTTP fetcher implementation
//!
//! All document and listing-page fetches go through the [`Fetcher`] trait
//! so that crawl logic can be tested against a mock transport. The real
//! implementation is a thin wrapper around a configured reqwest client.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Result of a fetch operation
///
/// Fetch failures are data, not errors: the crawl loops decide whether a
/// failed fetch means "skip this item" or "stop paginating".
#[derive(Debug)]
pub enum FetchOutcome {
    /// Successfully fetched the document
    Success {
        /// HTTP status code
        status: u16,
        /// Exact response body bytes
        body: Vec<u8>,
    },

    /// The server answered with a non-2xx status
    HttpError { status: u16 },

    /// Network-level failure (timeout, connection refused, TLS, ...)
    NetworkError { error: String },
}

/// Transport abstraction used by all crawl loops
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> FetchOutcome;
}

/// Production fetcher backed by reqwest
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a fetcher with the given user agent and per-request timeout
    ///
    /// `accept_invalid_certs` disables certificate validation; some
    /// paginated sources serve expired or self-signed certificates and are
    /// unreachable without it.
    pub fn new(
        user_agent: &str,
        timeout_secs: u64,
        accept_invalid_certs: bool,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> FetchOutcome {
        match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status();

                if !status.is_success() {
                    return FetchOutcome::HttpError {
                        status: status.as_u16(),
                    };
                }

                match response.bytes().await {
                    Ok(body) => FetchOutcome::Success {
                        status: status.as_u16(),
                        body: body.to_vec(),
                    },
                    Err(e) => FetchOutcome::NetworkError {
                        error: e.to_string(),
                    },
                }
            }
            Err(e) => {
                let error = if e.is_timeout() {
                    "Request timeout".to_string()
                } else if e.is_connect() {
                    "Connection refused".to_string()
                } else {
                    e.to_string()
                };
                FetchOutcome::NetworkError { error }
            }
        }
    }
}
