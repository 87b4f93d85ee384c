//! Transport collaborator for page fetches.
//!
//! The engine only ever does "send one page request, receive one JSON
//! page response". Retry and backoff policy live outside this crate:
//! every [`TransportError`] is fatal for the current run.

use async_trait::async_trait;
use tracetap_types::wire::{PageRequest, PageResponse};

/// Production endpoint for the tracing API.
pub const DEFAULT_BASE_URL: &str = "https://api.smith.langchain.com";

/// Fixed extraction endpoint, POSTed once per page.
pub const QUERY_PATH: &str = "/api/v1/runs/query";

/// Header carrying the API key.
const API_KEY_HEADER: &str = "X-Api-Key";

/// Errors surfaced by a transport implementation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The API throttled the request (HTTP 429).
    #[error("rate limited by API (retry-after: {retry_after_ms:?} ms)")]
    RateLimited {
        /// Server-suggested wait, from the `Retry-After` header.
        retry_after_ms: Option<u64>,
    },

    /// Any other non-success HTTP status.
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection, TLS, or timeout failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body was not a valid page envelope.
    #[error("malformed page response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// One-page-at-a-time transport to the runs-query endpoint.
#[async_trait]
pub trait PageTransport: Send + Sync {
    /// Send one page request and decode the page response.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on any HTTP, network, or decode
    /// failure. Implementations must not retry; the engine treats every
    /// error as fatal for the run.
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, TransportError>;
}

/// HTTP transport backed by [`reqwest`].
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    /// Create a transport against `base_url` authenticating with `api_key`.
    ///
    /// Trailing slashes on `base_url` are trimmed so the query path
    /// joins cleanly.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}{QUERY_PATH}", self.base_url)
    }
}

#[async_trait]
impl PageTransport for HttpTransport {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, TransportError> {
        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1_000));
            return Err(TransportError::RateLimited { retry_after_ms });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(TransportError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let transport = HttpTransport::new("https://api.example.com/", "key");
        assert_eq!(transport.endpoint(), "https://api.example.com/api/v1/runs/query");
    }

    #[test]
    fn rate_limit_error_carries_retry_hint() {
        let err = TransportError::RateLimited {
            retry_after_ms: Some(5_000),
        };
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn decode_error_from_invalid_body() {
        let err = serde_json::from_slice::<PageResponse>(b"{not json")
            .map_err(TransportError::Decode)
            .unwrap_err();
        assert!(err.to_string().starts_with("malformed page response"));
    }
}
