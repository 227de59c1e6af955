//! Outbound HTTP execution for bound command requests.
//!
//! The [`Transport`] trait is the seam between the invocation pipeline and the
//! network. [`HttpExecutor`] is the reqwest-backed implementation used in
//! production; tests substitute their own.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::redact_sensitive;

/// Default limit for one outbound request, including reading the body.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A fully bound request ready to send.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// The status and the complete body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u128 },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("could not read response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("could not build the HTTP client: {0}")]
    Client(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: OutboundRequest) -> Result<OutboundResponse, TransportError>;
}

/// Reqwest-backed [`Transport`] sharing one connection pool across invocations.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    timeout: Duration,
}

impl HttpExecutor {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .user_agent(concat!("slashhook/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| TransportError::Client(error.to_string()))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Transport for HttpExecutor {
    async fn execute(&self, request: OutboundRequest) -> Result<OutboundResponse, TransportError> {
        let start = Instant::now();
        let display_url = redact_sensitive(request.url.as_str());
        debug!(
            method = %request.method,
            url = %display_url,
            header_count = request.headers.len(),
            body_len = request.body.as_ref().map(Vec::len).unwrap_or_default(),
            "http request started"
        );

        let mut builder = self
            .client
            .request(request.method.clone(), request.url)
            .headers(request.headers)
            .timeout(self.timeout);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|error| self.classify(&display_url, error, false))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|error| self.classify(&display_url, error, true))?;

        if status.is_success() {
            debug!(
                method = %request.method,
                url = %display_url,
                status = %status,
                duration_ms = start.elapsed().as_millis(),
                "http request completed"
            );
        } else {
            warn!(
                method = %request.method,
                url = %display_url,
                status = %status,
                duration_ms = start.elapsed().as_millis(),
                "http request returned a non-success status"
            );
        }

        Ok(OutboundResponse {
            status,
            body: body.to_vec(),
        })
    }
}

impl HttpExecutor {
    fn classify(&self, url: &str, error: reqwest::Error, reading_body: bool) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout {
                url: url.to_string(),
                timeout_ms: self.timeout.as_millis(),
            };
        }
        let message = redact_sensitive(&error.without_url().to_string());
        if reading_body {
            TransportError::Body {
                url: url.to_string(),
                message,
            }
        } else {
            TransportError::Request {
                url: url.to_string(),
                message,
            }
        }
    }
}
