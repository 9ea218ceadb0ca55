//! Outbound HTTP seam.
//!
//! Everything that touches the network (manifest fetch, banner probe, plugin
//! download) goes through [`HttpClient`], so tests can substitute a scripted
//! client. [`ReqwestClient`] is the production implementation.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use crate::error::HttpError;

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest response body accepted (manifests and plugin sources are small).
const DEFAULT_MAX_BODY: usize = 16 * 1024 * 1024;

/// Maximum number of redirects followed.
const MAX_REDIRECTS: usize = 5;

/// A completed HTTP exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Value of the `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// Response body. Always empty for `HEAD`.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A `200 OK` response with the given body.
    #[must_use]
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: None,
            body: body.into(),
        }
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal asynchronous HTTP client.
///
/// Implementations must honour `timeout` for the whole exchange and must not
/// retry. Non-success statuses are returned as responses, not errors.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a `GET` request.
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, HttpError>;

    /// Issue a `HEAD` request.
    async fn head(&self, url: &str, timeout: Duration) -> Result<HttpResponse, HttpError>;
}

/// [`HttpClient`] backed by `reqwest` with rustls.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
    max_body: usize,
}

impl ReqwestClient {
    /// Build a client with the default body cap.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Client`] if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("limoka/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Client(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_body: DEFAULT_MAX_BODY,
        })
    }

    /// Override the maximum accepted body size in bytes.
    #[must_use]
    pub fn with_max_body(mut self, bytes: usize) -> Self {
        self.max_body = bytes;
        self
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        read_body: bool,
    ) -> Result<HttpResponse, HttpError> {
        let response = request
            .send()
            .await
            .map_err(|e| classify(url, &e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let mut body = Vec::new();
        if read_body {
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| classify(url, &e))?;
                if body.len().saturating_add(chunk.len()) > self.max_body {
                    return Err(HttpError::Transport {
                        url: url.to_owned(),
                        message: format!("response body exceeds {} bytes", self.max_body),
                    });
                }
                body.extend_from_slice(&chunk);
            }
        }

        debug!(url, status, bytes = body.len(), "http exchange complete");
        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

fn classify(url: &str, error: &reqwest::Error) -> HttpError {
    if error.is_timeout() {
        HttpError::Timeout {
            url: url.to_owned(),
        }
    } else {
        HttpError::Transport {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, HttpError> {
        self.send(self.client.get(url).timeout(timeout), url, true)
            .await
    }

    async fn head(&self, url: &str, timeout: Duration) -> Result<HttpResponse, HttpError> {
        self.send(self.client.head(url).timeout(timeout), url, false)
            .await
    }
}
