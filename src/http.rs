//! HTTP fetch capability for the crawler
//!
//! The crawler never talks to `reqwest` directly. Everything goes through the
//! [`Fetcher`] trait so the traversal engine can run against any transport,
//! including in-memory doubles in tests.

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("trawl/", env!("CARGO_PKG_VERSION"));

/// A fetched HTTP response
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,

    /// Value of the `Content-Type` header, if any
    pub content_type: Option<String>,

    /// Raw response body
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Whether the server answered with 200 OK
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Whether the response declares a PDF payload
    pub fn is_pdf(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("application/pdf"))
    }
}

/// Transport used by the crawler for every outbound request
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue a GET request and return the full response
    async fn get(&self, url: &str, timeout: Duration) -> Result<FetchResponse>;

    /// Issue a HEAD request and return the status code
    async fn head(&self, url: &str, timeout: Duration) -> Result<u16>;
}

/// [`Fetcher`] backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Create a client that identifies itself with the default user agent
    pub fn new() -> Result<Self> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    /// Create a client with a custom user agent
    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let client = ReqwestClient::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }
}

fn map_send_error(url: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(url.to_string())
    } else {
        Error::Http(err)
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, url: &str, timeout: Duration) -> Result<FetchResponse> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_send_error(url, e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| map_send_error(url, e))?
            .to_vec();

        debug!(status, bytes = body.len(), "GET {}", url);
        Ok(FetchResponse {
            status,
            content_type,
            body,
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn head(&self, url: &str, timeout: Duration) -> Result<u16> {
        let response = self
            .client
            .head(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_send_error(url, e))?;
        let status = response.status().as_u16();
        debug!(status, "HEAD {}", url);
        Ok(status)
    }
}
