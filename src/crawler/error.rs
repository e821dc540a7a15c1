//! Error types for the crawler module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Transport failure while fetching a resource
    #[error("Fetch error: {0}")]
    Fetch(#[from] CrateError),

    /// The server answered with something other than 200 OK
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// Requested URL
        url: String,
        /// Status code returned
        status: u16,
    },

    /// robots.txt forbids fetching this URL
    #[error("Disallowed by robots.txt: {0}")]
    Disallowed(String),

    /// The URL is not an absolute http(s) URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A URL filter pattern failed to compile
    #[error("Invalid URL pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// PDF decoding error
    #[error("PDF extraction error: {0}")]
    Pdf(String),

    /// Sitemap could not be parsed
    #[error("Sitemap error: {0}")]
    Sitemap(String),

    /// Input is neither a web URL nor a supported file type
    #[error("Unsupported file type or URL: {0}")]
    Unsupported(String),

    /// Extraction succeeded but produced no text
    #[error("No text extracted from {0}")]
    EmptyContent(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<quick_xml::Error> for CrawlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Sitemap(err.to_string())
    }
}

impl From<lopdf::Error> for CrawlError {
    fn from(err: lopdf::Error) -> Self {
        Self::Pdf(err.to_string())
    }
}

impl From<tokio::task::JoinError> for CrawlError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Other(format!("Task join error: {}", err))
    }
}

impl From<CrawlError> for CrateError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::Fetch(e) => e,
            CrawlError::Io(e) => CrateError::Io(e),
            CrawlError::InvalidUrl(_) | CrawlError::InvalidPattern(_) => {
                CrateError::InvalidRequest(err.to_string())
            }
            _ => CrateError::Crawl(err.to_string()),
        }
    }
}
