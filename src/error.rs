//! Error types for the trawl crate

use thiserror::Error;

/// Result type for trawl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for trawl operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A request did not complete within its deadline
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Web crawling error
    #[error("Crawl error: {0}")]
    Crawl(String),
}
