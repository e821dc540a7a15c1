//! # trawl - A Polite, Bounded Web Crawler for Rust
//!
//! This crate discovers the pages of a single website and extracts their plain
//! text, keyed by URL. It is built to be a good citizen on the sites it visits
//! and to keep going when individual pages fail.
//!
//! ## Features
//!
//! - Sitemap-first discovery, including nested sitemap indexes
//! - Breadth-first link following with depth and page budgets
//! - robots.txt compliance and a session-wide request delay
//! - Same-site link confinement with optional regex URL filters
//! - Text extraction from HTML, Markdown, plain text and PDF sources
//! - Per-URL failure reporting and cooperative cancellation
//! - Async API with Tokio
//!
//! ## Example
//!
//! ```rust,no_run
//! use trawl::crawler::{CrawlLimits, Crawler, CrawlerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CrawlerConfig::builder()
//!         .max_depth(1)
//!         .max_pages(5)
//!         .crawl_delay_secs(0.5)
//!         .build();
//!     let crawler = Crawler::new(config)?;
//!
//!     let report = crawler
//!         .crawl_with_depth("https://docs.example.com/", CrawlLimits::default())
//!         .await?;
//!
//!     for (url, text) in &report.pages {
//!         println!("{}: {} characters", url, text.len());
//!     }
//!     Ok(())
//! }
//! ```

mod error;

pub mod crawler;
pub mod http;

pub use error::{Error, Result};

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::crawler::{CrawlError, CrawlLimits, CrawlReport, Crawler, CrawlerConfig, Document};
    pub use crate::error::Error;
    pub use crate::error::Result;
}
