//! # Website Crawler Module
//!
//! This module provides a polite, bounded crawler that discovers the pages of
//! a single site and returns the plain text of each one, keyed by URL.
//!
//! ## Key Components
//!
//! - `Crawler`: The frontier traversal engine; seeds from the site's sitemap and
//!   then follows links breadth-first within depth and page budgets
//! - `PolitenessGate`: Session-wide request pacing and cached robots.txt rules
//! - `SitemapResolver`: Fetches XML sitemaps and flattens sitemap indexes
//! - `Dispatcher`: Extracts text and links from a URL, Markdown, text or PDF file
//! - `CrawlerConfig`: Configuration for the crawler, including budgets and delays
//!
//! ## Features
//!
//! - Sitemap-first discovery with cycle-safe index recursion
//! - Same-site link confinement (host or subdomain) with optional regex filters
//! - robots.txt compliance that fails open when robots.txt is unavailable
//! - Per-URL failure isolation, reported alongside the extracted pages
//! - Cooperative cancellation of long crawls

mod config;
mod content_extraction;
mod dispatcher;
mod error;
mod frontier;
mod politeness;
mod sitemap;
mod traversal;

// Re-export important types and functions
pub use config::{CrawlLimits, CrawlerConfig, CrawlerConfigBuilder};
pub use content_extraction::{
    candidate_links, collapse_whitespace, extract_links, extract_text, is_same_site, UrlPatterns,
};
pub use dispatcher::{markdown_to_html, pdf_pages, Dispatcher, DocumentKind};
pub use error::CrawlError;
pub use frontier::{Frontier, FrontierEntry};
pub use politeness::{PolitenessGate, RobotRules};
pub use sitemap::{parse_sitemap, sitemap_url_for, SitemapDocument, SitemapResolver};
pub use traversal::Crawler;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Text and links extracted from a single document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Extracted plain text, `None` when extraction failed
    pub text: Option<String>,

    /// Outbound links, in document order
    pub links: Vec<String>,
}

impl Document {
    /// A document with text and no links
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            links: Vec::new(),
        }
    }
}

/// Outcome of a depth-bounded crawl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    /// URL the crawl started from
    pub start_url: String,

    /// Extracted text keyed by URL, in crawl order
    pub pages: IndexMap<String, String>,

    /// Why each dispatched URL produced no text
    pub failures: IndexMap<String, String>,

    /// Whether the crawl was cancelled before finishing
    pub cancelled: bool,

    /// When the crawl started
    pub started_at: DateTime<Utc>,

    /// When the crawl finished
    pub finished_at: Option<DateTime<Utc>>,
}

impl CrawlReport {
    /// Start an empty report for `start_url`
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            pages: IndexMap::new(),
            failures: IndexMap::new(),
            cancelled: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Number of pages with extracted text
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether no page produced text
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serializes_pages_in_order() {
        let mut report = CrawlReport::new("https://example.com/");
        report
            .pages
            .insert("https://example.com/".to_string(), "Home".to_string());
        report
            .pages
            .insert("https://example.com/a".to_string(), "A".to_string());
        report
            .failures
            .insert("https://example.com/b".to_string(), "HTTP 404".to_string());
        let report = report.finish();

        let json = serde_json::to_string(&report).unwrap();
        let home = json.find("\"https://example.com/\":\"Home\"").unwrap();
        let a = json.find("\"https://example.com/a\":\"A\"").unwrap();
        assert!(home < a);
        assert!(json.contains("\"cancelled\":false"));
        assert_eq!(report.len(), 2);
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn test_document_text_only() {
        let document = Document::text_only("hello");
        assert_eq!(document.text.as_deref(), Some("hello"));
        assert!(document.links.is_empty());
        assert_eq!(Document::default().text, None);
    }
}
