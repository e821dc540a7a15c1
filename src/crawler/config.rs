//! # Crawler Configuration Module
//!
//! This module provides the configuration bundle for a crawl session: politeness
//! settings, crawl budgets, URL filters and request timeouts. It uses a builder
//! pattern for flexible configuration.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: The session-wide configuration struct
//! - `CrawlerConfigBuilder`: Builder pattern implementation for easier configuration
//! - `CrawlLimits`: Per-call overrides for the depth-bounded crawl
//!
//! ## Features
//!
//! - Defaults suitable for polite crawling (robots.txt on, one second between requests)
//! - Fine-grained control over crawl budgets (depth, pages)
//! - Regex URL filters applied to discovered links
//! - User-agent customization

use std::time::Duration;

use crate::http::DEFAULT_USER_AGENT;

/// Configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Whether to respect robots.txt
    pub respect_robots_txt: bool,

    /// Minimum delay between two outbound requests in the session
    pub crawl_delay: Duration,

    /// Maximum number of pages to record
    pub max_pages: u32,

    /// Maximum link depth from the start URL
    pub max_depth: u32,

    /// User agent to use for requests
    pub user_agent: String,

    /// Regular expressions a discovered link must match (any of them)
    pub url_patterns: Vec<String>,

    /// Timeout for page, sitemap and robots.txt GET requests
    pub request_timeout: Duration,

    /// Timeout for the sitemap existence check
    pub head_timeout: Duration,

    /// How many levels of nested sitemap indexes to follow
    pub max_sitemap_depth: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            respect_robots_txt: true,
            crawl_delay: Duration::from_secs(1),
            max_pages: 100,
            max_depth: 3,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            url_patterns: Vec::new(),
            request_timeout: Duration::from_secs(30),
            head_timeout: Duration::from_secs(10),
            max_sitemap_depth: 5,
        }
    }
}

/// Builder for CrawlerConfig
#[derive(Debug, Default)]
pub struct CrawlerConfigBuilder {
    config: CrawlerConfig,
}

impl CrawlerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
        }
    }

    /// Set whether to respect robots.txt
    pub fn respect_robots_txt(mut self, respect_robots_txt: bool) -> Self {
        self.config.respect_robots_txt = respect_robots_txt;
        self
    }

    /// Set the delay between requests
    pub fn crawl_delay(mut self, crawl_delay: Duration) -> Self {
        self.config.crawl_delay = crawl_delay;
        self
    }

    /// Set the delay between requests in (fractional) seconds.
    ///
    /// Negative or non-finite values disable the delay.
    pub fn crawl_delay_secs(mut self, secs: f64) -> Self {
        self.config.crawl_delay = Duration::try_from_secs_f64(secs).unwrap_or_default();
        self
    }

    /// Set the maximum number of pages to crawl
    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Set the maximum depth to crawl
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the URL patterns discovered links must match
    pub fn url_patterns(mut self, url_patterns: Vec<String>) -> Self {
        self.config.url_patterns = url_patterns;
        self
    }

    /// Set the GET request timeout
    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.config.request_timeout = request_timeout;
        self
    }

    /// Set the HEAD request timeout
    pub fn head_timeout(mut self, head_timeout: Duration) -> Self {
        self.config.head_timeout = head_timeout;
        self
    }

    /// Set how deep nested sitemap indexes are followed
    pub fn max_sitemap_depth(mut self, max_sitemap_depth: usize) -> Self {
        self.config.max_sitemap_depth = max_sitemap_depth;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CrawlerConfig {
        self.config
    }
}

impl CrawlerConfig {
    /// Create a new builder
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::new()
    }

    /// Resolve per-call overrides against this configuration
    pub(crate) fn effective_limits(&self, limits: &CrawlLimits) -> (u32, u32, Vec<String>) {
        (
            limits.max_depth.unwrap_or(self.max_depth),
            limits.max_pages.unwrap_or(self.max_pages),
            limits
                .url_patterns
                .clone()
                .unwrap_or_else(|| self.url_patterns.clone()),
        )
    }
}

/// Overrides for a single depth-bounded crawl.
///
/// `None` falls back to the crawler's [`CrawlerConfig`].
#[derive(Debug, Clone, Default)]
pub struct CrawlLimits {
    /// Maximum link depth for this crawl
    pub max_depth: Option<u32>,

    /// Maximum number of pages for this crawl
    pub max_pages: Option<u32>,

    /// URL patterns for this crawl
    pub url_patterns: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_polite() {
        let config = CrawlerConfig::default();
        assert!(config.respect_robots_txt);
        assert_eq!(config.crawl_delay, Duration::from_secs(1));
        assert_eq!(config.max_pages, 100);
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.head_timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("trawl/"));
    }

    #[test]
    fn test_builder() {
        let config = CrawlerConfig::builder()
            .respect_robots_txt(false)
            .crawl_delay_secs(0.25)
            .max_pages(5)
            .max_depth(1)
            .user_agent("test-agent")
            .url_patterns(vec!["/docs/".to_string()])
            .build();

        assert!(!config.respect_robots_txt);
        assert_eq!(config.crawl_delay, Duration::from_millis(250));
        assert_eq!(config.max_pages, 5);
        assert_eq!(config.max_depth, 1);
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.url_patterns, vec!["/docs/".to_string()]);
    }

    #[test]
    fn test_invalid_delay_disables_throttling() {
        let config = CrawlerConfig::builder().crawl_delay_secs(-3.0).build();
        assert_eq!(config.crawl_delay, Duration::ZERO);

        let config = CrawlerConfig::builder().crawl_delay_secs(f64::NAN).build();
        assert_eq!(config.crawl_delay, Duration::ZERO);
    }

    #[test]
    fn test_limits_override_config() {
        let config = CrawlerConfig::builder().max_depth(3).max_pages(100).build();

        let (depth, pages, patterns) = config.effective_limits(&CrawlLimits::default());
        assert_eq!((depth, pages), (3, 100));
        assert!(patterns.is_empty());

        let limits = CrawlLimits {
            max_depth: Some(0),
            max_pages: Some(1),
            url_patterns: Some(vec!["blog".to_string()]),
        };
        let (depth, pages, patterns) = config.effective_limits(&limits);
        assert_eq!((depth, pages), (0, 1));
        assert_eq!(patterns, vec!["blog".to_string()]);
    }
}
