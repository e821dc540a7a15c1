//! Frontier traversal engine
//!
//! Seeds the frontier from the site's sitemap, then drains it breadth-first,
//! following same-site links until the depth or page budget runs out.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::crawler::config::{CrawlLimits, CrawlerConfig};
use crate::crawler::content_extraction::UrlPatterns;
use crate::crawler::dispatcher::Dispatcher;
use crate::crawler::error::CrawlError;
use crate::crawler::frontier::Frontier;
use crate::crawler::politeness::PolitenessGate;
use crate::crawler::sitemap::{sitemap_url_for, SitemapResolver};
use crate::crawler::{CrawlReport, Document};
use crate::http::{Fetcher, HttpClient};

/// A crawl session.
///
/// The robots.txt cache and the request pacing window live as long as the
/// crawler and are shared by every crawl it runs. Each crawl gets its own
/// frontier and visited set.
pub struct Crawler {
    config: CrawlerConfig,
    fetcher: Arc<dyn Fetcher>,
    gate: Arc<PolitenessGate>,
    sitemaps: SitemapResolver,
}

impl Crawler {
    /// Create a crawler that talks HTTP with the configured user agent
    pub fn new(config: CrawlerConfig) -> Result<Self, CrawlError> {
        let client = HttpClient::with_user_agent(&config.user_agent)?;
        Ok(Self::with_fetcher(config, Arc::new(client)))
    }

    /// Create a crawler on top of an arbitrary transport
    pub fn with_fetcher(config: CrawlerConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let gate = Arc::new(PolitenessGate::new(
            fetcher.clone(),
            config.respect_robots_txt,
            config.crawl_delay,
            config.request_timeout,
        ));
        let sitemaps = SitemapResolver::new(
            fetcher.clone(),
            gate.clone(),
            config.request_timeout,
            config.head_timeout,
            config.max_sitemap_depth,
        );
        Self {
            config,
            fetcher,
            gate,
            sitemaps,
        }
    }

    /// The session configuration
    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// The session's politeness gate
    pub fn gate(&self) -> &PolitenessGate {
        &self.gate
    }

    /// The session's sitemap resolver
    pub fn sitemaps(&self) -> &SitemapResolver {
        &self.sitemaps
    }

    /// A dispatcher bound to this session, with no link patterns
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.fetcher.clone(), self.gate.clone(), self.config.request_timeout)
    }

    /// Process a single path or URL within this session
    pub async fn process(&self, input: &str) -> Document {
        self.dispatcher().process(input).await
    }

    /// Crawl from `start_url` using the configured budgets
    pub async fn crawl(&self, start_url: &str) -> Result<CrawlReport, CrawlError> {
        self.crawl_with_depth(start_url, CrawlLimits::default()).await
    }

    /// Crawl from `start_url` with per-call budget overrides
    pub async fn crawl_with_depth(
        &self,
        start_url: &str,
        limits: CrawlLimits,
    ) -> Result<CrawlReport, CrawlError> {
        self.crawl_with_cancel(start_url, limits, CancellationToken::new())
            .await
    }

    /// Crawl from `start_url` until the budgets run out or `cancel` fires.
    ///
    /// Only an invalid start URL or an invalid pattern fails the call. Every
    /// per-URL problem ends up in [`CrawlReport::failures`]. A cancelled crawl
    /// returns the pages recorded so far with `cancelled` set.
    #[instrument(skip(self, limits, cancel))]
    pub async fn crawl_with_cancel(
        &self,
        start_url: &str,
        limits: CrawlLimits,
        cancel: CancellationToken,
    ) -> Result<CrawlReport, CrawlError> {
        validate_start_url(start_url)?;
        let (max_depth, max_pages, patterns) = self.config.effective_limits(&limits);
        let patterns = UrlPatterns::new(&patterns)?;

        info!(max_depth, max_pages, "Starting crawl for {}", start_url);

        let dispatcher = self.dispatcher().with_patterns(patterns.clone());
        let mut report = CrawlReport::new(start_url);
        let mut frontier = Frontier::new();

        let seeds = tokio::select! {
            biased;
            _ = cancel.cancelled() => Vec::new(),
            seeds = self.sitemap_seeds(start_url) => seeds,
        };
        for url in seeds {
            if is_web_url(&url) {
                frontier.push(url, 0);
            }
        }
        frontier.push(start_url, 0);

        let mut pages_processed: u32 = 0;
        while pages_processed < max_pages && !frontier.is_empty() {
            if cancel.is_cancelled() {
                break;
            }
            let Some(entry) = frontier.pop() else {
                break;
            };
            if frontier.is_visited(&entry.url) || entry.depth > max_depth {
                continue;
            }
            frontier.mark_visited(&entry.url);
            debug!(depth = entry.depth, "Crawling {}", entry.url);

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = dispatcher.try_process(&entry.url) => outcome,
            };

            let document = match outcome {
                Ok(document) => document,
                Err(e) => {
                    warn!("Error crawling {}: {}", entry.url, e);
                    report.failures.insert(entry.url, e.to_string());
                    continue;
                }
            };

            let text = match document.text {
                Some(text) if !text.is_empty() => text,
                _ => {
                    let reason = CrawlError::EmptyContent(entry.url.clone());
                    debug!("{}", reason);
                    report.failures.insert(entry.url, reason.to_string());
                    continue;
                }
            };

            report.pages.insert(entry.url.clone(), text);
            pages_processed += 1;
            info!(
                pending = frontier.len(),
                "Processed page {}/{}: {}",
                pages_processed,
                max_pages,
                entry.url
            );

            if pages_processed >= max_pages {
                info!("Reached maximum page count ({})", max_pages);
                break;
            }

            if entry.depth < max_depth {
                for link in document.links {
                    if patterns.matches(&link) && is_web_url(&link) {
                        frontier.push(link, entry.depth + 1);
                    }
                }
            }
        }

        report.cancelled = cancel.is_cancelled();
        if report.cancelled {
            info!("Crawl of {} cancelled", start_url);
        }

        info!(
            pages = report.pages.len(),
            failures = report.failures.len(),
            dispatched = frontier.visited_count(),
            "Finished crawl for {}",
            start_url
        );
        Ok(report.finish())
    }

    async fn sitemap_seeds(&self, start_url: &str) -> Vec<String> {
        let sitemap_url = match sitemap_url_for(start_url) {
            Ok(sitemap_url) => sitemap_url,
            Err(e) => {
                warn!("Error locating sitemap for {}: {}", start_url, e);
                return Vec::new();
            }
        };
        if !self.gate.can_fetch(&sitemap_url).await {
            info!("robots.txt disallows {}, skipping sitemap", sitemap_url);
            return Vec::new();
        }
        if !self.sitemaps.has_sitemap(start_url).await {
            debug!("No sitemap found for {}", start_url);
            return Vec::new();
        }
        self.sitemaps.resolve(&sitemap_url).await
    }
}

impl std::fmt::Debug for Crawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn is_web_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
}

fn validate_start_url(start_url: &str) -> Result<(), CrawlError> {
    if is_web_url(start_url) {
        Ok(())
    } else {
        Err(CrawlError::InvalidUrl(start_url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::StaticFetcher;
    use std::time::{Duration, Instant};

    const ROOT: &str = "https://docs.example.com/";

    fn config() -> CrawlerConfig {
        CrawlerConfig::builder()
            .crawl_delay(Duration::ZERO)
            .max_depth(1)
            .max_pages(5)
            .build()
    }

    fn crawler(fetcher: &Arc<StaticFetcher>, config: CrawlerConfig) -> Crawler {
        Crawler::with_fetcher(config, fetcher.clone())
    }

    fn docs_site() -> StaticFetcher {
        StaticFetcher::new()
            .html(
                ROOT,
                r#"<h1>Docs home</h1>
                   <a href="/guide">Guide</a>
                   <a href="/api">API</a>
                   <a href="https://blog.docs.example.com/news">News</a>
                   <a href="https://elsewhere.org/">Elsewhere</a>"#,
            )
            .html(
                "https://docs.example.com/guide",
                r#"<p>Guide</p><a href="/guide/deep">Deeper</a>"#,
            )
            .html("https://docs.example.com/api", "<p>API reference</p>")
            .html("https://blog.docs.example.com/news", "<p>News</p>")
            .html("https://docs.example.com/guide/deep", "<p>Deep</p>")
            .html("https://elsewhere.org/", "<p>Elsewhere</p>")
    }

    #[tokio::test]
    async fn test_crawl_follows_same_site_links_to_depth() {
        let fetcher = Arc::new(docs_site());
        let report = crawler(&fetcher, config()).crawl(ROOT).await.unwrap();

        let urls: Vec<_> = report.pages.keys().cloned().collect();
        assert_eq!(
            urls,
            vec![
                ROOT.to_string(),
                "https://docs.example.com/guide".to_string(),
                "https://docs.example.com/api".to_string(),
                "https://blog.docs.example.com/news".to_string(),
            ]
        );
        assert_eq!(report.pages[ROOT], "Docs home Guide API News Elsewhere");
        assert!(!report.pages.contains_key("https://elsewhere.org/"));
        // Depth 2 is beyond the budget
        assert_eq!(fetcher.count("GET https://docs.example.com/guide/deep"), 0);
        assert!(!report.cancelled);
        assert!(report.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_depth_zero_crawls_only_the_start_page() {
        let fetcher = Arc::new(docs_site());
        let limits = CrawlLimits {
            max_depth: Some(0),
            ..Default::default()
        };
        let report = crawler(&fetcher, config())
            .crawl_with_depth(ROOT, limits)
            .await
            .unwrap();

        assert_eq!(report.pages.len(), 1);
        assert!(report.pages.contains_key(ROOT));
    }

    #[tokio::test]
    async fn test_page_budget_stops_the_crawl() {
        let fetcher = Arc::new(docs_site());
        let limits = CrawlLimits {
            max_pages: Some(2),
            ..Default::default()
        };
        let report = crawler(&fetcher, config())
            .crawl_with_depth(ROOT, limits)
            .await
            .unwrap();

        assert_eq!(report.pages.len(), 2);
        assert_eq!(fetcher.count("GET https://docs.example.com/api"), 0);
    }

    #[tokio::test]
    async fn test_zero_page_budget_fetches_nothing() {
        let fetcher = Arc::new(docs_site());
        let limits = CrawlLimits {
            max_pages: Some(0),
            ..Default::default()
        };
        let report = crawler(&fetcher, config())
            .crawl_with_depth(ROOT, limits)
            .await
            .unwrap();

        assert!(report.is_empty());
        assert_eq!(fetcher.count(&format!("GET {ROOT}")), 0);
    }

    #[tokio::test]
    async fn test_sitemap_urls_are_crawled_first_and_once() {
        let sitemap = r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url><loc>https://docs.example.com/api</loc></url>
              <url><loc>https://docs.example.com/guide</loc></url>
            </urlset>"#;
        let fetcher = Arc::new(docs_site().page(
            "https://docs.example.com/sitemap.xml",
            "application/xml",
            sitemap,
        ));
        let report = crawler(&fetcher, config()).crawl(ROOT).await.unwrap();

        let urls: Vec<_> = report.pages.keys().cloned().collect();
        assert_eq!(urls[0], "https://docs.example.com/api");
        assert_eq!(urls[1], "https://docs.example.com/guide");
        assert_eq!(urls[2], ROOT);
        // Linked from the root as well, but dispatched only once
        assert_eq!(fetcher.count("GET https://docs.example.com/api"), 1);
        assert_eq!(fetcher.count("GET https://docs.example.com/guide"), 1);
        // Sitemap pages sit at depth 0, so their links are followed
        assert!(report.pages.contains_key("https://docs.example.com/guide/deep"));
    }

    #[tokio::test]
    async fn test_failures_are_recorded_and_skipped() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .html(
                    ROOT,
                    r#"<p>Home</p><a href="/gone">Gone</a><a href="/down">Down</a><a href="/blank">Blank</a>"#,
                )
                .status("https://docs.example.com/gone", 410)
                .failing("https://docs.example.com/down")
                .html("https://docs.example.com/blank", "<script>only()</script>"),
        );
        let report = crawler(&fetcher, config()).crawl(ROOT).await.unwrap();

        assert_eq!(report.pages.len(), 1);
        assert_eq!(report.failures.len(), 3);
        assert!(report.failures["https://docs.example.com/gone"].contains("410"));
        assert!(report.failures.contains_key("https://docs.example.com/down"));
        assert!(report.failures["https://docs.example.com/blank"].contains("No text"));
    }

    #[tokio::test]
    async fn test_robots_disallowed_pages_are_never_fetched() {
        let fetcher = Arc::new(docs_site().page(
            "https://docs.example.com/robots.txt",
            "text/plain",
            "User-agent: *\nDisallow: /api\n",
        ));
        let config = CrawlerConfig::builder()
            .crawl_delay(Duration::ZERO)
            .max_depth(1)
            .respect_robots_txt(true)
            .build();
        let report = crawler(&fetcher, config).crawl(ROOT).await.unwrap();

        assert!(!report.pages.contains_key("https://docs.example.com/api"));
        assert_eq!(fetcher.count("GET https://docs.example.com/api"), 0);
        assert_eq!(fetcher.count("GET https://docs.example.com/robots.txt"), 1);
    }

    #[tokio::test]
    async fn test_patterns_restrict_followed_links() {
        let fetcher = Arc::new(docs_site());
        let limits = CrawlLimits {
            url_patterns: Some(vec!["/guide".to_string()]),
            ..Default::default()
        };
        let report = crawler(&fetcher, config())
            .crawl_with_depth(ROOT, limits)
            .await
            .unwrap();

        let urls: Vec<_> = report.pages.keys().cloned().collect();
        assert_eq!(
            urls,
            vec![ROOT.to_string(), "https://docs.example.com/guide".to_string()]
        );
    }

    #[tokio::test]
    async fn test_cancelled_crawl_returns_partial_report() {
        let fetcher = Arc::new(docs_site());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = crawler(&fetcher, config())
            .crawl_with_cancel(ROOT, CrawlLimits::default(), cancel)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert!(report.is_empty());
        assert_eq!(fetcher.count(&format!("GET {ROOT}")), 0);
    }

    #[tokio::test]
    async fn test_crawl_spaces_every_request() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .html("https://a.com/", r#"<p>Start</p><a href="/b">B</a>"#)
                .html("https://a.com/b", "<p>B</p>"),
        );
        let config = CrawlerConfig::builder()
            .crawl_delay(Duration::from_millis(200))
            .respect_robots_txt(false)
            .max_depth(1)
            .build();

        let start = Instant::now();
        let report = crawler(&fetcher, config).crawl("https://a.com/").await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(report.pages.len(), 2);
        assert_eq!(
            fetcher.requests(),
            vec![
                "HEAD https://a.com/sitemap.xml".to_string(),
                "GET https://a.com/".to_string(),
                "GET https://a.com/b".to_string(),
            ]
        );
        // Three requests, two full delay windows between them
        assert!(elapsed >= Duration::from_millis(390), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn test_sitemap_is_skipped_when_robots_disallows_it() {
        let sitemap = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url><loc>https://docs.example.com/api</loc></url>
            </urlset>"#;
        let fetcher = Arc::new(
            docs_site()
                .page("https://docs.example.com/sitemap.xml", "application/xml", sitemap)
                .page(
                    "https://docs.example.com/robots.txt",
                    "text/plain",
                    "User-agent: *\nDisallow: /sitemap.xml\n",
                ),
        );
        let limits = CrawlLimits {
            max_depth: Some(0),
            ..Default::default()
        };
        let report = crawler(&fetcher, config())
            .crawl_with_depth(ROOT, limits)
            .await
            .unwrap();

        assert_eq!(fetcher.count("HEAD https://docs.example.com/sitemap.xml"), 0);
        assert_eq!(fetcher.count("GET https://docs.example.com/sitemap.xml"), 0);
        let urls: Vec<_> = report.pages.keys().cloned().collect();
        assert_eq!(urls, vec![ROOT.to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_input_fails_the_call() {
        let fetcher = Arc::new(StaticFetcher::new());
        let crawler = crawler(&fetcher, config());

        assert!(matches!(
            crawler.crawl("not a url").await,
            Err(CrawlError::InvalidUrl(_))
        ));
        assert!(matches!(
            crawler.crawl("ftp://example.com/").await,
            Err(CrawlError::InvalidUrl(_))
        ));

        let limits = CrawlLimits {
            url_patterns: Some(vec!["[".to_string()]),
            ..Default::default()
        };
        assert!(matches!(
            crawler.crawl_with_depth(ROOT, limits).await,
            Err(CrawlError::InvalidPattern(_))
        ));
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_robots_cache_survives_across_crawls() {
        let fetcher = Arc::new(docs_site());
        let config = CrawlerConfig::builder()
            .crawl_delay(Duration::ZERO)
            .max_depth(0)
            .respect_robots_txt(true)
            .build();
        let crawler = crawler(&fetcher, config);

        crawler.crawl(ROOT).await.unwrap();
        crawler.crawl(ROOT).await.unwrap();

        assert_eq!(fetcher.count("GET https://docs.example.com/robots.txt"), 1);
        assert_eq!(fetcher.count(&format!("GET {ROOT}")), 2);
    }
}
