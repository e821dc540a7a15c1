//! XML sitemap discovery and resolution
//!
//! Sitemaps are read with a namespace-aware reader; only elements in the
//! sitemaps.org 0.9 namespace are considered. Sitemap indexes are followed
//! recursively up to a configured depth, and a sitemap is never fetched twice
//! within one resolution.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::crawler::error::CrawlError;
use crate::crawler::politeness::PolitenessGate;
use crate::http::Fetcher;

/// Namespace of sitemap protocol elements
pub const SITEMAP_NS: &[u8] = b"http://www.sitemaps.org/schemas/sitemap/0.9";

/// Textual marker identifying a sitemap index document
const INDEX_MARKER: &str = "<sitemapindex";

/// A parsed sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// A sitemap index listing child sitemap URLs
    Index(Vec<String>),
    /// A leaf sitemap listing page URLs
    UrlSet(Vec<String>),
}

/// Parse a sitemap body
///
/// # Arguments
///
/// * `xml` - The sitemap document. A body containing `<sitemapindex` is read
///   as an index (`<sitemap><loc>`), anything else as a url set (`<url><loc>`).
///
/// # Returns
///
/// The `<loc>` values in document order, or an error for malformed XML
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, CrawlError> {
    if xml.contains(INDEX_MARKER) {
        collect_locs(xml, b"sitemap").map(SitemapDocument::Index)
    } else {
        collect_locs(xml, b"url").map(SitemapDocument::UrlSet)
    }
}

/// Collect the text of every `<{entry}><loc>` pair in the sitemap namespace
fn collect_locs(xml: &str, entry: &[u8]) -> Result<Vec<String>, CrawlError> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    // Local name of each open element, `None` when outside the sitemap namespace
    let mut stack: Vec<Option<Vec<u8>>> = Vec::new();
    let mut locs = Vec::new();
    let mut current = String::new();
    let mut seen_root = false;

    loop {
        let (ns, event) = reader.read_resolved_event()?;
        let in_ns = matches!(ns, ResolveResult::Bound(Namespace(n)) if n == SITEMAP_NS);

        match event {
            Event::Start(start) => {
                seen_root = true;
                let name = in_ns.then(|| start.local_name().as_ref().to_vec());
                stack.push(name);
                current.clear();
            }
            Event::Empty(_) => seen_root = true,
            Event::Text(text) if in_loc(&stack, entry) => {
                let text = text
                    .unescape()
                    .map_err(|e| CrawlError::Sitemap(e.to_string()))?;
                current.push_str(&text);
            }
            Event::CData(data) if in_loc(&stack, entry) => {
                current.push_str(&String::from_utf8_lossy(&data));
            }
            Event::End(_) => {
                if in_loc(&stack, entry) {
                    let loc = current.trim();
                    if !loc.is_empty() {
                        locs.push(loc.to_string());
                    }
                    current.clear();
                }
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(CrawlError::Sitemap("unexpected end of document".to_string()));
    }
    if !seen_root {
        return Err(CrawlError::Sitemap("document has no root element".to_string()));
    }
    Ok(locs)
}

fn in_loc(stack: &[Option<Vec<u8>>], entry: &[u8]) -> bool {
    match stack {
        [.., Some(parent), Some(leaf)] => parent == entry && leaf == b"loc",
        _ => false,
    }
}

/// URL of the conventional sitemap for the site hosting `base_url`
pub fn sitemap_url_for(base_url: &str) -> Result<String, CrawlError> {
    let base = Url::parse(base_url)?;
    Ok(base.join("/sitemap.xml")?.to_string())
}

/// Fetches sitemaps and flattens them into page URLs
pub struct SitemapResolver {
    fetcher: Arc<dyn Fetcher>,
    gate: Arc<PolitenessGate>,
    request_timeout: Duration,
    head_timeout: Duration,
    max_depth: usize,
}

impl SitemapResolver {
    /// Create a resolver sharing the session's politeness gate
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        gate: Arc<PolitenessGate>,
        request_timeout: Duration,
        head_timeout: Duration,
        max_depth: usize,
    ) -> Self {
        Self {
            fetcher,
            gate,
            request_timeout,
            head_timeout,
            max_depth,
        }
    }

    /// Whether `{site}/sitemap.xml` answers a HEAD request with 200
    #[instrument(skip(self))]
    pub async fn has_sitemap(&self, base_url: &str) -> bool {
        let sitemap_url = match sitemap_url_for(base_url) {
            Ok(url) => url,
            Err(e) => {
                warn!("Error checking sitemap for {}: {}", base_url, e);
                return false;
            }
        };

        self.gate.throttle().await;
        match self.fetcher.head(&sitemap_url, self.head_timeout).await {
            Ok(status) => status == 200,
            Err(e) => {
                warn!("Error checking sitemap at {}: {}", sitemap_url, e);
                false
            }
        }
    }

    /// Resolve a sitemap into the page URLs it lists.
    ///
    /// Indexes are expanded recursively, children flattened in document
    /// order. Every failure yields an empty list for the affected sitemap.
    #[instrument(skip(self))]
    pub async fn resolve(&self, sitemap_url: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let urls = self.resolve_nested(sitemap_url.to_string(), 0, &mut seen).await;
        info!("Found {} URLs in sitemap {}", urls.len(), sitemap_url);
        urls
    }

    fn resolve_nested<'a>(
        &'a self,
        sitemap_url: String,
        depth: usize,
        seen: &'a mut HashSet<String>,
    ) -> BoxFuture<'a, Vec<String>> {
        Box::pin(async move {
            if depth > self.max_depth {
                warn!("Sitemap nesting too deep, skipping {}", sitemap_url);
                return Vec::new();
            }
            if !seen.insert(sitemap_url.clone()) {
                warn!("Sitemap cycle detected at {}", sitemap_url);
                return Vec::new();
            }

            let document = match self.fetch_document(&sitemap_url).await {
                Ok(Some(document)) => document,
                Ok(None) => return Vec::new(),
                Err(e) => {
                    warn!("Failed to parse sitemap {}: {}", sitemap_url, e);
                    return Vec::new();
                }
            };

            match document {
                SitemapDocument::UrlSet(urls) => urls,
                SitemapDocument::Index(children) => {
                    debug!("Sitemap index {} lists {} sitemaps", sitemap_url, children.len());
                    let mut urls = Vec::new();
                    for child in children {
                        urls.extend(self.resolve_nested(child, depth + 1, seen).await);
                    }
                    urls
                }
            }
        })
    }

    async fn fetch_document(&self, sitemap_url: &str) -> Result<Option<SitemapDocument>, CrawlError> {
        debug!("Parsing sitemap: {}", sitemap_url);
        self.gate.throttle().await;
        let response = self.fetcher.get(sitemap_url, self.request_timeout).await?;
        if !response.is_ok() {
            warn!("Failed to fetch sitemap {}: HTTP {}", sitemap_url, response.status);
            return Ok(None);
        }
        parse_sitemap(&response.text()).map(Some)
    }
}
