//! Content extraction functionality for the crawler module
//!
//! Turns raw HTML into whitespace-normalized plain text and a filtered list of
//! outbound links. HTML parsing is synchronous; the only asynchronous step is
//! the robots.txt check on each candidate link.

use regex::Regex;
use scraper::{Html, Node, Selector};
use tracing::{debug, info};
use url::Url;

use crate::crawler::error::CrawlError;
use crate::crawler::politeness::PolitenessGate;

/// Elements whose text never counts as page content
const EXCLUDED_ELEMENTS: &[&str] = &["script", "style", "header", "footer", "nav"];

/// Regular expressions a URL must match; an empty set matches everything
#[derive(Debug, Clone, Default)]
pub struct UrlPatterns {
    patterns: Vec<Regex>,
}

impl UrlPatterns {
    /// Compile a list of patterns
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, CrawlError> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Whether no patterns are configured
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether `url` matches at least one pattern (always true when empty)
    pub fn matches(&self, url: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.is_match(url))
    }
}

/// Collapse every run of whitespace, newlines included, into a single space
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract readable text from an HTML document.
///
/// Script, style, header, footer and nav subtrees are dropped; the remaining
/// text nodes are joined with spaces and whitespace is collapsed.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut pieces = Vec::new();
    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let excluded = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| EXCLUDED_ELEMENTS.contains(&el.name()))
        });
        if !excluded {
            pieces.push(&**text);
        }
    }

    let text = collapse_whitespace(&pieces.join(" "));
    debug!("Extracted {} characters of text content", text.len());
    text
}

/// Every anchor `href` in document order
fn anchor_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .collect()
}

/// Whether `host` is `base_host` or one of its subdomains
pub fn is_same_site(host: &str, base_host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let base_host = base_host.to_ascii_lowercase();
    host == base_host || host.ends_with(&format!(".{}", base_host))
}

/// Whether `href` is an absolute URL with a non-empty authority.
///
/// `Url` parses `https:///path` with `path` as its host, so the raw text is
/// checked too.
fn is_absolute_with_authority(href: &str) -> bool {
    let has_authority = href
        .split_once("://")
        .is_some_and(|(_, rest)| !rest.is_empty() && !rest.starts_with('/'));
    has_authority && Url::parse(href).is_ok_and(|u| u.has_host())
}

/// Links that pass the syntactic, domain and pattern filters
///
/// # Arguments
///
/// * `html` - The HTML document to scan for anchors
/// * `base_url` - URL the document was fetched from. With a base, hrefs are
///   resolved against it and confined to the base host or its subdomains.
///   Without one, hrefs must already be absolute and are kept verbatim.
/// * `patterns` - Regular expressions a link must match (any of them)
///
/// # Returns
///
/// The surviving links in document order, duplicates included
pub fn candidate_links(html: &str, base_url: Option<&str>, patterns: &UrlPatterns) -> Vec<String> {
    let hrefs = anchor_hrefs(html);

    let Some(base_url) = base_url else {
        return hrefs
            .into_iter()
            .filter(|href| is_absolute_with_authority(href))
            .filter(|href| patterns.matches(href))
            .collect();
    };

    let base = match Url::parse(base_url) {
        Ok(base) => base,
        Err(e) => {
            debug!("Cannot resolve links against {}: {}", base_url, e);
            return Vec::new();
        }
    };
    let Some(base_host) = base.host_str() else {
        return Vec::new();
    };

    hrefs
        .iter()
        .filter_map(|href| base.join(href).ok())
        .filter(|url| url.host_str().is_some_and(|host| is_same_site(host, base_host)))
        .map(String::from)
        .filter(|url| patterns.matches(url))
        .collect()
}

/// Extract outbound links from an HTML document
///
/// # Arguments
///
/// * `html` - The HTML document to scan for anchors
/// * `base_url` - URL the document was fetched from, if any
/// * `patterns` - Regular expressions a link must match (any of them)
/// * `gate` - The session's politeness gate, consulted for every candidate
///
/// # Returns
///
/// The links from [`candidate_links`] that robots.txt permits, in document
/// order with duplicates kept
pub async fn extract_links(
    html: &str,
    base_url: Option<&str>,
    patterns: &UrlPatterns,
    gate: &PolitenessGate,
) -> Vec<String> {
    let candidates = candidate_links(html, base_url, patterns);

    let mut links = Vec::with_capacity(candidates.len());
    for link in candidates {
        if gate.can_fetch(&link).await {
            links.push(link);
        }
    }

    info!("Extracted {} links", links.len());
    links
}
