//! Single-document dispatch
//!
//! Routes a path or URL to the matching extraction path and returns the
//! document's text and links. Used on its own and as the per-URL worker of
//! the traversal engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use lopdf::Document as PdfDocument;
use pulldown_cmark::{html, Options, Parser};
use tracing::{debug, instrument, warn};

use crate::crawler::content_extraction::{
    collapse_whitespace, extract_links, extract_text, UrlPatterns,
};
use crate::crawler::error::CrawlError;
use crate::crawler::politeness::PolitenessGate;
use crate::crawler::Document;
use crate::http::Fetcher;

/// Shape of a dispatcher input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    /// An `http://` or `https://` URL
    Web(String),
    /// A Markdown file (`.md`)
    Markdown(PathBuf),
    /// A plain text file (`.txt`)
    PlainText(PathBuf),
    /// A PDF file (`.pdf`)
    Pdf(PathBuf),
    /// Anything else
    Unsupported(String),
}

impl DocumentKind {
    /// Classify a path or URL
    pub fn classify(input: &str) -> Self {
        if input.starts_with("http://") || input.starts_with("https://") {
            Self::Web(input.to_string())
        } else if input.ends_with(".md") {
            Self::Markdown(PathBuf::from(input))
        } else if input.ends_with(".txt") {
            Self::PlainText(PathBuf::from(input))
        } else if input.ends_with(".pdf") {
            Self::Pdf(PathBuf::from(input))
        } else {
            Self::Unsupported(input.to_string())
        }
    }
}

/// Render Markdown into a minimal standalone HTML page
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut body = String::new();
    html::push_html(&mut body, Parser::new_ext(markdown, options));
    format!("<html><body>{}</body></html>", body)
}

/// Text of every page of a PDF, in page order
pub fn pdf_pages(bytes: &[u8]) -> Result<Vec<String>, CrawlError> {
    let document = PdfDocument::load_mem(bytes)?;
    let pages = document
        .get_pages()
        .into_keys()
        .map(|number| {
            document.extract_text(&[number]).unwrap_or_else(|e| {
                warn!(page = number, "Failed to extract PDF page text: {}", e);
                String::new()
            })
        })
        .collect();
    Ok(pages)
}

async fn pdf_text(bytes: Vec<u8>) -> Result<String, CrawlError> {
    let pages = tokio::task::spawn_blocking(move || pdf_pages(&bytes)).await??;
    Ok(collapse_whitespace(&pages.join("\n")))
}

/// Extracts text and links from a single path or URL
pub struct Dispatcher {
    fetcher: Arc<dyn Fetcher>,
    gate: Arc<PolitenessGate>,
    patterns: UrlPatterns,
    request_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher sharing the session's politeness gate
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        gate: Arc<PolitenessGate>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            gate,
            patterns: UrlPatterns::default(),
            request_timeout,
        }
    }

    /// Restrict links found on web pages to URLs matching `patterns`
    pub fn with_patterns(mut self, patterns: UrlPatterns) -> Self {
        self.patterns = patterns;
        self
    }

    /// Process a path or URL.
    ///
    /// Never fails: any error is logged and turned into an empty document.
    pub async fn process(&self, input: &str) -> Document {
        match self.try_process(input).await {
            Ok(document) => document,
            Err(e) => {
                warn!("Error processing {}: {}", input, e);
                Document::default()
            }
        }
    }

    /// Process a path or URL, reporting why extraction failed
    #[instrument(skip(self))]
    pub async fn try_process(&self, input: &str) -> Result<Document, CrawlError> {
        match DocumentKind::classify(input) {
            DocumentKind::Web(url) => self.process_web(&url).await,
            DocumentKind::Markdown(path) => self.process_markdown(&path).await,
            DocumentKind::PlainText(path) => {
                let text = tokio::fs::read_to_string(&path).await?;
                Ok(Document::text_only(text))
            }
            DocumentKind::Pdf(path) => {
                let bytes = tokio::fs::read(&path).await?;
                Ok(Document::text_only(pdf_text(bytes).await?))
            }
            DocumentKind::Unsupported(input) => Err(CrawlError::Unsupported(input)),
        }
    }

    async fn process_web(&self, url: &str) -> Result<Document, CrawlError> {
        if !self.gate.can_fetch(url).await {
            return Err(CrawlError::Disallowed(url.to_string()));
        }

        self.gate.throttle().await;
        let response = self.fetcher.get(url, self.request_timeout).await?;
        if !response.is_ok() {
            return Err(CrawlError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        if response.is_pdf() {
            debug!("{} is a PDF document", url);
            return Ok(Document::text_only(pdf_text(response.body).await?));
        }

        let html = response.text();
        let text = extract_text(&html);
        let links = extract_links(&html, Some(url), &self.patterns, &self.gate).await;
        Ok(Document {
            text: Some(text),
            links,
        })
    }

    async fn process_markdown(&self, path: &Path) -> Result<Document, CrawlError> {
        let markdown = tokio::fs::read_to_string(path).await?;
        let html = markdown_to_html(&markdown);
        let text = extract_text(&html);
        // No base URL: only absolute links survive
        let links = extract_links(&html, None, &UrlPatterns::default(), &self.gate).await;
        Ok(Document {
            text: Some(text),
            links,
        })
    }
}
