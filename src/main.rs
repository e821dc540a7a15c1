//! # trawl CLI Application
//!
//! This module implements the command-line interface for the trawl crawler.
//!
//! ## Key Components
//!
//! - CLI argument parsing with clap
//! - Subcommands:
//!   - `crawl`: Depth-bounded crawl of a website
//!   - `process`: Text and link extraction for a single path or URL
//!   - `sitemap`: Sitemap discovery and flattening
//!
//! ## Features
//!
//! - Configurable depth, page budget, delay and URL patterns
//! - Graceful Ctrl-C cancellation that keeps the pages crawled so far
//! - Progress spinner for long-running crawls
//! - JSON report output

mod logging;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};
use trawl::crawler::{sitemap_url_for, CrawlLimits, Crawler, CrawlerConfig};
use trawl::http::DEFAULT_USER_AGENT;

#[derive(Parser)]
#[command(author, version, about = "A polite, bounded web crawler", long_about = None)]
struct Cli {
    /// Also write logs to trawl.log in this directory
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl a website and extract the text of each page
    Crawl(CrawlArgs),

    /// Extract text and links from a single file or URL
    Process(ProcessArgs),

    /// List the page URLs in a site's sitemap
    Sitemap(SitemapArgs),
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// URL to start crawling from
    #[arg(required = true)]
    url: String,

    /// Maximum link depth from the start URL
    #[arg(short, long, default_value = "3")]
    depth: u32,

    /// Maximum number of pages to crawl
    #[arg(short = 'p', long, default_value = "100")]
    max_pages: u32,

    /// Minimum delay between requests, in seconds
    #[arg(long, default_value = "1.0")]
    delay: f64,

    /// Ignore robots.txt
    #[arg(long)]
    no_robots: bool,

    /// Only follow links matching this regex (repeatable)
    #[arg(long = "pattern")]
    patterns: Vec<String>,

    /// Save the crawl report as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// User agent to send
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// Path (.md, .txt, .pdf) or http(s) URL
    #[arg(required = true)]
    input: String,

    /// Ignore robots.txt
    #[arg(long)]
    no_robots: bool,
}

#[derive(Args, Debug)]
struct SitemapArgs {
    /// Base URL of the site
    #[arg(required = true)]
    url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    logging::setup_logging(cli.log_file)?;

    // Execute the appropriate command
    match cli.command {
        Some(Commands::Crawl(args)) => {
            crawl_command(args).await?;
        }
        Some(Commands::Process(args)) => {
            process_command(args).await?;
        }
        Some(Commands::Sitemap(args)) => {
            sitemap_command(args).await?;
        }
        None => {
            // If no command is provided, show help
            let _ = Cli::parse_from(["trawl", "--help"]);
        }
    }

    Ok(())
}

#[instrument]
async fn crawl_command(args: CrawlArgs) -> anyhow::Result<()> {
    let config = CrawlerConfig::builder()
        .max_depth(args.depth)
        .max_pages(args.max_pages)
        .crawl_delay_secs(args.delay)
        .respect_robots_txt(!args.no_robots)
        .user_agent(args.user_agent)
        .url_patterns(args.patterns)
        .build();
    let crawler = Crawler::new(config)?;

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing with the pages crawled so far");
                cancel.cancel();
            }
        }
    });

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} [{elapsed_precise}] {msg}")?);
    spinner.set_message(format!("Crawling {}...", args.url));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = crawler
        .crawl_with_cancel(&args.url, CrawlLimits::default(), cancel)
        .await;
    ctrl_c.abort();
    spinner.finish_and_clear();
    let report = result?;

    println!(
        "Crawled {} pages ({} failed){}",
        report.pages.len(),
        report.failures.len(),
        if report.cancelled { ", cancelled" } else { "" }
    );

    // Save to file if output is specified
    if let Some(output_file) = args.output {
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(&output_file, json).await?;
        println!("Saved crawl report to {}", output_file.display());
    } else {
        for (url, text) in &report.pages {
            println!("  {} ({} chars)", url, text.chars().count());
        }
        for (url, reason) in &report.failures {
            println!("  ! {}: {}", url, reason);
        }
    }

    Ok(())
}

#[instrument]
async fn process_command(args: ProcessArgs) -> anyhow::Result<()> {
    let config = CrawlerConfig::builder()
        .respect_robots_txt(!args.no_robots)
        .crawl_delay(Duration::ZERO)
        .build();
    let crawler = Crawler::new(config)?;

    let document = crawler.dispatcher().try_process(&args.input).await?;
    if let Some(text) = document.text {
        println!("{}", text);
    }
    if !document.links.is_empty() {
        println!();
        println!("Links:");
        for link in document.links {
            println!("  {}", link);
        }
    }

    Ok(())
}

#[instrument]
async fn sitemap_command(args: SitemapArgs) -> anyhow::Result<()> {
    let crawler = Crawler::new(CrawlerConfig::default())?;

    if !crawler.sitemaps().has_sitemap(&args.url).await {
        bail!("No sitemap found for {}", args.url);
    }

    let sitemap_url = sitemap_url_for(&args.url)?;
    let urls = crawler.sitemaps().resolve(&sitemap_url).await;
    for url in &urls {
        println!("{}", url);
    }
    println!("Found {} URLs in {}", urls.len(), sitemap_url);

    Ok(())
}
