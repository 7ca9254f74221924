//! # Newsdesk Crawler
//!
//! Crawls a configurable set of professional-news sites (tax, compliance,
//! audit), keeps the articles that match each source's keyword filters,
//! classifies them, and writes one JSON crawl result per edition.
//!
//! ## Usage
//!
//! ```sh
//! newsdesk_crawler -j ./json -c sources.yaml
//! ```
//!
//! ## Architecture
//!
//! 1. **Config**: YAML source profiles plus CLI overrides
//! 2. **Browser**: one shared Chrome process, started only when a source needs rendering
//! 3. **Crawl**: one task per source; listing → links → extract → filter → classify
//! 4. **Output**: the merged [`models::CrawlResult`] is persisted by an [`store::ArticleStore`]
//!
//! The process exits non-zero on configuration errors, browser launch
//! failure, an unwritable output directory, or when every source failed.

use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod classify;
mod cli;
mod config;
mod crawler;
mod dates;
mod extract;
mod feed;
mod models;
mod orchestrator;
mod relevance;
mod session;
mod store;
mod utils;

use cli::Cli;
use config::CrawlConfig;
use models::SourceStatus;
use session::chrome::LaunchOptions;
use store::{ArticleStore, JsonFileStore};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("newsdesk_crawler starting up");

    let args = Cli::parse();
    debug!(?args.json_output_dir, ?args.config, "Parsed CLI arguments");

    // ---- Configuration ----
    let mut config = CrawlConfig::load(args.config.as_deref()).await?;
    config.apply_overrides(&args);
    config.validate()?;
    info!(
        sources = config.sources.len(),
        needs_rendering = config.needs_rendering(),
        nav_timeout_secs = config.settings.nav_timeout_secs,
        source_timeout_secs = config.settings.source_timeout_secs,
        "Configuration ready"
    );

    // Early check: ensure JSON output dir is writable
    let output_dir = Path::new(&args.json_output_dir);
    if let Err(e) = ensure_writable_dir(output_dir).await {
        error!(
            path = %args.json_output_dir,
            error = %e,
            "JSON output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    // ---- Crawl ----
    let options = LaunchOptions {
        remote_debugging_url: args.chrome_url.clone(),
        needs_rendering: config.needs_rendering(),
    };
    let result = orchestrator::crawl(&config, &options).await?;

    for outcome in &result.sources {
        match outcome.status {
            SourceStatus::Ok => info!(source = %outcome.name, articles = outcome.article_count, "ok"),
            _ => warn!(
                source = %outcome.name,
                status = %outcome.status,
                articles = outcome.article_count,
                error = outcome.error.as_deref().unwrap_or(""),
                "degraded"
            ),
        }
    }

    // ---- Output ----
    let store = JsonFileStore::new(output_dir);
    if let Err(e) = store.save_crawl(&result).await {
        error!(error = %e, "Failed to write crawl result");
        return Err(e.into());
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        articles = result.articles.len(),
        degraded = result.degraded_sources().count(),
        "Execution complete"
    );

    if result.all_sources_failed() {
        error!("Every source failed");
        return Err("every source failed".into());
    }
    Ok(())
}
