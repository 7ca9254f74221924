//! Runs every source concurrently against one shared browser and merges the
//! results.
//!
//! Each source gets its own spawned task and its own page session. A task
//! that fails, times out or panics is reported as a failed source; it never
//! cancels its siblings. The browser is closed exactly once, after every task
//! has finished.

use crate::config::CrawlConfig;
use crate::config::CrawlSettings;
use crate::crawler::{self, SourceError, SourceReport};
use crate::models::{CrawlResult, SourceOutcome, SourceProfile, SourceStatus};
use crate::session::chrome::{LaunchOptions, SharedBrowser};
use crate::session::{Browser, SessionError};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

/// Run-level failures. Anything source-scoped ends up in a
/// [`SourceOutcome`] instead.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("browser failed to start: {0}")]
    BrowserLaunch(#[source] SessionError),
}

/// Launch the shared browser for `config` and crawl all of its sources.
///
/// # Errors
///
/// Returns [`CrawlError::BrowserLaunch`] when Chrome cannot be started or
/// connected to. Every other failure is reported per source.
pub async fn crawl(config: &CrawlConfig, options: &LaunchOptions) -> Result<CrawlResult, CrawlError> {
    let browser = SharedBrowser::launch(&config.settings, options)
        .await
        .map_err(CrawlError::BrowserLaunch)?;
    Ok(crawl_all(Arc::new(browser), &config.sources, &config.settings).await)
}

/// One source task: open a session, crawl under the source deadline, close.
async fn crawl_source(browser: Arc<dyn Browser>, profile: SourceProfile, settings: CrawlSettings) -> SourceReport {
    let mut session = match browser.open_session(&profile).await {
        Ok(session) => session,
        Err(e) => {
            error!(source = %profile.name, error = %e, "Could not open a page session");
            return SourceReport::failed(SourceError::SessionUnavailable(e));
        }
    };

    let run = crawler::run(session.as_mut(), &profile, &settings);
    let report = match settings.source_timeout() {
        Some(limit) => match timeout(limit, run).await {
            Ok(report) => report,
            Err(_) => {
                warn!(source = %profile.name, secs = limit.as_secs(), "Source deadline exceeded");
                SourceReport::failed(SourceError::DeadlineExceeded(limit.as_secs()))
            }
        },
        None => run.await,
    };

    session.close().await;
    report
}

/// Crawl `profiles` concurrently and close `browser` when all are done.
///
/// # Arguments
///
/// * `browser` - The shared browser; closed exactly once before returning
/// * `profiles` - Sources to crawl, one task each
/// * `settings` - Run settings, including the per-source deadline
///
/// # Returns
///
/// A [`CrawlResult`] with one outcome per profile in profile order. Articles
/// are merged in profile order, then per-source discovery order. A failed,
/// timed-out or panicked task shows up as a `failed` outcome; nothing here
/// returns an error.
#[instrument(level = "info", skip_all, fields(sources = profiles.len()))]
pub async fn crawl_all(browser: Arc<dyn Browser>, profiles: &[SourceProfile], settings: &CrawlSettings) -> CrawlResult {
    let t0 = Instant::now();
    let started_at = Utc::now();

    let handles: Vec<_> = profiles
        .iter()
        .cloned()
        .map(|profile| {
            let browser = Arc::clone(&browser);
            let settings = settings.clone();
            tokio::spawn(crawl_source(browser, profile, settings))
        })
        .collect();
    let joined = join_all(handles).await;

    browser.close().await;

    let mut result = CrawlResult {
        started_at,
        finished_at: started_at,
        articles: Vec::new(),
        sources: Vec::with_capacity(profiles.len()),
    };

    for (profile, joined) in profiles.iter().zip(joined) {
        let report = joined.unwrap_or_else(|e| {
            error!(source = %profile.name, error = %e, "Source task aborted");
            SourceReport::failed(SourceError::TaskAborted(e.to_string()))
        });
        let status = report.status();
        let article_count = report.articles.len();
        let error = report.error.as_ref().map(ToString::to_string);

        match status {
            SourceStatus::Ok => info!(source = %profile.name, article_count, "Source ok"),
            SourceStatus::Partial => {
                warn!(source = %profile.name, article_count, error = error.as_deref().unwrap_or(""), "Source partial")
            }
            SourceStatus::Failed => {
                error!(source = %profile.name, error = error.as_deref().unwrap_or(""), "Source failed")
            }
        }

        result.articles.extend(report.articles);
        result.sources.push(SourceOutcome {
            name: profile.name.clone(),
            status,
            error,
            article_count,
        });
    }

    result.finished_at = Utc::now();
    info!(
        articles = result.articles.len(),
        degraded = result.degraded_sources().count(),
        elapsed_ms = t0.elapsed().as_millis(),
        "Crawl finished"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_sources;
    use crate::session::mock::{MockBrowser, MockPage, MockSite};
    use std::sync::atomic::Ordering;

    fn profile(name: &str) -> SourceProfile {
        let mut p = default_sources().remove(0);
        p.name = name.to_string();
        p.base_url = format!("https://{name}.example.com/");
        p.listing_paths = vec!["/latest".to_string()];
        p.feed_urls.clear();
        p.link_pattern = None;
        p.link_selector = vec!["a.story".to_string()];
        p.title_selector = vec!["h1".to_string()];
        p.content_selector = vec![".body".to_string()];
        p.date_selector.clear();
        p.include_keywords = vec!["gst".to_string()];
        p.exclude_keywords.clear();
        p
    }

    fn healthy_site(name: &str) -> MockSite {
        let listing = format!("https://{name}.example.com/latest");
        let article = format!("https://{name}.example.com/news/1");
        MockSite::default()
            .page(&listing, MockPage::default().with_links("a.story", &[article.as_str()]))
            .page(
                &article,
                MockPage::default()
                    .with_text("h1", "GST council trims rates on essentials")
                    .with_text(".body", "The GST council met on Friday and cut rates."),
            )
    }

    fn settings() -> CrawlSettings {
        CrawlSettings {
            retry_base_delay_ms: 1,
            retry_max_delay_ms: 2,
            ..CrawlSettings::default()
        }
    }

    #[tokio::test]
    async fn test_failing_source_does_not_affect_healthy_one() {
        let browser = MockBrowser::default()
            .site("good", healthy_site("good"))
            .site("bad", MockSite::default().failing("https://bad.example.com/latest"));
        let counters = Arc::clone(&browser.counters);

        let result = crawl_all(Arc::new(browser), &[profile("good"), profile("bad")], &settings()).await;

        assert_eq!(result.articles.len(), 1);
        assert_eq!(result.articles[0].source, "good");
        assert_eq!(result.outcome("good").unwrap().status, SourceStatus::Ok);
        let bad = result.outcome("bad").unwrap();
        assert_eq!(bad.status, SourceStatus::Failed);
        assert!(bad.error.is_some());
        assert!(!result.all_sources_failed());
        assert_eq!(counters.browser_closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_failing_still_closes_everything_once() {
        let browser = MockBrowser::default()
            .site("a", MockSite::default().failing("https://a.example.com/latest"))
            .site("b", MockSite::default().failing("https://b.example.com/latest"));
        let counters = Arc::clone(&browser.counters);

        let result = crawl_all(Arc::new(browser), &[profile("a"), profile("b")], &settings()).await;

        assert!(result.articles.is_empty());
        assert!(result.all_sources_failed());
        assert_eq!(result.sources.len(), 2);
        assert_eq!(counters.browser_closes.load(Ordering::SeqCst), 1);
        assert_eq!(counters.sessions_opened.load(Ordering::SeqCst), 2);
        assert_eq!(counters.sessions_closed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_source_hits_deadline() {
        let browser = MockBrowser::default()
            .site("good", healthy_site("good"))
            .site("stuck", MockSite::default().hanging("https://stuck.example.com/latest"));
        let counters = Arc::clone(&browser.counters);
        let settings = CrawlSettings {
            nav_timeout_secs: 600,
            source_timeout_secs: 60,
            ..settings()
        };

        let result = crawl_all(Arc::new(browser), &[profile("good"), profile("stuck")], &settings).await;

        assert_eq!(result.outcome("good").unwrap().status, SourceStatus::Ok);
        let stuck = result.outcome("stuck").unwrap();
        assert_eq!(stuck.status, SourceStatus::Failed);
        assert!(stuck.error.as_deref().unwrap().contains("deadline"));
        assert_eq!(counters.sessions_closed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_panicking_task_reported_as_failed() {
        let browser = MockBrowser::default()
            .site("good", healthy_site("good"))
            .panic_on("boom");
        let counters = Arc::clone(&browser.counters);

        let result = crawl_all(Arc::new(browser), &[profile("boom"), profile("good")], &settings()).await;

        assert_eq!(result.sources[0].name, "boom");
        assert_eq!(result.sources[0].status, SourceStatus::Failed);
        assert_eq!(result.sources[1].status, SourceStatus::Ok);
        assert_eq!(result.articles.len(), 1);
        assert_eq!(counters.browser_closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refused_session_is_failed_source() {
        let browser = MockBrowser::default().refuse("a");
        let result = crawl_all(Arc::new(browser), &[profile("a")], &settings()).await;
        let a = result.outcome("a").unwrap();
        assert_eq!(a.status, SourceStatus::Failed);
        assert!(a.error.as_deref().unwrap().contains("tab limit"));
    }

    #[tokio::test]
    async fn test_outcomes_follow_profile_order() {
        let browser = MockBrowser::default()
            .site("x", healthy_site("x"))
            .site("y", healthy_site("y"))
            .site("z", healthy_site("z"));
        let result = crawl_all(Arc::new(browser), &[profile("z"), profile("x"), profile("y")], &settings()).await;
        let names: Vec<&str> = result.sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["z", "x", "y"]);
        let sources: Vec<&str> = result.articles.iter().map(|a| a.source.as_str()).collect();
        assert_eq!(sources, vec!["z", "x", "y"]);
        assert!(result.finished_at >= result.started_at);
    }
}
