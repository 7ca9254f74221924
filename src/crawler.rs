//! One source, end to end: listings → candidate links → extract → filter →
//! classify.
//!
//! # Failure handling
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Selector miss | Empty field (see [`crate::extract`]) |
//! | One article link fails or times out | Logged, skipped, loop continues |
//! | One listing fails after retries | Logged, next listing; reported as partial |
//! | Every listing fails | [`SourceError::ListingUnreachable`] |
//! | Every attempted link fails | [`SourceError::AllLinksFailed`] |
//!
//! Only listing loads are retried, with exponential backoff and jitter.
//! Article links get exactly one attempt.

use crate::classify::{categorize, determine_impact, extract_tags, summarize};
use crate::config::CrawlSettings;
use crate::dates::parse_published;
use crate::extract::extract;
use crate::feed::parse_feed;
use crate::models::{Article, RawExtraction, SourceProfile, SourceStatus};
use crate::relevance::is_relevant;
use crate::session::{PageSession, SessionError, parse_url, resolve_link};
use crate::utils::truncate_for_log;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use rand::{Rng, rng};
use std::collections::HashSet;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, instrument, warn};

/// Source-level failure, carried in the per-source outcome.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("could not open a page: {0}")]
    SessionUnavailable(#[source] SessionError),
    #[error("all {total} listing pages unreachable; last error: {last}")]
    ListingUnreachable { total: usize, last: String },
    #[error("{failed} of {total} listing pages unreachable; last error: {last}")]
    SomeListingsFailed { failed: usize, total: usize, last: String },
    #[error("all {0} candidate links failed to load")]
    AllLinksFailed(usize),
    #[error("source exceeded its {0}s deadline")]
    DeadlineExceeded(u64),
    #[error("crawler task aborted: {0}")]
    TaskAborted(String),
}

/// What one source run produced.
#[derive(Debug, Default)]
pub struct SourceReport {
    pub articles: Vec<Article>,
    pub error: Option<SourceError>,
    pub links_attempted: usize,
    pub links_failed: usize,
}

impl SourceReport {
    pub fn failed(error: SourceError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn status(&self) -> SourceStatus {
        SourceStatus::from_outcome(self.error.is_some(), self.articles.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ListingKind {
    Page,
    Feed,
}

#[derive(Debug, Clone, PartialEq)]
struct Listing {
    url: String,
    kind: ListingKind,
}

/// A link discovered on a listing, with the feed's date when it had one.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    url: String,
    published_hint: Option<String>,
}

/// Listing pages resolved against the base URL, followed by feeds.
fn listings(profile: &SourceProfile) -> Vec<Listing> {
    let mut out = Vec::new();
    if !profile.link_selector.is_empty() {
        match parse_url(&profile.base_url) {
            Ok(base) if profile.listing_paths.is_empty() => out.push(Listing {
                url: base.to_string(),
                kind: ListingKind::Page,
            }),
            Ok(base) => out.extend(profile.listing_paths.iter().filter_map(|path| {
                let url = base.join(path.trim()).ok()?;
                Some(Listing {
                    url: url.to_string(),
                    kind: ListingKind::Page,
                })
            })),
            Err(e) => warn!(source = %profile.name, error = %e, "Unusable base URL"),
        }
    }
    out.extend(profile.feed_urls.iter().map(|url| Listing {
        url: url.trim().to_string(),
        kind: ListingKind::Feed,
    }));
    out
}

/// Run `fut` under the navigation timeout.
async fn bounded<T>(
    url: &str,
    limit: Duration,
    fut: impl Future<Output = Result<T, SessionError>>,
) -> Result<T, SessionError> {
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(SessionError::Timeout {
            url: url.to_string(),
            secs: limit.as_secs(),
        }),
    }
}

/// Load a listing once: navigate for pages, raw fetch for feeds.
async fn load_listing_once(
    session: &mut dyn PageSession,
    listing: &Listing,
    settings: &CrawlSettings,
) -> Result<Option<String>, SessionError> {
    let limit = settings.nav_timeout();
    match listing.kind {
        ListingKind::Page => bounded(&listing.url, limit, session.navigate(&listing.url))
            .await
            .map(|_| None),
        ListingKind::Feed => bounded(&listing.url, limit, session.fetch_raw(&listing.url))
            .await
            .map(Some),
    }
}

/// Load a listing, retrying with exponential backoff and jitter.
///
/// ```text
/// delay = min(base * 2^(attempt-1), max) + jitter(0..=250ms)
/// ```
#[instrument(level = "info", skip_all, fields(url = %listing.url))]
async fn load_listing(
    session: &mut dyn PageSession,
    listing: &Listing,
    settings: &CrawlSettings,
) -> Result<Option<String>, SessionError> {
    let total_t0 = Instant::now();
    let mut attempt = 0usize;

    loop {
        match load_listing_once(session, listing, settings).await {
            Ok(body) => return Ok(body),
            Err(e) => {
                attempt += 1;
                if attempt > settings.listing_retries {
                    error!(
                        attempt,
                        max = settings.listing_retries,
                        elapsed_ms_total = total_t0.elapsed().as_millis(),
                        error = %e,
                        "Listing exhausted retries"
                    );
                    return Err(e);
                }

                let mut delay = settings
                    .retry_base_delay()
                    .saturating_mul(1u32 << (attempt - 1).min(16));
                if delay > settings.retry_max_delay() {
                    delay = settings.retry_max_delay();
                }
                let jitter_ms: u64 = rng().random_range(0..=250);
                let delay = delay + Duration::from_millis(jitter_ms);

                warn!(
                    attempt,
                    max = settings.listing_retries,
                    ?delay,
                    error = %e,
                    "Listing load failed; backing off"
                );
                sleep(delay).await;
            }
        }
    }
}

/// Discover this listing's candidates, minus anything in `seen`.
async fn discover(
    session: &mut dyn PageSession,
    profile: &SourceProfile,
    listing: &Listing,
    settings: &CrawlSettings,
    seen: &mut HashSet<String>,
) -> Result<Vec<Candidate>, SessionError> {
    let body = load_listing(session, listing, settings).await?;

    let raw: Vec<Candidate> = match body {
        None => session
            .discover_links(&profile.link_selector)
            .await
            .into_iter()
            .map(|url| Candidate {
                url,
                published_hint: None,
            })
            .collect(),
        Some(xml) => {
            let items = parse_feed(&xml, usize::MAX)
                .map_err(|e| SessionError::Unreadable {
                    url: listing.url.clone(),
                    reason: e.to_string(),
                })?;
            let base = parse_url(&listing.url)?;
            items
                .into_iter()
                .filter_map(|item| {
                    Some(Candidate {
                        url: resolve_link(&base, &item.link)?,
                        published_hint: item.published,
                    })
                })
                .collect()
        }
    };

    let found = raw.len();
    let candidates: Vec<Candidate> = raw
        .into_iter()
        .filter(|c| c.url != listing.url)
        .filter(|c| {
            profile
                .link_pattern
                .as_deref()
                .is_none_or(|pattern| c.url.contains(pattern))
        })
        .unique_by(|c| c.url.clone())
        .filter(|c| !seen.contains(&c.url))
        .take(settings.link_cap(profile))
        .collect();
    seen.extend(candidates.iter().map(|c| c.url.clone()));

    info!(
        source = %profile.name,
        listing = %listing.url,
        found,
        kept = candidates.len(),
        "Discovered candidate links"
    );
    Ok(candidates)
}

/// Assemble the normalized article from a complete, relevant extraction.
fn build_article(
    raw: RawExtraction,
    profile: &SourceProfile,
    published_hint: Option<&str>,
    crawled_at: DateTime<Utc>,
) -> Article {
    let published_at = parse_published(&raw.date_text)
        .or_else(|| published_hint.and_then(parse_published))
        .unwrap_or(crawled_at);

    Article {
        summary: summarize(&raw.content),
        category: categorize(&raw.title, &raw.content),
        impact: determine_impact(&raw.title, &raw.content),
        tags: extract_tags(&raw.title, &raw.content),
        source: profile.name.clone(),
        url: raw.url,
        published_at,
        title: raw.title,
        content: raw.content,
    }
}

/// Visit one candidate. `Ok(None)` means the page loaded but produced no
/// article (incomplete or irrelevant).
#[instrument(level = "debug", skip_all, fields(url = %candidate.url))]
async fn visit(
    session: &mut dyn PageSession,
    profile: &SourceProfile,
    candidate: &Candidate,
    settings: &CrawlSettings,
    crawled_at: DateTime<Utc>,
) -> Result<Option<Article>, SessionError> {
    bounded(&candidate.url, settings.nav_timeout(), session.navigate(&candidate.url)).await?;

    let raw = extract(session, profile, &candidate.url).await;
    if !raw.is_complete() {
        debug!(
            title_found = !raw.title.is_empty(),
            content_found = !raw.content.is_empty(),
            "Discarding incomplete extraction"
        );
        return Ok(None);
    }
    if !is_relevant(&raw, profile) {
        debug!(title = %truncate_for_log(&raw.title, 80), "Not relevant");
        return Ok(None);
    }

    Ok(Some(build_article(
        raw,
        profile,
        candidate.published_hint.as_deref(),
        crawled_at,
    )))
}

/// Crawl `profile` through `session` and report what was collected.
///
/// Listings are visited in order; each one's candidates are visited before
/// the next listing loads.
///
/// # Arguments
///
/// * `session` - The page session owned by this source's task
/// * `profile` - The source to crawl
/// * `settings` - Timeouts, retry budget and default link cap
///
/// # Returns
///
/// A [`SourceReport`] with the relevant articles in discovery order. Never
/// fails outright: source-level problems are returned in
/// [`SourceReport::error`] alongside whatever articles were gathered.
#[instrument(level = "info", skip_all, fields(source = %profile.name))]
pub async fn run(
    session: &mut dyn PageSession,
    profile: &SourceProfile,
    settings: &CrawlSettings,
) -> SourceReport {
    let t0 = Instant::now();
    let crawled_at = Utc::now();
    let listings = listings(profile);
    let mut report = SourceReport::default();
    let mut seen = HashSet::new();
    let mut listing_failures = 0usize;
    let mut last_listing_error = None;

    for listing in &listings {
        let candidates = match discover(session, profile, listing, settings, &mut seen).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(listing = %listing.url, error = %e, "Skipping unreachable listing");
                listing_failures += 1;
                last_listing_error = Some(e.to_string());
                continue;
            }
        };

        for candidate in &candidates {
            report.links_attempted += 1;
            match visit(session, profile, candidate, settings, crawled_at).await {
                Ok(Some(article)) => {
                    debug!(url = %article.url, category = ?article.category, impact = ?article.impact, "Collected article");
                    report.articles.push(article);
                }
                Ok(None) => {}
                Err(e) => {
                    report.links_failed += 1;
                    warn!(url = %candidate.url, error = %e, "Skipping candidate link");
                }
            }
        }
    }

    report.error = if listings.is_empty() {
        Some(SourceError::ListingUnreachable {
            total: 0,
            last: "no usable listing URL".to_string(),
        })
    } else if listing_failures == listings.len() {
        Some(SourceError::ListingUnreachable {
            total: listings.len(),
            last: last_listing_error.unwrap_or_default(),
        })
    } else if report.links_attempted > 0 && report.links_failed == report.links_attempted {
        Some(SourceError::AllLinksFailed(report.links_attempted))
    } else if listing_failures > 0 {
        Some(SourceError::SomeListingsFailed {
            failed: listing_failures,
            total: listings.len(),
            last: last_listing_error.unwrap_or_default(),
        })
    } else {
        None
    };

    info!(
        articles = report.articles.len(),
        links_attempted = report.links_attempted,
        links_failed = report.links_failed,
        listing_failures,
        status = %report.status(),
        elapsed_ms = t0.elapsed().as_millis(),
        "Source crawl finished"
    );
    report
}
