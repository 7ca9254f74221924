//! Data models for crawl targets, raw extractions and normalized articles.
//!
//! This module defines the core data structures used throughout the crawler:
//! - [`SourceProfile`]: Declarative description of one external site
//! - [`RawExtraction`]: Best-effort text pulled from one candidate page
//! - [`Article`]: The normalized output unit handed to the article store
//! - [`CrawlResult`]: Articles from every source plus a per-source status map
//!
//! Serialized field names use camelCase to match the record shape the
//! downstream store and notification consumers expect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A declarative description of one external site to crawl.
///
/// Profiles are immutable configuration: a crawl run only ever borrows them.
/// Every selector field is an ordered fallback chain, tried first to last.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceProfile {
    /// Unique source identifier, e.g. `"finance-daily"`.
    pub name: String,
    /// Root URL that listing paths are resolved against.
    pub base_url: String,
    /// Whether the site needs JavaScript execution to reveal its content.
    #[serde(default)]
    pub requires_browser_rendering: bool,
    /// Listing pages visited in sequence. Empty means `base_url` itself.
    #[serde(default)]
    pub listing_paths: Vec<String>,
    /// RSS or Atom feeds used as additional listings.
    #[serde(default)]
    pub feed_urls: Vec<String>,
    /// Optional substring every candidate link must contain (e.g. `/news/`).
    #[serde(default)]
    pub link_pattern: Option<String>,
    /// Per-listing cap on candidate links. Falls back to the crawl settings.
    #[serde(default)]
    pub max_links_per_listing: Option<usize>,
    #[serde(deserialize_with = "selector_chain")]
    pub link_selector: Vec<String>,
    #[serde(deserialize_with = "selector_chain")]
    pub title_selector: Vec<String>,
    #[serde(deserialize_with = "selector_chain")]
    pub content_selector: Vec<String>,
    #[serde(default, deserialize_with = "selector_chain")]
    pub date_selector: Vec<String>,
    #[serde(default, deserialize_with = "selector_chain")]
    pub author_selector: Vec<String>,
    #[serde(default, deserialize_with = "selector_chain")]
    pub category_selector: Vec<String>,
    /// Case-insensitive substrings; at least one must appear.
    #[serde(default)]
    pub include_keywords: Vec<String>,
    /// Case-insensitive substrings; none may appear.
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
}

/// Accept either a YAML list of selectors or one comma-joined CSS string.
///
/// A comma-joined string such as `"h1, .headline, .title"` becomes the
/// ordered chain `["h1", ".headline", ".title"]`.
fn selector_chain<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Chain {
        Joined(String),
        List(Vec<String>),
    }

    let raw = match Chain::deserialize(deserializer)? {
        Chain::Joined(s) => s.split(',').map(str::to_string).collect::<Vec<_>>(),
        Chain::List(list) => list,
    };
    Ok(raw
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

/// Transient record produced for one candidate URL.
///
/// Every field is best-effort: an empty string means "not found", never an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawExtraction {
    pub url: String,
    pub title: String,
    pub content: String,
    pub date_text: String,
    pub author_text: String,
    pub category_text: String,
}

impl RawExtraction {
    /// True when both title and content were found.
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty() && !self.content.is_empty()
    }
}

/// Domain category of an article, resolved in fixed priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tax,
    Compliance,
    Audit,
    General,
}

/// Heuristic urgency of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

/// The normalized output unit, the only entity the rest of the system sees.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub content: String,
    /// Extractive summary of at most two sentences.
    pub summary: String,
    /// Name of the [`SourceProfile`] that produced this article.
    pub source: String,
    pub url: String,
    /// Parsed publication time, or the crawl time when none could be parsed.
    pub published_at: DateTime<Utc>,
    pub category: Category,
    pub impact: Impact,
    /// Matched domain terms, in dictionary order.
    pub tags: Vec<String>,
}

/// Terminal state of one source in a crawl run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Ok,
    Partial,
    Failed,
}

impl SourceStatus {
    /// Derive the status from whether the source reported an error and how
    /// many articles it still produced.
    pub fn from_outcome(had_error: bool, article_count: usize) -> Self {
        match (had_error, article_count) {
            (false, _) => SourceStatus::Ok,
            (true, 0) => SourceStatus::Failed,
            (true, _) => SourceStatus::Partial,
        }
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceStatus::Ok => "ok",
            SourceStatus::Partial => "partial",
            SourceStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Outcome of one source, as reported in [`CrawlResult::sources`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceOutcome {
    pub name: String,
    pub status: SourceStatus,
    /// Human-readable description of the source-level failure, if any.
    pub error: Option<String>,
    pub article_count: usize,
}

/// Aggregate returned by the orchestrator.
///
/// `sources` lists every configured profile, in configuration order, so a
/// source's failure is never silently dropped.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub articles: Vec<Article>,
    pub sources: Vec<SourceOutcome>,
}

impl CrawlResult {
    /// Sources that did not finish cleanly.
    pub fn degraded_sources(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.sources.iter().filter(|s| s.status != SourceStatus::Ok)
    }

    /// True when there was at least one source and every one of them failed.
    pub fn all_sources_failed(&self) -> bool {
        !self.sources.is_empty() && self.sources.iter().all(|s| s.status == SourceStatus::Failed)
    }

    #[cfg(test)]
    pub fn outcome(&self, name: &str) -> Option<&SourceOutcome> {
        self.sources.iter().find(|s| s.name == name)
    }
}
