//! Crawl configuration: run settings plus the list of source profiles.
//!
//! Configuration is read from a YAML file when one is given, otherwise the
//! built-in profiles from [`default_sources`] are used. CLI flags are applied
//! on top by [`CrawlConfig::apply_overrides`].
//!
//! ```yaml
//! settings:
//!   navTimeoutSecs: 30
//!   maxLinksPerListing: 10
//! sources:
//!   - name: finance-daily
//!     baseUrl: https://economictimes.indiatimes.com
//!     requiresBrowserRendering: true
//!     listingPaths: [/news/economy, /topic/gst]
//!     linkSelector: 'a[href*="/news/"]'
//!     titleSelector: "h1, .contentTitle"
//!     contentSelector: ".artText, .story-content"
//!     includeKeywords: [tax, gst]
//! ```

use crate::cli::Cli;
use crate::models::SourceProfile;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid setting `{name}`: {reason}")]
    InvalidSetting { name: String, reason: String },
    #[error("invalid source `{name}`: {reason}")]
    InvalidSource { name: String, reason: String },
    #[error("no sources configured")]
    NoSources,
}

/// Run-wide knobs shared by every source.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CrawlSettings {
    /// Upper bound on any single page load.
    pub nav_timeout_secs: u64,
    /// Hard deadline for one source, listing and links included. 0 disables it.
    pub source_timeout_secs: u64,
    /// Default cap on candidate links taken from one listing.
    pub max_links_per_listing: usize,
    /// Extra attempts for a listing page that fails to load.
    pub listing_retries: usize,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub user_agent: String,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            nav_timeout_secs: 30,
            source_timeout_secs: 300,
            max_links_per_listing: 10,
            listing_retries: 2,
            retry_base_delay_ms: 1_000,
            retry_max_delay_ms: 8_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CrawlSettings {
    pub fn nav_timeout(&self) -> Duration {
        Duration::from_secs(self.nav_timeout_secs)
    }

    pub fn source_timeout(&self) -> Option<Duration> {
        (self.source_timeout_secs > 0).then(|| Duration::from_secs(self.source_timeout_secs))
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    /// The link cap for `profile`, falling back to the run default.
    pub fn link_cap(&self, profile: &SourceProfile) -> usize {
        profile.max_links_per_listing.unwrap_or(self.max_links_per_listing)
    }
}

/// Everything a crawl run needs.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrawlConfig {
    #[serde(default)]
    pub settings: CrawlSettings,
    pub sources: Vec<SourceProfile>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            settings: CrawlSettings::default(),
            sources: default_sources(),
        }
    }
}

impl CrawlConfig {
    /// Load from `path`, or fall back to the built-in profiles.
    #[instrument(level = "info", skip_all)]
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| ConfigError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
                let config = Self::from_yaml(&text)?;
                info!(path = %path.display(), sources = config.sources.len(), "Loaded crawl configuration");
                config
            }
            None => {
                info!("No configuration file given; using built-in sources");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply command-line overrides on top of file settings.
    ///
    /// `--max-links` replaces every per-profile cap as well as the default.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(secs) = cli.nav_timeout_secs {
            self.settings.nav_timeout_secs = secs;
        }
        if let Some(secs) = cli.source_timeout_secs {
            self.settings.source_timeout_secs = secs;
        }
        if let Some(max) = cli.max_links {
            self.settings.max_links_per_listing = max;
            for source in &mut self.sources {
                source.max_links_per_listing = None;
            }
        }
        if cli.http_only {
            for source in &mut self.sources {
                source.requires_browser_rendering = false;
            }
        }
    }

    pub fn needs_rendering(&self) -> bool {
        self.sources.iter().any(|s| s.requires_browser_rendering)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        if self.settings.nav_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "navTimeoutSecs".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }
        let invalid = |name: &str, reason: &str| ConfigError::InvalidSource {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if let Some(dup) = self.sources.iter().map(|s| s.name.as_str()).duplicates().next() {
            return Err(invalid(dup, "duplicate source name"));
        }
        for source in &self.sources {
            let name = source.name.as_str();
            if name.trim().is_empty() {
                return Err(invalid(name, "name is empty"));
            }
            match Url::parse(&source.base_url) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                _ => return Err(invalid(name, "baseUrl must be an absolute http(s) URL")),
            }
            if source.link_selector.is_empty() && source.feed_urls.is_empty() {
                return Err(invalid(name, "needs a linkSelector or at least one feed"));
            }
            if source.title_selector.is_empty() || source.content_selector.is_empty() {
                return Err(invalid(name, "titleSelector and contentSelector are required"));
            }
        }
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The three sources the newsroom crawls out of the box.
pub fn default_sources() -> Vec<SourceProfile> {
    vec![
        SourceProfile {
            name: "wire-service".to_string(),
            base_url: "https://www.aninews.in".to_string(),
            requires_browser_rendering: true,
            listing_paths: strings(&["/category/business"]),
            feed_urls: vec![],
            link_pattern: Some("/news/".to_string()),
            max_links_per_listing: Some(15),
            link_selector: strings(&[r#"a[href*="/news/"]"#]),
            title_selector: strings(&["h1", ".headline", ".title"]),
            content_selector: strings(&[".story-content", ".article-body", ".content-body"]),
            date_selector: strings(&[".date", ".published-date", "time"]),
            author_selector: vec![],
            category_selector: strings(&[".category", ".section"]),
            include_keywords: strings(&[
                "tax", "gst", "finance", "economy", "audit", "accounting",
                "chartered accountant", "icai", "compliance",
            ]),
            exclude_keywords: strings(&["sports", "entertainment", "bollywood", "cricket"]),
        },
        SourceProfile {
            name: "finance-daily".to_string(),
            base_url: "https://economictimes.indiatimes.com".to_string(),
            requires_browser_rendering: true,
            listing_paths: strings(&[
                "/news/economy",
                "/topic/gst",
                "/topic/income-tax",
                "/news/company/corporate-trends",
            ]),
            feed_urls: vec![],
            link_pattern: Some("/news/".to_string()),
            max_links_per_listing: Some(8),
            link_selector: strings(&[r#"a[href*="/news/"]"#]),
            title_selector: strings(&["h1", ".eachStory h3 a", ".contentTitle"]),
            content_selector: strings(&[".artText", ".story-content", ".Normal"]),
            date_selector: strings(&[".time", ".publish_on", ".date-format"]),
            author_selector: strings(&[".author", ".by"]),
            category_selector: strings(&[".secName", ".breadcrumb"]),
            include_keywords: strings(&[
                "tax", "gst", "income tax", "finance", "economy", "audit", "accounting",
                "corporate", "compliance", "budget", "policy",
            ]),
            exclude_keywords: strings(&["sports", "entertainment", "lifestyle"]),
        },
        SourceProfile {
            name: "standards-body".to_string(),
            base_url: "https://www.icai.org".to_string(),
            requires_browser_rendering: true,
            listing_paths: strings(&[
                "/news",
                "/new_post.html?id=8",
                "/new_post.html?id=5",
                "/new_post.html?id=34",
            ]),
            feed_urls: vec![],
            link_pattern: None,
            max_links_per_listing: Some(10),
            link_selector: strings(&[
                r#"a[href*="post"]"#,
                r#"a[href*="news"]"#,
                r#"a[href*="announcement"]"#,
            ]),
            title_selector: strings(&["h1", ".title", ".headline"]),
            content_selector: strings(&[".content", ".article-content", ".news-content"]),
            date_selector: strings(&[".date", ".published", "time"]),
            author_selector: vec![],
            category_selector: vec![],
            include_keywords: strings(&[
                "audit", "accounting", "standards", "ethics", "examination", "circular",
                "notification", "guidelines",
            ]),
            exclude_keywords: vec![],
        },
    ]
}
