//! Page sessions: the seam between the crawler and whatever loads pages.
//!
//! A [`Browser`] is the shared, run-scoped resource owned by the
//! orchestrator. Each source task asks it for its own [`PageSession`],
//! drives that session through listing and article pages, and closes it
//! before returning.
//!
//! # Implementations
//!
//! | Module | Backing | Used when |
//! |--------|---------|-----------|
//! | [`http`] | `reqwest` fetch + `scraper` DOM parse | `requiresBrowserRendering == false` |
//! | [`chrome`] | `chromiumoxide` tab in a shared Chrome process | `requiresBrowserRendering == true` |
//!
//! Selector misses are not errors: [`PageSession::query_selector_text`]
//! returns `None`. Only loading a page can fail.

use crate::models::SourceProfile;
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

pub mod chrome;
pub mod http;
#[cfg(test)]
pub mod mock;

/// Errors raised while loading pages or talking to the browser.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("navigation to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },
    #[error("browser error: {0}")]
    Browser(String),
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unreadable document {url}: {reason}")]
    Unreadable { url: String, reason: String },
}

impl From<chromiumoxide::error::CdpError> for SessionError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        SessionError::Browser(e.to_string())
    }
}

/// One page (tab or HTTP cursor) owned by a single source task.
#[async_trait]
pub trait PageSession: Send {
    /// Load `url`, replacing whatever the session currently shows.
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    /// Try each selector in order and return the first matched element text
    /// whose trimmed length exceeds `min_len`. `None` when nothing qualifies.
    async fn query_selector_text(&mut self, selectors: &[String], min_len: usize) -> Option<String>;

    /// Absolute hrefs of elements matching any selector, in document order,
    /// resolved against the current page URL. Misses yield an empty list.
    async fn discover_links(&mut self, selectors: &[String]) -> Vec<String>;

    /// Fetch a document as raw text without rendering it (feeds).
    async fn fetch_raw(&mut self, url: &str) -> Result<String, SessionError>;

    /// Release the page. Called exactly once by the owning task.
    async fn close(self: Box<Self>);
}

/// The run-scoped browser process shared by every source task.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a fresh session suited to `profile`.
    async fn open_session(&self, profile: &SourceProfile) -> Result<Box<dyn PageSession>, SessionError>;

    /// Shut the browser down. The orchestrator calls this exactly once.
    async fn close(&self);
}

/// Resolve `href` against `base`, keeping only http(s) links and dropping
/// fragments.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let mut resolved = base.join(href).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

/// Parse an absolute URL, mapping failure into [`SessionError`].
pub fn parse_url(url: &str) -> Result<Url, SessionError> {
    Url::parse(url).map_err(|source| SessionError::InvalidUrl {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_link_relative() {
        let base = Url::parse("https://www.icai.org/news").unwrap();
        assert_eq!(
            resolve_link(&base, "/new_post.html?id=8"),
            Some("https://www.icai.org/new_post.html?id=8".to_string())
        );
    }

    #[test]
    fn test_resolve_link_strips_fragment() {
        let base = Url::parse("https://example.com/").unwrap();
        assert_eq!(
            resolve_link(&base, "https://example.com/news/a#comments"),
            Some("https://example.com/news/a".to_string())
        );
    }

    #[test]
    fn test_resolve_link_rejects_non_http() {
        let base = Url::parse("https://example.com/").unwrap();
        assert_eq!(resolve_link(&base, "javascript:void(0)"), None);
        assert_eq!(resolve_link(&base, "mailto:desk@example.com"), None);
        assert_eq!(resolve_link(&base, "#top"), None);
        assert_eq!(resolve_link(&base, "   "), None);
    }
}
