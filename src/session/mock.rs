//! Scripted in-memory sessions for crawler and orchestrator tests.

use super::{Browser, PageSession, SessionError};
use crate::models::SourceProfile;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Canned content for one URL.
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    /// Matched texts per selector, in document order.
    pub texts: HashMap<String, Vec<String>>,
    pub links: HashMap<String, Vec<String>>,
}

impl MockPage {
    pub fn with_text(mut self, selector: &str, text: &str) -> Self {
        self.texts
            .entry(selector.to_string())
            .or_default()
            .push(text.to_string());
        self
    }

    pub fn with_links(mut self, selector: &str, links: &[&str]) -> Self {
        self.links
            .entry(selector.to_string())
            .or_default()
            .extend(links.iter().map(|l| l.to_string()));
        self
    }
}

/// A scripted site: pages by URL, URLs that fail, URLs that never load.
#[derive(Debug, Clone, Default)]
pub struct MockSite {
    pub pages: HashMap<String, MockPage>,
    pub raw: HashMap<String, String>,
    pub failing: HashSet<String>,
    pub hanging: HashSet<String>,
}

impl MockSite {
    pub fn page(mut self, url: &str, page: MockPage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub fn raw(mut self, url: &str, body: &str) -> Self {
        self.raw.insert(url.to_string(), body.to_string());
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn hanging(mut self, url: &str) -> Self {
        self.hanging.insert(url.to_string());
        self
    }
}

#[derive(Debug, Default)]
pub struct Counters {
    pub navigations: AtomicUsize,
    pub sessions_opened: AtomicUsize,
    pub sessions_closed: AtomicUsize,
    pub browser_closes: AtomicUsize,
}

pub struct MockSession {
    site: MockSite,
    current: Option<MockPage>,
    counters: Arc<Counters>,
}

impl MockSession {
    pub fn new(site: MockSite) -> Self {
        Self::with_counters(site, Arc::new(Counters::default()))
    }

    pub fn with_counters(site: MockSite, counters: Arc<Counters>) -> Self {
        Self {
            site,
            current: None,
            counters,
        }
    }

    async fn load(&self, url: &str) -> Result<(), SessionError> {
        if self.site.hanging.contains(url) {
            tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
        }
        if self.site.failing.contains(url) {
            return Err(SessionError::Status {
                url: url.to_string(),
                status: 503,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PageSession for MockSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.counters.navigations.fetch_add(1, Ordering::SeqCst);
        self.current = None;
        self.load(url).await?;
        let page = self.site.pages.get(url).cloned().ok_or_else(|| SessionError::Status {
            url: url.to_string(),
            status: 404,
        })?;
        self.current = Some(page);
        Ok(())
    }

    async fn query_selector_text(&mut self, selectors: &[String], min_len: usize) -> Option<String> {
        let page = self.current.as_ref()?;
        selectors
            .iter()
            .filter_map(|s| page.texts.get(s))
            .flatten()
            .map(|t| t.trim())
            .find(|t| t.chars().count() > min_len)
            .map(str::to_string)
    }

    async fn discover_links(&mut self, selectors: &[String]) -> Vec<String> {
        let Some(page) = self.current.as_ref() else {
            return Vec::new();
        };
        selectors
            .iter()
            .filter_map(|s| page.links.get(s))
            .flatten()
            .cloned()
            .collect()
    }

    async fn fetch_raw(&mut self, url: &str) -> Result<String, SessionError> {
        self.load(url).await?;
        self.site.raw.get(url).cloned().ok_or_else(|| SessionError::Status {
            url: url.to_string(),
            status: 404,
        })
    }

    async fn close(self: Box<Self>) {
        self.counters.sessions_closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// A browser whose sites are keyed by source name.
#[derive(Default)]
pub struct MockBrowser {
    pub sites: HashMap<String, MockSite>,
    /// Sources whose session cannot even be opened.
    pub refuse: HashSet<String>,
    /// Sources whose task panics while opening a session.
    pub panic_on: HashSet<String>,
    pub counters: Arc<Counters>,
}

impl MockBrowser {
    pub fn site(mut self, source: &str, site: MockSite) -> Self {
        self.sites.insert(source.to_string(), site);
        self
    }

    pub fn refuse(mut self, source: &str) -> Self {
        self.refuse.insert(source.to_string());
        self
    }

    pub fn panic_on(mut self, source: &str) -> Self {
        self.panic_on.insert(source.to_string());
        self
    }
}

#[async_trait]
impl Browser for MockBrowser {
    async fn open_session(&self, profile: &SourceProfile) -> Result<Box<dyn PageSession>, SessionError> {
        if self.panic_on.contains(&profile.name) {
            panic!("scripted panic for {}", profile.name);
        }
        if self.refuse.contains(&profile.name) {
            return Err(SessionError::Browser("tab limit reached".to_string()));
        }
        self.counters.sessions_opened.fetch_add(1, Ordering::SeqCst);
        let site = self.sites.get(&profile.name).cloned().unwrap_or_default();
        Ok(Box::new(MockSession::with_counters(site, Arc::clone(&self.counters))))
    }

    async fn close(&self) {
        self.counters.browser_closes.fetch_add(1, Ordering::SeqCst);
    }
}
