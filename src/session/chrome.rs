//! Chrome-backed page sessions and the run-scoped [`SharedBrowser`].
//!
//! A single Chrome process is launched (or a remote DevTools endpoint is
//! connected) per crawl run. Each source that needs JavaScript rendering
//! gets its own tab; sources that don't get an [`HttpSession`] built on the
//! same HTTP client.

use super::http::{HttpSession, build_client};
use super::{Browser, PageSession, SessionError, resolve_link};
use crate::config::CrawlSettings;
use crate::models::SourceProfile;
use async_trait::async_trait;
use chromiumoxide::{BrowserConfig, Page};
use futures::StreamExt;
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Launch options for the shared browser.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Connect to an already running Chrome instead of spawning one.
    pub remote_debugging_url: Option<String>,
    /// Whether any configured source needs rendering. When false no Chrome
    /// process is started at all.
    pub needs_rendering: bool,
}

struct ChromeProcess {
    browser: chromiumoxide::Browser,
    handler: JoinHandle<()>,
}

/// The browser process shared by every source task in a run.
pub struct SharedBrowser {
    chrome: Mutex<Option<ChromeProcess>>,
    client: Client,
    user_agent: String,
}

impl SharedBrowser {
    /// Start the shared browser. Failure here is fatal for the crawl.
    #[instrument(level = "info", skip_all, fields(needs_rendering = options.needs_rendering))]
    pub async fn launch(settings: &CrawlSettings, options: &LaunchOptions) -> Result<Self, SessionError> {
        let client = build_client(settings)?;
        let chrome = if options.needs_rendering {
            Some(start_chrome(settings, options.remote_debugging_url.as_deref()).await?)
        } else {
            info!("No source requires rendering; skipping Chrome launch");
            None
        };
        Ok(Self {
            chrome: Mutex::new(chrome),
            client,
            user_agent: settings.user_agent.clone(),
        })
    }
}

async fn start_chrome(settings: &CrawlSettings, remote: Option<&str>) -> Result<ChromeProcess, SessionError> {
    let (browser, mut handler) = match remote {
        Some(url) => {
            info!(%url, "Connecting to remote Chrome instance");
            chromiumoxide::Browser::connect(url).await?
        }
        None => {
            let config = BrowserConfig::builder()
                .no_sandbox()
                .request_timeout(settings.nav_timeout())
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .arg("--disable-setuid-sandbox")
                .arg("--window-size=1920,1080")
                .build()
                .map_err(SessionError::Browser)?;
            chromiumoxide::Browser::launch(config).await?
        }
    };

    let handler = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });
    info!("Browser initialized");
    Ok(ChromeProcess { browser, handler })
}

#[async_trait]
impl Browser for SharedBrowser {
    async fn open_session(&self, profile: &SourceProfile) -> Result<Box<dyn PageSession>, SessionError> {
        if !profile.requires_browser_rendering {
            return Ok(Box::new(HttpSession::new(self.client.clone())));
        }

        let guard = self.chrome.lock().await;
        let Some(chrome) = guard.as_ref() else {
            warn!(source = %profile.name, "Rendering requested but no browser running; using HTTP session");
            return Ok(Box::new(HttpSession::new(self.client.clone())));
        };
        let page = chrome.browser.new_page("about:blank").await?;
        drop(guard);

        page.set_user_agent(self.user_agent.as_str()).await?;
        debug!(source = %profile.name, "Opened browser tab");
        Ok(Box::new(ChromeSession {
            page,
            client: self.client.clone(),
        }))
    }

    async fn close(&self) {
        let Some(mut chrome) = self.chrome.lock().await.take() else {
            return;
        };
        if let Err(e) = chrome.browser.close().await {
            warn!(error = %e, "Browser close failed");
        }
        if let Err(e) = chrome.browser.wait().await {
            warn!(error = %e, "Waiting for browser exit failed");
        }
        chrome.handler.abort();
        info!("Browser closed");
    }
}

/// One Chrome tab owned by a single source task.
pub struct ChromeSession {
    page: Page,
    client: Client,
}

impl ChromeSession {
    async fn current_url(&self) -> Option<Url> {
        let url = self.page.url().await.ok().flatten()?;
        Url::parse(&url).ok()
    }
}

/// Chrome loads error pages without failing `goto`, so the main document's
/// HTTP status decides. No recorded response counts as loaded.
fn navigation_status(url: &str, status: Option<i64>) -> Result<(), SessionError> {
    match status {
        Some(code) if !(200..300).contains(&code) => Err(SessionError::Status {
            url: url.to_string(),
            status: u16::try_from(code).unwrap_or(0),
        }),
        _ => Ok(()),
    }
}

#[async_trait]
impl PageSession for ChromeSession {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        super::parse_url(url)?;
        self.page.goto(url).await?;
        let status = self
            .page
            .wait_for_navigation_response()
            .await?
            .and_then(|request| request.response.as_ref().map(|response| response.status));
        navigation_status(url, status)
    }

    async fn query_selector_text(&mut self, selectors: &[String], min_len: usize) -> Option<String> {
        for selector in selectors {
            let elements = match self.page.find_elements(selector.as_str()).await {
                Ok(elements) => elements,
                Err(e) => {
                    debug!(%selector, error = %e, "Selector matched nothing");
                    continue;
                }
            };
            for element in elements {
                let Ok(Some(text)) = element.inner_text().await else {
                    continue;
                };
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if text.chars().count() > min_len {
                    return Some(text);
                }
            }
        }
        None
    }

    async fn discover_links(&mut self, selectors: &[String]) -> Vec<String> {
        let Some(base) = self.current_url().await else {
            return Vec::new();
        };
        let mut links = Vec::new();
        for selector in selectors {
            let Ok(elements) = self.page.find_elements(selector.as_str()).await else {
                debug!(%selector, "Link selector matched nothing");
                continue;
            };
            for element in elements {
                // `href` as a property is already absolute; the attribute is the fallback.
                let href = match element.property("href").await {
                    Ok(Some(serde_json::Value::String(href))) => Some(href),
                    _ => element.attribute("href").await.ok().flatten(),
                };
                if let Some(resolved) = href.and_then(|h| resolve_link(&base, &h)) {
                    links.push(resolved);
                }
            }
        }
        links
    }

    async fn fetch_raw(&mut self, url: &str) -> Result<String, SessionError> {
        HttpSession::new(self.client.clone()).fetch_raw(url).await
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.page.close().await {
            debug!(error = %e, "Closing tab failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.icai.org/category/announcements";

    #[test]
    fn test_error_status_fails_navigation() {
        for code in [403, 404, 503] {
            match navigation_status(URL, Some(code)) {
                Err(SessionError::Status { url, status }) => {
                    assert_eq!(url, URL);
                    assert_eq!(i64::from(status), code);
                }
                other => panic!("expected status error for {code}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_success_or_unknown_status_loads() {
        assert!(navigation_status(URL, Some(200)).is_ok());
        assert!(navigation_status(URL, Some(204)).is_ok());
        assert!(navigation_status(URL, None).is_ok());
    }
}
