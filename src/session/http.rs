//! Lightweight page session: one HTTP fetch per navigation, DOM parsed with
//! `scraper`.
//!
//! Used for sources whose markup is served complete without JavaScript.
//! The fetched body is kept as text and parsed per query, so the session
//! stays `Send` across await points.

use super::{PageSession, SessionError, parse_url, resolve_link};
use crate::config::CrawlSettings;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

/// Build the HTTP client shared by every lightweight session in a run.
pub fn build_client(settings: &CrawlSettings) -> Result<Client, SessionError> {
    let client = Client::builder()
        .user_agent(settings.user_agent.clone())
        .timeout(settings.nav_timeout())
        .build()?;
    Ok(client)
}

struct LoadedPage {
    url: Url,
    html: String,
}

/// A page session backed by plain HTTP requests.
pub struct HttpSession {
    client: Client,
    current: Option<LoadedPage>,
}

impl HttpSession {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            current: None,
        }
    }

    async fn get_text(&self, url: &str) -> Result<(Url, String), SessionError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let final_url = response.url().clone();
        let body = response.text().await?;
        Ok((final_url, body))
    }
}

#[async_trait]
impl PageSession for HttpSession {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        parse_url(url)?;
        let (final_url, html) = self.get_text(url).await?;
        debug!(bytes = html.len(), "Fetched page");
        self.current = Some(LoadedPage {
            url: final_url,
            html,
        });
        Ok(())
    }

    async fn query_selector_text(&mut self, selectors: &[String], min_len: usize) -> Option<String> {
        let page = self.current.as_ref()?;
        select_text(&page.html, selectors, min_len)
    }

    async fn discover_links(&mut self, selectors: &[String]) -> Vec<String> {
        match self.current.as_ref() {
            Some(page) => select_links(&page.html, &page.url, selectors),
            None => Vec::new(),
        }
    }

    async fn fetch_raw(&mut self, url: &str) -> Result<String, SessionError> {
        parse_url(url)?;
        let (_, body) = self.get_text(url).await?;
        Ok(body)
    }

    async fn close(self: Box<Self>) {}
}

fn parse_selector(raw: &str) -> Option<Selector> {
    match Selector::parse(raw) {
        Ok(selector) => Some(selector),
        Err(e) => {
            debug!(selector = raw, error = %e, "Skipping unparseable selector");
            None
        }
    }
}

/// Whitespace-collapsed text content of an element.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First element text, across the selector chain in order, longer than `min_len`.
pub(crate) fn select_text(html: &str, selectors: &[String], min_len: usize) -> Option<String> {
    let document = Html::parse_document(html);
    for raw in selectors {
        let Some(selector) = parse_selector(raw) else {
            continue;
        };
        for element in document.select(&selector) {
            let text = element_text(element);
            if text.chars().count() > min_len {
                return Some(text);
            }
        }
    }
    None
}

/// Resolved hrefs of every element matching any selector, in chain order.
pub(crate) fn select_links(html: &str, base: &Url, selectors: &[String]) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();
    for raw in selectors {
        let Some(selector) = parse_selector(raw) else {
            continue;
        };
        for element in document.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(resolved) = resolve_link(base, href) {
                    links.push(resolved);
                }
            }
        }
    }
    links
}
