//! Field extraction from a loaded page via selector fallback chains.
//!
//! For each field the profile's selectors are tried in order and the first
//! match long enough wins. A miss is an empty string, never an error, so
//! markup drift on one selector degrades to the next one in the chain.

use crate::models::{RawExtraction, SourceProfile};
use crate::session::PageSession;
use tracing::{debug, instrument};

/// Title and content must be longer than this many characters.
pub const MIN_PRIMARY_FIELD_LEN: usize = 10;

/// Pull raw fields out of the page `session` currently shows.
#[instrument(level = "debug", skip_all, fields(source = %profile.name, %url))]
pub async fn extract(session: &mut dyn PageSession, profile: &SourceProfile, url: &str) -> RawExtraction {
    let extraction = RawExtraction {
        url: url.to_string(),
        title: field(session, &profile.title_selector, MIN_PRIMARY_FIELD_LEN).await,
        content: field(session, &profile.content_selector, MIN_PRIMARY_FIELD_LEN).await,
        date_text: field(session, &profile.date_selector, 0).await,
        author_text: field(session, &profile.author_selector, 0).await,
        category_text: field(session, &profile.category_selector, 0).await,
    };

    debug!(
        title_found = !extraction.title.is_empty(),
        content_chars = extraction.content.len(),
        date_found = !extraction.date_text.is_empty(),
        "Extracted fields"
    );
    extraction
}

async fn field(session: &mut dyn PageSession, selectors: &[String], min_len: usize) -> String {
    if selectors.is_empty() {
        return String::new();
    }
    session
        .query_selector_text(selectors, min_len)
        .await
        .unwrap_or_default()
}
