//! Keyword relevance test for raw extractions.

use crate::models::{RawExtraction, SourceProfile};

/// Lower-cased `title + " " + content`, the text every heuristic scans.
pub fn haystack(title: &str, content: &str) -> String {
    format!("{title} {content}").to_lowercase()
}

/// True iff the text contains at least one include keyword and no exclude
/// keyword. Matching is case-insensitive substring search.
///
/// The include scan runs first; when nothing matches the exclude scan is
/// skipped.
pub fn is_relevant(extraction: &RawExtraction, profile: &SourceProfile) -> bool {
    let text = haystack(&extraction.title, &extraction.content);
    let contains = |keyword: &String| {
        let keyword = keyword.trim().to_lowercase();
        !keyword.is_empty() && text.contains(&keyword)
    };

    profile.include_keywords.iter().any(contains) && !profile.exclude_keywords.iter().any(contains)
}
