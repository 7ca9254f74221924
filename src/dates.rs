//! Best-effort parsing of publication dates scraped from article pages and
//! feeds.
//!
//! Newsroom date strings are noisy ("Updated: Oct 16, 2026, 10:30 AM IST").
//! The whole string is tried first against the strict formats, then a
//! regex-located date fragment against the looser ones. Anything that still
//! fails yields `None` and the caller falls back to crawl time.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%b %d, %Y %I:%M %p",
    "%B %d, %Y %I:%M %p",
    "%d %b %Y %H:%M",
    "%d %B %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%d %b, %Y",
    "%d %B, %Y",
];

static RE_ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(19|20)\d\d[-/.](1[012]|0?[1-9])[-/.](3[01]|[12][0-9]|0?[1-9])").unwrap());

static RE_DAY_FIRST_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(3[01]|[12][0-9]|0?[1-9])[-/.](1[012]|0?[1-9])[-/.](19|20)\d\d").unwrap());

static RE_MONTH_NAME_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+(19|20)\d\d").unwrap()
});

static RE_DAY_FIRST_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\d{1,2}\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?,?\s+(19|20)\d\d").unwrap()
});

/// Parse `text` into a UTC timestamp. Times without a zone are taken as UTC;
/// dates without a time are taken as midnight UTC.
pub fn parse_published(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    parse_exact(text).or_else(|| parse_fragment(text))
}

fn parse_exact(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    parse_date_only(text)
}

fn parse_date_only(text: &str) -> Option<DateTime<Utc>> {
    // `%b` rejects "Sept" and abbreviations with a trailing dot ("Oct. 16").
    let normalized = text.replace("Sept", "Sep").replace(". ", " ");
    [text, normalized.as_str()]
        .iter()
        .find_map(|candidate| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(candidate.trim(), format).ok())
        })
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn parse_fragment(text: &str) -> Option<DateTime<Utc>> {
    [&*RE_ISO_DATE, &*RE_DAY_FIRST_NUMERIC, &*RE_MONTH_NAME_FIRST, &*RE_DAY_FIRST_NAME]
        .iter()
        .filter_map(|re| re.find(text))
        .find_map(|m| parse_date_only(m.as_str()))
}
