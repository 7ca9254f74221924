//! Keyword heuristics that turn raw article text into a category, an impact
//! level, a tag set and a short extractive summary.
//!
//! All functions are pure and operate on lower-cased `title + content`.
//!
//! # Priority
//!
//! | Function | Order | Fallback |
//! |----------|-------|----------|
//! | [`categorize`] | tax → compliance → audit | general |
//! | [`determine_impact`] | high → medium | low |
//!
//! Tax language overlaps heavily with compliance language ("GST compliance",
//! "TDS rules"), so the tax group is checked first and wins.

use crate::models::{Category, Impact};
use crate::relevance::haystack;
use once_cell::sync::Lazy;
use regex::Regex;

const TAX_TERMS: &[&str] = &["tax", "gst", "income tax", "tds"];
const COMPLIANCE_TERMS: &[&str] = &["compliance", "regulation", "rule", "circular"];
const AUDIT_TERMS: &[&str] = &["audit", "auditing", "auditor"];

const HIGH_IMPACT_TERMS: &[&str] = &[
    "mandatory",
    "compulsory",
    "penalty",
    "deadline",
    "new rule",
    "amendment",
    "notification",
];
const MEDIUM_IMPACT_TERMS: &[&str] = &["guideline", "clarification", "update", "change", "circular"];

/// Domain dictionary for [`extract_tags`], in output order.
const TAG_TERMS: &[&str] = &[
    "gst",
    "income tax",
    "tds",
    "audit",
    "compliance",
    "icai",
    "corporate",
    "banking",
    "finance",
    "accounting",
    "tax reform",
    "budget",
    "policy",
];

/// Sentences shorter than this (after trimming) are not summary material.
const MIN_SENTENCE_LEN: usize = 10;
const SUMMARY_SENTENCES: usize = 2;

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());

fn mentions_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| text.contains(term))
}

/// First matching keyword group wins: tax, then compliance, then audit.
pub fn categorize(title: &str, content: &str) -> Category {
    let text = haystack(title, content);
    if mentions_any(&text, TAX_TERMS) {
        Category::Tax
    } else if mentions_any(&text, COMPLIANCE_TERMS) {
        Category::Compliance
    } else if mentions_any(&text, AUDIT_TERMS) {
        Category::Audit
    } else {
        Category::General
    }
}

/// High-tier keywords are checked before medium-tier ones, so text with both
/// resolves to [`Impact::High`].
pub fn determine_impact(title: &str, content: &str) -> Impact {
    let text = haystack(title, content);
    if mentions_any(&text, HIGH_IMPACT_TERMS) {
        Impact::High
    } else if mentions_any(&text, MEDIUM_IMPACT_TERMS) {
        Impact::Medium
    } else {
        Impact::Low
    }
}

/// Every dictionary term present in the text, in dictionary order.
pub fn extract_tags(title: &str, content: &str) -> Vec<String> {
    let text = haystack(title, content);
    TAG_TERMS
        .iter()
        .filter(|term| text.contains(*term))
        .map(|term| term.to_string())
        .collect()
}

/// The first two sentences longer than ten characters, joined and closed
/// with a period. Empty when no sentence qualifies.
pub fn summarize(content: &str) -> String {
    let sentences: Vec<&str> = SENTENCE_END
        .split(content)
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_SENTENCE_LEN)
        .take(SUMMARY_SENTENCES)
        .collect();

    if sentences.is_empty() {
        return String::new();
    }
    format!("{}.", sentences.join(". "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_mandatory_gst_deadline() {
        let title = "New mandatory GST filing deadline announced";
        assert_eq!(categorize(title, ""), Category::Tax);
        assert_eq!(determine_impact(title, ""), Impact::High);
    }

    #[test]
    fn test_tax_wins_over_compliance() {
        assert_eq!(
            categorize("GST compliance checklist", "Regulation and circular roundup"),
            Category::Tax
        );
    }

    #[test]
    fn test_compliance_wins_over_audit() {
        assert_eq!(
            categorize("New regulation for auditors", "Audit firms must comply"),
            Category::Compliance
        );
    }

    #[test]
    fn test_audit_and_general() {
        assert_eq!(categorize("Auditor resigns", "Board seeks replacement"), Category::Audit);
        assert_eq!(categorize("Monsoon session begins", "Parliament convenes"), Category::General);
    }

    #[test]
    fn test_high_impact_wins_over_medium() {
        assert_eq!(
            determine_impact("Guideline update", "A penalty applies from next month"),
            Impact::High
        );
    }

    #[test]
    fn test_medium_and_low_impact() {
        assert_eq!(determine_impact("Clarification issued", "on valuation"), Impact::Medium);
        assert_eq!(determine_impact("Markets close higher", "Sensex gains"), Impact::Low);
    }

    #[test]
    fn test_extract_tags_returns_all_matches_in_order() {
        let tags = extract_tags(
            "Budget: GST and income tax changes",
            "Corporate accounting and banking policy shift, TDS rates cut",
        );
        assert_eq!(
            tags,
            vec!["gst", "income tax", "tds", "corporate", "banking", "accounting", "budget", "policy"]
        );
        assert!(extract_tags("Weather", "Sunny").is_empty());
    }

    #[test]
    fn test_summarize_takes_two_long_sentences() {
        let content = "Short. The GST council met on Friday! It revised rates for forty items? \
                       A third sentence is ignored.";
        assert_eq!(
            summarize(content),
            "The GST council met on Friday. It revised rates for forty items."
        );
    }

    #[test]
    fn test_summarize_edge_cases() {
        assert_eq!(summarize(""), "");
        assert_eq!(summarize("Too short. Tiny!"), "");
        assert_eq!(
            summarize("Only one sentence without a terminator"),
            "Only one sentence without a terminator."
        );
    }

    #[test]
    fn test_summarize_idempotent_for_same_input() {
        let content = "First long sentence here. Second long sentence here. Third.";
        assert_eq!(summarize(content), summarize(content));
    }
}
