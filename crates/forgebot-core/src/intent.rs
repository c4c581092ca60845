//! Intent extraction: does this message ask us to build something?
//!
//! The pattern list is priority-ordered and evaluated first-match-wins.
//! Ordering matters: several later patterns are strict substrings of earlier
//! ones (欲しい vs が欲しい, 作って vs を作って), so reordering would change
//! which span of text gets captured.

use once_cell::sync::Lazy;
use regex::Regex;

/// Priority-ordered build-request patterns. Japanese verb-phrase suffixes
/// first (the original audience), English prefixes after.
static INTENT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(.+?)作りたい",
        r"(.+?)が欲しい",
        r"(.+?)がほしい",
        r"(.+?)を作って",
        r"(.+?)作って",
        r"(.+?)を実装して",
        r"(.+?)実装して",
        r"(.+?)を生成して",
        r"(.+?)生成して",
        r"(.+?)欲しい",
        r"(.+?)ほしい",
        r"(?i)i want to build (.+)",
        r"(?i)build me (.+)",
        r"(?i)make me (.+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("intent pattern compiles"))
    .collect()
});

/// Matches free-text intent patterns against message bodies.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntentMatcher;

impl IntentMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Returns the raw captured idea of the first matching pattern, or
    /// `None` when the message is not a build request. At most one idea is
    /// extracted per message even if several patterns would match.
    pub fn extract(&self, body: &str) -> Option<String> {
        for pattern in INTENT_PATTERNS.iter() {
            if let Some(caps) = pattern.captures(body) {
                let idea = caps.get(1)?.as_str().trim();
                if !idea.is_empty() {
                    return Some(idea.to_string());
                }
            }
        }
        None
    }
}
