//! Keyword matching over extracted document text

use aho_corasick::{AhoCorasick, MatchKind};
use docsieve_core::{Error, Result, Verdict};
use std::collections::BTreeSet;

/// Keywords scanned for when no ruleset is configured
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "internal use only",
    "confidential",
    "strictly private",
    "personal & confidential private",
    "restricted",
    "internal",
    "not for distribution",
    "do not share",
    "proprietary",
    "trade secret",
    "classified",
    "sensitive",
    "bank statement",
    "invoice",
    "salary",
    "contract",
    "agreement",
    "mom disclosure",
    "passport",
    "social security",
    "ssn",
    "date of birth",
    "credit card",
    "identity",
    "id number",
    "company confidential",
    "staff only",
    "management only",
    "internal only",
];

/// The default ruleset as owned strings
pub fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

/// Fast keyword matcher using the Aho-Corasick algorithm
///
/// Matching is ASCII case-insensitive and leftmost-longest, so
/// "internal use only" wins over "internal" at the same position.
/// Hits are reported as the canonical (lower-cased) keyword.
pub struct KeywordMatcher {
    automaton: AhoCorasick,
    keywords: Vec<String>,
}

impl KeywordMatcher {
    /// Create a new matcher; blank and duplicate keywords are dropped
    pub fn new<I, S>(keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = BTreeSet::new();
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty() && seen.insert(k.clone()))
            .collect();

        if keywords.is_empty() {
            return Err(Error::config("keyword list is empty"));
        }

        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(&keywords)
            .map_err(|e| Error::classifier(format!("Failed to build keyword matcher: {}", e)))?;

        Ok(Self {
            automaton,
            keywords,
        })
    }

    /// Matcher over [`DEFAULT_KEYWORDS`]
    pub fn with_defaults() -> Result<Self> {
        Self::new(DEFAULT_KEYWORDS)
    }

    /// Distinct keywords found in `text`
    pub fn find(&self, text: &str) -> BTreeSet<String> {
        self.automaton
            .find_iter(text)
            .map(|m| self.keywords[m.pattern().as_usize()].clone())
            .collect()
    }

    /// Scan text and produce a verdict
    ///
    /// Text with no non-whitespace content cannot be judged and yields
    /// [`Verdict::Indeterminate`].
    pub fn scan(&self, text: &str) -> Verdict {
        if text.trim().is_empty() {
            return Verdict::Indeterminate;
        }
        Verdict::from_signals(self.find(text))
    }

    /// Number of keywords in the ruleset
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    /// Check if the ruleset is empty (never true for a built matcher)
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

impl std::fmt::Debug for KeywordMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeywordMatcher")
            .field("keywords", &self.keywords.len())
            .finish()
    }
}
