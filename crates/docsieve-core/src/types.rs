//! Core types for docsieve

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// A single unit of work: one URL read from the input file
///
/// Identity is the exact string value. Two items with the same string are
/// the same item for deduplication, even when submitted twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(String);

impl Item {
    /// Create a new item from a URL string
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The item's identity string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Item {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Item {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Signals that justify a flagged verdict (keyword hits or a classifier label)
///
/// Always non-empty; kept sorted so rendering is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeSet<String>")]
pub struct Evidence(BTreeSet<String>);

impl TryFrom<BTreeSet<String>> for Evidence {
    type Error = &'static str;

    fn try_from(signals: BTreeSet<String>) -> std::result::Result<Self, Self::Error> {
        Self::from_signals(signals).ok_or("evidence needs at least one signal")
    }
}

impl Evidence {
    /// Build evidence from signals, or `None` if there are none
    pub fn from_signals<I, S>(signals: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = signals.into_iter().map(Into::into).collect();
        if set.is_empty() {
            None
        } else {
            Some(Self(set))
        }
    }

    /// Evidence consisting of a single label
    pub fn label(label: impl Into<String>) -> Self {
        Self(BTreeSet::from([label.into()]))
    }

    /// Sorted, comma-joined rendering used in the output file
    pub fn joined(&self) -> String {
        self.0.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

/// Classification result for an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Item matched; evidence lists why
    Flagged(Evidence),

    /// Item did not match
    Clear,

    /// Classifier could not decide (e.g. a document with no extractable text)
    Indeterminate,
}

impl Verdict {
    /// Flagged if any signals are given, otherwise clear
    pub fn from_signals<I, S>(signals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match Evidence::from_signals(signals) {
            Some(evidence) => Self::Flagged(evidence),
            None => Self::Clear,
        }
    }
}

/// Why a transient failure happened; drives the backoff default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransientKind {
    /// Rate limit or quota exhaustion (429 and friends)
    RateLimited,

    /// Server-side fault (5xx) or connectivity problem
    Unavailable,
}

impl fmt::Display for TransientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => f.write_str("rate limited"),
            Self::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// A retryable failure reported by a classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientFailure {
    /// Failure category
    pub kind: TransientKind,

    /// Human-readable reason, preserved from the provider where possible
    pub reason: String,

    /// Delay the provider asked for, if it said so
    pub suggested_delay: Option<Duration>,
}

/// Result of a single classifier call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The classifier produced a verdict
    Success(Verdict),

    /// Retryable failure
    TransientFailure(TransientFailure),

    /// Non-retryable failure; the reason is kept verbatim
    FatalFailure(String),
}

impl AttemptOutcome {
    /// Rate-limit failure with an optional provider delay
    pub fn rate_limited(reason: impl Into<String>, suggested_delay: Option<Duration>) -> Self {
        Self::TransientFailure(TransientFailure {
            kind: TransientKind::RateLimited,
            reason: reason.into(),
            suggested_delay,
        })
    }

    /// Server/connectivity failure with an optional provider delay
    pub fn unavailable(reason: impl Into<String>, suggested_delay: Option<Duration>) -> Self {
        Self::TransientFailure(TransientFailure {
            kind: TransientKind::Unavailable,
            reason: reason.into(),
            suggested_delay,
        })
    }

    /// Non-retryable failure
    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::FatalFailure(reason.into())
    }
}

/// Terminal state of an item after all attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemResult {
    /// A verdict was reached
    Resolved(Verdict),

    /// Classification failed for good
    Failed(String),
}
