//! Response Adapter System
//!
//! Provides a pluggable system for reading the reply text out of the
//! non-streaming JSON bodies returned by different LLM providers
//! (OpenAI chat completions, Anthropic messages, Gemini generateContent).

use std::fmt::Debug;

/// Reply text extracted from a provider response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyText {
    /// The model answered with text
    Text(String),

    /// The body had no usable content
    Empty,

    /// The provider withheld the answer (safety filter, content policy)
    Blocked(String),
}

impl ReplyText {
    /// Normalized answer: trimmed and upper-cased, or `None` if there is no text
    pub fn normalized(&self) -> Option<String> {
        match self {
            Self::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_uppercase())
                }
            }
            _ => None,
        }
    }
}

/// Trait for reading provider response formats
pub trait ResponseAdapter: Send + Sync + Debug {
    /// Name of this adapter (for logging/debugging)
    fn name(&self) -> &str;

    /// Extract the reply from a decoded JSON body
    fn extract(&self, body: &serde_json::Value) -> ReplyText;

    /// Extract the reply from a raw body string
    ///
    /// Bodies that are not JSON count as empty.
    fn extract_str(&self, body: &str) -> ReplyText {
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(json) => self.extract(&json),
            Err(e) => {
                tracing::debug!(adapter = self.name(), error = %e, "response body is not JSON");
                ReplyText::Empty
            }
        }
    }
}
