//! Configurable Response Adapter
//!
//! A generic adapter that can be configured to read various provider
//! response formats using JSONPath-like content extraction.

use crate::response_adapter::{ReplyText, ResponseAdapter};
use serde::{Deserialize, Serialize};

/// Configuration for a provider response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Adapter name
    pub name: String,

    /// Path to the reply text (dot-notation or simple JSONPath)
    /// Examples: "content[0].text", "candidates[0].content.parts[0].text"
    pub content_path: String,

    /// Path to a field whose presence means the provider blocked the reply
    /// Examples: "promptFeedback.blockReason"
    #[serde(default)]
    pub block_reason_path: Option<String>,

    /// Path to a finish/stop reason
    #[serde(default)]
    pub finish_reason_path: Option<String>,

    /// Finish reasons that mean the reply was withheld (e.g. "SAFETY")
    #[serde(default)]
    pub blocked_finish_reasons: Vec<String>,
}

/// A configurable response adapter
#[derive(Debug, Clone)]
pub struct ConfigurableAdapter {
    config: AdapterConfig,
}

impl ConfigurableAdapter {
    /// Create a new configurable adapter
    pub fn new(config: AdapterConfig) -> Self {
        Self { config }
    }

    /// Extract value from JSON using a simple path notation
    fn extract_path<'a>(
        &self,
        value: &'a serde_json::Value,
        path: &str,
    ) -> Option<&'a serde_json::Value> {
        let mut current = value;

        for part in path.split('.') {
            // Handle array index notation: "parts[0]"
            if let Some(bracket_pos) = part.find('[') {
                let key = &part[..bracket_pos];
                let index_str = part[bracket_pos + 1..].trim_end_matches(']');

                if !key.is_empty() {
                    current = current.get(key)?;
                }

                let index: usize = index_str.parse().ok()?;
                current = current.get(index)?;
            } else {
                current = current.get(part)?;
            }
        }

        Some(current)
    }

    fn string_at(&self, value: &serde_json::Value, path: &str) -> Option<String> {
        self.extract_path(value, path)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

impl ResponseAdapter for ConfigurableAdapter {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn extract(&self, body: &serde_json::Value) -> ReplyText {
        if let Some(ref path) = self.config.block_reason_path {
            if let Some(reason) = self.string_at(body, path) {
                return ReplyText::Blocked(reason);
            }
        }

        if let Some(text) = self.string_at(body, &self.config.content_path) {
            if !text.trim().is_empty() {
                return ReplyText::Text(text);
            }
        }

        // No text: report a withheld reply if the finish reason says so
        if let Some(ref path) = self.config.finish_reason_path {
            if let Some(reason) = self.string_at(body, path) {
                if self.config.blocked_finish_reasons.contains(&reason) {
                    return ReplyText::Blocked(reason);
                }
            }
        }

        ReplyText::Empty
    }
}

// =============================================================================
// Pre-built Adapters
// =============================================================================

/// Create an Anthropic Messages API adapter
///
/// Anthropic format:
/// ```text
/// {"id":"msg_01","type":"message","role":"assistant",
///  "content":[{"type":"text","text":"OK"}],"stop_reason":"end_turn"}
/// ```
pub fn anthropic_adapter() -> ConfigurableAdapter {
    ConfigurableAdapter::new(AdapterConfig {
        name: "anthropic".to_string(),
        content_path: "content[0].text".to_string(),
        block_reason_path: None,
        finish_reason_path: Some("stop_reason".to_string()),
        blocked_finish_reasons: vec!["refusal".to_string()],
    })
}

/// Create a Gemini generateContent adapter
///
/// Gemini format:
/// ```text
/// {"candidates":[{"content":{"parts":[{"text":"OK"}],"role":"model"},"finishReason":"STOP"}]}
/// ```
/// A blocked prompt has no candidates and carries `promptFeedback.blockReason`.
pub fn gemini_adapter() -> ConfigurableAdapter {
    ConfigurableAdapter::new(AdapterConfig {
        name: "gemini".to_string(),
        content_path: "candidates[0].content.parts[0].text".to_string(),
        block_reason_path: Some("promptFeedback.blockReason".to_string()),
        finish_reason_path: Some("candidates[0].finishReason".to_string()),
        blocked_finish_reasons: vec![
            "SAFETY".to_string(),
            "RECITATION".to_string(),
            "BLOCKLIST".to_string(),
            "PROHIBITED_CONTENT".to_string(),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anthropic_adapter() {
        let adapter = anthropic_adapter();

        let body = r#"{"id":"msg_01","type":"message","role":"assistant","content":[{"type":"text","text":"SENSITIVE"}],"stop_reason":"end_turn"}"#;
        assert_eq!(adapter.extract_str(body), ReplyText::Text("SENSITIVE".to_string()));

        let empty = r#"{"id":"msg_02","type":"message","content":[],"stop_reason":"end_turn"}"#;
        assert_eq!(adapter.extract_str(empty), ReplyText::Empty);
    }

    #[test]
    fn test_gemini_adapter() {
        let adapter = gemini_adapter();

        let body = r#"{"candidates":[{"content":{"parts":[{"text":"OK\n"}],"role":"model"},"finishReason":"STOP"}]}"#;
        assert_eq!(adapter.extract_str(body), ReplyText::Text("OK\n".to_string()));

        let blocked = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert_eq!(adapter.extract_str(blocked), ReplyText::Blocked("SAFETY".to_string()));

        let filtered = r#"{"candidates":[{"content":{"parts":[],"role":"model"},"finishReason":"SAFETY"}]}"#;
        assert_eq!(adapter.extract_str(filtered), ReplyText::Blocked("SAFETY".to_string()));
    }

    #[test]
    fn test_path_extraction() {
        let adapter = ConfigurableAdapter::new(AdapterConfig {
            name: "test".to_string(),
            content_path: "choices[0].message.content".to_string(),
            block_reason_path: None,
            finish_reason_path: None,
            blocked_finish_reasons: vec![],
        });

        let json: serde_json::Value =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"test"}}]}"#).unwrap();

        let value = adapter.extract_path(&json, "choices[0].message.content");
        assert_eq!(value.unwrap().as_str(), Some("test"));
        assert!(adapter.extract_path(&json, "choices[3].message").is_none());
    }
}
