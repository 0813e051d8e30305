//! OpenAI Chat Completions Adapter
//!
//! Reads the non-streaming chat completions format:
//! ```text
//! {"id":"chatcmpl-xxx","object":"chat.completion","model":"gpt-4o-mini",
//!  "choices":[{"index":0,"message":{"role":"assistant","content":"OK"},"finish_reason":"stop"}]}
//! ```

use crate::response_adapter::{ReplyText, ResponseAdapter};
use serde::Deserialize;

/// OpenAI chat completions adapter
#[derive(Debug, Clone, Default)]
pub struct OpenAiAdapter;

impl OpenAiAdapter {
    /// Create a new OpenAI adapter
    pub fn new() -> Self {
        Self
    }
}

impl ResponseAdapter for OpenAiAdapter {
    fn name(&self) -> &str {
        "openai"
    }

    fn extract(&self, body: &serde_json::Value) -> ReplyText {
        let completion = match OpenAiCompletion::deserialize(body) {
            Ok(completion) => completion,
            Err(e) => {
                tracing::debug!(error = %e, "unexpected OpenAI response shape");
                return ReplyText::Empty;
            }
        };

        let Some(choice) = completion.choices.into_iter().next() else {
            return ReplyText::Empty;
        };

        if choice.finish_reason.as_deref() == Some("content_filter") {
            return ReplyText::Blocked("content_filter".to_string());
        }

        let Some(message) = choice.message else {
            return ReplyText::Empty;
        };

        match (message.content, message.refusal) {
            (Some(content), _) if !content.trim().is_empty() => ReplyText::Text(content),
            (_, Some(refusal)) => ReplyText::Blocked(refusal),
            _ => ReplyText::Empty,
        }
    }
}

// =============================================================================
// OpenAI Response Structures
// =============================================================================

#[derive(Debug, Deserialize)]
struct OpenAiCompletion {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: Option<OpenAiMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}
