//! Response Adapters
//!
//! Pluggable adapters for reading reply text from LLM provider responses.

pub mod configurable;
mod openai;

pub use configurable::{anthropic_adapter, gemini_adapter, AdapterConfig, ConfigurableAdapter};
pub use openai::OpenAiAdapter;

use crate::response_adapter::ResponseAdapter;

/// Get an adapter by provider name, falling back to OpenAI
pub fn get_adapter(name: &str) -> Box<dyn ResponseAdapter> {
    match name.to_lowercase().as_str() {
        "openai" => Box::new(OpenAiAdapter::new()),
        "anthropic" | "claude" => Box::new(configurable::anthropic_adapter()),
        "gemini" | "google" => Box::new(configurable::gemini_adapter()),
        _ => Box::new(OpenAiAdapter::new()), // OpenAI-compatible endpoints
    }
}
