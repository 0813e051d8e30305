//! docsieve Core
//!
//! Core types, traits, and utilities shared across docsieve components.
//!
//! This crate provides:
//! - The work-unit data model: items, verdicts, attempt outcomes, and item results
//! - Error types and result handling
//! - Response adapters that pull the reply text out of LLM provider JSON bodies

pub mod adapters;
pub mod error;
pub mod response_adapter;
pub mod types;

pub use adapters::{get_adapter, anthropic_adapter, gemini_adapter, AdapterConfig, ConfigurableAdapter, OpenAiAdapter};
pub use error::{Error, Result};
pub use response_adapter::{ReplyText, ResponseAdapter};
pub use types::{
    AttemptOutcome, Evidence, Item, ItemResult, TransientFailure, TransientKind, Verdict,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::response_adapter::{ReplyText, ResponseAdapter};
    pub use crate::types::{
        AttemptOutcome, Evidence, Item, ItemResult, TransientFailure, TransientKind, Verdict,
    };
}
