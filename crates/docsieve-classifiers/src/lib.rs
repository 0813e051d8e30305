//! docsieve Classifiers
//!
//! Classifier adapters that turn one item into one [`AttemptOutcome`].
//!
//! Two families are provided:
//! - Keyword: download the document behind a URL, extract its text, and scan
//!   it for sensitive keywords (Aho-Corasick, case-insensitive)
//! - LLM: ask an external model (OpenAI, Anthropic, Gemini) whether the URL
//!   string itself looks sensitive
//!
//! Adapters perform exactly one external call per `classify` and never retry;
//! retries belong to the pipeline. Provider error text is mapped to
//! transient/fatal outcomes in [`failure`].
//!
//! [`AttemptOutcome`]: docsieve_core::AttemptOutcome

pub mod classifier;
pub mod config;
pub mod document;
pub mod failure;
pub mod llm;
pub mod patterns;
pub mod registry;

pub use classifier::{Classifier, ClassifierKind};
pub use config::{ClassifierSettings, HttpSettings, LlmSettings};
pub use document::{DocumentKind, DocumentScanner};
pub use llm::{LlmClassifier, LlmProvider};
pub use patterns::KeywordMatcher;
pub use registry::{build_classifier, ClassifierChoice};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{Classifier, ClassifierKind};
    pub use crate::document::DocumentScanner;
    pub use crate::llm::{LlmClassifier, LlmProvider};
    pub use crate::patterns::KeywordMatcher;
}
