//! Classifier trait and common types

use async_trait::async_trait;
use docsieve_core::{AttemptOutcome, Item};

/// Trait for all classifiers
///
/// One call is one external request. Implementations must map every error
/// path to an [`AttemptOutcome`] variant instead of panicking or retrying.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify the given item
    async fn classify(&self, item: &Item) -> AttemptOutcome;

    /// Get the classifier name
    fn name(&self) -> &str;

    /// Get the classifier family
    fn kind(&self) -> ClassifierKind;
}

/// Classifier family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    /// Document download + keyword scan
    Keyword,
    /// External language model judging the URL string
    Llm,
}
