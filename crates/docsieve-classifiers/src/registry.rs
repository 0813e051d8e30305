//! Classifier construction and credential checks
//!
//! Everything that can make a run pointless (no keywords, no API key, a
//! placeholder model name) is rejected here, before any item is scheduled.

use crate::classifier::Classifier;
use crate::config::ClassifierSettings;
use crate::document::DocumentScanner;
use crate::llm::LlmClassifier;
use crate::patterns::KeywordMatcher;
use docsieve_core::{Error, Result};
use std::sync::Arc;
use tracing::info;

/// Values commonly left in `.env` templates instead of real credentials
const PLACEHOLDERS: &[&str] = &[
    "YOUR_API_KEY_HERE",
    "YOUR_MODEL_NAME_HERE",
    "PLACEHOLDER",
    "NONE",
    "NULL",
    "MISSING",
    "CONFIG_ME",
    "ENTER_YOUR_KEY",
    "ADD_YOUR_MODEL",
    "YOUR_GOOGLE_API_KEY",
    "YOUR_GOOGLE_GEMINI_MODEL",
    "YOUR_ANTHROPIC_CLAUDE_API_KEY_HERE",
    "YOUR_ANTHROPIC_CLAUDE_MODEL_NAME_HERE",
    "YOUR_OPENAI_GPT_API_KEY_HERE",
    "YOUR_OPENAI_GPT_MODEL_NAME_HERE",
];

/// Which classifier family to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierChoice {
    /// Download documents and scan them for keywords
    Keywords,
    /// Ask the configured language model about each URL
    Llm,
}

/// Check that a configured value is present and not a template placeholder
pub fn is_usable_value(value: &str) -> bool {
    let cleaned = value.trim().to_uppercase();
    !cleaned.is_empty() && !PLACEHOLDERS.contains(&cleaned.as_str())
}

/// Build a classifier, reading credentials from the process environment
pub fn build_classifier(
    choice: ClassifierChoice,
    settings: &ClassifierSettings,
) -> Result<Arc<dyn Classifier>> {
    build_classifier_with(choice, settings, |var| std::env::var(var).ok())
}

/// Build a classifier with an explicit environment lookup
pub fn build_classifier_with<F>(
    choice: ClassifierChoice,
    settings: &ClassifierSettings,
    lookup: F,
) -> Result<Arc<dyn Classifier>>
where
    F: Fn(&str) -> Option<String>,
{
    match choice {
        ClassifierChoice::Keywords => {
            let matcher = KeywordMatcher::new(settings.resolved_keywords()?)?;
            info!(keywords = matcher.len(), "Keyword scanner ready");
            Ok(Arc::new(DocumentScanner::new(Arc::new(matcher), &settings.http)?))
        }
        ClassifierChoice::Llm => {
            let llm = &settings.llm;
            let key_var = llm.api_key_var();

            let api_key = lookup(key_var)
                .filter(|key| is_usable_value(key))
                .ok_or_else(|| {
                    Error::config(format!(
                        "{} is not configured: set {} (directly or in .env)",
                        llm.provider, key_var
                    ))
                })?;

            let model = resolve_model(settings, &lookup)?;
            let classifier = LlmClassifier::new(llm.provider, model, api_key.trim(), llm)?;
            info!(
                provider = %llm.provider,
                model = classifier.model(),
                "LLM classifier ready"
            );
            Ok(Arc::new(classifier))
        }
    }
}

/// Model name from config, then the model env var, then the provider default
fn resolve_model<F>(settings: &ClassifierSettings, lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let llm = &settings.llm;

    if let Some(ref model) = llm.model {
        if !is_usable_value(model) {
            return Err(Error::config(format!("Configured model name '{}' is a placeholder", model)));
        }
        return Ok(model.trim().to_string());
    }

    let model_var = llm.model_var();
    match lookup(model_var) {
        Some(model) if is_usable_value(&model) => Ok(model.trim().to_string()),
        Some(model) if !model.trim().is_empty() => Err(Error::config(format!(
            "{} holds a placeholder model name '{}'",
            model_var, model
        ))),
        _ => Ok(llm.provider.default_model().to_string()),
    }
}
