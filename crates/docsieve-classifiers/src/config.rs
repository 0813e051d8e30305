//! Classifier configuration

use crate::llm::LlmProvider;
use crate::patterns::default_keywords;
use docsieve_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration shared by all classifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Keywords scanned for in document text
    pub keywords: Vec<String>,

    /// YAML file holding a list of keywords; replaces `keywords` when set
    pub keywords_file: Option<PathBuf>,

    /// HTTP settings for document downloads
    pub http: HttpSettings,

    /// Language model settings
    pub llm: LlmSettings,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            keywords_file: None,
            http: HttpSettings::default(),
            llm: LlmSettings::default(),
        }
    }
}

impl ClassifierSettings {
    /// The keyword ruleset in effect
    pub fn resolved_keywords(&self) -> Result<Vec<String>> {
        let Some(ref path) = self.keywords_file else {
            return Ok(self.keywords.clone());
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read keywords file {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_yaml::from_str::<Vec<String>>(&content).map_err(|e| {
            Error::config(format!(
                "Keywords file {} is not a YAML list: {}",
                path.display(),
                e
            ))
        })
    }
}

/// HTTP settings for document downloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// User-Agent header
    pub user_agent: String,

    /// Largest document body read before giving up
    pub max_document_bytes: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: format!("docsieve/{}", env!("CARGO_PKG_VERSION")),
            max_document_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Language model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Provider to call
    pub provider: LlmProvider,

    /// Model name; falls back to `model_env`, then the provider default
    pub model: Option<String>,

    /// Environment variable holding the API key (provider default if unset)
    pub api_key_env: Option<String>,

    /// Environment variable holding the model name (provider default if unset)
    pub model_env: Option<String>,

    /// Base URL override, e.g. for an OpenAI-compatible gateway
    pub endpoint: Option<String>,

    /// Reply token limit; the answer is a single word
    pub max_tokens: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            model: None,
            api_key_env: None,
            model_env: None,
            endpoint: None,
            max_tokens: 10,
            timeout_secs: 60,
        }
    }
}

impl LlmSettings {
    /// Environment variable holding the API key
    pub fn api_key_var(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.api_key_env())
    }

    /// Environment variable holding the model name
    pub fn model_var(&self) -> &str {
        self.model_env
            .as_deref()
            .unwrap_or_else(|| self.provider.model_env())
    }
}
