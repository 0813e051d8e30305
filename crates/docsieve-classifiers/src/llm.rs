//! LLM URL classifier
//!
//! Sends a fixed static-analysis prompt about the URL string to a hosted
//! model and reads back a one-word answer: `SENSITIVE` or `OK`. The URL is
//! never fetched.

use crate::classifier::{Classifier, ClassifierKind};
use crate::config::LlmSettings;
use crate::failure;
use async_trait::async_trait;
use docsieve_core::adapters::get_adapter;
use docsieve_core::{AttemptOutcome, Error, Evidence, Item, ReplyText, ResponseAdapter, Result, Verdict};
use reqwest::header::RETRY_AFTER;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Label recorded as evidence for a flagged URL
pub const SENSITIVE_LABEL: &str = "SENSITIVE";

const ANALYSIS_PROMPT: &str = r#"Role: you perform static analysis of URL strings for potential sensitive information.
Objective: decide whether the URL string below, read purely as text, contains patterns that suggest sensitive data.
Constraints:
1. You MUST NOT visit, access, or validate the URL. Only its characters and structure count.
2. Your reply MUST be exactly one word: "SENSITIVE" if the string suggests potentially sensitive information, or "OK" if it does not.
Do not include any other text, explanations, or punctuation.
URL: {url}
"#;

/// Render the analysis prompt for one URL
pub fn analysis_prompt(url: &str) -> String {
    ANALYSIS_PROMPT.replace("{url}", url)
}

/// Hosted model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[serde(alias = "gpt")]
    OpenAi,
    #[serde(alias = "claude")]
    Anthropic,
    #[serde(alias = "google")]
    Gemini,
}

impl LlmProvider {
    /// All providers, in display order
    pub const ALL: [LlmProvider; 3] = [Self::OpenAi, Self::Anthropic, Self::Gemini];

    /// Lower-case provider id
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }

    /// Model used when neither config nor environment names one
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-haiku-latest",
            Self::Gemini => "gemini-1.5-flash",
        }
    }

    /// Environment variable holding the API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Gemini => "GOOGLE_API_KEY",
        }
    }

    /// Environment variable holding the model name
    pub fn model_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_GPT_MODEL",
            Self::Anthropic => "ANTHROPIC_CLAUDE_MODEL",
            Self::Gemini => "GOOGLE_GEMINI_MODEL",
        }
    }

    /// Public API base URL
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "gpt" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(Error::config(format!(
                "Unknown LLM provider '{}' (expected openai, anthropic or gemini)",
                other
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: [GeminiContent<'a>; 1],
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: [GeminiPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

/// Classifier that asks a hosted model about the URL string
pub struct LlmClassifier {
    name: String,
    provider: LlmProvider,
    model: String,
    api_key: String,
    base_url: String,
    max_tokens: u32,
    client: reqwest::Client,
    adapter: Box<dyn ResponseAdapter>,
}

impl LlmClassifier {
    /// Create a classifier for a provider with a resolved model and key
    pub fn new(
        provider: LlmProvider,
        model: impl Into<String>,
        api_key: impl Into<String>,
        settings: &LlmSettings,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let model = model.into();
        let base_url = settings
            .endpoint
            .as_deref()
            .unwrap_or_else(|| provider.default_endpoint());
        Ok(Self {
            name: format!("{}:{}", provider, model),
            provider,
            model,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens: settings.max_tokens,
            client,
            adapter: get_adapter(provider.as_str()),
        })
    }

    /// Model in use
    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, prompt: &str) -> reqwest::RequestBuilder {
        let messages = [ChatMessage {
            role: "user",
            content: prompt,
        }];

        match self.provider {
            LlmProvider::OpenAi => self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&ChatRequest {
                    model: &self.model,
                    max_tokens: self.max_tokens,
                    messages,
                }),
            LlmProvider::Anthropic => self
                .client
                .post(format!("{}/messages", self.base_url))
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&ChatRequest {
                    model: &self.model,
                    max_tokens: self.max_tokens,
                    messages,
                }),
            LlmProvider::Gemini => self
                .client
                .post(format!(
                    "{}/models/{}:generateContent",
                    self.base_url, self.model
                ))
                .header("x-goog-api-key", &self.api_key)
                .json(&GeminiRequest {
                    contents: [GeminiContent {
                        parts: [GeminiPart { text: prompt }],
                    }],
                    generation_config: GeminiGenerationConfig {
                        max_output_tokens: self.max_tokens,
                    },
                }),
        }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(&self, item: &Item) -> AttemptOutcome {
        let prompt = analysis_prompt(item.as_str());

        let response = match self.request(&prompt).send().await {
            Ok(response) => response,
            Err(e) => return failure::from_transport(&e),
        };

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return failure::from_transport(&e),
        };

        if !status.is_success() {
            return failure::from_status(status.as_u16(), retry_after.as_deref(), &body);
        }

        let reply = self.adapter.extract_str(&body);
        debug!(item = %item, classifier = %self.name, reply = ?reply, "Model replied");
        AttemptOutcome::Success(interpret(item, &reply))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Llm
    }
}

/// Turn a model reply into a verdict
///
/// Anything other than a clear `SENSITIVE` counts as clear, including
/// empty and safety-blocked replies.
pub fn interpret(item: &Item, reply: &ReplyText) -> Verdict {
    let Some(answer) = reply.normalized() else {
        match reply {
            ReplyText::Blocked(reason) => {
                warn!(item = %item, reason = %reason, "Reply blocked by provider, treating as OK")
            }
            _ => warn!(item = %item, "Empty reply from provider, treating as OK"),
        }
        return Verdict::Clear;
    };

    match answer.trim_matches(|c: char| !c.is_ascii_alphanumeric()) {
        SENSITIVE_LABEL => Verdict::Flagged(Evidence::label(SENSITIVE_LABEL)),
        "OK" => Verdict::Clear,
        _ => {
            warn!(item = %item, reply = %answer, "Unclear reply from provider, treating as OK");
            Verdict::Clear
        }
    }
}
