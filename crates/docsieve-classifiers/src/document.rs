//! Document keyword scanner
//!
//! Downloads the document behind an item URL, extracts its text, and runs
//! the keyword matcher over it. PDFs are parsed on the blocking pool;
//! text-like bodies are decoded as UTF-8 (lossy).

use crate::classifier::{Classifier, ClassifierKind};
use crate::config::HttpSettings;
use crate::failure;
use crate::patterns::KeywordMatcher;
use async_trait::async_trait;
use docsieve_core::{AttemptOutcome, Error, Item, Result, Verdict};
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Body read from an error response for the failure reason
const ERROR_BODY_LIMIT: usize = 4096;

/// Document formats the scanner understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
    Unsupported(String),
}

impl DocumentKind {
    /// Detect the format from magic bytes, then the URL extension, then
    /// the `Content-Type` header
    pub fn detect(body: &[u8], url: &Url, content_type: Option<&str>) -> Self {
        if body.starts_with(PDF_MAGIC) {
            return Self::Pdf;
        }

        if let Some(mime) = mime_guess::from_path(url.path()).first() {
            if let Some(kind) = Self::from_mime(mime.essence_str()) {
                return kind;
            }
        }

        let header = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_lowercase());

        match header {
            Some(ref essence) => {
                Self::from_mime(essence).unwrap_or_else(|| Self::Unsupported(essence.clone()))
            }
            None => Self::Unsupported("unknown".to_string()),
        }
    }

    fn from_mime(essence: &str) -> Option<Self> {
        match essence {
            "application/pdf" | "application/x-pdf" => Some(Self::Pdf),
            "application/json" | "application/xml" | "application/csv" => Some(Self::Text),
            other if other.starts_with("text/") => Some(Self::Text),
            _ => None,
        }
    }
}

/// Keyword classifier over downloaded documents
pub struct DocumentScanner {
    name: String,
    client: reqwest::Client,
    matcher: Arc<KeywordMatcher>,
    max_bytes: u64,
}

impl DocumentScanner {
    /// Create a scanner with its own HTTP client
    pub fn new(matcher: Arc<KeywordMatcher>, http: &HttpSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(http.user_agent.as_str())
            .timeout(Duration::from_secs(http.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, matcher, http.max_document_bytes))
    }

    /// Create a scanner around an existing client
    pub fn with_client(client: reqwest::Client, matcher: Arc<KeywordMatcher>, max_bytes: u64) -> Self {
        Self {
            name: "document-keywords".to_string(),
            client,
            matcher,
            max_bytes,
        }
    }

    async fn scan(&self, item: &Item) -> std::result::Result<Verdict, AttemptOutcome> {
        let url = Url::parse(item.as_str())
            .map_err(|e| AttemptOutcome::fatal(format!("invalid URL: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AttemptOutcome::fatal(format!(
                "unsupported URL scheme: {}",
                url.scheme()
            )));
        }

        let (body, content_type) = self.download(&url).await?;
        let kind = DocumentKind::detect(&body, &url, content_type.as_deref());
        debug!(item = %item, bytes = body.len(), kind = ?kind, "Document downloaded");

        let text = match kind {
            DocumentKind::Pdf => extract_pdf_text(body).await?,
            DocumentKind::Text => String::from_utf8_lossy(&body).into_owned(),
            DocumentKind::Unsupported(label) => {
                return Err(AttemptOutcome::fatal(format!(
                    "unsupported document type: {}",
                    label
                )))
            }
        };

        Ok(self.matcher.scan(&text))
    }

    async fn download(
        &self,
        url: &Url,
    ) -> std::result::Result<(Vec<u8>, Option<String>), AttemptOutcome> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| failure::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = header_string(&response, RETRY_AFTER);
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > ERROR_BODY_LIMIT {
                let mut end = ERROR_BODY_LIMIT;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            return Err(failure::from_status(status.as_u16(), retry_after.as_deref(), &body));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(self.too_large());
            }
        }

        let content_type = header_string(&response, CONTENT_TYPE);
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| failure::from_transport(&e))?
        {
            body.extend_from_slice(&chunk);
            if body.len() as u64 > self.max_bytes {
                return Err(self.too_large());
            }
        }

        Ok((body, content_type))
    }

    fn too_large(&self) -> AttemptOutcome {
        AttemptOutcome::fatal(format!(
            "document exceeds size limit of {} bytes",
            self.max_bytes
        ))
    }
}

#[async_trait]
impl Classifier for DocumentScanner {
    async fn classify(&self, item: &Item) -> AttemptOutcome {
        match self.scan(item).await {
            Ok(verdict) => AttemptOutcome::Success(verdict),
            Err(outcome) => outcome,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Keyword
    }
}

fn header_string(
    response: &reqwest::Response,
    name: reqwest::header::HeaderName,
) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn extract_pdf_text(body: Vec<u8>) -> std::result::Result<String, AttemptOutcome> {
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&body))
        .await
        .map_err(|e| AttemptOutcome::fatal(format!("PDF extraction aborted: {}", e)))?
        .map_err(|e| AttemptOutcome::fatal(format!("error processing PDF: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_detect_by_magic() {
        let kind = DocumentKind::detect(b"%PDF-1.7\n...", &url("https://x.test/file"), None);
        assert_eq!(kind, DocumentKind::Pdf);
    }

    #[test]
    fn test_detect_by_extension_then_header() {
        assert_eq!(
            DocumentKind::detect(b"hello", &url("https://x.test/notes.txt"), None),
            DocumentKind::Text
        );
        assert_eq!(
            DocumentKind::detect(b"hello", &url("https://x.test/dl?id=4"), Some("text/plain; charset=utf-8")),
            DocumentKind::Text
        );
        assert_eq!(
            DocumentKind::detect(b"PK\x03\x04", &url("https://x.test/a"), Some("application/zip")),
            DocumentKind::Unsupported("application/zip".to_string())
        );
        assert_eq!(
            DocumentKind::detect(b"", &url("https://x.test/a"), None),
            DocumentKind::Unsupported("unknown".to_string())
        );
    }

    #[tokio::test]
    async fn test_invalid_url_is_fatal() {
        let matcher = Arc::new(KeywordMatcher::with_defaults().unwrap());
        let scanner = DocumentScanner::new(matcher, &HttpSettings::default()).unwrap();

        let outcome = scanner.classify(&Item::new("not a url")).await;
        assert!(matches!(outcome, AttemptOutcome::FatalFailure(_)));

        let outcome = scanner.classify(&Item::new("ftp://host/file.pdf")).await;
        assert!(matches!(outcome, AttemptOutcome::FatalFailure(r) if r.contains("scheme")));
    }
}
