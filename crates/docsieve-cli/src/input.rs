//! Input file reading and extension filtering

use anyhow::{Context, Result};
use docsieve_core::Item;
use std::path::Path;
use url::Url;

/// File extensions the URL harvester knows how to filter for
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "xls", "xml", "xlsx", "json", "pdf", "sql", "doc", "docx", "pptx", "txt", "git", "zip",
    "tar.gz", "tgz", "bak", "7z", "rar", "log", "cache", "secret", "db", "backup", "yml", "gz",
    "config", "csv", "yaml", "md", "md5", "exe", "dll", "bin", "ini", "bat", "sh", "tar", "deb",
    "rpm", "iso", "img", "env", "apk", "msi", "dmg", "tmp", "crt", "pem", "key", "pub", "asc",
];

/// Keeps lines whose URL path ends in one of a set of extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl ExtensionFilter {
    /// Build a filter; extensions are trimmed, lower-cased, and stripped of
    /// a leading dot. Returns `None` if nothing usable remains.
    pub fn new<I, S>(extensions: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut extensions: Vec<String> = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        extensions.sort();
        extensions.dedup();

        if extensions.is_empty() {
            None
        } else {
            Some(Self { extensions })
        }
    }

    /// Filter over every supported extension
    pub fn all_supported() -> Self {
        Self {
            extensions: SUPPORTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Extensions in the filter
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Check whether a URL line passes the filter
    ///
    /// The query string and fragment are ignored for parseable URLs.
    pub fn matches(&self, line: &str) -> bool {
        self.matching(line).is_some()
    }

    /// The extension a URL line ends in, preferring the longest match
    /// (`backup.tar.gz` is `tar.gz`, not `gz`)
    pub fn matching(&self, line: &str) -> Option<&str> {
        let path = match Url::parse(line) {
            Ok(url) => url.path().to_lowercase(),
            Err(_) => line.to_lowercase(),
        };
        self.extensions
            .iter()
            .filter(|ext| {
                path.len() > ext.len()
                    && path.ends_with(ext.as_str())
                    && path.as_bytes()[path.len() - ext.len() - 1] == b'.'
            })
            .max_by_key(|ext| ext.len())
            .map(String::as_str)
    }

    /// CDX `filter` parameter keeping originals that end in one of the extensions
    pub fn cdx_filter(&self) -> String {
        let alternatives: Vec<String> = self
            .extensions
            .iter()
            .map(|ext| ext.replace('.', "\\."))
            .collect();
        format!("original:.*\\.({})$", alternatives.join("|"))
    }
}

/// Split raw input into items: trimmed, non-blank, filtered
pub fn parse_items(content: &str, filter: Option<&ExtensionFilter>) -> Vec<Item> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| filter.map_or(true, |f| f.matches(line)))
        .map(Item::from)
        .collect()
}

/// Read items from a newline-delimited UTF-8 file
pub fn read_items(path: &Path, filter: Option<&ExtensionFilter>) -> Result<Vec<Item>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;
    Ok(parse_items(&content, filter))
}
