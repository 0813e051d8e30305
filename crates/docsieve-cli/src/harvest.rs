//! URL harvesting from the Wayback Machine CDX index
//!
//! `docsieve harvest <domain>` lists every archived URL under a domain that
//! ends in one of the filter extensions, writes them as an input file for
//! the classifying modes, and prints per-extension counts. With
//! `--check-200` each harvested URL is also looked up for archived copies
//! that were captured with a 200 status.

use crate::input::{parse_items, ExtensionFilter};
use crate::HarvestArgs;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Public CDX search endpoint
pub const DEFAULT_CDX_ENDPOINT: &str = "https://web.archive.org/cdx/search/cdx";

/// Prefix for links to archived snapshots
const WAYBACK_BASE: &str = "https://web.archive.org/web";

/// Harvest settings (`harvest:` in the config file)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// CDX search endpoint
    pub endpoint: String,

    /// Timeout for the domain listing, which can be large
    pub fetch_timeout_secs: u64,

    /// Timeout for each archived-copy lookup
    pub check_timeout_secs: u64,

    /// Delay before each archived-copy lookup, in milliseconds
    pub check_delay_ms: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CDX_ENDPOINT.to_string(),
            fetch_timeout_secs: 300,
            check_timeout_secs: 45,
            check_delay_ms: 200,
        }
    }
}

/// Client for the CDX search API
pub struct CdxClient {
    client: reqwest::Client,
    endpoint: String,
    fetch_timeout: Duration,
    check_timeout: Duration,
}

impl CdxClient {
    /// Create a client
    pub fn new(config: &HarvestConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("docsieve/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            check_timeout: Duration::from_secs(config.check_timeout_secs),
        })
    }

    /// Query for every distinct URL under `domain` matching the filter
    pub fn domain_query(domain: &str, filter: &ExtensionFilter) -> Vec<(&'static str, String)> {
        vec![
            ("url", format!("*.{}/*", domain)),
            ("collapse", "urlkey".to_string()),
            ("output", "text".to_string()),
            ("fl", "original".to_string()),
            ("filter", filter.cdx_filter()),
        ]
    }

    /// Fetch the newline-separated URL list for a domain
    pub async fn fetch_domain(&self, domain: &str, filter: &ExtensionFilter) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&Self::domain_query(domain, filter))
            .timeout(self.fetch_timeout)
            .send()
            .await
            .with_context(|| format!("CDX request for {} failed", domain))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read CDX response")?;

        if !status.is_success() {
            bail!("CDX request for {} returned {}: {}", domain, status, body.trim());
        }
        Ok(body)
    }

    /// Snapshot links for captures of `url` that returned 200
    pub async fn archived_200(&self, url: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("url", url),
                ("filter", "statuscode:200"),
                ("fl", "timestamp,original"),
                ("output", "json"),
            ])
            .timeout(self.check_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            bail!("CDX lookup returned {}", status);
        }
        parse_archived(&response.text().await?)
    }
}

/// Parse a CDX JSON reply (a header row, then one row per capture) into
/// snapshot links
///
/// Rows with too few fields or a non-numeric timestamp are skipped.
pub fn parse_archived(body: &str) -> Result<Vec<String>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<Vec<String>> = serde_json::from_str(body).context("Malformed CDX JSON")?;
    let Some((header, records)) = rows.split_first() else {
        return Ok(Vec::new());
    };

    let column = |name: &str, fallback: usize| {
        header
            .iter()
            .position(|field| field == name)
            .unwrap_or(fallback)
    };
    let ts_col = column("timestamp", 0);
    let url_col = column("original", 1);

    Ok(records
        .iter()
        .filter_map(|record| {
            let timestamp = record.get(ts_col)?;
            let original = record.get(url_col)?;
            if timestamp.is_empty() || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            Some(format!("{}/{}/{}", WAYBACK_BASE, timestamp, original))
        })
        .collect())
}

/// Harvested URLs per extension
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionCounts {
    pub per_extension: BTreeMap<String, usize>,
    /// Non-blank lines, matched or not
    pub total: usize,
}

impl ExtensionCounts {
    /// Count each line under the longest filter extension it ends in
    pub fn tally(body: &str, filter: &ExtensionFilter) -> Self {
        let mut per_extension: BTreeMap<String, usize> = filter
            .extensions()
            .iter()
            .map(|ext| (ext.clone(), 0))
            .collect();
        let mut total = 0;

        for line in body.lines().map(str::trim).filter(|line| !line.is_empty()) {
            total += 1;
            if let Some(ext) = filter.matching(line) {
                *per_extension.entry(ext.to_string()).or_default() += 1;
            }
        }

        Self {
            per_extension,
            total,
        }
    }
}

impl fmt::Display for ExtensionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (ext, count) in self.per_extension.iter().filter(|(_, count)| **count > 0) {
            writeln!(f, "  .{}: {}", ext, count)?;
        }
        write!(f, "  total: {}", self.total)
    }
}

/// Look up archived 200 captures for each URL in turn
///
/// A failed lookup counts as zero captures. Returns the links found and
/// whether cancellation cut the pass short.
pub async fn check_archives(
    client: &CdxClient,
    urls: &[String],
    delay: Duration,
    cancel: &CancellationToken,
) -> (Vec<String>, bool) {
    let mut archived = Vec::new();

    for (checked, url) in urls.iter().enumerate() {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(checked, remaining = urls.len() - checked, "Archive check interrupted");
                return (archived, true);
            }
            _ = tokio::time::sleep(delay) => {}
        }

        match client.archived_200(url).await {
            Ok(found) => {
                debug!(url = %url, captures = found.len(), "Archive lookup");
                archived.extend(found);
            }
            Err(e) => warn!(url = %url, error = %format!("{:#}", e), "Archive lookup failed"),
        }
    }

    (archived, false)
}

/// Run the harvest command; returns whether it was interrupted
pub async fn run(args: &HarvestArgs, config: &HarvestConfig, cancel: CancellationToken) -> Result<bool> {
    let filter = if args.all_extensions || args.exts.is_empty() {
        ExtensionFilter::all_supported()
    } else {
        match ExtensionFilter::new(&args.exts) {
            Some(filter) => filter,
            None => bail!("no valid extensions given with --exts"),
        }
    };

    let mut config = config.clone();
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    let client = CdxClient::new(&config)?;

    info!(domain = %args.domain, extensions = filter.extensions().len(), "Fetching archived URLs");
    let body = client.fetch_domain(&args.domain, &filter).await?;
    write_file(&args.output, &body)?;

    let counts = ExtensionCounts::tally(&body, &filter);
    println!("URLs per extension for {}:\n{}", args.domain, counts);
    println!("URL list written to {}", args.output.display());

    if !args.check_200 {
        return Ok(false);
    }

    let urls: Vec<String> = parse_items(&body, None)
        .into_iter()
        .map(|item| item.as_str().to_string())
        .collect();
    info!(urls = urls.len(), "Checking archived 200 captures");

    let delay = Duration::from_millis(config.check_delay_ms);
    let (archived, interrupted) = check_archives(&client, &urls, delay, &cancel).await;

    let mut lines = archived.join("\n");
    if !lines.is_empty() {
        lines.push('\n');
    }
    write_file(&args.archived_output, &lines)?;
    println!(
        "{} archived 200 captures written to {}",
        archived.len(),
        args.archived_output.display()
    );

    Ok(interrupted)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
