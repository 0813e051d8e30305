//! Mapping of provider and transport errors to attempt outcomes
//!
//! Providers report retry hints in many shapes: a `Retry-After` header,
//! Google's `retry_delay { seconds: N }` / `"retryDelay": "Ns"`, or prose
//! like "Please try again in 20s". Everything here is heuristic text parsing
//! and stays inside the adapters; the pipeline only sees
//! `TransientFailure::suggested_delay`.

use docsieve_core::AttemptOutcome;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

/// Longest provider message kept in a failure reason
const MAX_REASON_LEN: usize = 300;

fn delay_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"retry_delay\s*\{\s*seconds:\s*(\d+(?:\.\d+)?)\s*\}",
            r#""retrydelay"\s*:\s*"(\d+(?:\.\d+)?)s""#,
            r"retry after (\d+(?:\.\d+)?)\s*sec",
            r"try again in (\d+(?:\.\d+)?)\s*s\b",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

fn status_code_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b[1-5]\d{2}\b").ok()).as_ref()
}

fn millis_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"try again in (\d+)\s*ms\b").ok())
        .as_ref()
}

/// Parse a `Retry-After` header value given in seconds
///
/// HTTP-date values are ignored.
pub fn parse_retry_after(header_value: Option<&str>) -> Option<Duration> {
    header_value?
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(seconds)
}

/// Seconds as a duration; negative, NaN, or out-of-range values are no hint
fn seconds(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

/// Check for a standalone HTTP status code such as `429`
///
/// Digits inside request ids or values like `401ms` do not count.
fn has_status(text: &str, codes: &[&str]) -> bool {
    status_code_pattern().map_or(false, |pattern| {
        pattern
            .find_iter(text)
            .any(|m| codes.contains(&m.as_str()))
    })
}

/// Find a provider-suggested retry delay inside an error message
pub fn parse_retry_delay(message: &str) -> Option<Duration> {
    let lower = message.to_lowercase();

    for pattern in delay_patterns() {
        if let Some(caps) = pattern.captures(&lower) {
            if let Some(secs) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) {
                return seconds(secs);
            }
        }
    }

    millis_pattern()
        .and_then(|p| p.captures(&lower))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Map a non-success HTTP status to an outcome
pub fn from_status(status: u16, retry_after: Option<&str>, body: &str) -> AttemptOutcome {
    let detail = truncate(body.trim());
    let reason = if detail.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, detail)
    };
    let suggested = || parse_retry_after(retry_after).or_else(|| parse_retry_delay(body));

    match status {
        401 | 403 => AttemptOutcome::fatal(format!("authentication failed ({})", reason)),
        404 => AttemptOutcome::fatal("not found (404)"),
        408 => AttemptOutcome::unavailable(reason, suggested()),
        429 => AttemptOutcome::rate_limited(reason, suggested()),
        500..=599 => AttemptOutcome::unavailable(reason, suggested()),
        _ => match from_message(&reason) {
            // A non-429 status with quota wording (some providers use 400/403)
            AttemptOutcome::TransientFailure(t) if t.kind == docsieve_core::TransientKind::RateLimited => {
                AttemptOutcome::rate_limited(reason, suggested())
            }
            _ => AttemptOutcome::fatal(reason),
        },
    }
}

/// Map a transport-level `reqwest` error to an outcome
pub fn from_transport(err: &reqwest::Error) -> AttemptOutcome {
    if err.is_builder() {
        return AttemptOutcome::fatal(format!("malformed request: {}", err));
    }
    if err.is_timeout() {
        return AttemptOutcome::unavailable(format!("request timed out: {}", err), None);
    }
    if err.is_connect() || err.is_body() || err.is_request() {
        return AttemptOutcome::unavailable(format!("connection error: {}", err), None);
    }
    if let Some(status) = err.status() {
        return from_status(status.as_u16(), None, &err.to_string());
    }
    from_message(&err.to_string())
}

/// Classify a free-form error message
///
/// Rate-limit and quota wording is transient, as are server and
/// connectivity faults; everything else is fatal with the message kept.
pub fn from_message(message: &str) -> AttemptOutcome {
    let lower = message.to_lowercase();

    if has_status(&lower, &["429"])
        || lower.contains("rate limit")
        || lower.contains("quota")
        || lower.contains("resource_exhausted")
    {
        return AttemptOutcome::rate_limited(message, parse_retry_delay(message));
    }

    if lower.contains("authenticationerror")
        || lower.contains("invalid api key")
        || has_status(&lower, &["401"])
    {
        return AttemptOutcome::fatal(message);
    }

    if has_status(&lower, &["500", "502", "503", "504"])
        || lower.contains("connection error")
        || lower.contains("connection reset")
        || lower.contains("service unavailable")
        || lower.contains("overloaded")
    {
        return AttemptOutcome::unavailable(message, parse_retry_delay(message));
    }

    AttemptOutcome::fatal(message)
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_REASON_LEN {
        return text.to_string();
    }
    let mut end = MAX_REASON_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}
