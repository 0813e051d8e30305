//! End-of-run summary

use docsieve_pipeline::RunReport;
use docsieve_telemetry::MetricsSnapshot;
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;

/// Render the human-readable summary printed after a run
pub fn render_summary(report: &RunReport, metrics: &MetricsSnapshot, output: &Path) -> String {
    let counters = &report.counters;
    let mut out = String::new();

    if report.interrupted {
        let _ = writeln!(out, "Run interrupted; results below are partial.");
    }
    let _ = writeln!(
        out,
        "Processed {} of {} items: {} flagged, {} clear, {} indeterminate, {} failed",
        counters.processed,
        counters.submitted,
        counters.flagged,
        counters.clear,
        counters.indeterminate,
        counters.failed
    );

    if !report.failures.is_empty() {
        let _ = writeln!(out, "Failed items:");
        for failure in &report.failures {
            let _ = writeln!(out, "  {} ({})", failure.item, failure.reason);
        }
    }

    if !report.abandoned.is_empty() {
        let _ = writeln!(out, "Not processed ({}):", report.abandoned.len());
        for item in &report.abandoned {
            let _ = writeln!(out, "  {}", item);
        }
    }

    let _ = writeln!(out, "Classifier: {}", metrics);
    let _ = write!(out, "Flagged results written to {}", output.display());
    out
}

/// Machine-readable summary written with `--summary-json`
#[derive(Debug, Serialize)]
pub struct JsonSummary<'a> {
    pub run_id: String,
    pub output: &'a Path,
    pub report: &'a RunReport,
    pub metrics: &'a MetricsSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsieve_core::{Evidence, Item};
    use docsieve_pipeline::{FailedItem, RunCounters};

    fn report() -> RunReport {
        RunReport {
            flagged: vec![(Item::new("https://a.test/1.pdf"), Evidence::label("salary"))],
            counters: RunCounters {
                submitted: 4,
                processed: 3,
                flagged: 1,
                clear: 1,
                indeterminate: 0,
                failed: 1,
                abandoned: 1,
            },
            failures: vec![FailedItem {
                item: Item::new("https://a.test/2.pdf"),
                reason: "not found (404)".to_string(),
            }],
            abandoned: vec![Item::new("https://a.test/3.pdf")],
            interrupted: true,
        }
    }

    #[test]
    fn test_summary_lists_failures_and_abandoned() {
        let text = render_summary(&report(), &MetricsSnapshot::default(), Path::new("out.txt"));

        assert!(text.starts_with("Run interrupted"));
        assert!(text.contains("Processed 3 of 4 items: 1 flagged, 1 clear, 0 indeterminate, 1 failed"));
        assert!(text.contains("  https://a.test/2.pdf (not found (404))"));
        assert!(text.contains("Not processed (1):\n  https://a.test/3.pdf"));
        assert!(text.ends_with("Flagged results written to out.txt"));
    }

    #[test]
    fn test_clean_run_summary() {
        let report = RunReport {
            flagged: Vec::new(),
            counters: RunCounters {
                submitted: 2,
                processed: 2,
                clear: 2,
                ..Default::default()
            },
            failures: Vec::new(),
            abandoned: Vec::new(),
            interrupted: false,
        };
        let text = render_summary(&report, &MetricsSnapshot::default(), Path::new("out.txt"));

        assert!(!text.contains("interrupted"));
        assert!(!text.contains("Failed items"));
        assert!(!text.contains("Not processed"));
    }

    #[test]
    fn test_json_summary_shape() {
        let report = report();
        let metrics = MetricsSnapshot::default();
        let summary = JsonSummary {
            run_id: "run-1".to_string(),
            output: Path::new("out.txt"),
            report: &report,
            metrics: &metrics,
        };

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["report"]["counters"]["failed"], 1);
        assert_eq!(value["report"]["interrupted"], true);
        assert_eq!(value["output"], "out.txt");
    }
}
