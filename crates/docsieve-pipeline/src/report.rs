//! Run report and output formatting

use docsieve_core::{Evidence, Item, Result};
use serde::Serialize;
use std::io::Write;

/// Run counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    /// Items handed to the scheduler
    pub submitted: usize,
    /// Items that reached a terminal result
    pub processed: usize,
    /// Distinct flagged identities
    pub flagged: usize,
    pub clear: usize,
    pub indeterminate: usize,
    pub failed: usize,
    /// Items stopped by cancellation
    pub abandoned: usize,
}

/// An item that failed, with its reason
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct FailedItem {
    pub item: Item,
    pub reason: String,
}

/// Final result of a run
///
/// All lists are sorted by item identity, so two runs over the same
/// outcomes produce identical reports regardless of completion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Flagged items and why, one entry per identity
    pub flagged: Vec<(Item, Evidence)>,
    pub counters: RunCounters,
    pub failures: Vec<FailedItem>,
    pub abandoned: Vec<Item>,
    /// Cancellation was requested during the run
    pub interrupted: bool,
}

impl RunReport {
    /// Output lines for the flagged subset
    pub fn flagged_lines(&self) -> impl Iterator<Item = String> + '_ {
        self.flagged
            .iter()
            .map(|(item, evidence)| format!("{} - Found Keyword(s)/Reason: {}", item, evidence))
    }

    /// Write one line per flagged item
    pub fn write_lines<W: Write>(&self, mut out: W) -> Result<()> {
        for line in self.flagged_lines() {
            writeln!(out, "{}", line)?;
        }
        out.flush()?;
        Ok(())
    }

    /// Every submitted item reached a result
    pub fn is_complete(&self) -> bool {
        self.counters.abandoned == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RunReport {
        RunReport {
            flagged: vec![
                (
                    Item::new("https://a.test/x.pdf"),
                    Evidence::from_signals(["salary", "confidential"]).unwrap(),
                ),
                (Item::new("https://b.test/y.pdf"), Evidence::label("SENSITIVE")),
            ],
            counters: RunCounters {
                submitted: 3,
                processed: 3,
                flagged: 2,
                clear: 1,
                ..Default::default()
            },
            failures: vec![],
            abandoned: vec![],
            interrupted: false,
        }
    }

    #[test]
    fn test_flagged_lines_format() {
        let lines: Vec<String> = report().flagged_lines().collect();
        assert_eq!(
            lines,
            vec![
                "https://a.test/x.pdf - Found Keyword(s)/Reason: confidential, salary",
                "https://b.test/y.pdf - Found Keyword(s)/Reason: SENSITIVE",
            ]
        );
    }

    #[test]
    fn test_write_lines_to_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        report().write_lines(file.reopen().unwrap()).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(written.ends_with("SENSITIVE\n"));
        assert!(report().is_complete());
    }

    #[test]
    fn test_report_serializes() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["counters"]["flagged"], 2);
        assert_eq!(json["flagged"][0][0], "https://a.test/x.pdf");
    }
}
