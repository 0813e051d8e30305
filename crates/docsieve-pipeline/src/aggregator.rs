//! Result aggregation
//!
//! The aggregator is owned by the scheduler's fan-in loop and is the only
//! place worker results are combined. Reports may arrive in any order;
//! everything is sorted when the report is finalized.

use crate::report::{FailedItem, RunCounters, RunReport};
use crate::worker::{WorkerExit, WorkerReport};
use docsieve_core::{Error, Evidence, Item, ItemResult, Result, Verdict};
use std::collections::BTreeMap;

/// Collects worker reports into a [`RunReport`]
#[derive(Debug, Default)]
pub struct Aggregator {
    counters: RunCounters,
    flagged: BTreeMap<Item, Evidence>,
    failures: Vec<FailedItem>,
    abandoned: Vec<Item>,
    interrupted: bool,
    sealed: bool,
}

impl Aggregator {
    /// Create an aggregator expecting `submitted` items
    pub fn new(submitted: usize) -> Self {
        Self {
            counters: RunCounters {
                submitted,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Record a worker's report
    pub fn record(&mut self, report: WorkerReport) -> Result<()> {
        match report.exit {
            WorkerExit::Finished(result) => self.record_result(report.item, result),
            WorkerExit::Abandoned => self.abandon(report.item),
        }
    }

    /// Record an item's terminal result
    pub fn record_result(&mut self, item: Item, result: ItemResult) -> Result<()> {
        self.ensure_open()?;
        self.counters.processed += 1;

        match result {
            ItemResult::Resolved(Verdict::Flagged(evidence)) => {
                // First result wins for a repeated identity
                self.flagged.entry(item).or_insert(evidence);
                self.counters.flagged = self.flagged.len();
            }
            ItemResult::Resolved(Verdict::Clear) => self.counters.clear += 1,
            ItemResult::Resolved(Verdict::Indeterminate) => self.counters.indeterminate += 1,
            ItemResult::Failed(reason) => {
                self.counters.failed += 1;
                self.failures.push(FailedItem { item, reason });
            }
        }
        Ok(())
    }

    /// Record an item that never reached a result
    pub fn abandon(&mut self, item: Item) -> Result<()> {
        self.ensure_open()?;
        self.counters.abandoned += 1;
        self.abandoned.push(item);
        Ok(())
    }

    /// Note that cancellation was requested
    pub fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }

    /// Number of items seen so far (results plus abandonments)
    pub fn seen(&self) -> usize {
        self.counters.processed + self.counters.abandoned
    }

    /// Seal the aggregator; further records are rejected
    pub fn complete(&mut self) {
        self.sealed = true;
    }

    /// Build the final report
    ///
    /// Only valid after [`complete`](Self::complete). Repeated calls return
    /// equal reports.
    pub fn finalize(&self) -> Result<RunReport> {
        if !self.sealed {
            return Err(Error::usage("finalize called before complete"));
        }
        if self.seen() != self.counters.submitted {
            return Err(Error::internal(format!(
                "{} items submitted but {} accounted for",
                self.counters.submitted,
                self.seen()
            )));
        }

        let mut failures = self.failures.clone();
        failures.sort();
        let mut abandoned = self.abandoned.clone();
        abandoned.sort();

        Ok(RunReport {
            flagged: self
                .flagged
                .iter()
                .map(|(item, evidence)| (item.clone(), evidence.clone()))
                .collect(),
            counters: self.counters.clone(),
            failures,
            abandoned,
            interrupted: self.interrupted,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.sealed {
            Err(Error::usage("aggregator already completed"))
        } else {
            Ok(())
        }
    }
}
