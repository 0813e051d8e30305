//! Pipeline scheduler
//!
//! Fans a batch out over at most `concurrency` workers and folds their
//! reports into an [`Aggregator`]. With a concurrency of one the batch runs
//! as a plain loop in input order; otherwise workers run on a `JoinSet`
//! and complete in any order.
//!
//! Once the cancellation token fires no further items are admitted,
//! in-flight workers are drained, and everything left in the queue is
//! recorded as abandoned.

use crate::aggregator::Aggregator;
use crate::backoff::millis;
use crate::report::RunReport;
use crate::worker::{ItemWorker, WorkerReport};
use docsieve_core::{Item, Result};
use futures::FutureExt;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Scheduler settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum in-flight workers; 1 means strictly sequential
    pub concurrency: usize,

    /// Delay between consecutive item admissions
    pub pacing: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            pacing: Duration::ZERO,
        }
    }
}

impl SchedulerConfig {
    /// Strictly sequential processing
    pub fn sequential() -> Self {
        Self::default()
    }

    /// Up to `concurrency` items in flight
    pub fn concurrent(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Self::default()
        }
    }

    /// Set the admission pacing delay
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }
}

/// Drives a batch of items through item workers
pub struct Scheduler {
    worker: ItemWorker,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create a scheduler; a concurrency of zero is treated as one
    pub fn new(worker: ItemWorker, config: SchedulerConfig) -> Self {
        let config = SchedulerConfig {
            concurrency: config.concurrency.max(1),
            ..config
        };
        Self { worker, config }
    }

    /// Process the batch and produce the final report
    pub async fn run(&self, items: Vec<Item>) -> Result<RunReport> {
        let mut aggregator = Aggregator::new(items.len());

        info!(
            items = items.len(),
            concurrency = self.config.concurrency,
            pacing_ms = millis(self.config.pacing),
            "Starting run"
        );

        if self.config.concurrency == 1 {
            self.run_sequential(items, &mut aggregator).await?;
        } else {
            self.run_concurrent(items, &mut aggregator).await?;
        }

        if self.worker.cancel_token().is_cancelled() {
            aggregator.mark_interrupted();
        }
        aggregator.complete();

        let report = aggregator.finalize()?;
        info!(
            processed = report.counters.processed,
            flagged = report.counters.flagged,
            failed = report.counters.failed,
            abandoned = report.counters.abandoned,
            "Run finished"
        );
        Ok(report)
    }

    async fn run_sequential(&self, items: Vec<Item>, aggregator: &mut Aggregator) -> Result<()> {
        let mut queue = items.into_iter().enumerate();

        for (index, item) in queue.by_ref() {
            if !self.admit(index).await {
                aggregator.abandon(item)?;
                break;
            }
            let report = run_contained(self.worker.clone(), index, item).await;
            aggregator.record(report)?;
        }

        abandon_rest(queue, aggregator)
    }

    async fn run_concurrent(&self, items: Vec<Item>, aggregator: &mut Aggregator) -> Result<()> {
        let mut queue = items.into_iter().enumerate().peekable();
        let mut tasks = JoinSet::new();
        let mut in_flight: BTreeMap<usize, Item> = BTreeMap::new();

        loop {
            while tasks.len() < self.config.concurrency && queue.peek().is_some() {
                let Some((index, item)) = queue.next() else {
                    break;
                };
                if !self.admit(index).await {
                    aggregator.abandon(item)?;
                    break;
                }
                in_flight.insert(index, item.clone());
                tasks.spawn(run_contained(self.worker.clone(), index, item));
            }

            match tasks.join_next().await {
                Some(Ok(report)) => {
                    in_flight.remove(&report.index);
                    aggregator.record(report)?;
                }
                Some(Err(e)) => {
                    error!(error = %e, "Worker task failed to join");
                }
                None => break,
            }
        }

        // Tasks that died without reporting still owe their item a result
        for (index, item) in in_flight {
            aggregator.record(WorkerReport::failed(index, item, "worker task aborted"))?;
        }

        abandon_rest(queue, aggregator)
    }

    /// Wait out the pacing delay before admitting item `index`
    ///
    /// Returns false if cancellation was requested.
    async fn admit(&self, index: usize) -> bool {
        let cancel = self.worker.cancel_token();
        if cancel.is_cancelled() {
            return false;
        }
        if index == 0 || self.config.pacing.is_zero() {
            return true;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.config.pacing) => true,
        }
    }
}

/// Run a worker, turning a panic into a failed result for its item
async fn run_contained(worker: ItemWorker, index: usize, item: Item) -> WorkerReport {
    match AssertUnwindSafe(worker.run(index, item.clone()))
        .catch_unwind()
        .await
    {
        Ok(report) => report,
        Err(panic) => {
            let reason = format!("worker panicked: {}", panic_message(&*panic));
            error!(item = %item, reason = %reason, "Worker panicked");
            WorkerReport::failed(index, item, reason)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn abandon_rest<I>(queue: I, aggregator: &mut Aggregator) -> Result<()>
where
    I: Iterator<Item = (usize, Item)>,
{
    let mut count = 0usize;
    for (_, item) in queue {
        aggregator.abandon(item)?;
        count += 1;
    }
    if count > 0 {
        warn!(abandoned = count, "Cancellation requested, queued items not started");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        assert_eq!(SchedulerConfig::sequential().concurrency, 1);

        let config = SchedulerConfig::concurrent(4).with_pacing(Duration::from_millis(500));
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.pacing, Duration::from_millis(500));
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*boxed), "boom");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*boxed), "bang");

        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(&*boxed), "unknown panic");
    }
}
