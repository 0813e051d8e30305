//! Item worker
//!
//! Drives one item through the classifier:
//! `Pending -> Attempting -> (Retrying -> Attempting)* -> Resolved | Failed`,
//! with `Abandoned` as the exit when cancellation is observed before an
//! attempt, before a wait, or during a wait. A running classifier call is
//! never interrupted.

use crate::backoff::{millis, BackoffDecision, BackoffPolicy};
use docsieve_classifiers::Classifier;
use docsieve_core::{AttemptOutcome, Item, ItemResult, Verdict};
use docsieve_telemetry::MetricsCollector;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How a worker ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// The item reached a terminal result
    Finished(ItemResult),
    /// Cancellation stopped the item before it reached a result
    Abandoned,
}

/// Everything a worker hands back to the aggregator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    /// Position of the item in the submitted batch
    pub index: usize,
    pub item: Item,
    pub exit: WorkerExit,
    /// Classifier calls made
    pub attempts: u32,
    /// Backoff waits that ran to completion
    pub waits: Vec<Duration>,
}

impl WorkerReport {
    /// Report for an item whose worker task died before reporting
    pub fn failed(index: usize, item: Item, reason: impl Into<String>) -> Self {
        Self {
            index,
            item,
            exit: WorkerExit::Finished(ItemResult::Failed(reason.into())),
            attempts: 0,
            waits: Vec::new(),
        }
    }

    /// The terminal result, unless abandoned
    pub fn result(&self) -> Option<&ItemResult> {
        match &self.exit {
            WorkerExit::Finished(result) => Some(result),
            WorkerExit::Abandoned => None,
        }
    }
}

/// Runs single items against a shared classifier
#[derive(Clone)]
pub struct ItemWorker {
    classifier: Arc<dyn Classifier>,
    policy: BackoffPolicy,
    cancel: CancellationToken,
    metrics: MetricsCollector,
}

impl ItemWorker {
    /// Create a worker
    pub fn new(
        classifier: Arc<dyn Classifier>,
        policy: BackoffPolicy,
        cancel: CancellationToken,
        metrics: MetricsCollector,
    ) -> Self {
        Self {
            classifier,
            policy,
            cancel,
            metrics,
        }
    }

    /// The cancellation token this worker observes
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Process one item to its exit
    pub async fn run(&self, index: usize, item: Item) -> WorkerReport {
        self.metrics.record_item_started();

        let mut attempts = 0u32;
        let mut waits = Vec::new();

        let exit = loop {
            if self.cancel.is_cancelled() {
                break WorkerExit::Abandoned;
            }

            attempts += 1;
            self.metrics.record_attempt();
            debug!(
                item = %item,
                attempt = attempts,
                classifier = self.classifier.name(),
                "Attempting classification"
            );

            let outcome = self.classifier.classify(&item).await;

            let failure = match outcome {
                AttemptOutcome::Success(verdict) => {
                    break WorkerExit::Finished(ItemResult::Resolved(verdict));
                }
                AttemptOutcome::FatalFailure(reason) => {
                    self.metrics.record_fatal();
                    break WorkerExit::Finished(ItemResult::Failed(reason));
                }
                AttemptOutcome::TransientFailure(ref failure) => {
                    self.metrics.record_transient();
                    failure.clone()
                }
            };

            let delay = match self.policy.next_delay(attempts, &outcome) {
                BackoffDecision::Retry(delay) => delay,
                BackoffDecision::GiveUp => {
                    break WorkerExit::Finished(ItemResult::Failed(format!(
                        "gave up after {} attempts: {}",
                        attempts, failure.reason
                    )));
                }
            };

            if self.cancel.is_cancelled() {
                break WorkerExit::Abandoned;
            }

            warn!(
                item = %item,
                attempt = attempts,
                delay_ms = millis(delay),
                kind = %failure.kind,
                reason = %failure.reason,
                "Transient failure, backing off"
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break WorkerExit::Abandoned,
                _ = tokio::time::sleep(delay) => {}
            }

            self.metrics.record_retry(delay);
            waits.push(delay);
        };

        self.log_exit(&item, attempts, &exit);

        WorkerReport {
            index,
            item,
            exit,
            attempts,
            waits,
        }
    }

    fn log_exit(&self, item: &Item, attempts: u32, exit: &WorkerExit) {
        let label = match exit {
            WorkerExit::Finished(ItemResult::Resolved(Verdict::Flagged(evidence))) => {
                info!(item = %item, attempts, evidence = %evidence, "Item flagged");
                "flagged"
            }
            WorkerExit::Finished(ItemResult::Resolved(Verdict::Clear)) => {
                debug!(item = %item, attempts, "Item clear");
                "clear"
            }
            WorkerExit::Finished(ItemResult::Resolved(Verdict::Indeterminate)) => {
                warn!(item = %item, attempts, "Item indeterminate");
                "indeterminate"
            }
            WorkerExit::Finished(ItemResult::Failed(reason)) => {
                error!(item = %item, attempts, reason = %reason, "Item failed");
                "failed"
            }
            WorkerExit::Abandoned => {
                warn!(item = %item, attempts, "Item abandoned on cancellation");
                "abandoned"
            }
        };
        self.metrics.record_item_finished(label);
    }
}
