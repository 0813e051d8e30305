//! docsieve Pipeline
//!
//! Drives a batch of items through a classifier:
//!
//! - [`backoff`]: pure retry/give-up decisions for failed attempts
//! - [`worker`]: one item's attempt loop, with cancellable backoff waits
//! - [`scheduler`]: bounded fan-out over workers, pacing, and cancellation
//! - [`aggregator`]: single-consumer fan-in of worker reports
//! - [`report`]: the final, deterministic run report and its output format

pub mod aggregator;
pub mod backoff;
pub mod report;
pub mod scheduler;
pub mod worker;

pub use aggregator::Aggregator;
pub use backoff::{BackoffDecision, BackoffPolicy, RetryConfig};
pub use report::{FailedItem, RunCounters, RunReport};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use worker::{ItemWorker, WorkerExit, WorkerReport};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::backoff::BackoffPolicy;
    pub use crate::report::RunReport;
    pub use crate::scheduler::{Scheduler, SchedulerConfig};
    pub use crate::worker::ItemWorker;
}
