//! docsieve Telemetry
//!
//! Run-level counters for the classification pipeline.
//!
//! Provides:
//! - Shared atomic counters (items, attempts, retries, failures, backoff time)
//! - Mirrored events on the `metrics` facade, for whichever recorder the
//!   embedding application installs

pub mod metrics;

pub use metrics::{describe_metrics, MetricsCollector, MetricsSnapshot};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::metrics::{MetricsCollector, MetricsSnapshot};
}
