//! Scripted classifiers for pipeline tests
//!
//! Each item gets a queue of outcomes to return, one per call; once the
//! queue runs dry the fallback outcome is returned.

#![allow(dead_code)]

use async_trait::async_trait;
use docsieve_classifiers::{Classifier, ClassifierKind};
use docsieve_core::{AttemptOutcome, Item, Verdict};
use docsieve_pipeline::{BackoffPolicy, ItemWorker, Scheduler, SchedulerConfig};
use docsieve_telemetry::MetricsCollector;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A classifier that replays scripted outcomes per item
pub struct ScriptedClassifier {
    scripts: Mutex<HashMap<String, VecDeque<AttemptOutcome>>>,
    fallback: AttemptOutcome,
    latency: Option<Duration>,
    panic_on: HashSet<String>,
    cancel_on: Option<(String, CancellationToken)>,
    calls: Mutex<Vec<String>>,
    call_count: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

impl ScriptedClassifier {
    /// Create a classifier that answers `Clear` for anything unscripted
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback: AttemptOutcome::Success(Verdict::Clear),
            latency: None,
            panic_on: HashSet::new(),
            cancel_on: None,
            calls: Mutex::new(Vec::new()),
            call_count: AtomicU32::new(0),
            in_flight: AtomicU32::new(0),
            max_in_flight: AtomicU32::new(0),
        }
    }

    /// Outcomes returned for `item`, in order
    pub fn script(self, item: &str, outcomes: Vec<AttemptOutcome>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(item.to_string(), outcomes.into());
        self
    }

    /// `item` is flagged with the given signals
    pub fn flag(self, item: &str, signals: &[&str]) -> Self {
        let verdict = Verdict::from_signals(signals.iter().copied());
        self.script(item, vec![AttemptOutcome::Success(verdict)])
    }

    /// Outcome for unscripted items and exhausted scripts
    pub fn with_fallback(mut self, outcome: AttemptOutcome) -> Self {
        self.fallback = outcome;
        self
    }

    /// Simulated latency per call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Panic when asked about `item`
    pub fn panic_on(mut self, item: &str) -> Self {
        self.panic_on.insert(item.to_string());
        self
    }

    /// Fire `token` when `item` is classified (simulates Ctrl+C mid-call)
    pub fn cancel_on(mut self, item: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((item.to_string(), token));
        self
    }

    /// Total classify calls
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Items in the order their calls started
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of concurrent calls observed
    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, item: &Item) -> AttemptOutcome {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(item.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some((ref target, ref token)) = self.cancel_on {
            if target == item.as_str() {
                token.cancel();
            }
        }

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panic_on.contains(item.as_str()) {
            panic!("scripted panic for {}", item);
        }

        self.scripts
            .lock()
            .unwrap()
            .get_mut(item.as_str())
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Keyword
    }
}

/// Items from string literals
pub fn items(values: &[&str]) -> Vec<Item> {
    values.iter().map(|v| Item::new(*v)).collect()
}

/// A scheduler over `classifier` with the default backoff policy
pub fn scheduler(
    classifier: Arc<ScriptedClassifier>,
    config: SchedulerConfig,
    cancel: CancellationToken,
) -> Scheduler {
    let worker = ItemWorker::new(
        classifier,
        BackoffPolicy::default(),
        cancel,
        MetricsCollector::new(),
    );
    Scheduler::new(worker, config)
}
