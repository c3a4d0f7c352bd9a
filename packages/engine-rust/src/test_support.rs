//! Recording fakes shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use weave_core::{OperationId, Value};

use crate::intercept::{Flow, InvocationContext, InvocationHooks, OperationError, Policy};
use crate::traits::{
    DiagnosticSink, Stopwatch, StopwatchSource, TransactionProvider, TransactionScope,
};

// ---------------------------------------------------------------------------
// HookLog / RecordingPolicy
// ---------------------------------------------------------------------------

/// Ordered log of `label:hook` entries shared between fakes.
#[derive(Debug, Clone, Default)]
pub struct HookLog(Arc<Mutex<Vec<String>>>);

impl HookLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Entries whose hook part equals `hook`, e.g. all `*:after`.
    pub fn hook(&self, hook: &str) -> Vec<String> {
        let suffix = format!(":{hook}");
        self.0
            .lock()
            .iter()
            .filter(|e| e.ends_with(&suffix))
            .cloned()
            .collect()
    }
}

/// Policy whose hooks append to a [`HookLog`] and can be told to misbehave.
#[derive(Clone)]
pub struct RecordingPolicy {
    label: &'static str,
    log: HookLog,
    fail_before: bool,
    fail_success: bool,
    short_circuit: Option<Value>,
}

impl RecordingPolicy {
    pub fn new(label: &'static str, log: HookLog) -> Self {
        Self {
            label,
            log,
            fail_before: false,
            fail_success: false,
            short_circuit: None,
        }
    }

    pub fn failing_before(mut self) -> Self {
        self.fail_before = true;
        self
    }

    pub fn failing_success(mut self) -> Self {
        self.fail_success = true;
        self
    }

    pub fn returning(mut self, value: Value) -> Self {
        self.short_circuit = Some(value);
        self
    }
}

impl Policy for RecordingPolicy {
    fn name(&self) -> &'static str {
        self.label
    }

    fn hooks(&self) -> Box<dyn InvocationHooks> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl InvocationHooks for RecordingPolicy {
    async fn before(&mut self, _ctx: &InvocationContext) -> Result<Flow, OperationError> {
        self.log.push(format!("{}:before", self.label));
        if self.fail_before {
            return Err(OperationError::ArgumentRequired {
                message: weave_core::messages::REQUIRED_MODEL,
            });
        }
        match self.short_circuit.clone() {
            Some(value) => Ok(Flow::Return(value)),
            None => Ok(Flow::Proceed),
        }
    }

    async fn on_success(&mut self, _ctx: &InvocationContext) -> Result<(), OperationError> {
        self.log.push(format!("{}:success", self.label));
        if self.fail_success {
            return Err(anyhow::anyhow!("{} success hook failed", self.label).into());
        }
        Ok(())
    }

    async fn on_exception(&mut self, _ctx: &InvocationContext, _error: &OperationError) {
        self.log.push(format!("{}:exception", self.label));
    }

    async fn after(&mut self, _ctx: &InvocationContext) {
        self.log.push(format!("{}:after", self.label));
    }
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Counts how often an operation body actually ran.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Transaction provider that counts opens, commits and disposals.
#[derive(Debug, Default)]
pub struct RecordingTransactions {
    pub opened: AtomicUsize,
    pub committed: Arc<AtomicUsize>,
    pub disposed: Arc<AtomicUsize>,
    pub fail_open: bool,
    pub fail_commit: bool,
}

impl RecordingTransactions {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn committed(&self) -> usize {
        self.committed.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

struct RecordingScope {
    committed: Arc<AtomicUsize>,
    disposed: Arc<AtomicUsize>,
    fail_commit: bool,
}

#[async_trait]
impl TransactionProvider for RecordingTransactions {
    async fn open(&self) -> anyhow::Result<Box<dyn TransactionScope>> {
        if self.fail_open {
            anyhow::bail!("connection refused");
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingScope {
            committed: self.committed.clone(),
            disposed: self.disposed.clone(),
            fail_commit: self.fail_commit,
        }))
    }
}

#[async_trait]
impl TransactionScope for RecordingScope {
    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        if self.fail_commit {
            anyhow::bail!("serialization failure");
        }
        self.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn dispose(self: Box<Self>) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Timing / diagnostics
// ---------------------------------------------------------------------------

/// Stopwatch source whose stopwatches always report a fixed elapsed time
/// once started.
#[derive(Debug, Clone, Copy)]
pub struct FixedStopwatchSource(pub Duration);

struct FixedStopwatch {
    elapsed: Duration,
    running: bool,
}

impl Stopwatch for FixedStopwatch {
    fn start(&mut self) {
        self.running = true;
    }

    fn elapsed(&self) -> Duration {
        if self.running {
            self.elapsed
        } else {
            Duration::ZERO
        }
    }

    fn reset(&mut self) {
        self.running = false;
    }
}

impl StopwatchSource for FixedStopwatchSource {
    fn stopwatch(&self) -> Box<dyn Stopwatch> {
        Box::new(FixedStopwatch {
            elapsed: self.0,
            running: false,
        })
    }
}

/// Diagnostic sink that keeps every slow-invocation record.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    pub records: Mutex<Vec<(String, Duration)>>,
}

impl RecordingDiagnostics {
    pub fn records(&self) -> Vec<(String, Duration)> {
        self.records.lock().clone()
    }
}

impl DiagnosticSink for RecordingDiagnostics {
    fn slow_invocation(&self, operation: &OperationId, elapsed: Duration, _threshold: Duration) {
        self.records.lock().push((operation.to_string(), elapsed));
    }
}
