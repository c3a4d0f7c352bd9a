//! Capabilities the engine consumes from its environment.
//!
//! Policies never see concrete cache stores, validators, clocks or
//! transaction managers; they are handed `Arc<dyn ...>` capabilities at
//! registration time. Reference adapters live in [`crate::adapters`].

use std::time::Duration;

use async_trait::async_trait;
use weave_core::{OperationId, Value};

/// Shared key-value cache used by the cache and cache-invalidate policies.
///
/// Implementations must tolerate concurrent `set`/`get`/`remove` from many
/// invocations without callers holding any lock. All operations are
/// synchronous; wrap in `Arc<dyn CacheStore>` for sharing.
pub trait CacheStore: Send + Sync + 'static {
    /// Insert or replace `key`, expiring after `ttl_minutes`.
    fn set(&self, key: &str, value: Value, ttl_minutes: u32);

    /// Retrieve a live entry, or `None` if absent or expired.
    fn get(&self, key: &str) -> Option<Value>;

    /// Check whether a live entry exists without cloning it.
    fn exists(&self, key: &str) -> bool;

    /// Remove `key` if present.
    fn remove(&self, key: &str);
}

/// Validates entities of one declared record type.
pub trait Validator: Send + Sync {
    /// The `Record::type_name` this validator accepts.
    fn entity_type(&self) -> &str;

    /// Returns one message per failed rule; empty means valid.
    fn validate(&self, entity: &Value) -> Vec<String>;
}

/// Opens transactional scopes around operation bodies.
#[async_trait]
pub trait TransactionProvider: Send + Sync {
    async fn open(&self) -> anyhow::Result<Box<dyn TransactionScope>>;
}

/// One open transactional scope. Consumed by either `commit` or `dispose`.
#[async_trait]
pub trait TransactionScope: Send {
    /// Make the scope's work durable.
    async fn commit(self: Box<Self>) -> anyhow::Result<()>;

    /// Abandon the scope without committing.
    async fn dispose(self: Box<Self>);
}

/// Monotonic stopwatch owned by a single invocation.
pub trait Stopwatch: Send {
    fn start(&mut self);

    /// Time accumulated since `start`. Zero if never started.
    fn elapsed(&self) -> Duration;

    fn reset(&mut self);

    fn elapsed_seconds(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}

/// Hands out fresh stopwatches, one per invocation.
pub trait StopwatchSource: Send + Sync {
    fn stopwatch(&self) -> Box<dyn Stopwatch>;
}

/// Receives diagnostic records emitted by policies.
pub trait DiagnosticSink: Send + Sync {
    /// An invocation of `operation` took `elapsed`, above `threshold`.
    fn slow_invocation(&self, operation: &OperationId, elapsed: Duration, threshold: Duration);
}
