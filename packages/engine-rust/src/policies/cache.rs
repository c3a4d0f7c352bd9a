//! Result caching and cache invalidation.

use std::sync::Arc;

use async_trait::async_trait;
use weave_core::messages::NULL_KEY_SENTINEL;
use weave_core::{OperationId, Value};

use crate::intercept::{
    Flow, InvocationContext, InvocationHooks, OperationError, Policy, ResultSource,
};
use crate::traits::CacheStore;

/// Cache key for an invocation: `component.operation(arg1,arg2,...)`.
///
/// Arguments use their natural text form, `<Null>` for `Null`, joined by a
/// bare comma. Argument order matters.
#[must_use]
pub fn cache_key(operation: &OperationId, arguments: &[Value]) -> String {
    let rendered: Vec<String> = arguments
        .iter()
        .map(|argument| match argument {
            Value::Null => NULL_KEY_SENTINEL.to_string(),
            other => other.to_string(),
        })
        .collect();
    format!("{operation}({})", rendered.join(","))
}

// ---------------------------------------------------------------------------
// CachePolicy
// ---------------------------------------------------------------------------

/// Returns a stored result when one exists; otherwise lets the body run and
/// stores its result for `duration_minutes`.
#[derive(Clone)]
pub struct CachePolicy {
    store: Arc<dyn CacheStore>,
    duration_minutes: u32,
}

impl CachePolicy {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, duration_minutes: u32) -> Self {
        Self {
            store,
            duration_minutes,
        }
    }
}

impl Policy for CachePolicy {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn hooks(&self) -> Box<dyn InvocationHooks> {
        Box::new(CacheHooks {
            policy: self.clone(),
            key: None,
        })
    }
}

struct CacheHooks {
    policy: CachePolicy,
    /// Set on a miss; the after-hook stores under it.
    key: Option<String>,
}

#[async_trait]
impl InvocationHooks for CacheHooks {
    async fn before(&mut self, ctx: &InvocationContext) -> Result<Flow, OperationError> {
        let key = cache_key(ctx.operation(), ctx.arguments());
        if let Some(cached) = self.policy.store.get(&key) {
            tracing::debug!(%key, "cache hit");
            metrics::counter!("weave_cache_lookups_total", "outcome" => "hit").increment(1);
            return Ok(Flow::Return(cached));
        }
        tracing::debug!(%key, "cache miss");
        metrics::counter!("weave_cache_lookups_total", "outcome" => "miss").increment(1);
        self.key = Some(key);
        Ok(Flow::Proceed)
    }

    /// Stores only once the outcome is final: a later success-hook (a failed
    /// commit) can still fail the invocation.
    async fn after(&mut self, ctx: &InvocationContext) {
        let Some(key) = self.key.take() else {
            return;
        };
        if ctx.is_failed() || ctx.source() != ResultSource::Body {
            return;
        }
        let value = ctx.result().cloned().unwrap_or_default();
        self.policy
            .store
            .set(&key, value, self.policy.duration_minutes);
    }
}

// ---------------------------------------------------------------------------
// CacheInvalidatePolicy
// ---------------------------------------------------------------------------

/// Removes a fixed cache entry once the operation has succeeded.
#[derive(Clone)]
pub struct CacheInvalidatePolicy {
    store: Arc<dyn CacheStore>,
    key: String,
}

impl CacheInvalidatePolicy {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }
}

impl Policy for CacheInvalidatePolicy {
    fn name(&self) -> &'static str {
        "cache_invalidate"
    }

    fn hooks(&self) -> Box<dyn InvocationHooks> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl InvocationHooks for CacheInvalidatePolicy {
    async fn after(&mut self, ctx: &InvocationContext) {
        if ctx.is_failed() || ctx.source() != ResultSource::Body {
            return;
        }
        if self.store.exists(&self.key) {
            self.store.remove(&self.key);
            tracing::debug!(key = %self.key, "cache entry invalidated");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
