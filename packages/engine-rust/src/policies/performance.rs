//! Slow-invocation reporting.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::intercept::{Flow, InvocationContext, InvocationHooks, OperationError, Policy};
use crate::traits::{DiagnosticSink, Stopwatch, StopwatchSource};

/// Times each invocation with its own stopwatch and reports it to the
/// [`DiagnosticSink`] when it takes longer than `threshold`.
///
/// The stopwatch starts in the before-hook and is read in the after-hook, so
/// the measurement covers every exit path, including rejections by
/// lower-priority policies that ran before it.
#[derive(Clone)]
pub struct PerformanceTimerPolicy {
    threshold: Duration,
    stopwatches: Arc<dyn StopwatchSource>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl PerformanceTimerPolicy {
    #[must_use]
    pub fn new(
        threshold: Duration,
        stopwatches: Arc<dyn StopwatchSource>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            threshold,
            stopwatches,
            diagnostics,
        }
    }

    #[must_use]
    pub fn threshold(&self) -> Duration {
        self.threshold
    }
}

impl Policy for PerformanceTimerPolicy {
    fn name(&self) -> &'static str {
        "performance_timer"
    }

    fn hooks(&self) -> Box<dyn InvocationHooks> {
        Box::new(TimerHooks {
            stopwatch: self.stopwatches.stopwatch(),
            threshold: self.threshold,
            diagnostics: Arc::clone(&self.diagnostics),
        })
    }
}

struct TimerHooks {
    stopwatch: Box<dyn Stopwatch>,
    threshold: Duration,
    diagnostics: Arc<dyn DiagnosticSink>,
}

#[async_trait]
impl InvocationHooks for TimerHooks {
    async fn before(&mut self, _ctx: &InvocationContext) -> Result<Flow, OperationError> {
        self.stopwatch.start();
        Ok(Flow::Proceed)
    }

    async fn after(&mut self, ctx: &InvocationContext) {
        let elapsed = self.stopwatch.elapsed();
        if elapsed > self.threshold {
            self.diagnostics
                .slow_invocation(ctx.operation(), elapsed, self.threshold);
        }
        self.stopwatch.reset();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
