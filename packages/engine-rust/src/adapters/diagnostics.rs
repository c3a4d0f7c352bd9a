//! [`DiagnosticSink`] that writes through `tracing` and `metrics`.

use std::time::Duration;

use weave_core::OperationId;

use crate::traits::DiagnosticSink;

/// Emits a `warn!` event and bumps `weave_slow_invocations_total` for every
/// slow invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn slow_invocation(&self, operation: &OperationId, elapsed: Duration, threshold: Duration) {
        tracing::warn!(
            operation = %operation,
            elapsed_secs = elapsed.as_secs_f64(),
            threshold_secs = threshold.as_secs(),
            "slow invocation"
        );
        metrics::counter!(
            "weave_slow_invocations_total",
            "operation" => operation.to_string(),
        )
        .increment(1);
    }
}
