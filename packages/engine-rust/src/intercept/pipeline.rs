//! Lifecycle execution: runs a policy chain around one operation body.

use std::time::Instant;

use tracing::{debug, info_span, Instrument};
use weave_core::Value;

use super::invocation::{
    Completion, InvocationContext, OperationError, ResultSource, Stage,
};
use super::policy::{Flow, InvocationHooks, PolicyChain};

/// Executes the before / body / success | exception / after lifecycle.
///
/// Hook order is the chain order (ascending priority) for every phase,
/// after-hooks included. Per-call state lives in the hooks objects and the
/// [`InvocationContext`]; the pipeline itself is stateless and `Copy`.
///
/// Failure rules:
/// - a before-hook error skips the remaining before-hooks, the body, the
///   success-hooks and the exception-hooks;
/// - a body error (immediate or from an async completion) or a success-hook
///   error runs every exception-hook;
/// - after-hooks run exactly once on every path, and the original failure is
///   returned unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterceptionPipeline;

impl InterceptionPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Run `body` for `ctx` under `chain`.
    ///
    /// # Errors
    ///
    /// Returns the before-hook, body, or success-hook failure that ended the
    /// invocation.
    pub async fn execute<B>(
        &self,
        chain: &PolicyChain,
        ctx: InvocationContext,
        body: B,
    ) -> Result<Value, OperationError>
    where
        B: FnOnce() -> Completion + Send,
    {
        let span = info_span!(
            "invocation",
            operation = %ctx.operation(),
            invocation_id = %ctx.invocation_id(),
            policies = chain.len(),
            outcome = tracing::field::Empty,
        );
        run(chain, ctx, body).instrument(span).await
    }
}

async fn run<B>(
    chain: &PolicyChain,
    mut ctx: InvocationContext,
    body: B,
) -> Result<Value, OperationError>
where
    B: FnOnce() -> Completion + Send,
{
    let start = Instant::now();
    let mut hooks: Vec<(&'static str, Box<dyn InvocationHooks>)> = chain
        .iter()
        .map(|binding| (binding.policy.name(), binding.policy.hooks()))
        .collect();

    ctx.enter(Stage::BeforeHooksRun);
    let mut proceed = true;
    for (name, hook) in &mut hooks {
        match hook.before(&ctx).await {
            Ok(Flow::Proceed) => {}
            Ok(Flow::Return(value)) => {
                debug!(policy = *name, "before-hook returned a result; body skipped");
                ctx.succeed(value, ResultSource::Policy(*name));
                ctx.enter(Stage::Succeeded);
                proceed = false;
                break;
            }
            Err(error) => {
                debug!(policy = *name, %error, "before-hook rejected invocation");
                ctx.enter(Stage::Failed);
                ctx.fail(error);
                proceed = false;
                break;
            }
        }
    }

    if proceed {
        ctx.enter(Stage::BodyRunning);
        match body().resolve().await {
            Ok(value) => {
                ctx.succeed(value, ResultSource::Body);
                ctx.enter(Stage::Succeeded);
                let mut failure = None;
                for (name, hook) in &mut hooks {
                    if let Err(error) = hook.on_success(&ctx).await {
                        debug!(policy = *name, %error, "success-hook failed");
                        failure = Some(error);
                        break;
                    }
                }
                if let Some(error) = failure {
                    run_exception_hooks(&mut hooks, &mut ctx, error).await;
                }
            }
            Err(error) => run_exception_hooks(&mut hooks, &mut ctx, error).await,
        }
    }

    ctx.enter(Stage::AfterHooksRun);
    for (_, hook) in &mut hooks {
        hook.after(&ctx).await;
    }
    ctx.enter(Stage::Done);

    record_completion(&ctx, start);
    ctx.into_result()
}

async fn run_exception_hooks(
    hooks: &mut [(&'static str, Box<dyn InvocationHooks>)],
    ctx: &mut InvocationContext,
    error: OperationError,
) {
    ctx.enter(Stage::Failed);
    for (_, hook) in hooks.iter_mut() {
        hook.on_exception(ctx, &error).await;
    }
    ctx.fail(error);
}

fn record_completion(ctx: &InvocationContext, start: Instant) {
    let outcome = if ctx.is_failed() { "error" } else { "ok" };
    let elapsed = start.elapsed();
    let operation = ctx.operation().to_string();

    tracing::Span::current().record("outcome", outcome);
    debug!(
        outcome,
        duration_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
        "invocation complete"
    );

    metrics::counter!(
        "weave_invocations_total",
        "operation" => operation.clone(),
        "outcome" => outcome,
    )
    .increment(1);
    metrics::histogram!("weave_invocation_duration_seconds", "operation" => operation)
        .record(elapsed.as_secs_f64());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
