//! Tower integration: intercept any `Service<Invocation>`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::{Layer, Service};
use weave_core::Value;

use super::invocation::{Completion, Invocation, InvocationContext, OperationError};
use super::pipeline::InterceptionPipeline;
use super::selector::PolicySelector;

// ---------------------------------------------------------------------------
// InterceptLayer
// ---------------------------------------------------------------------------

/// Tower layer that runs each request through the policy chain selected for
/// its operation, with the inner service as the body.
#[derive(Debug, Clone)]
pub struct InterceptLayer {
    selector: Arc<PolicySelector>,
}

impl InterceptLayer {
    #[must_use]
    pub fn new(selector: Arc<PolicySelector>) -> Self {
        Self { selector }
    }
}

impl<S> Layer<S> for InterceptLayer {
    type Service = InterceptService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InterceptService {
            inner,
            selector: Arc::clone(&self.selector),
        }
    }
}

// ---------------------------------------------------------------------------
// InterceptService
// ---------------------------------------------------------------------------

/// Service wrapper produced by [`InterceptLayer`].
///
/// The inner service is only called if every before-hook lets the request
/// through; a short-circuiting policy answers without touching it.
#[derive(Debug, Clone)]
pub struct InterceptService<S> {
    inner: S,
    selector: Arc<PolicySelector>,
}

impl<S> Service<Invocation> for InterceptService<S>
where
    S: Service<Invocation, Response = Value, Error = OperationError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Value;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<Value, OperationError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Invocation) -> Self::Future {
        // Keep the instance that was driven to readiness for this call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let chain = self.selector.select_for(&request.operation);

        Box::pin(async move {
            let ctx = InvocationContext::new(request.operation.clone(), request.arguments.clone());
            InterceptionPipeline::new()
                .execute(&chain, ctx, move || Completion::pending(inner.call(request)))
                .await
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
