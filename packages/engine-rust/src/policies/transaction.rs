//! Transactional scope around the operation body.

use std::sync::Arc;

use async_trait::async_trait;

use crate::intercept::{Flow, InvocationContext, InvocationHooks, OperationError, Policy};
use crate::traits::{TransactionProvider, TransactionScope};

/// Opens a scope before the body, commits it on success and disposes of it
/// without committing on failure. A scope is never committed twice and never
/// outlives its invocation.
#[derive(Clone)]
pub struct TransactionalScopePolicy {
    provider: Arc<dyn TransactionProvider>,
}

impl TransactionalScopePolicy {
    #[must_use]
    pub fn new(provider: Arc<dyn TransactionProvider>) -> Self {
        Self { provider }
    }
}

impl Policy for TransactionalScopePolicy {
    fn name(&self) -> &'static str {
        "transactional_scope"
    }

    fn hooks(&self) -> Box<dyn InvocationHooks> {
        Box::new(ScopeHooks {
            provider: Arc::clone(&self.provider),
            scope: None,
        })
    }
}

struct ScopeHooks {
    provider: Arc<dyn TransactionProvider>,
    scope: Option<Box<dyn TransactionScope>>,
}

#[async_trait]
impl InvocationHooks for ScopeHooks {
    async fn before(&mut self, ctx: &InvocationContext) -> Result<Flow, OperationError> {
        let scope = self
            .provider
            .open()
            .await
            .map_err(OperationError::Transaction)?;
        tracing::debug!(operation = %ctx.operation(), "transaction scope opened");
        self.scope = Some(scope);
        Ok(Flow::Proceed)
    }

    async fn on_success(&mut self, ctx: &InvocationContext) -> Result<(), OperationError> {
        if let Some(scope) = self.scope.take() {
            scope.commit().await.map_err(OperationError::Transaction)?;
            tracing::debug!(operation = %ctx.operation(), "transaction committed");
        }
        Ok(())
    }

    async fn on_exception(&mut self, ctx: &InvocationContext, error: &OperationError) {
        if let Some(scope) = self.scope.take() {
            scope.dispose().await;
            tracing::debug!(operation = %ctx.operation(), %error, "transaction rolled back");
        }
    }

    async fn after(&mut self, _ctx: &InvocationContext) {
        // Reached with an open scope only when a later before-hook rejected
        // or short-circuited the invocation.
        if let Some(scope) = self.scope.take() {
            scope.dispose().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
