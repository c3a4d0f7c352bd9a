//! Entry point tying selection and execution together.

use std::sync::Arc;

use weave_core::{OperationId, PolicyDescriptor, Value};

use super::invocation::{Completion, InvocationContext, OperationError};
use super::layer::InterceptLayer;
use super::pipeline::InterceptionPipeline;
use super::registry::{Capabilities, PolicyRegistry, RegistrationError};
use super::selector::PolicySelector;
use crate::config::EngineConfig;

/// Wraps operation bodies in the policies declared for them.
///
/// Cheap to clone; every clone shares the same selector and therefore the
/// same memoized chains and built policies.
#[derive(Debug, Clone)]
pub struct Weaver {
    selector: Arc<PolicySelector>,
    pipeline: InterceptionPipeline,
}

impl Weaver {
    #[must_use]
    pub fn new(selector: PolicySelector) -> Self {
        Self {
            selector: Arc::new(selector),
            pipeline: InterceptionPipeline::new(),
        }
    }

    /// Build every declaration in `registry` and wrap the resulting selector.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistrationError`] raised while building policies.
    pub fn from_registry(
        registry: &PolicyRegistry,
        capabilities: &Capabilities,
        config: &EngineConfig,
    ) -> Result<Self, RegistrationError> {
        Ok(Self::new(registry.build(capabilities, config)?))
    }

    #[must_use]
    pub fn selector(&self) -> &PolicySelector {
        &self.selector
    }

    /// Descriptors that would wrap `component.operation`, in execution order.
    #[must_use]
    pub fn resolve_policies(&self, component: &str, operation: &str) -> Vec<PolicyDescriptor> {
        self.selector.descriptors(component, operation)
    }

    /// Run `body` as `operation` with `arguments`, under its policy chain.
    ///
    /// # Errors
    ///
    /// Returns whatever failure ended the invocation: a policy rejection, the
    /// body's own error, or a success-hook failure.
    pub async fn invoke<B>(
        &self,
        operation: &OperationId,
        arguments: Vec<Value>,
        body: B,
    ) -> Result<Value, OperationError>
    where
        B: FnOnce() -> Completion + Send,
    {
        let chain = self.selector.select_for(operation);
        let ctx = InvocationContext::new(operation.clone(), arguments);
        self.pipeline.execute(&chain, ctx, body).await
    }

    /// Tower layer applying the same policies to a `Service<Invocation>`.
    #[must_use]
    pub fn layer(&self) -> InterceptLayer {
        InterceptLayer::new(Arc::clone(&self.selector))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
