//! Validates record arguments against a registered validator.

use std::sync::Arc;

use async_trait::async_trait;

use crate::intercept::{Flow, InvocationContext, InvocationHooks, OperationError, Policy};
use crate::traits::Validator;

/// Runs a [`Validator`] over every argument whose record type matches the
/// validator's entity type. The first entity with failures rejects the
/// invocation; later entities are not checked.
#[derive(Clone)]
pub struct ValidatePolicy {
    validator: Arc<dyn Validator>,
}

impl ValidatePolicy {
    #[must_use]
    pub fn new(validator: Arc<dyn Validator>) -> Self {
        Self { validator }
    }
}

impl std::fmt::Debug for ValidatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatePolicy")
            .field("entity_type", &self.validator.entity_type())
            .finish()
    }
}

impl Policy for ValidatePolicy {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn hooks(&self) -> Box<dyn InvocationHooks> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl InvocationHooks for ValidatePolicy {
    async fn before(&mut self, ctx: &InvocationContext) -> Result<Flow, OperationError> {
        let entity_type = self.validator.entity_type();
        for entity in ctx
            .arguments()
            .iter()
            .filter(|argument| argument.type_name() == Some(entity_type))
        {
            let messages = self.validator.validate(entity);
            if !messages.is_empty() {
                tracing::debug!(
                    operation = %ctx.operation(),
                    entity_type,
                    failures = messages.len(),
                    "validation failed"
                );
                return Err(OperationError::ValidationFailed { messages });
            }
        }
        Ok(Flow::Proceed)
    }
}
