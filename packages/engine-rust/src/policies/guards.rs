//! Argument guards: reject an invocation before its body runs.

use async_trait::async_trait;
use weave_core::messages::{NOT_EMPTY_ID, REQUIRED_MODEL};
use weave_core::Value;

use crate::intercept::{Flow, InvocationContext, InvocationHooks, OperationError, Policy};

// ---------------------------------------------------------------------------
// NullArgumentCheck
// ---------------------------------------------------------------------------

/// Fails with "A model must be provided." when the first argument is absent
/// or `Null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullArgumentCheckPolicy;

impl Policy for NullArgumentCheckPolicy {
    fn name(&self) -> &'static str {
        "null_argument_check"
    }

    fn hooks(&self) -> Box<dyn InvocationHooks> {
        Box::new(*self)
    }
}

#[async_trait]
impl InvocationHooks for NullArgumentCheckPolicy {
    async fn before(&mut self, ctx: &InvocationContext) -> Result<Flow, OperationError> {
        if ctx.first_argument().is_none() {
            return Err(OperationError::ArgumentRequired {
                message: REQUIRED_MODEL,
            });
        }
        Ok(Flow::Proceed)
    }
}

// ---------------------------------------------------------------------------
// IdentifierCheck
// ---------------------------------------------------------------------------

/// Checks the first argument as an identifier: it must be present, and if it
/// is an integer it must be positive. Non-integer identifiers pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifierCheckPolicy;

impl Policy for IdentifierCheckPolicy {
    fn name(&self) -> &'static str {
        "identifier_check"
    }

    fn hooks(&self) -> Box<dyn InvocationHooks> {
        Box::new(*self)
    }
}

#[async_trait]
impl InvocationHooks for IdentifierCheckPolicy {
    async fn before(&mut self, ctx: &InvocationContext) -> Result<Flow, OperationError> {
        match ctx.first_argument() {
            None => Err(OperationError::ArgumentRequired {
                message: NOT_EMPTY_ID,
            }),
            Some(Value::Int(id)) if *id <= 0 => Err(OperationError::IdentifierMustBePositive),
            Some(_) => Ok(Flow::Proceed),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use weave_core::OperationId;

    use super::*;

    fn ctx(arguments: Vec<Value>) -> InvocationContext {
        InvocationContext::new(OperationId::new("Users", "get"), arguments)
    }

    async fn check(policy: &dyn Policy, arguments: Vec<Value>) -> Result<Flow, OperationError> {
        policy.hooks().before(&ctx(arguments)).await
    }

    #[tokio::test]
    async fn null_check_rejects_missing_model() {
        for arguments in [vec![], vec![Value::Null], vec![Value::Null, Value::Int(1)]] {
            let err = check(&NullArgumentCheckPolicy, arguments).await.unwrap_err();
            assert_eq!(err.to_string(), REQUIRED_MODEL);
        }
    }

    #[tokio::test]
    async fn null_check_accepts_any_present_value() {
        for value in [Value::Int(0), Value::from(""), Value::record("Dto", Vec::<(String, Value)>::new())] {
            assert_eq!(
                check(&NullArgumentCheckPolicy, vec![value]).await.unwrap(),
                Flow::Proceed
            );
        }
    }

    #[tokio::test]
    async fn identifier_check_rejects_missing_id() {
        let err = check(&IdentifierCheckPolicy, vec![Value::Null]).await.unwrap_err();
        assert_eq!(err.to_string(), NOT_EMPTY_ID);
    }

    #[tokio::test]
    async fn identifier_check_rejects_non_positive_integers() {
        for id in [0, -1, i64::MIN] {
            let err = check(&IdentifierCheckPolicy, vec![Value::Int(id)])
                .await
                .unwrap_err();
            assert!(matches!(err, OperationError::IdentifierMustBePositive));
        }
    }

    #[tokio::test]
    async fn identifier_check_passes_positive_and_non_integer_ids() {
        for id in [Value::Int(1), Value::from("a1b2"), Value::Float(-3.0)] {
            assert_eq!(check(&IdentifierCheckPolicy, vec![id]).await.unwrap(), Flow::Proceed);
        }
    }
}
