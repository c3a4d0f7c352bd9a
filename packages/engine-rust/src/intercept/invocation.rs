//! Per-invocation state, body completion, and the failure taxonomy.

use std::fmt;
use std::future::Future;

use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;
use uuid::Uuid;
use weave_core::messages::{ID_GREATER_THAN_ZERO, VALIDATION_SEPARATOR};
use weave_core::{OperationId, Value};

// ---------------------------------------------------------------------------
// OperationError
// ---------------------------------------------------------------------------

/// Failure surfaced to the caller of an intercepted operation.
///
/// Policy failures carry their kind and message unchanged; body failures
/// pass through untouched in whatever variant the body produced.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("{message}")]
    ArgumentRequired { message: &'static str },
    #[error("{}", ID_GREATER_THAN_ZERO)]
    IdentifierMustBePositive,
    #[error("{}", .messages.join(VALIDATION_SEPARATOR))]
    ValidationFailed { messages: Vec<String> },
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
    #[error("transaction scope failed: {0}")]
    Transaction(anyhow::Error),
    #[error("operation task aborted: {reason}")]
    TaskAborted { reason: String },
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Boxed future produced by an asynchronous operation body.
pub type BodyFuture = BoxFuture<'static, Result<Value, OperationError>>;

/// What an operation body hands back to the pipeline.
///
/// Synchronous bodies return `Ready`; asynchronous ones return a future or a
/// spawned task. The pipeline resolves every variant to the same
/// `Result<Value, OperationError>`, so a failure discovered after the body
/// returned is handled exactly like an immediate one.
pub enum Completion {
    Ready(Result<Value, OperationError>),
    Pending(BodyFuture),
    Spawned(JoinHandle<Result<Value, OperationError>>),
}

impl Completion {
    pub fn ready(value: impl Into<Value>) -> Self {
        Completion::Ready(Ok(value.into()))
    }

    pub fn failed(error: impl Into<OperationError>) -> Self {
        Completion::Ready(Err(error.into()))
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, OperationError>> + Send + 'static,
    {
        Completion::Pending(Box::pin(future))
    }

    /// Wait for the body to finish and report its real outcome.
    ///
    /// A spawned task that panicked or was cancelled becomes
    /// `OperationError::TaskAborted`.
    pub async fn resolve(self) -> Result<Value, OperationError> {
        match self {
            Completion::Ready(result) => result,
            Completion::Pending(future) => future.await,
            Completion::Spawned(handle) => match handle.await {
                Ok(result) => result,
                Err(join_error) => {
                    let reason = if join_error.is_panic() {
                        "body task panicked"
                    } else {
                        "body task was cancelled"
                    };
                    Err(OperationError::TaskAborted {
                        reason: reason.to_string(),
                    })
                }
            },
        }
    }
}

impl From<Result<Value, OperationError>> for Completion {
    fn from(result: Result<Value, OperationError>) -> Self {
        Completion::Ready(result)
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Completion::Pending(_) => f.write_str("Pending(..)"),
            Completion::Spawned(_) => f.write_str("Spawned(..)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle state
// ---------------------------------------------------------------------------

/// Lifecycle position of one invocation inside the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    NotStarted,
    BeforeHooksRun,
    BodyRunning,
    Succeeded,
    Failed,
    AfterHooksRun,
    Done,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::NotStarted => "not_started",
            Stage::BeforeHooksRun => "before_hooks",
            Stage::BodyRunning => "body_running",
            Stage::Succeeded => "succeeded",
            Stage::Failed => "failed",
            Stage::AfterHooksRun => "after_hooks",
            Stage::Done => "done",
        }
    }
}

/// Completion state of an invocation.
#[derive(Debug)]
pub enum Outcome {
    Pending,
    Succeeded,
    Failed(OperationError),
}

/// Where the invocation's result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    /// Not produced yet.
    None,
    /// The wrapped operation body ran and produced it.
    Body,
    /// A policy returned it from its before-hook (e.g. a cache hit).
    Policy(&'static str),
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// A request to run an operation: identity plus positional arguments.
///
/// This is the request type of [`InterceptService`](super::InterceptService).
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub operation: OperationId,
    pub arguments: Vec<Value>,
}

impl Invocation {
    #[must_use]
    pub fn new(operation: OperationId, arguments: Vec<Value>) -> Self {
        Self {
            operation,
            arguments,
        }
    }
}

// ---------------------------------------------------------------------------
// InvocationContext
// ---------------------------------------------------------------------------

/// Mutable record for a single call, owned by the pipeline for its duration.
///
/// Hooks read it; only the pipeline advances the stage, stores the result
/// and settles the outcome.
#[derive(Debug)]
pub struct InvocationContext {
    invocation_id: Uuid,
    operation: OperationId,
    arguments: Vec<Value>,
    result: Option<Value>,
    outcome: Outcome,
    stage: Stage,
    source: ResultSource,
}

impl InvocationContext {
    #[must_use]
    pub fn new(operation: OperationId, arguments: Vec<Value>) -> Self {
        Self {
            invocation_id: Uuid::new_v4(),
            operation,
            arguments,
            result: None,
            outcome: Outcome::Pending,
            stage: Stage::NotStarted,
            source: ResultSource::None,
        }
    }

    #[must_use]
    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    #[must_use]
    pub fn operation(&self) -> &OperationId {
        &self.operation
    }

    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// First positional argument, treating `Value::Null` as absent.
    #[must_use]
    pub fn first_argument(&self) -> Option<&Value> {
        self.arguments.first().filter(|v| !v.is_null())
    }

    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn source(&self) -> ResultSource {
        self.source
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_))
    }

    pub(crate) fn enter(&mut self, stage: Stage) {
        tracing::trace!(
            operation = %self.operation,
            from = self.stage.as_str(),
            to = stage.as_str(),
            "invocation stage"
        );
        self.stage = stage;
    }

    pub(crate) fn succeed(&mut self, value: Value, source: ResultSource) {
        self.result = Some(value);
        self.source = source;
        self.outcome = Outcome::Succeeded;
    }

    pub(crate) fn fail(&mut self, error: OperationError) {
        self.outcome = Outcome::Failed(error);
    }

    /// Consumes the context, yielding what the caller receives.
    pub(crate) fn into_result(self) -> Result<Value, OperationError> {
        match self.outcome {
            Outcome::Failed(error) => Err(error),
            Outcome::Succeeded | Outcome::Pending => Ok(self.result.unwrap_or_default()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
