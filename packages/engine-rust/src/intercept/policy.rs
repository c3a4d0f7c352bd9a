//! Policy and hook traits, and the ordered chain the pipeline executes.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use weave_core::{PolicyDescriptor, Value};

use super::invocation::{InvocationContext, OperationError};

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

/// Decision returned by a before-hook.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Continue with the next before-hook and, eventually, the body.
    Proceed,
    /// Skip the remaining before-hooks and the body; the invocation succeeds
    /// with this value.
    ///
    /// No success-hook runs on this path, including those of policies whose
    /// before-hooks already ran. Their after-hooks still run and see
    /// [`ResultSource::Policy`](super::ResultSource::Policy), so a
    /// transactional scope opened earlier is disposed rather than committed.
    /// Nothing ran inside it, so no work is lost.
    Return(Value),
}

/// Lifecycle hooks for one policy during one invocation.
///
/// A fresh hooks object is created per invocation, so implementations may
/// keep per-call state in `self` (a started stopwatch, a computed cache key,
/// an open transaction scope). Every method has a no-op default.
#[async_trait]
pub trait InvocationHooks: Send {
    /// Runs before the body in ascending priority order. An error skips the
    /// body and the success and exception hooks.
    async fn before(&mut self, _ctx: &InvocationContext) -> Result<Flow, OperationError> {
        Ok(Flow::Proceed)
    }

    /// Runs after the body succeeded. An error turns the invocation into a
    /// failure.
    async fn on_success(&mut self, _ctx: &InvocationContext) -> Result<(), OperationError> {
        Ok(())
    }

    /// Observes a body (or success-hook) failure. Cannot suppress it.
    async fn on_exception(&mut self, _ctx: &InvocationContext, _error: &OperationError) {}

    /// Runs exactly once on every exit path.
    async fn after(&mut self, _ctx: &InvocationContext) {}
}

/// A registered cross-cutting policy. Shared across all invocations of the
/// operations it is bound to.
pub trait Policy: Send + Sync {
    /// Short label used in traces and as the short-circuit source.
    fn name(&self) -> &'static str;

    /// Create the per-invocation hooks object.
    fn hooks(&self) -> Box<dyn InvocationHooks>;
}

// ---------------------------------------------------------------------------
// PolicyBinding / PolicyChain
// ---------------------------------------------------------------------------

/// A declared descriptor paired with the policy built from it at startup.
#[derive(Clone)]
pub struct PolicyBinding {
    pub descriptor: PolicyDescriptor,
    pub policy: Arc<dyn Policy>,
}

impl PolicyBinding {
    #[must_use]
    pub fn new(descriptor: PolicyDescriptor, policy: Arc<dyn Policy>) -> Self {
        Self { descriptor, policy }
    }

    #[must_use]
    pub fn priority(&self) -> i32 {
        self.descriptor.priority
    }
}

impl fmt::Debug for PolicyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyBinding")
            .field("policy", &self.policy.name())
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// Immutable, priority-ordered list of bindings for one operation.
///
/// Construction sorts by ascending priority with a stable sort, so bindings
/// with equal priority keep the order they were given in. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct PolicyChain {
    bindings: Arc<[PolicyBinding]>,
}

impl PolicyChain {
    #[must_use]
    pub fn new(mut bindings: Vec<PolicyBinding>) -> Self {
        bindings.sort_by_key(PolicyBinding::priority);
        Self {
            bindings: bindings.into(),
        }
    }

    /// The pass-through chain.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PolicyBinding> {
        self.bindings.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The inert descriptors, in execution order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<PolicyDescriptor> {
        self.bindings.iter().map(|b| b.descriptor.clone()).collect()
    }
}

impl<'a> IntoIterator for &'a PolicyChain {
    type Item = &'a PolicyBinding;
    type IntoIter = std::slice::Iter<'a, PolicyBinding>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{HookLog, RecordingPolicy};

    fn binding(label: &'static str, priority: i32, log: &HookLog) -> PolicyBinding {
        PolicyBinding::new(
            PolicyDescriptor::null_argument_check().with_priority(priority),
            Arc::new(RecordingPolicy::new(label, log.clone())),
        )
    }

    #[test]
    fn chain_sorts_by_ascending_priority() {
        let log = HookLog::default();
        let chain = PolicyChain::new(vec![
            binding("p5", 5, &log),
            binding("p1", 1, &log),
            binding("p3", 3, &log),
        ]);
        let priorities: Vec<i32> = chain.iter().map(PolicyBinding::priority).collect();
        assert_eq!(priorities, vec![1, 3, 5]);
    }

    #[test]
    fn equal_priorities_keep_given_order() {
        let log = HookLog::default();
        let chain = PolicyChain::new(vec![
            binding("a", 2, &log),
            binding("b", 1, &log),
            binding("c", 2, &log),
            binding("d", 1, &log),
        ]);
        let names: Vec<&str> = chain.iter().map(|b| b.policy.name()).collect();
        assert_eq!(names, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn empty_chain() {
        let chain = PolicyChain::empty();
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);
        assert!(chain.descriptors().is_empty());
    }
}
