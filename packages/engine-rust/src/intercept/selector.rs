//! Policy selection: which bindings apply to an operation, and in what order.

use std::collections::HashMap;

use dashmap::DashMap;
use weave_core::{OperationId, PolicyDescriptor};

use super::policy::{PolicyBinding, PolicyChain};

/// Resolves the ordered policy chain for `(component, operation)` pairs.
///
/// Holds the bindings declared at component level (applied to every
/// operation of that component) and at operation level. Selection
/// concatenates component bindings then operation bindings, each in
/// declaration order, and stable-sorts by priority. Declarations are fixed at
/// construction, so results are memoized per operation for the selector's
/// lifetime. Only operations with operation-level declarations are memoized;
/// every other operation gets its component's precomputed chain (or an empty
/// one), so the memo stays bounded by the declarations.
#[derive(Debug, Default)]
pub struct PolicySelector {
    components: HashMap<String, Vec<PolicyBinding>>,
    operations: HashMap<OperationId, Vec<PolicyBinding>>,
    /// Chains for operations that only have component-level declarations.
    component_chains: HashMap<String, PolicyChain>,
    /// `None` disables memoization.
    memo: Option<DashMap<OperationId, PolicyChain>>,
}

impl PolicySelector {
    /// Creates a selector from already-built bindings. Used by
    /// [`PolicyRegistry::build`](super::PolicyRegistry::build).
    #[must_use]
    pub fn new(
        components: HashMap<String, Vec<PolicyBinding>>,
        operations: HashMap<OperationId, Vec<PolicyBinding>>,
        memoize: bool,
    ) -> Self {
        let component_chains = components
            .iter()
            .map(|(name, bindings)| (name.clone(), PolicyChain::new(bindings.clone())))
            .collect();
        Self {
            components,
            operations,
            component_chains,
            memo: memoize.then(DashMap::new),
        }
    }

    /// Ordered chain for `component.operation`. Unknown pairs yield an empty
    /// chain.
    #[must_use]
    pub fn select(&self, component: &str, operation: &str) -> PolicyChain {
        self.select_for(&OperationId::new(component, operation))
    }

    /// Same as [`select`](Self::select) for an existing identity.
    #[must_use]
    pub fn select_for(&self, operation: &OperationId) -> PolicyChain {
        if !self.operations.contains_key(operation) {
            return self
                .component_chains
                .get(&operation.component)
                .cloned()
                .unwrap_or_else(PolicyChain::empty);
        }
        match &self.memo {
            Some(memo) => memo
                .entry(operation.clone())
                .or_insert_with(|| self.resolve(operation))
                .clone(),
            None => self.resolve(operation),
        }
    }

    /// Inert view of the chain, for diagnostics.
    #[must_use]
    pub fn descriptors(&self, component: &str, operation: &str) -> Vec<PolicyDescriptor> {
        self.select(component, operation).descriptors()
    }

    /// Operations that carry operation-level declarations, sorted.
    #[must_use]
    pub fn declared_operations(&self) -> Vec<OperationId> {
        let mut ops: Vec<OperationId> = self.operations.keys().cloned().collect();
        ops.sort();
        ops
    }

    fn resolve(&self, operation: &OperationId) -> PolicyChain {
        let component_level = self
            .components
            .get(&operation.component)
            .into_iter()
            .flatten();
        let operation_level = self.operations.get(operation).into_iter().flatten();
        PolicyChain::new(component_level.chain(operation_level).cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::test_support::{HookLog, RecordingPolicy};

    /// Binding whose descriptor is identifiable by its invalidation key.
    fn tagged(tag: &str, priority: i32) -> PolicyBinding {
        PolicyBinding::new(
            PolicyDescriptor::cache_invalidate(tag).with_priority(priority),
            Arc::new(RecordingPolicy::new("tagged", HookLog::default())),
        )
    }

    fn tags(chain: &PolicyChain) -> Vec<String> {
        chain
            .descriptors()
            .into_iter()
            .map(|d| match d.spec {
                weave_core::PolicySpec::CacheInvalidate { key } => key,
                other => panic!("unexpected spec {other:?}"),
            })
            .collect()
    }

    fn selector(
        component: Vec<PolicyBinding>,
        operation: Vec<PolicyBinding>,
        memoize: bool,
    ) -> PolicySelector {
        let mut components = HashMap::new();
        components.insert("Users".to_string(), component);
        let mut operations = HashMap::new();
        operations.insert(OperationId::new("Users", "get"), operation);
        PolicySelector::new(components, operations, memoize)
    }

    #[test]
    fn merges_component_and_operation_levels_by_priority() {
        let s = selector(
            vec![tagged("c5", 5), tagged("c1", 1)],
            vec![tagged("o3", 3), tagged("o0", 0)],
            true,
        );
        assert_eq!(tags(&s.select("Users", "get")), vec!["o0", "c1", "o3", "c5"]);
    }

    #[test]
    fn ties_put_component_level_first() {
        let s = selector(
            vec![tagged("c-a", 2), tagged("c-b", 2)],
            vec![tagged("o-a", 2), tagged("o-b", 2)],
            true,
        );
        assert_eq!(tags(&s.select("Users", "get")), vec!["c-a", "c-b", "o-a", "o-b"]);
    }

    #[test]
    fn component_policies_apply_to_undeclared_operations() {
        let s = selector(vec![tagged("c", 0)], vec![tagged("o", 0)], true);
        assert_eq!(tags(&s.select("Users", "delete")), vec!["c"]);
    }

    #[test]
    fn unknown_operation_yields_empty_chain() {
        let s = selector(vec![tagged("c", 0)], vec![], true);
        assert!(s.select("Billing", "charge").is_empty());
        assert!(PolicySelector::default().select("Any", "thing").is_empty());
    }

    #[test]
    fn undeclared_operations_are_not_memoized() {
        let s = selector(vec![tagged("c", 1)], vec![tagged("o", 0)], true);
        for i in 0..1_000 {
            assert!(s.select("Anything", &format!("op{i}")).is_empty());
            assert_eq!(tags(&s.select("Users", &format!("op{i}"))), vec!["c"]);
        }
        assert_eq!(s.memo.as_ref().map(DashMap::len), Some(0));

        assert_eq!(tags(&s.select("Users", "get")), vec!["o", "c"]);
        assert_eq!(s.memo.as_ref().map(DashMap::len), Some(1));
    }

    #[test]
    fn declared_operations_are_sorted() {
        let s = selector(vec![], vec![tagged("o", 0)], false);
        assert_eq!(s.declared_operations(), vec![OperationId::new("Users", "get")]);
    }

    proptest! {
        #[test]
        fn selection_is_deterministic_and_stably_ordered(
            component in proptest::collection::vec(-3i32..3, 0..6),
            operation in proptest::collection::vec(-3i32..3, 0..6),
        ) {
            let component_bindings: Vec<_> = component
                .iter()
                .enumerate()
                .map(|(i, p)| tagged(&format!("c{i}"), *p))
                .collect();
            let operation_bindings: Vec<_> = operation
                .iter()
                .enumerate()
                .map(|(i, p)| tagged(&format!("o{i}"), *p))
                .collect();

            let mut expected: Vec<(i32, String)> = component
                .iter()
                .enumerate()
                .map(|(i, p)| (*p, format!("c{i}")))
                .chain(operation.iter().enumerate().map(|(i, p)| (*p, format!("o{i}"))))
                .collect();
            expected.sort_by_key(|(p, _)| *p);
            let expected: Vec<String> = expected.into_iter().map(|(_, t)| t).collect();

            let memoized = selector(component_bindings.clone(), operation_bindings.clone(), true);
            let fresh = selector(component_bindings, operation_bindings, false);

            let first = tags(&memoized.select("Users", "get"));
            let second = tags(&memoized.select("Users", "get"));
            let unmemoized = tags(&fresh.select("Users", "get"));

            prop_assert_eq!(&first, &expected);
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(&first, &unmemoized);
        }
    }
}
