//! Startup-time policy declaration and validation.
//!
//! Operations are not annotated; instead a [`PolicyRegistry`] maps component
//! names and `component.operation` identities to descriptors. `build` turns
//! every descriptor into a live policy using the supplied [`Capabilities`],
//! so configuration mistakes surface at startup rather than mid-call.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use weave_core::{OperationId, PolicyDescriptor, PolicyKind};

use super::policy::PolicyBinding;
use super::selector::PolicySelector;
use crate::adapters::{MemoryCacheStore, MonotonicStopwatchSource, TracingDiagnostics, ValidatorRegistry};
use crate::config::{EngineConfig, PolicyTable};
use crate::policies::build_policy;
use crate::traits::{CacheStore, DiagnosticSink, StopwatchSource, TransactionProvider, Validator};

// ---------------------------------------------------------------------------
// RegistrationError
// ---------------------------------------------------------------------------

/// Errors raised while declaring or building policies.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("invalid {kind} policy declared on {declared_on}: {reason}")]
    InvalidPolicyConfiguration {
        declared_on: String,
        kind: PolicyKind,
        reason: String,
    },
    #[error("invalid operation key `{key}`: expected `component.operation`")]
    InvalidOperationKey { key: String },
    #[error("failed to parse policy table: {0}")]
    Table(#[from] serde_json::Error),
    #[error("failed to read policy table: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// External collaborators handed to policies when they are built.
///
/// `Default` wires the in-process reference adapters and no transaction
/// provider.
#[derive(Clone)]
pub struct Capabilities {
    pub cache: Arc<dyn CacheStore>,
    pub validators: ValidatorRegistry,
    pub transactions: Option<Arc<dyn TransactionProvider>>,
    pub stopwatches: Arc<dyn StopwatchSource>,
    pub diagnostics: Arc<dyn DiagnosticSink>,
}

impl Capabilities {
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_validator(mut self, name: impl Into<String>, validator: Arc<dyn Validator>) -> Self {
        self.validators.register(name, validator);
        self
    }

    #[must_use]
    pub fn with_transactions(mut self, provider: Arc<dyn TransactionProvider>) -> Self {
        self.transactions = Some(provider);
        self
    }

    #[must_use]
    pub fn with_stopwatches(mut self, source: Arc<dyn StopwatchSource>) -> Self {
        self.stopwatches = source;
        self
    }

    #[must_use]
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            cache: Arc::new(MemoryCacheStore::new()),
            validators: ValidatorRegistry::new(),
            transactions: None,
            stopwatches: Arc::new(MonotonicStopwatchSource),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("validators", &self.validators)
            .field("transactions", &self.transactions.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// PolicyRegistry
// ---------------------------------------------------------------------------

/// Declaration table: which descriptors apply to which components and
/// operations, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    components: Vec<(String, PolicyDescriptor)>,
    operations: Vec<(OperationId, PolicyDescriptor)>,
}

impl PolicyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a policy for every operation of `component`.
    pub fn component(
        &mut self,
        component: impl Into<String>,
        descriptor: PolicyDescriptor,
    ) -> &mut Self {
        self.components.push((component.into(), descriptor));
        self
    }

    /// Declare a policy for one operation.
    pub fn operation(&mut self, operation: OperationId, descriptor: PolicyDescriptor) -> &mut Self {
        self.operations.push((operation, descriptor));
        self
    }

    /// Append every declaration of a policy table.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperationKey` if an operation key is not of the form
    /// `component.operation`.
    pub fn extend_from_table(&mut self, table: &PolicyTable) -> Result<&mut Self, RegistrationError> {
        for (component, descriptors) in &table.components {
            for descriptor in descriptors {
                self.component(component.clone(), descriptor.clone());
            }
        }
        for (key, descriptors) in &table.operations {
            let operation: OperationId = key
                .parse()
                .map_err(|_| RegistrationError::InvalidOperationKey { key: key.clone() })?;
            for descriptor in descriptors {
                self.operation(operation.clone(), descriptor.clone());
            }
        }
        Ok(self)
    }

    /// Registry holding exactly the declarations of `table`.
    ///
    /// # Errors
    ///
    /// See [`extend_from_table`](Self::extend_from_table).
    pub fn from_table(table: &PolicyTable) -> Result<Self, RegistrationError> {
        let mut registry = Self::new();
        registry.extend_from_table(table)?;
        Ok(registry)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len() + self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build every declared policy and produce the selector.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPolicyConfiguration` for the first descriptor that
    /// cannot be built with `capabilities`.
    pub fn build(
        &self,
        capabilities: &Capabilities,
        config: &EngineConfig,
    ) -> Result<PolicySelector, RegistrationError> {
        let mut components: HashMap<String, Vec<PolicyBinding>> = HashMap::new();
        for (component, descriptor) in &self.components {
            let policy = build_policy(descriptor, component, capabilities, config)?;
            components
                .entry(component.clone())
                .or_default()
                .push(PolicyBinding::new(descriptor.clone(), policy));
        }

        let mut operations: HashMap<OperationId, Vec<PolicyBinding>> = HashMap::new();
        for (operation, descriptor) in &self.operations {
            let policy = build_policy(descriptor, &operation.to_string(), capabilities, config)?;
            operations
                .entry(operation.clone())
                .or_default()
                .push(PolicyBinding::new(descriptor.clone(), policy));
        }

        tracing::debug!(
            components = components.len(),
            operations = operations.len(),
            declarations = self.len(),
            "policy registry built"
        );
        Ok(PolicySelector::new(
            components,
            operations,
            config.memoize_selection,
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
