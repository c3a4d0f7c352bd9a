//! Built-in policies and the factory that builds them from descriptors.

pub mod cache;
pub mod guards;
pub mod performance;
pub mod transaction;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use weave_core::messages::INVALID_VALIDATION_CLASS;
use weave_core::{PolicyDescriptor, PolicySpec};

pub use cache::{cache_key, CacheInvalidatePolicy, CachePolicy};
pub use guards::{IdentifierCheckPolicy, NullArgumentCheckPolicy};
pub use performance::PerformanceTimerPolicy;
pub use transaction::TransactionalScopePolicy;
pub use validation::ValidatePolicy;

use crate::config::EngineConfig;
use crate::intercept::{Capabilities, Policy, RegistrationError};

/// Build the live policy for `descriptor`.
///
/// `declared_on` names the component or operation the descriptor was declared
/// for and is only used in error reports.
///
/// # Errors
///
/// Returns `InvalidPolicyConfiguration` when the descriptor's parameters are
/// unusable or a capability it needs is missing.
pub fn build_policy(
    descriptor: &PolicyDescriptor,
    declared_on: &str,
    capabilities: &Capabilities,
    config: &EngineConfig,
) -> Result<Arc<dyn Policy>, RegistrationError> {
    let invalid = |reason: String| RegistrationError::InvalidPolicyConfiguration {
        declared_on: declared_on.to_string(),
        kind: descriptor.kind(),
        reason,
    };

    let policy: Arc<dyn Policy> = match &descriptor.spec {
        PolicySpec::Cache { duration_minutes } => {
            let minutes = duration_minutes.unwrap_or(config.default_cache_minutes);
            if minutes == 0 {
                return Err(invalid("cache duration must be at least one minute".into()));
            }
            Arc::new(CachePolicy::new(Arc::clone(&capabilities.cache), minutes))
        }
        PolicySpec::CacheInvalidate { key } => {
            if key.is_empty() {
                return Err(invalid("invalidation key must not be empty".into()));
            }
            Arc::new(CacheInvalidatePolicy::new(
                Arc::clone(&capabilities.cache),
                key.clone(),
            ))
        }
        PolicySpec::Validate { validator } => {
            let Some(found) = capabilities.validators.get(validator) else {
                return Err(invalid(format!(
                    "{INVALID_VALIDATION_CLASS} (no validator registered as `{validator}`)"
                )));
            };
            if found.entity_type().is_empty() {
                return Err(invalid(format!(
                    "{INVALID_VALIDATION_CLASS} (`{validator}` declares no entity type)"
                )));
            }
            Arc::new(ValidatePolicy::new(found))
        }
        PolicySpec::IdentifierCheck => Arc::new(IdentifierCheckPolicy),
        PolicySpec::NullArgumentCheck => Arc::new(NullArgumentCheckPolicy),
        PolicySpec::PerformanceTimer { threshold_secs } => {
            let secs = threshold_secs.unwrap_or(config.default_slow_threshold_secs);
            Arc::new(PerformanceTimerPolicy::new(
                Duration::from_secs(secs),
                Arc::clone(&capabilities.stopwatches),
                Arc::clone(&capabilities.diagnostics),
            ))
        }
        PolicySpec::TransactionalScope => {
            let Some(provider) = &capabilities.transactions else {
                return Err(invalid("no transaction provider is configured".into()));
            };
            Arc::new(TransactionalScopePolicy::new(Arc::clone(provider)))
        }
    };

    tracing::trace!(policy = policy.name(), declared_on, "policy built");
    Ok(policy)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
