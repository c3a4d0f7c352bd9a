//! Inert policy descriptors.
//!
//! A [`PolicyDescriptor`] names one cross-cutting policy, carries its
//! parameters, and fixes its priority. Descriptors are declared once at
//! startup (in code or in a JSON policy table) and never mutated. The engine
//! turns each descriptor into a live policy at registration time.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fieldless tag identifying which built-in policy a descriptor describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Cache,
    CacheInvalidate,
    Validate,
    IdentifierCheck,
    NullArgumentCheck,
    PerformanceTimer,
    TransactionalScope,
}

impl PolicyKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::Cache => "cache",
            PolicyKind::CacheInvalidate => "cache_invalidate",
            PolicyKind::Validate => "validate",
            PolicyKind::IdentifierCheck => "identifier_check",
            PolicyKind::NullArgumentCheck => "null_argument_check",
            PolicyKind::PerformanceTimer => "performance_timer",
            PolicyKind::TransactionalScope => "transactional_scope",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific policy parameters.
///
/// Serialized with an internal `kind` tag, e.g.
/// `{"kind": "cache", "duration_minutes": 10}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicySpec {
    /// Cache the operation result. `None` falls back to the engine default.
    Cache {
        #[serde(default)]
        duration_minutes: Option<u32>,
    },
    /// Remove the entry stored under `key` after the operation succeeds.
    CacheInvalidate { key: String },
    /// Validate record arguments with the validator registered under this name.
    Validate { validator: String },
    /// First argument must be present and, if integral, positive.
    IdentifierCheck,
    /// First argument must be present.
    NullArgumentCheck,
    /// Report invocations slower than `threshold_secs`. `None` falls back to
    /// the engine default.
    PerformanceTimer {
        #[serde(default)]
        threshold_secs: Option<u64>,
    },
    /// Run the operation inside a transactional scope.
    TransactionalScope,
}

impl PolicySpec {
    #[must_use]
    pub fn kind(&self) -> PolicyKind {
        match self {
            PolicySpec::Cache { .. } => PolicyKind::Cache,
            PolicySpec::CacheInvalidate { .. } => PolicyKind::CacheInvalidate,
            PolicySpec::Validate { .. } => PolicyKind::Validate,
            PolicySpec::IdentifierCheck => PolicyKind::IdentifierCheck,
            PolicySpec::NullArgumentCheck => PolicyKind::NullArgumentCheck,
            PolicySpec::PerformanceTimer { .. } => PolicyKind::PerformanceTimer,
            PolicySpec::TransactionalScope => PolicyKind::TransactionalScope,
        }
    }
}

/// One declared policy: what it is, how it is configured, and where it sits
/// in the chain. Lower `priority` runs first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyDescriptor {
    #[serde(flatten)]
    pub spec: PolicySpec,
    #[serde(default)]
    pub priority: i32,
}

impl PolicyDescriptor {
    #[must_use]
    pub fn new(spec: PolicySpec) -> Self {
        Self { spec, priority: 0 }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn kind(&self) -> PolicyKind {
        self.spec.kind()
    }

    #[must_use]
    pub fn cache(duration_minutes: u32) -> Self {
        Self::new(PolicySpec::Cache {
            duration_minutes: Some(duration_minutes),
        })
    }

    #[must_use]
    pub fn cache_invalidate(key: impl Into<String>) -> Self {
        Self::new(PolicySpec::CacheInvalidate { key: key.into() })
    }

    #[must_use]
    pub fn validate(validator: impl Into<String>) -> Self {
        Self::new(PolicySpec::Validate {
            validator: validator.into(),
        })
    }

    #[must_use]
    pub fn identifier_check() -> Self {
        Self::new(PolicySpec::IdentifierCheck)
    }

    #[must_use]
    pub fn null_argument_check() -> Self {
        Self::new(PolicySpec::NullArgumentCheck)
    }

    #[must_use]
    pub fn performance_timer(threshold_secs: u64) -> Self {
        Self::new(PolicySpec::PerformanceTimer {
            threshold_secs: Some(threshold_secs),
        })
    }

    #[must_use]
    pub fn transactional_scope() -> Self {
        Self::new(PolicySpec::TransactionalScope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_priority_and_kind() {
        let d = PolicyDescriptor::cache(15).with_priority(3);
        assert_eq!(d.priority, 3);
        assert_eq!(d.kind(), PolicyKind::Cache);
        assert_eq!(
            d.spec,
            PolicySpec::Cache {
                duration_minutes: Some(15)
            }
        );
    }

    #[test]
    fn deserializes_tagged_descriptor() {
        let d: PolicyDescriptor =
            serde_json::from_str(r#"{"kind": "cache_invalidate", "key": "users", "priority": 2}"#)
                .unwrap();
        assert_eq!(d, PolicyDescriptor::cache_invalidate("users").with_priority(2));
    }

    #[test]
    fn priority_and_optional_parameters_default() {
        let d: PolicyDescriptor = serde_json::from_str(r#"{"kind": "cache"}"#).unwrap();
        assert_eq!(d.priority, 0);
        assert_eq!(
            d.spec,
            PolicySpec::Cache {
                duration_minutes: None
            }
        );

        let d: PolicyDescriptor =
            serde_json::from_str(r#"{"kind": "identifier_check", "priority": -1}"#).unwrap();
        assert_eq!(d, PolicyDescriptor::identifier_check().with_priority(-1));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = serde_json::from_str::<PolicyDescriptor>(r#"{"kind": "retry"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn kind_names_match_serde_tags() {
        let kinds = [
            PolicyDescriptor::cache(1),
            PolicyDescriptor::cache_invalidate("k"),
            PolicyDescriptor::validate("v"),
            PolicyDescriptor::identifier_check(),
            PolicyDescriptor::null_argument_check(),
            PolicyDescriptor::performance_timer(1),
            PolicyDescriptor::transactional_scope(),
        ];
        for d in kinds {
            let json = serde_json::to_value(&d).unwrap();
            assert_eq!(json["kind"], d.kind().as_str());
        }
    }
}
