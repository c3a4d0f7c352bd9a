//! Engine configuration and the JSON policy table.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use weave_core::PolicyDescriptor;

use crate::intercept::RegistrationError;

/// Engine-level defaults applied when policies are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cache duration for cache policies declared without one.
    pub default_cache_minutes: u32,
    /// Slow-invocation threshold for timers declared without one.
    pub default_slow_threshold_secs: u64,
    /// Keep each resolved policy chain for the selector's lifetime.
    pub memoize_selection: bool,
    /// `EnvFilter` directives used when neither the host nor `RUST_LOG`
    /// supplies any.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_cache_minutes: 10,
            default_slow_threshold_secs: 5,
            memoize_selection: true,
            log_filter: "info,weave_engine=debug".to_string(),
        }
    }
}

impl EngineConfig {
    /// Reads a JSON config file; absent fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::Io` if the file cannot be read and
    /// `RegistrationError::Table` if it is not valid JSON for this struct.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistrationError> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }
}

/// Declarative policy assignments, usually loaded from JSON:
///
/// ```json
/// {
///   "components": { "UserService": [ { "kind": "performance_timer", "threshold_secs": 2 } ] },
///   "operations": {
///     "UserService.get_by_id": [
///       { "kind": "identifier_check", "priority": 1 },
///       { "kind": "cache", "duration_minutes": 10, "priority": 2 }
///     ]
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyTable {
    /// Component name to descriptors applied to all of its operations.
    pub components: BTreeMap<String, Vec<PolicyDescriptor>>,
    /// `component.operation` to descriptors for that operation only.
    pub operations: BTreeMap<String, Vec<PolicyDescriptor>>,
}

impl PolicyTable {
    /// # Errors
    ///
    /// Returns `RegistrationError::Table` if `json` is not a valid table.
    pub fn from_json_str(json: &str) -> Result<Self, RegistrationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// Returns `RegistrationError::Io` if the file cannot be read and
    /// `RegistrationError::Table` if it cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistrationError> {
        let path = path.as_ref();
        let table = Self::from_json_str(&std::fs::read_to_string(path)?)?;
        tracing::info!(
            path = %path.display(),
            components = table.components.len(),
            operations = table.operations.len(),
            "policy table loaded"
        );
        Ok(table)
    }

    /// # Errors
    ///
    /// Returns `RegistrationError::Table` if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, RegistrationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use weave_core::PolicySpec;

    use super::*;

    #[test]
    fn engine_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_cache_minutes, 10);
        assert_eq!(config.default_slow_threshold_secs, 5);
        assert!(config.memoize_selection);
        assert_eq!(config.log_filter, "info,weave_engine=debug");
    }

    #[test]
    fn config_file_overrides_only_given_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "default_cache_minutes": 3, "log_filter": "warn,weave_engine=trace" }}"#
        )
        .unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.default_cache_minutes, 3);
        assert_eq!(config.log_filter, "warn,weave_engine=trace");
        assert!(config.memoize_selection);
        assert_eq!(config.default_slow_threshold_secs, 5);
    }

    #[test]
    fn loads_table_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "operations": {{ "Orders.place": [ {{ "kind": "transactional_scope", "priority": 4 }} ] }} }}"#
        )
        .unwrap();

        let table = PolicyTable::load(file.path()).unwrap();
        assert!(table.components.is_empty());
        let descriptors = &table.operations["Orders.place"];
        assert_eq!(descriptors[0].spec, PolicySpec::TransactionalScope);
        assert_eq!(descriptors[0].priority, 4);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PolicyTable::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, RegistrationError::Io(_)));
    }

    #[test]
    fn unknown_kind_is_a_table_error() {
        let err = PolicyTable::from_json_str(
            r#"{ "components": { "C": [ { "kind": "retry" } ] } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, RegistrationError::Table(_)));
    }

    #[test]
    fn pretty_json_reloads_identically() {
        let mut table = PolicyTable::default();
        table.components.insert(
            "UserService".into(),
            vec![PolicyDescriptor::performance_timer(2)],
        );
        table.operations.insert(
            "UserService.update".into(),
            vec![PolicyDescriptor::cache_invalidate("UserService.get_all()").with_priority(3)],
        );
        let json = table.to_json_pretty().unwrap();
        assert_eq!(PolicyTable::from_json_str(&json).unwrap(), table);
    }
}
