//! Validator implementations and the name-keyed registry the validate policy
//! resolves against.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use weave_core::Value;

use crate::traits::Validator;

// ---------------------------------------------------------------------------
// RuleValidator
// ---------------------------------------------------------------------------

type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Clone)]
enum Check {
    Required,
    MinLength(usize),
    MaxLength(usize),
    Range { min: i64, max: i64 },
    Must(Predicate),
}

#[derive(Clone)]
struct Rule {
    field: String,
    check: Check,
    message: String,
}

impl Rule {
    /// Absent fields only fail `Required` and `Must`; the bound checks skip
    /// them.
    fn passes(&self, value: Option<&Value>) -> bool {
        let value = value.unwrap_or(&Value::Null);
        match &self.check {
            Check::Required => match value {
                Value::Null => false,
                Value::String(s) => !s.trim().is_empty(),
                Value::Array(items) => !items.is_empty(),
                Value::Map(entries) => !entries.is_empty(),
                _ => true,
            },
            Check::MinLength(min) => text_len(value).map_or(true, |len| len >= *min),
            Check::MaxLength(max) => text_len(value).map_or(true, |len| len <= *max),
            Check::Range { min, max } => match value {
                Value::Int(i) => (*min..=*max).contains(i),
                #[allow(clippy::cast_precision_loss)]
                Value::Float(x) => *x >= *min as f64 && *x <= *max as f64,
                _ => true,
            },
            Check::Must(predicate) => predicate(value),
        }
    }
}

fn text_len(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// Declarative field rules for one record type, checked in declaration order.
/// Every failing rule contributes its message.
///
/// ```
/// use weave_engine::adapters::RuleValidator;
///
/// let validator = RuleValidator::new("CreateUserDto")
///     .required("email", "Email is required")
///     .max_length("name", 50, "Name is too long");
/// # let _ = validator;
/// ```
#[derive(Clone)]
pub struct RuleValidator {
    entity_type: String,
    rules: Vec<Rule>,
}

impl RuleValidator {
    #[must_use]
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            rules: Vec::new(),
        }
    }

    fn rule(mut self, field: impl Into<String>, check: Check, message: impl Into<String>) -> Self {
        self.rules.push(Rule {
            field: field.into(),
            check,
            message: message.into(),
        });
        self
    }

    /// Field must be present, non-null, and not blank or empty.
    #[must_use]
    pub fn required(self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.rule(field, Check::Required, message)
    }

    #[must_use]
    pub fn min_length(
        self,
        field: impl Into<String>,
        min: usize,
        message: impl Into<String>,
    ) -> Self {
        self.rule(field, Check::MinLength(min), message)
    }

    #[must_use]
    pub fn max_length(
        self,
        field: impl Into<String>,
        max: usize,
        message: impl Into<String>,
    ) -> Self {
        self.rule(field, Check::MaxLength(max), message)
    }

    /// Numeric field within `min..=max`.
    #[must_use]
    pub fn range(
        self,
        field: impl Into<String>,
        min: i64,
        max: i64,
        message: impl Into<String>,
    ) -> Self {
        self.rule(field, Check::Range { min, max }, message)
    }

    /// Arbitrary predicate on the field value (`Null` when absent).
    #[must_use]
    pub fn must<F>(self, field: impl Into<String>, predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.rule(field, Check::Must(Arc::new(predicate)), message)
    }
}

impl Validator for RuleValidator {
    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn validate(&self, entity: &Value) -> Vec<String> {
        self.rules
            .iter()
            .filter(|rule| !rule.passes(entity.field(&rule.field)))
            .map(|rule| rule.message.clone())
            .collect()
    }
}

impl fmt::Debug for RuleValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleValidator")
            .field("entity_type", &self.entity_type)
            .field("rules", &self.rules.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// FnValidator
// ---------------------------------------------------------------------------

/// Validator backed by a closure returning failure messages.
pub struct FnValidator<F> {
    entity_type: String,
    check: F,
}

impl<F> FnValidator<F>
where
    F: Fn(&Value) -> Vec<String> + Send + Sync,
{
    pub fn new(entity_type: impl Into<String>, check: F) -> Self {
        Self {
            entity_type: entity_type.into(),
            check,
        }
    }
}

impl<F> Validator for FnValidator<F>
where
    F: Fn(&Value) -> Vec<String> + Send + Sync,
{
    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn validate(&self, entity: &Value) -> Vec<String> {
        (self.check)(entity)
    }
}

// ---------------------------------------------------------------------------
// ValidatorRegistry
// ---------------------------------------------------------------------------

/// Validators addressable by the name a validate descriptor refers to.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: HashMap<String, Arc<dyn Validator>>,
}

impl ValidatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `validator` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, validator: Arc<dyn Validator>) {
        self.validators.insert(name.into(), validator);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Validator>> {
        self.validators.get(name).cloned()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn user(fields: Vec<(&str, Value)>) -> Value {
        Value::record("CreateUserDto", fields)
    }

    fn validator() -> RuleValidator {
        RuleValidator::new("CreateUserDto")
            .required("email", "Email is required")
            .min_length("password", 8, "Password must be at least 8 characters")
            .max_length("name", 5, "Name is too long")
            .range("age", 18, 130, "Age must be between 18 and 130")
            .must(
                "email",
                |v| v.as_str().map_or(true, |s| s.contains('@')),
                "Email is invalid",
            )
    }

    #[test]
    fn valid_entity_has_no_messages() {
        let entity = user(vec![
            ("email", Value::from("a@b.c")),
            ("password", Value::from("longenough")),
            ("name", Value::from("Ada")),
            ("age", Value::Int(36)),
        ]);
        assert!(validator().validate(&entity).is_empty());
    }

    #[test]
    fn every_failing_rule_reports_in_declaration_order() {
        let entity = user(vec![
            ("email", Value::from("   ")),
            ("password", Value::from("short")),
            ("name", Value::from("Grace Hopper")),
            ("age", Value::Int(7)),
        ]);
        assert_eq!(
            validator().validate(&entity),
            vec![
                "Email is required",
                "Password must be at least 8 characters",
                "Name is too long",
                "Age must be between 18 and 130",
                "Email is invalid",
            ]
        );
    }

    #[test]
    fn absent_fields_only_fail_required() {
        assert_eq!(validator().validate(&user(vec![])), vec!["Email is required"]);
    }

    #[test]
    fn range_accepts_floats_within_bounds() {
        let v = RuleValidator::new("T").range("score", 0, 10, "out of range");
        assert!(v.validate(&Value::record("T", [("score", Value::Float(9.5))])).is_empty());
        assert_eq!(
            v.validate(&Value::record("T", [("score", Value::Float(10.5))])),
            vec!["out of range"]
        );
    }

    #[test]
    fn registry_resolves_by_name() {
        let mut registry = ValidatorRegistry::new();
        registry.register("UserValidator", Arc::new(validator()));
        registry.register(
            "AlwaysValid",
            Arc::new(FnValidator::new("Anything", |_| Vec::new())),
        );

        assert_eq!(registry.names(), vec!["AlwaysValid", "UserValidator"]);
        assert_eq!(
            registry.get("UserValidator").map(|v| v.entity_type().to_string()),
            Some("CreateUserDto".to_string())
        );
        assert!(registry.get("Missing").is_none());
    }
}
