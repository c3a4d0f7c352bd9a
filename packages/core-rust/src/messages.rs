//! User-facing failure messages raised by the built-in policies.

/// First argument of a model-taking operation was absent.
pub const REQUIRED_MODEL: &str = "A model must be provided.";

/// Identifier argument was absent.
pub const NOT_EMPTY_ID: &str = "Id value cannot be empty.";

/// Identifier argument was zero or negative.
pub const ID_GREATER_THAN_ZERO: &str = "Id value must be greater than zero.";

/// A validate policy referenced something that is not a registered validator.
pub const INVALID_VALIDATION_CLASS: &str = "This is not a validation class.";

/// Separator between individual validation messages.
pub const VALIDATION_SEPARATOR: &str = " - ";

/// Text substituted for null arguments when building cache keys.
pub const NULL_KEY_SENTINEL: &str = "<Null>";
