use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stable identity of an intercepted operation: owning component plus
/// operation name. Renders as `component.operation`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationId {
    pub component: String,
    pub name: String,
}

impl OperationId {
    #[must_use]
    pub fn new(component: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.name)
    }
}

/// Error from parsing a `component.operation` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOperationIdError(pub String);

impl fmt::Display for ParseOperationIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected `component.operation`, got `{}`", self.0)
    }
}

impl std::error::Error for ParseOperationIdError {}

/// Splits at the last `.` so that namespaced components such as
/// `billing.InvoiceService.create` keep their full component path.
impl FromStr for OperationId {
    type Err = ParseOperationIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('.') {
            Some((component, name)) if !component.is_empty() && !name.is_empty() => {
                Ok(Self::new(component, name))
            }
            _ => Err(ParseOperationIdError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_component_and_name() {
        let op = OperationId::new("UserService", "get_by_id");
        assert_eq!(op.to_string(), "UserService.get_by_id");
    }

    #[test]
    fn parse_splits_at_last_dot() {
        let op: OperationId = "billing.InvoiceService.create".parse().unwrap();
        assert_eq!(op.component, "billing.InvoiceService");
        assert_eq!(op.name, "create");
    }

    #[test]
    fn parse_rejects_missing_parts() {
        assert!("nodot".parse::<OperationId>().is_err());
        assert!(".op".parse::<OperationId>().is_err());
        assert!("Comp.".parse::<OperationId>().is_err());
    }
}
