//! Weave Core: argument values, operation identity, and inert policy descriptors.

pub mod descriptor;
pub mod messages;
pub mod operation;
pub mod types;

pub use descriptor::{PolicyDescriptor, PolicyKind, PolicySpec};
pub use operation::{OperationId, ParseOperationIdError};
pub use types::Value;
