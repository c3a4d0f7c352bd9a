//! Weave Engine: declarative method interception.
//!
//! Operations are wrapped by an ordered chain of cross-cutting policies
//! (argument guards, validation, caching, cache invalidation, timing,
//! transactional scope). Chains are declared once at startup through a
//! [`PolicyRegistry`] or a JSON [`PolicyTable`], resolved per operation by the
//! [`PolicySelector`], and executed around each call by the
//! [`InterceptionPipeline`]. [`Weaver`] and [`InterceptLayer`] are the two
//! entry points for application code.

pub mod adapters;
pub mod config;
pub mod intercept;
pub mod logging;
pub mod policies;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use config::{EngineConfig, PolicyTable};
pub use intercept::{
    Capabilities, Completion, Flow, InterceptLayer, InterceptService, InterceptionPipeline,
    Invocation, InvocationContext, InvocationHooks, OperationError, Policy, PolicyChain,
    PolicyRegistry, PolicySelector, RegistrationError, Weaver,
};
pub use weave_core::{OperationId, PolicyDescriptor, PolicyKind, PolicySpec, Value};
