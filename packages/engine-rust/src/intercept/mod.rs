//! Interception core: declaring policies, selecting them per operation, and
//! running them around an operation body.
//!
//! - [`registry`]: startup declarations and policy construction
//! - [`selector`]: ordered, memoized chain per operation
//! - [`pipeline`]: the before / body / success | exception / after lifecycle
//! - [`weaver`]: closure-based entry point
//! - [`layer`]: tower `Layer` for `Service<Invocation>`

pub mod invocation;
pub mod layer;
pub mod pipeline;
pub mod policy;
pub mod registry;
pub mod selector;
pub mod weaver;

pub use invocation::{
    BodyFuture, Completion, Invocation, InvocationContext, OperationError, Outcome, ResultSource,
    Stage,
};
pub use layer::{InterceptLayer, InterceptService};
pub use pipeline::InterceptionPipeline;
pub use policy::{Flow, InvocationHooks, Policy, PolicyBinding, PolicyChain};
pub use registry::{Capabilities, PolicyRegistry, RegistrationError};
pub use selector::PolicySelector;
pub use weaver::Weaver;
