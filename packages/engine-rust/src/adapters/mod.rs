//! In-process reference implementations of the capability traits.

pub mod diagnostics;
pub mod memory_cache;
pub mod stopwatch;
pub mod validators;

pub use diagnostics::TracingDiagnostics;
pub use memory_cache::MemoryCacheStore;
pub use stopwatch::{MonotonicStopwatch, MonotonicStopwatchSource};
pub use validators::{FnValidator, RuleValidator, ValidatorRegistry};
