//! Hiro Runtime - asynchronous test-suite runner
//!
//! This library provides:
//! - A lifecycle event bus (`hiro.*`, `suite.*`, `test.*` events)
//! - A failure boundary that turns errors and panics into reported values
//! - Suites composed from mixins, with async setup hooks and sandboxes
//! - A polling scheduler that runs suites one after another
//! - A console reporter driven purely by events

/// Hiro runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Public API modules
pub mod async_runtime;
pub mod boundary;
pub mod error;
pub mod events;
pub mod registry;
pub mod reporter;
pub mod runtime;
pub mod scheduler;
pub mod status;
pub mod suite;

// Re-export commonly used types
pub use boundary::{
    attempt, attempt_async, attempt_value, attempt_with, ensure, extract_stack, get_location,
    Failure, SourceLocation,
};
pub use error::{HiroError, HiroResult};
pub use events::{listener, Event, EventBus, EventName, Listener};
pub use registry::{ModuleDefinition, Registry};
pub use reporter::{ConsoleReporter, FailureRecord, RunSummary};
pub use runtime::Hiro;
pub use scheduler::{Scheduler, SchedulerConfig};
pub use status::Status;
pub use suite::{
    Method, MethodSet, Report, Sandbox, Suite, SuiteContext, SuiteReport, Test, TestOutcome,
    TestResult,
};
