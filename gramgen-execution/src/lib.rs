//! Worker-process execution engine for gramgen
//!
//! This crate owns the controller side of the generation protocol: spawning
//! one isolated worker per invocation, collecting the single result it
//! reports, and translating that result into a build outcome.

pub mod error;
pub mod supervisor;
pub mod translate;

// Re-export main types
pub use error::ExecutionError;
pub use supervisor::{SupervisorConfig, WorkerState, WorkerSupervisor, TOOL_PATH_ENV};
pub use translate::{evaluate, translate, GenerationFailure};
