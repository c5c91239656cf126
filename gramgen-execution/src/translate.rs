//! Translation of worker results into build outcomes
//!
//! The single point where a delivered (or missing) result becomes a
//! user-facing success/failure decision.

use gramgen_ipc::protocol::GenerationResult;
use thiserror::Error;

use crate::error::ExecutionError;

/// Failure outcome of a generation run, with user-facing wording
#[derive(Debug, Error)]
pub enum GenerationFailure {
    #[error("There was 1 error during grammar generation")]
    OneError,

    #[error("There were {count} errors during grammar generation")]
    ManyErrors { count: u32 },

    /// The worker never produced a usable result. Kept distinct from the
    /// tool-reported counts above.
    #[error("grammar generation worker failed: {0}")]
    Worker(#[from] ExecutionError),
}

/// Decide success or failure from a delivered result.
///
/// An error count of zero is silent success.
pub fn evaluate(result: &GenerationResult) -> Result<(), GenerationFailure> {
    match result.error_count {
        0 => Ok(()),
        1 => Err(GenerationFailure::OneError),
        count => Err(GenerationFailure::ManyErrors { count }),
    }
}

/// Translate a full run outcome, including the process-level failure paths.
pub fn translate(outcome: Result<GenerationResult, ExecutionError>) -> Result<(), GenerationFailure> {
    match outcome {
        Ok(result) => evaluate(&result),
        Err(err) => Err(GenerationFailure::Worker(err)),
    }
}
