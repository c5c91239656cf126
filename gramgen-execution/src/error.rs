//! Error types for worker supervision

use gramgen_ipc::channel::ChannelError;
use gramgen_ipc::IpcError;
use thiserror::Error;

/// Errors raised while supervising a generation worker.
///
/// Every variant is fatal for the invocation that raised it and propagates
/// as an explicit failure; none of them is ever folded into a zero-error
/// result.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The worker process could not be started at all
    #[error("failed to start grammar generation worker: {0}")]
    SpawnFailure(String),

    /// The worker exited without ever delivering a result
    #[error("grammar generation worker terminated abnormally ({status}) without reporting a result")]
    AbnormalTermination { status: String },

    /// More than one result arrived over a single-shot channel
    #[error("worker result protocol violated: {0}")]
    ChannelProtocolViolation(#[from] ChannelError),

    /// Transport-level failure talking to the worker
    #[error("worker IPC failure: {0}")]
    Ipc(#[from] IpcError),

    /// IO failure around the worker lifecycle
    #[error("worker IO failure: {0}")]
    Io(#[from] std::io::Error),
}
