//! Inter-process communication for gramgen
//!
//! This crate defines the wire contract between the controlling build step
//! and the grammar-generation worker process: one spec in, one result out,
//! carried as newline-delimited JSON envelopes over the worker's stdio.

pub mod channel;
pub mod error;
pub mod protocol;
pub mod transport;

// Re-export commonly used types
pub use channel::{result_channel, ChannelError, ResultReceiver, ResultSender};
pub use error::IpcError;
pub use protocol::{
    ControllerMessage, GenerationResult, GenerationSpec, MessageEnvelope, WorkerMessage,
    IPC_PROTOCOL_VERSION,
};
pub use transport::{ChildProcessTransport, IpcTransport, StdioTransport};
