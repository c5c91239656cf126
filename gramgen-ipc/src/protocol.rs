//! IPC protocol definitions and message types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// IPC protocol version for compatibility checking
pub const IPC_PROTOCOL_VERSION: u32 = 1;

/// Immutable description of one grammar-generation run.
///
/// Built once by the controller and handed to the worker when it is spawned.
/// The worker never sees any other controller state: this value and the
/// environment the supervisor constructs are its whole world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSpec {
    /// Ordered arguments for the wrapped tool
    pub arguments: Vec<String>,
    /// Maximum heap size for the wrapped tool, e.g. "1g"
    pub max_heap_size: String,
    /// Working directory for the tool invocation; the worker's own working
    /// directory when absent
    pub working_dir: Option<PathBuf>,
}

impl GenerationSpec {
    /// Create a new generation spec
    pub fn new(arguments: Vec<String>, max_heap_size: impl Into<String>) -> Self {
        Self {
            arguments,
            max_heap_size: max_heap_size.into(),
            working_dir: None,
        }
    }

    /// Override the directory the tool runs in
    pub fn with_working_dir(mut self, working_dir: PathBuf) -> Self {
        self.working_dir = Some(working_dir);
        self
    }
}

/// Outcome of one tool run.
///
/// Created exactly once, inside the worker, after the tool finishes. An
/// error count of zero means the generation succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub error_count: u32,
    pub error_output: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i32,
}

impl GenerationResult {
    /// Create a clean result
    pub fn success(started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> Self {
        let duration_ms = (completed_at - started_at).num_milliseconds() as i32;
        Self {
            error_count: 0,
            error_output: None,
            started_at,
            completed_at,
            duration_ms,
        }
    }

    /// Create a result carrying tool diagnostics
    pub fn with_errors(
        error_count: u32,
        error_output: Option<String>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let duration_ms = (completed_at - started_at).num_milliseconds() as i32;
        Self {
            error_count,
            error_output,
            started_at,
            completed_at,
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_count == 0
    }
}

/// Messages sent from the controller to the worker process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// Run the grammar tool described by the spec
    Generate {
        spec: GenerationSpec,
        correlation_id: Uuid,
    },
}

/// Messages sent from the worker process back to the controller.
///
/// Exactly one instance flows per worker lifetime; the one-shot discipline
/// is enforced by the result channel on the controller side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerMessage {
    /// The tool ran to completion and reported its diagnostic count
    GenerationComplete {
        correlation_id: Uuid,
        result: GenerationResult,
    },
}

/// Message envelope for all IPC communications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope<T> {
    pub protocol_version: u32,
    pub timestamp: DateTime<Utc>,
    pub message: T,
}

impl<T> MessageEnvelope<T> {
    /// Create a new message envelope
    pub fn new(message: T) -> Self {
        Self {
            protocol_version: IPC_PROTOCOL_VERSION,
            timestamp: Utc::now(),
            message,
        }
    }

    /// Check if protocol version is compatible
    pub fn is_compatible(&self) -> bool {
        self.protocol_version == IPC_PROTOCOL_VERSION
    }
}
