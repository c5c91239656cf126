//! Worker process supervision for grammar generation
//!
//! One invocation means one worker process: the supervisor spawns it with a
//! purpose-built environment, hands it the generation spec, blocks until it
//! terminates and collects the single result it reported. There is no pool,
//! no reuse and no retry; a deadline, if wanted, is the caller's policy
//! (wrap [`WorkerSupervisor::run`] in `tokio::time::timeout`).

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, error, warn};
use uuid::Uuid;

use gramgen_ipc::channel::{result_channel, ResultSender};
use gramgen_ipc::protocol::{
    ControllerMessage, GenerationResult, GenerationSpec, MessageEnvelope, WorkerMessage,
};
use gramgen_ipc::transport::{ChildProcessTransport, IpcTransport};
use gramgen_ipc::IpcError;

use crate::error::ExecutionError;

/// Environment variable carrying the tool classpath to the worker
pub const TOOL_PATH_ENV: &str = "GRAMGEN_TOOL_PATH";

/// Configuration for spawned worker processes
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Base name used for worker ids and log lines
    pub base_name: String,
    /// Environment variables the worker inherits from the controller.
    /// Everything else is dropped: the worker observes only this set plus
    /// the variables the supervisor writes itself.
    pub shared_env: Vec<String>,
    /// Additional variables written into the worker environment verbatim
    pub extra_env: Vec<(String, String)>,
    /// Worker executable; the current executable re-invoked in worker mode
    /// when unset
    pub worker_program: Option<PathBuf>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            base_name: "gramgen-worker".to_string(),
            shared_env: ["PATH", "HOME", "TMPDIR", "RUST_LOG"]
                .iter()
                .map(|name| name.to_string())
                .collect(),
            extra_env: Vec::new(),
            worker_program: None,
        }
    }
}

/// Lifecycle of a single supervised invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Created,
    Spawning,
    Running,
    CompletedWithResult,
    TerminatedAbnormally,
}

/// Runs grammar generation in an isolated worker process
pub struct WorkerSupervisor {
    config: SupervisorConfig,
}

impl WorkerSupervisor {
    /// Create a new supervisor
    pub fn new(config: SupervisorConfig) -> Self {
        Self { config }
    }

    /// Create a supervisor with default configuration
    pub fn with_defaults() -> Self {
        Self::new(SupervisorConfig::default())
    }

    /// Run the tool described by `spec` in a fresh worker process.
    ///
    /// Blocks until the worker terminates. A worker that exits without
    /// reporting yields [`ExecutionError::AbnormalTermination`], which is
    /// kept distinct from any tool-reported error count.
    pub async fn run(
        &self,
        working_dir: &Path,
        tool_classpath: &[PathBuf],
        spec: GenerationSpec,
    ) -> Result<GenerationResult, ExecutionError> {
        let worker_id = format!("{}-{}", self.config.base_name, Uuid::new_v4());
        let mut state = WorkerState::Created;
        debug!(worker_id = %worker_id, state = ?state, "supervising generation run");

        state = WorkerState::Spawning;
        let mut child = self.spawn_worker(&worker_id, working_dir, tool_classpath)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ExecutionError::SpawnFailure("worker stdin not piped".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecutionError::SpawnFailure("worker stdout not piped".to_string()))?;

        // The receiving endpoint is wired up before the spec (the start
        // signal) goes out, so even an instantly-reporting worker cannot be
        // missed.
        let (result_tx, result_rx) = result_channel();
        let correlation_id = Uuid::new_v4();
        let transport = ChildProcessTransport::new(stdin, stdout);
        let courier = tokio::spawn(drive_worker_connection(
            transport,
            spec,
            correlation_id,
            result_tx,
        ));

        state = WorkerState::Running;
        debug!(worker_id = %worker_id, state = ?state, "worker started");

        let status = child.wait().await?;
        if let Err(join_err) = courier.await {
            warn!(worker_id = %worker_id, error = %join_err, "worker courier task failed");
        }

        match result_rx.receive().await {
            Ok(result) => {
                state = WorkerState::CompletedWithResult;
                if !status.success() {
                    warn!(worker_id = %worker_id, status = %status, "worker exited non-zero after reporting");
                }
                debug!(
                    worker_id = %worker_id,
                    state = ?state,
                    error_count = result.error_count,
                    "worker reported result"
                );
                Ok(result)
            }
            Err(_) => {
                state = WorkerState::TerminatedAbnormally;
                error!(
                    worker_id = %worker_id,
                    state = ?state,
                    status = %status,
                    "worker terminated without reporting a result"
                );
                Err(ExecutionError::AbnormalTermination {
                    status: status.to_string(),
                })
            }
        }
    }

    fn spawn_worker(
        &self,
        worker_id: &str,
        working_dir: &Path,
        tool_classpath: &[PathBuf],
    ) -> Result<Child, ExecutionError> {
        std::fs::create_dir_all(working_dir).map_err(|e| {
            ExecutionError::SpawnFailure(format!(
                "working directory {} is not usable: {}",
                working_dir.display(),
                e
            ))
        })?;

        let program = match &self.config.worker_program {
            Some(path) => path.clone(),
            None => std::env::current_exe().map_err(|e| {
                ExecutionError::SpawnFailure(format!("failed to locate worker executable: {}", e))
            })?,
        };

        let tool_path = std::env::join_paths(tool_classpath).map_err(|e| {
            ExecutionError::SpawnFailure(format!("invalid tool classpath: {}", e))
        })?;

        let mut cmd = Command::new(&program);
        cmd.arg("--worker")
            .arg("--worker-id")
            .arg(worker_id)
            .current_dir(working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        // The worker environment is built from scratch; controller and
        // worker share only the declared allow-list and the serialized
        // spec/result values.
        cmd.env_clear();
        for name in &self.config.shared_env {
            if let Some(value) = std::env::var_os(name) {
                cmd.env(name, value);
            }
        }
        for (name, value) in &self.config.extra_env {
            cmd.env(name, value);
        }
        cmd.env(TOOL_PATH_ENV, &tool_path);

        cmd.spawn().map_err(|e| {
            ExecutionError::SpawnFailure(format!("failed to spawn worker process: {}", e))
        })
    }
}

/// Owns the child transport for one invocation: ships the spec (the start
/// signal) and forwards every result message into the one-shot channel.
async fn drive_worker_connection(
    mut transport: ChildProcessTransport,
    spec: GenerationSpec,
    correlation_id: Uuid,
    result_tx: ResultSender<GenerationResult>,
) {
    let envelope = MessageEnvelope::new(WorkerMessage::Generate {
        spec,
        correlation_id,
    });
    if let Err(e) = transport.send(&envelope).await {
        // Dropping the sender surfaces upstream as abnormal termination.
        error!(error = %e, "failed to hand the spec to the worker");
        return;
    }

    loop {
        match transport.receive::<ControllerMessage>().await {
            Ok(envelope) => {
                let ControllerMessage::GenerationComplete {
                    correlation_id: received,
                    result,
                } = envelope.message;
                if received != correlation_id {
                    warn!(
                        expected = %correlation_id,
                        received = %received,
                        "result correlation id mismatch"
                    );
                }
                if let Err(e) = result_tx.send(result) {
                    // At most one result may flow per worker lifetime.
                    error!(error = %e, "worker violated the single-result protocol");
                }
            }
            Err(IpcError::ConnectionClosed) => break,
            Err(e) => {
                warn!(error = %e, "failed to read worker message");
                break;
            }
        }
    }
}
