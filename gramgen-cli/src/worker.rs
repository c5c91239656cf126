//! Worker-mode entry point.
//!
//! The spawned process receives exactly one generation spec on stdin, runs
//! the wrapped tool, and writes exactly one result envelope to stdout
//! before returning so the process can exit. A tool that cannot be resolved
//! or fails still yields a best-effort result with a non-zero error count;
//! only a crash of the worker itself leaves the controller without one.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info};

use gramgen_ipc::protocol::{ControllerMessage, GenerationResult, MessageEnvelope, WorkerMessage};
use gramgen_ipc::transport::{IpcTransport, StdioTransport};

use crate::tool::{CommandTool, GrammarTool, ToolError, ToolReport};

/// Top-level routine of the spawned worker process
pub async fn run_worker(worker_id: String) -> Result<()> {
    info!(worker_id = %worker_id, "worker process started");

    let mut transport = StdioTransport::new();

    let envelope: MessageEnvelope<WorkerMessage> = transport
        .receive()
        .await
        .context("failed to read generation spec from controller")?;
    let WorkerMessage::Generate {
        spec,
        correlation_id,
    } = envelope.message;

    let started_at = Utc::now();
    let result = match run_tool(&spec).await {
        Ok(report) => {
            if report.error_count == 0 {
                GenerationResult::success(started_at, Utc::now())
            } else {
                GenerationResult::with_errors(
                    report.error_count,
                    Some(report.output),
                    started_at,
                    Utc::now(),
                )
            }
        }
        Err(e) => {
            error!(worker_id = %worker_id, error = %e, "grammar tool failed");
            GenerationResult::with_errors(1, Some(e.to_string()), started_at, Utc::now())
        }
    };

    let reply = MessageEnvelope::new(ControllerMessage::GenerationComplete {
        correlation_id,
        result,
    });
    transport
        .send(&reply)
        .await
        .context("failed to report generation result")?;

    info!(worker_id = %worker_id, "worker process finished");
    Ok(())
}

async fn run_tool(spec: &gramgen_ipc::protocol::GenerationSpec) -> Result<ToolReport, ToolError> {
    let tool = CommandTool::from_env()?;
    tool.generate(spec).await
}
