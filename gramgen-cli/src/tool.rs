//! Invocation of the wrapped grammar compiler.
//!
//! The worker resolves the tool from the classpath the supervisor handed
//! over in its environment. The tool is third-party code: its output is
//! parsed and its failures are counted, nothing is assumed about its
//! internals.

use std::env;
use std::ffi::OsStr;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use gramgen_execution::supervisor::TOOL_PATH_ENV;
use gramgen_ipc::protocol::GenerationSpec;

/// Environment variable naming the tool executable inside the tool path
pub const TOOL_BIN_ENV: &str = "GRAMGEN_TOOL_BIN";
/// Heap bound exported to the tool's own launcher
pub const TOOL_MAX_HEAP_ENV: &str = "GRAMGEN_TOOL_MAX_HEAP";

const DEFAULT_TOOL_BIN: &str = "antlr4";

/// Errors from resolving or running the wrapped tool
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("grammar tool '{0}' not found in tool path")]
    ToolNotFound(String),

    #[error("tool path is not set in the worker environment")]
    ToolPathMissing,

    #[error("failed to run grammar tool: {0}")]
    Io(#[from] std::io::Error),
}

/// What the tool reported for one run
#[derive(Debug, Clone)]
pub struct ToolReport {
    pub error_count: u32,
    pub output: String,
}

/// A wrapped grammar compiler the worker can drive
#[async_trait]
pub trait GrammarTool: Send + Sync {
    async fn generate(&self, spec: &GenerationSpec) -> Result<ToolReport, ToolError>;
}

/// Runs the tool as an external command and counts its diagnostics
pub struct CommandTool {
    program: PathBuf,
}

impl CommandTool {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }

    /// Resolve the tool executable from the environment the supervisor
    /// constructed for this worker.
    pub fn from_env() -> Result<Self, ToolError> {
        let search_path = env::var_os(TOOL_PATH_ENV).ok_or(ToolError::ToolPathMissing)?;
        let bin = env::var(TOOL_BIN_ENV).unwrap_or_else(|_| DEFAULT_TOOL_BIN.to_string());
        resolve_tool(&search_path, &bin).map(Self::new)
    }
}

fn resolve_tool(search_path: &OsStr, bin: &str) -> Result<PathBuf, ToolError> {
    for dir in env::split_paths(search_path) {
        let candidate = dir.join(bin);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(ToolError::ToolNotFound(bin.to_string()))
}

#[async_trait]
impl GrammarTool for CommandTool {
    async fn generate(&self, spec: &GenerationSpec) -> Result<ToolReport, ToolError> {
        debug!(
            program = %self.program.display(),
            argument_count = spec.arguments.len(),
            "invoking grammar tool"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&spec.arguments)
            .env(TOOL_MAX_HEAP_ENV, &spec.max_heap_size)
            .stdin(std::process::Stdio::null());
        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);

        let mut error_count = count_diagnostics(&stderr);
        if error_count == 0 && !output.status.success() {
            // Non-zero exit with no parsed diagnostics still counts as one
            // failure.
            warn!(status = %output.status, "grammar tool exited abnormally without diagnostics");
            error_count = 1;
        }

        let mut combined = String::new();
        if !stdout.trim().is_empty() {
            combined.push_str(stdout.trim());
        }
        if !stderr.trim().is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(stderr.trim());
        }

        Ok(ToolReport {
            error_count,
            output: combined,
        })
    }
}

/// Count error diagnostics in the tool's stderr stream.
///
/// Matches both `error(NNN):` (ANTLR 4 style) and plain `error:` prefixes.
fn count_diagnostics(stderr: &str) -> u32 {
    stderr
        .lines()
        .filter(|line| {
            let line = line.trim_start();
            line.starts_with("error(") || line.starts_with("error:")
        })
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_diagnostics() {
        assert_eq!(count_diagnostics(""), 0);
        assert_eq!(count_diagnostics("warning(125): A.g4: implicit token\n"), 0);
        assert_eq!(
            count_diagnostics("error(50): A.g4:1:0: syntax error\nerror(50): A.g4:2:0: syntax error\n"),
            2
        );
        assert_eq!(count_diagnostics("error: cannot open grammar\n"), 1);
        assert_eq!(count_diagnostics("  error(99): indented diagnostic\n"), 1);
        assert_eq!(count_diagnostics("note: an error occurred earlier\n"), 0);
    }

    #[test]
    fn test_resolve_tool_finds_the_first_match() {
        let empty = tempfile::tempdir().unwrap();
        let populated = tempfile::tempdir().unwrap();
        let tool = populated.path().join("fakegen");
        std::fs::write(&tool, b"#!/bin/sh\n").unwrap();

        let search_path =
            env::join_paths([empty.path(), populated.path()]).unwrap();
        let resolved = resolve_tool(&search_path, "fakegen").unwrap();
        assert_eq!(resolved, tool);
    }

    #[test]
    fn test_resolve_tool_reports_missing_binaries() {
        let dir = tempfile::tempdir().unwrap();
        let search_path = env::join_paths([dir.path()]).unwrap();
        let err = resolve_tool(&search_path, "fakegen").unwrap_err();
        assert!(matches!(err, ToolError::ToolNotFound(name) if name == "fakegen"));
    }
}
