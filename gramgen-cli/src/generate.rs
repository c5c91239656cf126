//! The generate command: assembles the tool argument list, runs the worker
//! and translates its result into a build outcome.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use gramgen_execution::supervisor::{SupervisorConfig, WorkerSupervisor};
use gramgen_execution::translate;
use gramgen_ipc::protocol::GenerationSpec;

use crate::tool::TOOL_BIN_ENV;

/// One grammar-generation build step
pub struct GenerateTask {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub trace: bool,
    pub trace_lexer: bool,
    pub trace_parser: bool,
    pub trace_tree_walker: bool,
    pub arguments: Vec<String>,
    pub max_heap_size: String,
    pub tool_path: Vec<PathBuf>,
    pub tool_bin: String,
    pub working_dir: Option<PathBuf>,
}

impl GenerateTask {
    /// Finalize the argument list handed to the grammar tool.
    ///
    /// Order: output directory, custom arguments, trace flags not already
    /// given explicitly, then every file in the source directory.
    pub fn build_arguments(&self) -> Result<Vec<String>> {
        let mut args = Vec::new();

        args.push("-o".to_string());
        args.push(self.output_dir.display().to_string());

        args.extend(self.arguments.iter().cloned());

        for (enabled, flag) in [
            (self.trace, "-trace"),
            (self.trace_lexer, "-traceLexer"),
            (self.trace_parser, "-traceParser"),
            (self.trace_tree_walker, "-traceTreeWalker"),
        ] {
            if enabled && !self.arguments.iter().any(|arg| arg == flag) {
                args.push(flag.to_string());
            }
        }

        let mut sources = Vec::new();
        let entries = fs::read_dir(&self.source_dir).with_context(|| {
            format!("failed to read source directory {}", self.source_dir.display())
        })?;
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                sources.push(entry.path().display().to_string());
            }
        }
        sources.sort();
        args.extend(sources);

        Ok(args)
    }

    /// Run the generation in a worker process and translate the outcome.
    pub async fn run(&self) -> Result<()> {
        let arguments = self.build_arguments()?;
        debug!(arguments = ?arguments, "finalized tool arguments");
        info!(
            source_dir = %self.source_dir.display(),
            output_dir = %self.output_dir.display(),
            "starting grammar generation"
        );

        let spec = GenerationSpec::new(arguments, self.max_heap_size.clone());

        let mut config = SupervisorConfig::default();
        config
            .extra_env
            .push((TOOL_BIN_ENV.to_string(), self.tool_bin.clone()));
        let supervisor = WorkerSupervisor::new(config);

        let working_dir = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("failed to resolve current directory")?,
        };

        let outcome = supervisor.run(&working_dir, &self.tool_path, spec).await;
        translate::translate(outcome)?;

        info!("grammar generation finished");
        Ok(())
    }
}
