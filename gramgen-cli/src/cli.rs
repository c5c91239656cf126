//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Run as worker process (internal use)
    #[arg(long, hide = true)]
    pub worker: bool,

    /// Worker ID (used with --worker)
    #[arg(long, value_name = "ID", hide = true)]
    pub worker_id: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate parser sources from a directory of grammar files
    Generate {
        /// Directory containing the grammar files; every file in it is
        /// passed to the tool
        #[arg(long, value_name = "PATH")]
        source_dir: PathBuf,

        /// Directory the generated sources are written into
        #[arg(long, value_name = "PATH")]
        output_dir: PathBuf,

        /// Have all rules call traceIn/traceOut
        #[arg(long)]
        trace: bool,

        /// Have all lexer rules call traceIn/traceOut
        #[arg(long)]
        trace_lexer: bool,

        /// Have all parser rules call traceIn/traceOut
        #[arg(long)]
        trace_parser: bool,

        /// Have all tree walker rules call traceIn/traceOut
        #[arg(long)]
        trace_tree_walker: bool,

        /// Extra argument passed to the tool verbatim (repeatable)
        #[arg(long = "arg", value_name = "ARG")]
        arguments: Vec<String>,

        /// Maximum heap size for the wrapped tool
        #[arg(long, value_name = "SIZE", default_value = "1g")]
        max_heap_size: String,

        /// Directory searched for the tool executable (repeatable)
        #[arg(long = "tool-path", value_name = "PATH")]
        tool_path: Vec<PathBuf>,

        /// Executable name of the wrapped grammar tool
        #[arg(long, value_name = "NAME", default_value = "antlr4")]
        tool_bin: String,

        /// Working directory for the worker process (current directory
        /// when unset)
        #[arg(long, value_name = "PATH")]
        working_dir: Option<PathBuf>,
    },
}
