use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod generate;
mod tool;
mod worker;

use cli::{Cli, Commands};
use generate::GenerateTask;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Worker mode is dispatched before anything else: stdout belongs to the
    // IPC stream, so logs must go to stderr.
    if cli.worker {
        init_worker_tracing(cli.log_level.as_ref())?;
        let worker_id = cli
            .worker_id
            .unwrap_or_else(|| "gramgen-worker-unknown".to_string());
        return worker::run_worker(worker_id).await;
    }

    init_tracing(cli.log_level.as_ref())?;

    match cli.command {
        Some(Commands::Generate {
            source_dir,
            output_dir,
            trace,
            trace_lexer,
            trace_parser,
            trace_tree_walker,
            arguments,
            max_heap_size,
            tool_path,
            tool_bin,
            working_dir,
        }) => {
            let task = GenerateTask {
                source_dir,
                output_dir,
                trace,
                trace_lexer,
                trace_parser,
                trace_tree_walker,
                arguments,
                max_heap_size,
                tool_path,
                tool_bin,
                working_dir,
            };
            task.run().await
        }
        None => anyhow::bail!("no command given; try `gramgen generate --help`"),
    }
}

fn init_tracing(log_level: Option<&String>) -> Result<()> {
    let env_filter = build_env_filter(log_level);
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}

fn init_worker_tracing(log_level: Option<&String>) -> Result<()> {
    let env_filter = build_env_filter(log_level);

    // Worker processes log to stderr to keep stdout clean for IPC
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    debug!("Worker tracing initialized");
    Ok(())
}

fn build_env_filter(log_level: Option<&String>) -> EnvFilter {
    match log_level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| {
            eprintln!("Invalid log level '{}', falling back to 'info'", level);
            EnvFilter::new("info")
        }),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}
