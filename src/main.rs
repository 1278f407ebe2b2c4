//! depcache - Dependency cache synchronizer
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use depcache::cli::{commands, Cli};
use depcache::error::DepCacheResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> DepCacheResult<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise 0 = info, 1+ = debug, quiet = warn
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.quiet {
            EnvFilter::new("depcache=warn")
        } else {
            match cli.verbose {
                0 => EnvFilter::new("depcache=info"),
                _ => EnvFilter::new("depcache=debug"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command.operation() {
        Some(operation) => commands::sync(operation, &cli).await,
        None => {
            commands::version();
            Ok(())
        }
    }
}
