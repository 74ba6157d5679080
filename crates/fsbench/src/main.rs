//! fsbench - FUSE latency harness.

// Use mimalloc for reduced allocation latency (enabled by default).
// Disable with `--no-default-features` if debugging allocator issues.
#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use fsbench::error::exit_code;
use fsbench::{BenchError, BenchmarkRunner, Cli, report, signal};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            let code = categorize_error(&e);
            eprintln!("error: {e:#}");
            ExitCode::from(code)
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_filter());

    if cli.print_header {
        let mut stdout = io::stdout().lock();
        report::write_header(&mut stdout).context("Failed to write header")?;
        return Ok(());
    }

    // Usage errors surface here, before anything is spawned.
    let config = cli.into_config()?;

    if let Err(e) = signal::install_signal_handler() {
        tracing::warn!("Failed to install signal handler: {}", e);
    }

    let fs = config.filesystem;
    let measurement = BenchmarkRunner::new(config)
        .run()
        .with_context(|| format!("Benchmark of {fs} failed"))?;

    let mut stdout = io::stdout().lock();
    report::write_rows(&mut stdout, &measurement).context("Failed to write results")?;
    stdout.flush().context("Failed to flush results")?;
    Ok(())
}

/// Logs go to stderr; stdout carries only TSV.
fn init_logging(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Map an error chain to an exit code using typed downcasting.
fn categorize_error(e: &anyhow::Error) -> u8 {
    if signal::shutdown_requested() {
        return exit_code::INTERRUPTED;
    }
    e.chain()
        .find_map(|cause| cause.downcast_ref::<BenchError>())
        .map_or(exit_code::FAILURE, BenchError::exit_code)
}
