//! Graphscan CLI: index matching files and scan their dependency graphs.

use anyhow::Result;
use clap::Parser;
use graphscan::engine::{Cli, RunStatus, handle_run};
use std::process::ExitCode;
use std::time::Instant;

/// Exit code when the scan finished but found violations or vulnerabilities.
const FINDINGS_EXIT_CODE: u8 = 2;

fn main() -> Result<ExitCode> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    let status = handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(match status {
        RunStatus::Passed => ExitCode::SUCCESS,
        RunStatus::FindingsDetected => ExitCode::from(FINDINGS_EXIT_CODE),
    })
}
