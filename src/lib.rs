//! Graphscan: index artifacts into dependency graphs and scan them against a remote service.

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use log::debug;
use std::sync::Arc;

use crate::engine::{GraphIndexer, GraphScanner};
use crate::pipeline::PipelineContext;

/// Result alias used by public graphscan API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: collect the files of `groups`, index each one with `indexer`, scan every
/// non-empty graph with `scanner`, and return results plus per-stage failures.
///
/// Item failures never abort the run; inspect [`ScanOutcome::indexing_failures`] and
/// [`ScanOutcome::dispatch_failures`] and decide what is fatal. [`ScanOutcome::passed`] is true
/// when no result carries a violation or vulnerability.
///
/// ```ignore
/// let indexer = Arc::new(graphscan::engine::IndexerApp::new("/opt/indexer-app"));
/// let scanner = Arc::new(graphscan::engine::RemoteScanner::new("https://scan.example.com")?);
/// let groups = vec![graphscan::PathGroup::new("build/libs/*.jar").with_target("libs-release/app/")];
/// let outcome = graphscan::scan(groups, indexer, scanner, &graphscan::ScanOpts::default())?;
/// ```
pub fn scan(
    groups: Vec<PathGroup>,
    indexer: Arc<dyn GraphIndexer>,
    scanner: Arc<dyn GraphScanner>,
    opts: &ScanOpts,
) -> Result<ScanOutcome> {
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    let ctx = PipelineContext::new(indexer, scanner, opts.clone());
    pipeline::scan_path_groups(groups, &ctx)
}
