use anyhow::Result;
use log::{debug, error};
use std::sync::atomic::Ordering;
use std::thread;

use crate::pipeline::{self, PipelineContext, PipelineHandles};
use crate::{PathGroup, ScanOutcome};

/// Start both stages and the collector. Returns immediately; pass the handles to
/// [`collect_results`] to wait for the run.
///
/// Collector → path channel → indexing workers → request channel → dispatch workers.
pub fn run_pipeline(groups: Vec<PathGroup>, ctx: &PipelineContext) -> PipelineHandles {
    let channels = pipeline::create_pipeline_channels(&ctx.opts);
    let num_threads = ctx.opts.worker_count();
    debug!("Starting pipeline with {} worker(s) per stage", num_threads);

    let dispatch_handles = pipeline::spawn_dispatch_workers(
        channels.request_rx,
        &ctx.scanner,
        &channels.dispatch_errors,
        &ctx.on_scanned,
        num_threads,
    );

    let indexing_handles = pipeline::spawn_indexing_workers(
        channels.path_rx,
        &channels.request_tx,
        &ctx.indexer,
        &channels.indexing_errors,
        &ctx.opts,
    );

    let collect_handle = pipeline::spawn_collect_thread(
        groups,
        channels.path_tx,
        channels.indexing_errors.clone(),
        ctx.cancel.clone(),
    );

    // Stage barrier: the dispatch queue is closed only after every indexing worker has
    // returned, i.e. after the last request that could ever be produced was sent.
    let request_tx = channels.request_tx;
    let coordinator_handle = thread::spawn(move || {
        let mut forwarded = 0_usize;
        for h in indexing_handles {
            match h.join() {
                Ok(n) => forwarded += n,
                Err(_) => error!("indexing worker panicked"),
            }
        }
        debug!("Indexing done, {} graph(s) forwarded; closing dispatch queue", forwarded);
        drop(request_tx);
        forwarded
    });

    PipelineHandles {
        collect_handle,
        coordinator_handle,
        dispatch_handles,
        indexing_errors: channels.indexing_errors,
        dispatch_errors: channels.dispatch_errors,
        cancel: ctx.cancel.clone(),
    }
}

/// Wait for both stages to drain, then merge the per-worker result slots in worker order
/// and drain both failure queues.
pub fn collect_results(handles: PipelineHandles) -> Result<ScanOutcome> {
    let PipelineHandles {
        collect_handle,
        coordinator_handle,
        dispatch_handles,
        indexing_errors,
        dispatch_errors,
        cancel,
    } = handles;

    let path_count = collect_handle
        .join()
        .map_err(|_| anyhow::anyhow!("collector thread panicked"))?;
    let forwarded = coordinator_handle
        .join()
        .map_err(|_| anyhow::anyhow!("pipeline coordinator panicked"))?;

    let mut results = Vec::with_capacity(forwarded);
    for h in dispatch_handles {
        let slot = h
            .join()
            .map_err(|_| anyhow::anyhow!("dispatch worker panicked"))?;
        results.extend(slot);
    }
    debug!(
        "main: {} path(s) collected, {} graph(s) forwarded, {} result(s)",
        path_count,
        forwarded,
        results.len()
    );

    pipeline::log_failure_summary(&indexing_errors, &dispatch_errors);

    Ok(ScanOutcome {
        results,
        dropped_failures: indexing_errors.dropped() + dispatch_errors.dropped(),
        indexing_failures: indexing_errors.drain(),
        dispatch_failures: dispatch_errors.drain(),
        cancelled: cancel.is_some_and(|c| c.load(Ordering::Relaxed)),
    })
}

/// Main orchestrator: run the whole pipeline over `groups` and block until it finishes.
pub fn scan_path_groups(groups: Vec<PathGroup>, ctx: &PipelineContext) -> Result<ScanOutcome> {
    let handles = run_pipeline(groups, ctx);
    collect_results(handles)
}
