use crossbeam_channel::{Receiver, Sender};
use log::{info, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::engine::indexer::GraphIndexer;
use crate::error::ScanError;
use crate::pipeline::error_handler::FailureQueue;
use crate::utils::thread_prefix;
use crate::{CandidatePath, ScanOpts, ScanRequest};

/// Single indexing worker: index each candidate, forward non-empty graphs as scan requests.
/// Returns the number of requests forwarded.
fn indexing_worker_loop(
    worker_id: usize,
    path_rx: Receiver<CandidatePath>,
    request_tx: Sender<ScanRequest>,
    indexer: Arc<dyn GraphIndexer>,
    errors: FailureQueue,
    project_key: Option<String>,
    watches: Vec<String>,
) -> usize {
    let prefix = thread_prefix(worker_id);
    let mut forwarded = 0_usize;
    while let Ok(candidate) = path_rx.recv() {
        info!("{}Indexing file: {}", prefix, candidate.path.display());
        let graph = match indexer.index_file(&candidate.path) {
            Ok(graph) => graph,
            Err(e) => {
                warn!("{}{}", prefix, e);
                errors.add(e);
                continue;
            }
        };
        // Unsupported file or nothing found: nothing to scan.
        if graph.is_empty() {
            continue;
        }
        let request = ScanRequest::new(
            graph,
            candidate.repo_path,
            project_key.clone(),
            watches.clone(),
        );
        if request_tx.send(request).is_err() {
            errors.add(ScanError::QueueClosed("dispatch"));
            break;
        }
        forwarded += 1;
    }
    forwarded
}

/// Spawn `num_threads` indexing workers. Each holds a clone of `request_tx`, so the dispatch
/// queue cannot close while any of them is still running.
pub fn spawn_indexing_workers(
    path_rx: Receiver<CandidatePath>,
    request_tx: &Sender<ScanRequest>,
    indexer: &Arc<dyn GraphIndexer>,
    errors: &FailureQueue,
    opts: &ScanOpts,
) -> Vec<JoinHandle<usize>> {
    (0..opts.worker_count())
        .map(|worker_id| {
            let path_rx = path_rx.clone();
            let request_tx = request_tx.clone();
            let indexer = Arc::clone(indexer);
            let errors = errors.clone();
            let project_key = opts.project_key.clone();
            let watches = opts.watches.clone();
            thread::spawn(move || {
                indexing_worker_loop(
                    worker_id,
                    path_rx,
                    request_tx,
                    indexer,
                    errors,
                    project_key,
                    watches,
                )
            })
        })
        .collect()
}
