use crossbeam_channel::Receiver;
use log::{debug, error};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::engine::scanner::GraphScanner;
use crate::pipeline::context::ProgressFn;
use crate::pipeline::error_handler::FailureQueue;
use crate::utils::thread_prefix;
use crate::{ScanRequest, ScanResult};

/// Single dispatch worker: scan each request and keep successes in this worker's own slot.
fn dispatch_worker_loop(
    worker_id: usize,
    request_rx: Receiver<ScanRequest>,
    scanner: Arc<dyn GraphScanner>,
    errors: FailureQueue,
    on_scanned: Option<ProgressFn>,
) -> Vec<ScanResult> {
    let prefix = thread_prefix(worker_id);
    let mut slot = Vec::new();
    while let Ok(request) = request_rx.recv() {
        debug!("{}Scanning graph: {}", prefix, request.graph.id);
        match scanner.scan_graph(&request) {
            Ok(result) => slot.push(result),
            Err(e) => {
                error!(
                    "{}Scanning {} failed with error: {}",
                    prefix, request.graph.id, e
                );
                errors.add(e);
            }
        }
        if let Some(f) = &on_scanned {
            f(1);
        }
    }
    slot
}

/// Spawn dispatch workers. Worker `i`'s join handle yields its result slot.
pub fn spawn_dispatch_workers(
    request_rx: Receiver<ScanRequest>,
    scanner: &Arc<dyn GraphScanner>,
    errors: &FailureQueue,
    on_scanned: &Option<ProgressFn>,
    num_threads: usize,
) -> Vec<JoinHandle<Vec<ScanResult>>> {
    (0..num_threads)
        .map(|worker_id| {
            let request_rx = request_rx.clone();
            let scanner = Arc::clone(scanner);
            let errors = errors.clone();
            let on_scanned = on_scanned.clone();
            thread::spawn(move || {
                dispatch_worker_loop(worker_id, request_rx, scanner, errors, on_scanned)
            })
        })
        .collect()
}
