//! Pipeline context: collaborators, channels and handles shared by the two stages.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread::JoinHandle;

use crate::engine::indexer::GraphIndexer;
use crate::engine::scanner::GraphScanner;
use crate::pipeline::error_handler::FailureQueue;
use crate::{CandidatePath, ScanOpts, ScanRequest, ScanResult, Stage};

/// Called with the number of graphs a dispatch worker just finished (scanned or failed).
pub type ProgressFn = Arc<dyn Fn(usize) + Send + Sync>;

/// Everything a run needs besides the path groups.
#[derive(Clone)]
pub struct PipelineContext {
    pub indexer: Arc<dyn GraphIndexer>,
    pub scanner: Arc<dyn GraphScanner>,
    pub opts: ScanOpts,
    /// When set to true the collector stops producing; queued work still drains.
    pub cancel: Option<Arc<AtomicBool>>,
    pub on_scanned: Option<ProgressFn>,
}

impl PipelineContext {
    pub fn new(
        indexer: Arc<dyn GraphIndexer>,
        scanner: Arc<dyn GraphScanner>,
        opts: ScanOpts,
    ) -> Self {
        Self {
            indexer,
            scanner,
            opts,
            cancel: None,
            on_scanned: None,
        }
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_progress(mut self, on_scanned: ProgressFn) -> Self {
        self.on_scanned = Some(on_scanned);
        self
    }
}

/// Handles returned by [`run_pipeline`](super::run_pipeline); pass to
/// [`collect_results`](super::collect_results) to wait for the run.
/// `dispatch_handles[i]` returns worker `i`'s result slot.
pub struct PipelineHandles {
    pub collect_handle: JoinHandle<usize>,
    pub coordinator_handle: JoinHandle<usize>,
    pub dispatch_handles: Vec<JoinHandle<Vec<ScanResult>>>,
    pub indexing_errors: FailureQueue,
    pub dispatch_errors: FailureQueue,
    pub cancel: Option<Arc<AtomicBool>>,
}

/// Channels and failure queues for one run. Collector gets path_tx; indexing workers get
/// path_rx and clones of request_tx; dispatch workers get request_rx.
pub struct PipelineChannels {
    pub path_tx: Sender<CandidatePath>,
    pub path_rx: Receiver<CandidatePath>,
    pub request_tx: Sender<ScanRequest>,
    pub request_rx: Receiver<ScanRequest>,
    pub indexing_errors: FailureQueue,
    pub dispatch_errors: FailureQueue,
}

pub fn create_pipeline_channels(opts: &ScanOpts) -> PipelineChannels {
    let backlog = opts.backlog.max(1);
    let (path_tx, path_rx) = bounded::<CandidatePath>(backlog);
    let (request_tx, request_rx) = bounded::<ScanRequest>(backlog);
    PipelineChannels {
        path_tx,
        path_rx,
        request_tx,
        request_rx,
        indexing_errors: FailureQueue::new(Stage::Indexing, opts.failure_capacity),
        dispatch_errors: FailureQueue::new(Stage::Dispatch, opts.failure_capacity),
    }
}
