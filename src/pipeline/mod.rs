//! Pipeline components: collector, indexing stage, dispatch stage, failure queues.

pub mod collect;
pub mod context;
pub mod dispatch;
pub mod error_handler;
pub mod indexing;
pub mod orchestrator;

pub use collect::{collect_files_for_indexing, run_collect_loop, spawn_collect_thread};
pub use context::{
    PipelineChannels, PipelineContext, PipelineHandles, ProgressFn, create_pipeline_channels,
};
pub use dispatch::spawn_dispatch_workers;
pub use error_handler::{FailureQueue, log_failure_summary};
pub use indexing::spawn_indexing_workers;
pub use orchestrator::{collect_results, run_pipeline, scan_path_groups};
