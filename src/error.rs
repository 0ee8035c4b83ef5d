//! Item-scoped errors captured as failure records.
//!
//! None of these abort the pipeline; they end up in the failure queue of the stage that
//! produced them and are surfaced after both stages drain.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Root path of a path group could not be resolved or read.
    #[error("cannot resolve root path '{}' of pattern '{pattern}': {source}", .root.display())]
    RootPath {
        pattern: String,
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Include or exclusion pattern did not compile.
    #[error("invalid pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    /// Directory walk failed under a group root.
    #[error("walk error under '{}': {reason}", .root.display())]
    Walk { root: PathBuf, reason: String },

    /// Indexer process could not be started.
    #[error("failed to launch indexer '{}' for {}: {source}", .indexer.display(), .path.display())]
    IndexerLaunch {
        indexer: PathBuf,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Indexer exited with a status other than success or "unsupported".
    #[error("indexer failed indexing {} with {status}: {output}", .path.display())]
    IndexerExit {
        path: PathBuf,
        status: String,
        output: String,
    },

    /// Indexer output was not a dependency graph.
    #[error("cannot parse indexer output for {}: {source}", .path.display())]
    IndexerOutput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Remote scan call failed.
    #[error("scanning {graph_id} failed: {reason}")]
    RemoteScan { graph_id: String, reason: String },

    /// A stage queue closed while a producer still had work for it.
    #[error("{0} queue closed before all work was enqueued")]
    QueueClosed(&'static str),
}

impl ScanError {
    pub fn remote(graph_id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ScanError::RemoteScan {
            graph_id: graph_id.into(),
            reason: reason.to_string(),
        }
    }

    pub fn pattern(pattern: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ScanError::Pattern {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_names_graph() {
        let err = ScanError::remote("gav://a:b:1", "503 Service Unavailable");
        assert_eq!(
            err.to_string(),
            "scanning gav://a:b:1 failed: 503 Service Unavailable"
        );
    }

    #[test]
    fn test_indexer_exit_message() {
        let err = ScanError::IndexerExit {
            path: PathBuf::from("/tmp/a.jar"),
            status: "exit status: 1".to_string(),
            output: "boom".to_string(),
        };
        assert!(err.to_string().contains("/tmp/a.jar"));
        assert!(err.to_string().contains("boom"));
    }
}
