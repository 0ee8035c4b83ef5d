//! External indexer: turns one file into a dependency graph by running a subprocess.

use log::debug;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::DependencyGraph;
use crate::error::ScanError;
use crate::utils::config::IndexerConsts;

/// Produces a dependency graph for one file. An empty graph means "nothing to scan".
pub trait GraphIndexer: Send + Sync {
    fn index_file(&self, path: &Path) -> Result<DependencyGraph, ScanError>;
}

/// Runs `<exec_path> [args..] graph <file>` and parses its stdout as JSON.
///
/// Exit code 3 marks an unsupported file and yields an empty graph.
#[derive(Clone, Debug)]
pub struct IndexerApp {
    exec_path: PathBuf,
    args: Vec<String>,
}

impl IndexerApp {
    pub fn new(exec_path: impl Into<PathBuf>) -> Self {
        Self {
            exec_path: exec_path.into(),
            args: Vec::new(),
        }
    }

    /// Configured executable, or `indexer-app` looked up on `PATH`.
    pub fn from_settings(exec_path: Option<&Path>, args: &[String]) -> Self {
        let exec = exec_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(IndexerConsts::DEFAULT_EXECUTABLE));
        Self::new(exec).with_args(args.to_vec())
    }

    /// Arguments placed before the `graph` sub-command.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn exec_path(&self) -> &Path {
        &self.exec_path
    }
}

impl GraphIndexer for IndexerApp {
    fn index_file(&self, path: &Path) -> Result<DependencyGraph, ScanError> {
        let output = Command::new(&self.exec_path)
            .args(&self.args)
            .arg(IndexerConsts::GRAPH_COMMAND)
            .arg(path)
            .output()
            .map_err(|source| ScanError::IndexerLaunch {
                indexer: self.exec_path.clone(),
                path: path.to_path_buf(),
                source,
            })?;

        if !output.status.success() {
            if output.status.code() == Some(IndexerConsts::UNSUPPORTED_EXIT_CODE) {
                debug!("File {} is not supported by the indexer", path.display());
                return Ok(DependencyGraph::default());
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            let text = if stderr.trim().is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(ScanError::IndexerExit {
                path: path.to_path_buf(),
                status: output.status.to_string(),
                output: text,
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|source| ScanError::IndexerOutput {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;

    /// Indexer script run through `sh`: exit 3 for `.txt`, 1 for `.bad`, garbage for `.junk`.
    const SCRIPT: &str = r#"
[ "$1" = "graph" ] || exit 9
case "$2" in
  *.txt) exit 3 ;;
  *.bad) echo "cannot read archive" >&2; exit 1 ;;
  *.junk) echo "not json" ;;
  *) printf '{"component_id":"generic://%s","nodes":[{"component_id":"dep:1"}]}' "$(basename "$2")" ;;
esac
"#;

    fn indexer(dir: &Path) -> IndexerApp {
        let script = dir.join("indexer.sh");
        fs::write(&script, SCRIPT).unwrap();
        IndexerApp::new("sh").with_args(vec![script.to_string_lossy().to_string()])
    }

    #[test]
    fn test_graph_parsed_from_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let idx = indexer(dir.path());
        let graph = idx.index_file(&dir.path().join("a.jar")).unwrap();
        assert_eq!(graph.id, "generic://a.jar");
        assert_eq!(graph.nodes.len(), 1);
    }

    #[test]
    fn test_same_file_same_identity() {
        let dir = tempfile::tempdir().unwrap();
        let idx = indexer(dir.path());
        let file = dir.path().join("b.jar");
        assert_eq!(
            idx.index_file(&file).unwrap().id,
            idx.index_file(&file).unwrap().id
        );
    }

    #[test]
    fn test_unsupported_exit_code_is_empty_graph() {
        let dir = tempfile::tempdir().unwrap();
        let graph = indexer(dir.path())
            .index_file(&dir.path().join("notes.txt"))
            .unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_other_exit_code_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = indexer(dir.path())
            .index_file(&dir.path().join("x.bad"))
            .unwrap_err();
        match err {
            ScanError::IndexerExit { output, .. } => assert_eq!(output, "cannot read archive"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_output_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = indexer(dir.path())
            .index_file(&dir.path().join("x.junk"))
            .unwrap_err();
        assert!(matches!(err, ScanError::IndexerOutput { .. }));
    }

    #[test]
    fn test_missing_executable_is_launch_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = IndexerApp::new(dir.path().join("no-such-indexer"))
            .index_file(&dir.path().join("a.jar"))
            .unwrap_err();
        assert!(matches!(err, ScanError::IndexerLaunch { .. }));
    }
}
