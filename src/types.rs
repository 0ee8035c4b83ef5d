//! Public and internal types for the graphscan API and pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::utils::config::{PipelineDefaults, SCAN_TYPE_BINARY};

/// One file-matching rule plus the repository path its artifacts belong to.
///
/// Same shape as an entry of the `files` array in a JSON file spec.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PathGroup {
    /// Wildcard (`*`, `?`) or regular expression, depending on [`Self::regexp`].
    pub pattern: String,
    /// Repository path in the scanning service; see [`repo_path_from_target`](crate::engine::repo_path_from_target).
    #[serde(default)]
    pub target: String,
    /// Walk the whole tree under the root (true) or only its direct children.
    #[serde(default = "default_recursive")]
    pub recursive: bool,
    /// Wildcard patterns matched against the full path; a match drops the path.
    #[serde(default)]
    pub exclusions: Vec<String>,
    /// Treat `pattern` as a regular expression instead of a wildcard.
    #[serde(default)]
    pub regexp: bool,
}

fn default_recursive() -> bool {
    true
}

impl PathGroup {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            recursive: true,
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_exclusions(mut self, exclusions: Vec<String>) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_regexp(mut self, regexp: bool) -> Self {
        self.regexp = regexp;
        self
    }
}

/// Top level of a JSON file spec: `{"files": [ ... ]}`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FileSpec {
    #[serde(default)]
    pub files: Vec<PathGroup>,
}

/// Dependency graph produced by the external indexer for one file.
///
/// An empty `id` is the "unsupported / nothing to scan" marker.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DependencyGraph {
    #[serde(rename = "component_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sha256: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sha1: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<DependencyGraph>,
}

impl DependencyGraph {
    /// True when the indexer produced nothing worth sending to the scanner.
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}

/// A file selected for indexing, with the repository path of the group that found it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidatePath {
    pub path: PathBuf,
    pub repo_path: String,
}

/// Unit of work for the scan dispatch stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanRequest {
    pub graph: DependencyGraph,
    pub repo_path: String,
    pub project_key: Option<String>,
    pub watches: Vec<String>,
    pub scan_type: &'static str,
}

impl ScanRequest {
    pub fn new(
        graph: DependencyGraph,
        repo_path: String,
        project_key: Option<String>,
        watches: Vec<String>,
    ) -> Self {
        Self {
            graph,
            repo_path,
            project_key,
            watches,
            scan_type: SCAN_TYPE_BINARY,
        }
    }
}

/// A component affected by a finding, keyed by component id in [`Violation::components`].
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Component {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixed_versions: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Cve {
    #[serde(default)]
    pub cve: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cvss_v3_score: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Violation {
    #[serde(default)]
    pub issue_id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub severity: String,
    #[serde(rename = "type", default)]
    pub violation_type: String,
    #[serde(default)]
    pub watch_name: String,
    #[serde(default)]
    pub fail_build: bool,
    #[serde(default)]
    pub cves: Vec<Cve>,
    #[serde(default)]
    pub components: BTreeMap<String, Component>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Vulnerability {
    #[serde(default)]
    pub issue_id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub cves: Vec<Cve>,
    #[serde(default)]
    pub components: BTreeMap<String, Component>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct License {
    #[serde(default)]
    pub license_key: String,
    #[serde(default)]
    pub components: BTreeMap<String, Component>,
}

/// Response of the scanning service for one graph.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ScanResult {
    #[serde(default)]
    pub scan_id: String,
    #[serde(default)]
    pub violations: Vec<Violation>,
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(default)]
    pub licenses: Vec<License>,
}

impl ScanResult {
    pub fn has_findings(&self) -> bool {
        !self.violations.is_empty() || !self.vulnerabilities.is_empty()
    }
}

/// Which pipeline stage captured a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// File collection and indexing.
    Indexing,
    /// Remote scan dispatch.
    Dispatch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Indexing => write!(f, "indexing"),
            Stage::Dispatch => write!(f, "dispatch"),
        }
    }
}

/// One captured, item-scoped error.
#[derive(Debug)]
pub struct FailureRecord {
    pub stage: Stage,
    pub error: crate::error::ScanError,
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.error)
    }
}

/// Everything a finished run hands back to the caller.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Results in worker-slot order.
    pub results: Vec<ScanResult>,
    /// Collection and indexing failures.
    pub indexing_failures: Vec<FailureRecord>,
    /// Remote scan failures.
    pub dispatch_failures: Vec<FailureRecord>,
    /// Failures beyond the queue capacity that were counted but not kept.
    pub dropped_failures: usize,
    /// True when the collector stopped early on request.
    pub cancelled: bool,
}

impl ScanOutcome {
    /// No result carries a violation or a vulnerability.
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| !r.has_findings())
    }

    pub fn has_failures(&self) -> bool {
        !self.indexing_failures.is_empty()
            || !self.dispatch_failures.is_empty()
            || self.dropped_failures > 0
    }

    /// First indexing failure, then first dispatch failure.
    pub fn first_failure(&self) -> Option<&FailureRecord> {
        self.indexing_failures
            .first()
            .or_else(|| self.dispatch_failures.first())
    }
}

/// Options for one pipeline run.
#[derive(Clone, Debug)]
pub struct ScanOpts {
    /// Worker count for each stage; values below 1 are raised to 1.
    pub threads: usize,
    /// Backlog capacity of each stage queue.
    pub backlog: usize,
    /// Max failure records kept per stage.
    pub failure_capacity: usize,
    pub project_key: Option<String>,
    pub watches: Vec<String>,
}

impl Default for ScanOpts {
    fn default() -> Self {
        Self {
            threads: PipelineDefaults::THREADS,
            backlog: PipelineDefaults::BACKLOG,
            failure_capacity: PipelineDefaults::FAILURE_CAPACITY,
            project_key: None,
            watches: Vec::new(),
        }
    }
}

impl ScanOpts {
    pub fn worker_count(&self) -> usize {
        self.threads.max(1)
    }
}

/// How results are printed by the CLI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Full settings (CLI, config file and environment). Use [`ScanOpts`] for the pipeline alone.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Base URL of the scanning service.
    pub url: Option<String>,
    /// Indexer executable. When None, looked up as `indexer-app`.
    pub indexer: Option<PathBuf>,
    /// Arguments placed before the `graph` sub-command (e.g. a script for an interpreter).
    pub indexer_args: Vec<String>,
    pub threads: usize,
    pub backlog: usize,
    pub failure_capacity: usize,
    pub project: Option<String>,
    pub watches: Vec<String>,
    /// Fail the run when a violation is marked fail-build.
    pub fail: bool,
    /// When None, vulnerabilities are included only if no watches and no project are set.
    pub include_vulnerabilities: Option<bool>,
    pub include_licenses: bool,
    pub format: OutputFormat,
    pub verbose: bool,
    /// Show a counter of scanned graphs.
    pub progress: bool,
    pub poll_interval: std::time::Duration,
    pub max_wait: std::time::Duration,
}

impl Default for Settings {
    fn default() -> Self {
        use crate::utils::config::RemoteConsts;
        Self {
            url: None,
            indexer: None,
            indexer_args: Vec::new(),
            threads: PipelineDefaults::THREADS,
            backlog: PipelineDefaults::BACKLOG,
            failure_capacity: PipelineDefaults::FAILURE_CAPACITY,
            project: None,
            watches: Vec::new(),
            fail: true,
            include_vulnerabilities: None,
            include_licenses: false,
            format: OutputFormat::default(),
            verbose: false,
            progress: false,
            poll_interval: RemoteConsts::POLL_INTERVAL,
            max_wait: RemoteConsts::MAX_WAIT,
        }
    }
}

impl Settings {
    /// Watches or a project were given, so results are violations against that context.
    pub fn has_context(&self) -> bool {
        !self.watches.is_empty() || self.project.is_some()
    }

    pub fn include_vulnerabilities(&self) -> bool {
        self.include_vulnerabilities
            .unwrap_or_else(|| !self.has_context())
    }
}

impl From<&Settings> for ScanOpts {
    fn from(s: &Settings) -> Self {
        ScanOpts {
            threads: s.threads,
            backlog: s.backlog,
            failure_capacity: s.failure_capacity,
            project_key: s.project.clone(),
            watches: s.watches.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(violations: usize, vulnerabilities: usize) -> ScanResult {
        ScanResult {
            scan_id: "s".to_string(),
            violations: vec![Violation::default(); violations],
            vulnerabilities: vec![Vulnerability::default(); vulnerabilities],
            licenses: Vec::new(),
        }
    }

    #[test]
    fn test_passed_empty_outcome() {
        assert!(ScanOutcome::default().passed());
    }

    #[test]
    fn test_passed_flips_on_any_finding() {
        let mut outcome = ScanOutcome {
            results: vec![result_with(0, 0), result_with(0, 0)],
            ..Default::default()
        };
        assert!(outcome.passed());
        outcome.results.push(result_with(0, 1));
        assert!(!outcome.passed());
        outcome.results = vec![result_with(2, 0)];
        assert!(!outcome.passed());
    }

    #[test]
    fn test_graph_empty_identity() {
        assert!(DependencyGraph::default().is_empty());
        let g: DependencyGraph =
            serde_json::from_str(r#"{"component_id":"gav://org:lib:1.0","nodes":[]}"#).unwrap();
        assert!(!g.is_empty());
        assert_eq!(g.id, "gav://org:lib:1.0");
    }

    #[test]
    fn test_path_group_defaults_from_json() {
        let spec: FileSpec =
            serde_json::from_str(r#"{"files":[{"pattern":"libs/*.jar"}]}"#).unwrap();
        assert_eq!(spec.files.len(), 1);
        assert!(spec.files[0].recursive);
        assert!(spec.files[0].exclusions.is_empty());
        assert!(!spec.files[0].regexp);
    }

    #[test]
    fn test_include_vulnerabilities_follows_context() {
        let mut s = Settings::default();
        assert!(s.include_vulnerabilities());
        s.watches = vec!["w1".to_string()];
        assert!(!s.include_vulnerabilities());
        s.include_vulnerabilities = Some(true);
        assert!(s.include_vulnerabilities());
    }

    #[test]
    fn test_worker_count_minimum_one() {
        let opts = ScanOpts {
            threads: 0,
            ..Default::default()
        };
        assert_eq!(opts.worker_count(), 1);
    }
}
