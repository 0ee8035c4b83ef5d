//! Application configuration constants.
//! Tuning and protocol values in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
    url_env_key: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!(".{pkg}.toml"),
                url_env_key: format!("{}_URL", pkg.to_uppercase()),
            }
        })
    }

    /// `.graphscan.toml`
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// `GRAPHSCAN_URL`
    pub fn url_env_key(&self) -> &str {
        &self.url_env_key
    }
}

// ---- Pipeline ----

/// Defaults for worker pools and failure queues.
pub struct PipelineDefaults;

impl PipelineDefaults {
    /// Workers per stage when nothing is configured.
    pub const THREADS: usize = 3;
    /// Backlog of each stage queue. Large enough that normal fan-out never blocks the producer.
    pub const BACKLOG: usize = 20_000;
    /// Failure records kept per stage; further failures are only counted.
    pub const FAILURE_CAPACITY: usize = 1_000;
}

// ---- Indexer ----

/// External indexer invocation.
pub struct IndexerConsts;

impl IndexerConsts {
    /// Sub-command passed before the file path.
    pub const GRAPH_COMMAND: &'static str = "graph";
    /// Exit code meaning "file type not supported"; not an error.
    pub const UNSUPPORTED_EXIT_CODE: i32 = 3;
    /// Executable looked up when none is configured.
    pub const DEFAULT_EXECUTABLE: &'static str = "indexer-app";
}

// ---- Remote scan ----

/// Scan-type tag sent with every graph.
pub const SCAN_TYPE_BINARY: &str = "binary";

/// Remote scan endpoint and polling.
pub struct RemoteConsts;

impl RemoteConsts {
    pub const SCAN_GRAPH_PATH: &'static str = "api/v1/scan/graph";
    pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
    pub const MAX_WAIT: Duration = Duration::from_secs(15 * 60);
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
}
