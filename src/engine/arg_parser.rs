use clap::Parser;
use std::path::PathBuf;

use crate::OutputFormat;

/// Index artifacts with an external indexer and scan their dependency graphs.
#[derive(Clone, Parser)]
#[command(name = "graphscan")]
#[command(about = "Index files into dependency graphs and scan them for vulnerabilities and policy violations.")]
pub struct Cli {
    /// Files to scan: a path, a wildcard pattern (`libs/*.jar`) or a regexp with --regexp.
    #[arg(value_name = "PATTERN", required_unless_present = "spec", conflicts_with = "spec")]
    pub pattern: Option<String>,

    /// JSON file spec with a `files` array of path groups. Replaces PATTERN.
    #[arg(long)]
    pub spec: Option<PathBuf>,

    /// Repository path of the scanned files in the scanning service.
    #[arg(long, default_value = "")]
    pub target: String,

    /// Walk directories recursively. Default: true.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub recursive: Option<bool>,

    /// Exclusion wildcards, separated by ';'.
    #[arg(long, value_delimiter = ';')]
    pub exclusions: Vec<String>,

    /// Treat PATTERN as a regular expression.
    #[arg(long)]
    pub regexp: bool,

    /// Worker threads per stage.
    #[arg(long, short = 't')]
    pub threads: Option<usize>,

    /// Base URL of the scanning service. Also read from GRAPHSCAN_URL.
    #[arg(long)]
    pub url: Option<String>,

    /// Indexer executable. Default: `indexer-app` on PATH.
    #[arg(long)]
    pub indexer: Option<PathBuf>,

    /// Project key to scan against.
    #[arg(long)]
    pub project: Option<String>,

    /// Watch names, separated by ','.
    #[arg(long, value_delimiter = ',')]
    pub watches: Vec<String>,

    /// Fail the run when a violation has fail-build set. Default: true.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub fail: Option<bool>,

    /// Include all vulnerabilities. Default: only when no watches and no project are given.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub vuln: Option<bool>,

    /// Include licenses in the results.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub licenses: Option<bool>,

    /// Output format.
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Settings file. Default: `.graphscan.toml` in the current directory.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Show a counter of scanned graphs.
    #[arg(long)]
    pub progress: bool,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
