//! CLI command handler: resolve settings, run the pipeline, report and decide the exit status.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::arg_parser::Cli;
use crate::engine::indexer::IndexerApp;
use crate::engine::progress::{create_counter, progress_callback, refresh_bar};
use crate::engine::report::{check_fail_build, print_results};
use crate::engine::scanner::RemoteScanner;
use crate::pipeline::{PipelineContext, scan_path_groups};
use crate::utils::config::PackagePaths;
use crate::utils::{apply_file_to_settings, load_settings_toml, setup_logging};
use crate::{FileSpec, PathGroup, ScanOpts, ScanOutcome, Settings};

/// How a completed run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Passed,
    FindingsDetected,
}

/// Read the URL from the environment, loading `.env` in `dir` first.
fn url_from_env(dir: &Path) -> Option<String> {
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
    }
    std::env::var(PackagePaths::get().url_env_key())
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Overwrite a settings field from the CLI when given.
macro_rules! apply_cli_opt {
    ($cli:expr, $settings:expr, $cli_field:ident => $settings_field:ident) => {
        if let Some(v) = $cli.$cli_field.clone() {
            $settings.$settings_field = v;
        }
    };
}

/// Defaults, then the settings file, then the environment, then CLI flags.
pub fn build_settings(cli: &Cli, dir: &Path) -> Settings {
    let mut settings = Settings::default();
    if let Some(file) = load_settings_toml(dir, cli.config.as_deref()) {
        apply_file_to_settings(&file, &mut settings);
    }
    if let Some(url) = url_from_env(dir) {
        settings.url = Some(url);
    }
    if cli.url.is_some() {
        settings.url = cli.url.clone();
    }
    if cli.indexer.is_some() {
        settings.indexer = cli.indexer.clone();
    }
    if cli.project.is_some() {
        settings.project = cli.project.clone();
    }
    if !cli.watches.is_empty() {
        settings.watches = cli.watches.clone();
    }
    if cli.vuln.is_some() {
        settings.include_vulnerabilities = cli.vuln;
    }
    apply_cli_opt!(cli, settings, threads => threads);
    apply_cli_opt!(cli, settings, fail => fail);
    apply_cli_opt!(cli, settings, licenses => include_licenses);
    apply_cli_opt!(cli, settings, format => format);
    apply_cli_opt!(cli, settings, verbose => verbose);
    settings.progress |= cli.progress;
    settings
}

/// Path groups from `--spec` or from the positional pattern and its flags.
pub fn path_groups(cli: &Cli) -> Result<Vec<PathGroup>> {
    if let Some(spec_path) = &cli.spec {
        let text = std::fs::read_to_string(spec_path)
            .with_context(|| format!("read file spec {}", spec_path.display()))?;
        let spec: FileSpec = serde_json::from_str(&text)
            .with_context(|| format!("parse file spec {}", spec_path.display()))?;
        return Ok(spec.files);
    }
    let pattern = cli
        .pattern
        .clone()
        .ok_or_else(|| anyhow::anyhow!("no pattern and no --spec given"))?;
    Ok(vec![
        PathGroup::new(pattern)
            .with_target(cli.target.clone())
            .with_recursive(cli.recursive.unwrap_or(true))
            .with_exclusions(cli.exclusions.clone())
            .with_regexp(cli.regexp),
    ])
}

/// Summary of what the failure queues hold, for the terminal error.
fn failure_message(outcome: &ScanOutcome) -> Option<String> {
    let first = outcome.first_failure()?;
    let total =
        outcome.indexing_failures.len() + outcome.dispatch_failures.len() + outcome.dropped_failures;
    Some(if total > 1 {
        format!("{} (and {} more failure(s))", first, total - 1)
    } else {
        first.to_string()
    })
}

fn run_scan(cli: &Cli, settings: &Settings) -> Result<RunStatus> {
    let groups = path_groups(cli)?;
    let scanner = RemoteScanner::from_settings(settings)?;
    let indexer = IndexerApp::from_settings(settings.indexer.as_deref(), &settings.indexer_args);
    debug!("Indexer: {}", indexer.exec_path().display());

    let cancel_requested = Arc::new(AtomicBool::new(false));
    let cancel_requested_handler = Arc::clone(&cancel_requested);
    ctrlc::set_handler(move || {
        cancel_requested_handler.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;

    let mut ctx = PipelineContext::new(
        Arc::new(indexer),
        Arc::new(scanner),
        ScanOpts::from(settings),
    )
    .with_cancel(cancel_requested);
    let bar = settings.progress.then(|| create_counter("Scanning"));
    if let Some(bar) = &bar {
        ctx = ctx.with_progress(progress_callback(bar));
    }

    let outcome = scan_path_groups(groups, &ctx)?;
    if let Some(bar) = &bar {
        refresh_bar(bar);
    }

    print_results(&outcome.results, settings.format, settings.include_licenses)?;
    run_status(&outcome, settings)
}

/// Fail-build is only meaningful for violation results, i.e. when vulnerabilities are not
/// requested.
fn fail_build_applies(settings: &Settings) -> bool {
    settings.fail && !settings.include_vulnerabilities()
}

/// Final decision for a finished run. Fail-build violations, item failures and cancellation
/// are terminal errors; otherwise the results decide between passed and findings.
pub fn run_status(outcome: &ScanOutcome, settings: &Settings) -> Result<RunStatus> {
    if fail_build_applies(settings) && check_fail_build(&outcome.results) {
        anyhow::bail!("Violations with fail-build were found");
    }
    if let Some(msg) = failure_message(outcome) {
        anyhow::bail!(msg);
    }
    if outcome.cancelled {
        anyhow::bail!("Scan cancelled by user; queued files were still scanned");
    }
    if outcome.passed() {
        info!("Scan completed successfully.");
        Ok(RunStatus::Passed)
    } else {
        warn!("Scan completed, findings detected.");
        Ok(RunStatus::FindingsDetected)
    }
}

/// Run the scan. Infrastructure failures come back as the terminal error.
pub fn handle_run(cli: &Cli) -> Result<RunStatus> {
    // Logger first so settings-file warnings are shown; verbosity is final once resolved.
    setup_logging(cli.verbose.unwrap_or(false));
    let settings = build_settings(cli, Path::new("."));
    setup_logging(settings.verbose);
    run_scan(cli, &settings).map_err(|e| anyhow::anyhow!("Scan command failed. {:#}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".graphscan.toml"),
            "[settings]\nthreads = 2\nproject = \"p1\"\nfail = false\n",
        )
        .unwrap();
        let cli = Cli::parse_from([
            "graphscan",
            "libs/*.jar",
            "--threads",
            "6",
            "--watches",
            "a,b",
            "--url",
            "https://scan.example.com",
        ]);
        let s = build_settings(&cli, dir.path());
        assert_eq!(s.threads, 6);
        assert_eq!(s.project.as_deref(), Some("p1"));
        assert_eq!(s.watches, vec!["a", "b"]);
        assert!(!s.fail);
        assert_eq!(s.url.as_deref(), Some("https://scan.example.com"));
    }

    #[test]
    fn test_path_group_from_pattern() {
        let cli = Cli::parse_from([
            "graphscan",
            "libs/*.jar",
            "--target",
            "repo/libs/",
            "--recursive=false",
            "--exclusions",
            "*-sources.jar;*.pom",
        ]);
        let groups = path_groups(&cli).unwrap();
        assert_eq!(
            groups,
            vec![
                PathGroup::new("libs/*.jar")
                    .with_target("repo/libs/")
                    .with_recursive(false)
                    .with_exclusions(vec!["*-sources.jar".to_string(), "*.pom".to_string()])
            ]
        );
    }

    #[test]
    fn test_path_groups_from_spec_file() {
        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("spec.json");
        std::fs::write(
            &spec,
            r#"{"files":[{"pattern":"a/*.jar","target":"r/"},{"pattern":"b/(.*)\\.war","regexp":true,"recursive":false}]}"#,
        )
        .unwrap();
        let cli = Cli::parse_from(["graphscan", "--spec", spec.to_str().unwrap()]);
        let groups = path_groups(&cli).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].target, "r/");
        assert!(groups[1].regexp);
        assert!(!groups[1].recursive);
    }

    #[test]
    fn test_pattern_and_spec_conflict() {
        assert!(Cli::try_parse_from(["graphscan", "x", "--spec", "s.json"]).is_err());
        assert!(Cli::try_parse_from(["graphscan"]).is_err());
    }

    fn violation(fail_build: bool) -> crate::Violation {
        crate::Violation {
            issue_id: "XRAY-1".to_string(),
            fail_build,
            ..Default::default()
        }
    }

    fn outcome_with(violations: Vec<crate::Violation>) -> ScanOutcome {
        ScanOutcome {
            results: vec![crate::ScanResult {
                scan_id: "s1".to_string(),
                violations,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn failure(graph: &str) -> crate::FailureRecord {
        crate::FailureRecord {
            stage: crate::Stage::Dispatch,
            error: crate::error::ScanError::remote(graph, "502 Bad Gateway"),
        }
    }

    fn with_watches() -> Settings {
        Settings {
            watches: vec!["prod".to_string()],
            ..Settings::default()
        }
    }

    #[test]
    fn test_clean_run_passes() {
        let status = run_status(&outcome_with(Vec::new()), &Settings::default()).unwrap();
        assert_eq!(status, RunStatus::Passed);
    }

    #[test]
    fn test_findings_without_failures() {
        let status = run_status(&outcome_with(vec![violation(false)]), &with_watches()).unwrap();
        assert_eq!(status, RunStatus::FindingsDetected);
    }

    #[test]
    fn test_fail_build_violation_with_context_is_terminal() {
        let err = run_status(&outcome_with(vec![violation(true)]), &with_watches()).unwrap_err();
        assert!(err.to_string().contains("fail-build"));
    }

    #[test]
    fn test_fail_build_ignored_when_vulnerabilities_requested() {
        let outcome = outcome_with(vec![violation(true)]);
        // No context: vulnerabilities are included by default.
        let status = run_status(&outcome, &Settings::default()).unwrap();
        assert_eq!(status, RunStatus::FindingsDetected);

        let settings = Settings {
            include_vulnerabilities: Some(true),
            ..with_watches()
        };
        assert_eq!(
            run_status(&outcome, &settings).unwrap(),
            RunStatus::FindingsDetected
        );
    }

    #[test]
    fn test_fail_build_applies_without_context_when_vulnerabilities_off() {
        let settings = Settings {
            include_vulnerabilities: Some(false),
            ..Settings::default()
        };
        assert!(run_status(&outcome_with(vec![violation(true)]), &settings).is_err());
    }

    #[test]
    fn test_fail_build_disabled() {
        let settings = Settings {
            fail: false,
            ..with_watches()
        };
        let status = run_status(&outcome_with(vec![violation(true)]), &settings).unwrap();
        assert_eq!(status, RunStatus::FindingsDetected);
    }

    #[test]
    fn test_findings_plus_failure_is_terminal_with_count() {
        let mut outcome = outcome_with(vec![violation(false)]);
        outcome.dispatch_failures = vec![failure("g1"), failure("g2")];
        outcome.dropped_failures = 1;
        let msg = run_status(&outcome, &with_watches()).unwrap_err().to_string();
        assert!(msg.contains("g1"));
        assert!(msg.contains("(and 2 more failure(s))"));
    }

    #[test]
    fn test_single_failure_has_no_count() {
        let mut outcome = outcome_with(Vec::new());
        outcome.dispatch_failures = vec![failure("g1")];
        assert_eq!(
            failure_message(&outcome).as_deref(),
            Some("[dispatch] scanning g1 failed: 502 Bad Gateway")
        );
    }

    #[test]
    fn test_cancelled_run_is_terminal() {
        let mut outcome = outcome_with(Vec::new());
        outcome.cancelled = true;
        let err = run_status(&outcome, &Settings::default()).unwrap_err();
        assert!(err.to_string().contains("cancelled"));
    }
}
