//! Load `.graphscan.toml` (CLI only). Lib callers pass [`Settings`]/[`ScanOpts`](crate::ScanOpts) directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::config::PackagePaths;
use crate::{OutputFormat, Settings};

#[derive(Debug, Default, Deserialize)]
pub struct SettingsToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    url: Option<String>,
    indexer: Option<String>,
    indexer_args: Option<Vec<String>>,
    threads: Option<usize>,
    backlog: Option<usize>,
    failure_capacity: Option<usize>,
    project: Option<String>,
    watches: Option<Vec<String>>,
    fail: Option<bool>,
    vuln: Option<bool>,
    licenses: Option<bool>,
    format: Option<OutputFormat>,
    verbose: Option<bool>,
    /// Seconds.
    poll_interval: Option<u64>,
    /// Seconds.
    max_wait: Option<u64>,
}

/// Parse settings from TOML text.
pub fn parse_settings_toml(s: &str) -> Result<SettingsToml, toml::de::Error> {
    toml::from_str(s)
}

/// Load the settings file: `explicit` when given, else `.graphscan.toml` in `dir`.
/// Returns None if the file is missing or unreadable; a malformed file is warned about and ignored.
pub fn load_settings_toml(dir: &Path, explicit: Option<&Path>) -> Option<SettingsToml> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dir.join(PackagePaths::get().config_filename()));
    let s = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            if explicit.is_some() {
                log::warn!("{}: {}", path.display(), e);
            }
            return None;
        }
    };
    parse_settings_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite settings field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $settings:expr, $sec_field:ident => $settings_field:ident) => {
        if let Some(v) = $sec.$sec_field.clone() {
            $settings.$settings_field = v;
        }
    };
}

/// Apply file config to settings (only fields present in the file). Call before applying CLI.
pub fn apply_file_to_settings(file: &SettingsToml, settings: &mut Settings) {
    let sec = &file.settings;
    if let Some(ref url) = sec.url {
        settings.url = Some(url.clone());
    }
    if let Some(ref p) = sec.indexer {
        settings.indexer = Some(PathBuf::from(p));
    }
    if let Some(ref p) = sec.project {
        settings.project = Some(p.clone());
    }
    if let Some(v) = sec.vuln {
        settings.include_vulnerabilities = Some(v);
    }
    apply_file_opt!(sec, settings, indexer_args => indexer_args);
    apply_file_opt!(sec, settings, threads => threads);
    apply_file_opt!(sec, settings, backlog => backlog);
    apply_file_opt!(sec, settings, failure_capacity => failure_capacity);
    apply_file_opt!(sec, settings, watches => watches);
    apply_file_opt!(sec, settings, fail => fail);
    apply_file_opt!(sec, settings, licenses => include_licenses);
    apply_file_opt!(sec, settings, format => format);
    apply_file_opt!(sec, settings, verbose => verbose);
    if let Some(secs) = sec.poll_interval {
        settings.poll_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = sec.max_wait {
        settings.max_wait = Duration::from_secs(secs);
    }
}
