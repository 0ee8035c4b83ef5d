//! Result output: JSON or a compact listing, plus the fail-build rule.

use anyhow::Result;

use crate::utils::Colors;
use crate::{OutputFormat, ScanResult};

/// True if any violation asks to fail the build.
pub fn check_fail_build(results: &[ScanResult]) -> bool {
    results
        .iter()
        .flat_map(|r| r.violations.iter())
        .any(|v| v.fail_build)
}

fn component_list<T>(components: &std::collections::BTreeMap<String, T>) -> String {
    components.keys().cloned().collect::<Vec<_>>().join(", ")
}

/// Compact listing of one result.
pub fn format_result(result: &ScanResult, include_licenses: bool) -> Vec<String> {
    let mut lines = vec![format!("Scan {}", result.scan_id)];
    for v in &result.violations {
        lines.push(format!(
            "  violation  [{}] {} {} (watch: {}) {}",
            v.severity,
            v.issue_id,
            v.summary,
            v.watch_name,
            component_list(&v.components)
        ));
    }
    for v in &result.vulnerabilities {
        let cves = v
            .cves
            .iter()
            .map(|c| c.cve.as_str())
            .collect::<Vec<_>>()
            .join(",");
        lines.push(format!(
            "  vulnerability  [{}] {} {} {} {}",
            v.severity,
            v.issue_id,
            cves,
            v.summary,
            component_list(&v.components)
        ));
    }
    if include_licenses {
        for l in &result.licenses {
            lines.push(format!(
                "  license  {} {}",
                l.license_key,
                component_list(&l.components)
            ));
        }
    }
    lines
}

pub fn print_results(
    results: &[ScanResult],
    format: OutputFormat,
    include_licenses: bool,
) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(results)?),
        OutputFormat::Table => {
            for result in results {
                for line in format_result(result, include_licenses) {
                    println!("{}", line);
                }
            }
            let findings = results.iter().filter(|r| r.has_findings()).count();
            let summary = format!("{} graph(s) scanned, {} with findings", results.len(), findings);
            let color = if findings == 0 {
                Colors::PASSED
            } else {
                Colors::FINDING
            };
            println!("{}", Colors::colorize(color, &summary));
        }
    }
    Ok(())
}
