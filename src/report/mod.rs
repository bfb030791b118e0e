// SPDX-License-Identifier: PMPL-1.0-or-later
//! Rendering of scan results.
//!
//! - Text: per-file listing for terminals
//! - JSON: results plus a run summary
//! - SARIF 2.1.0: for code-scanning integrations

use crate::model::{IssueType, ScanResult, Severity};
use serde::Serialize;
use std::collections::BTreeMap;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Sarif,
}

/// Totals over a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub files: usize,
    pub files_with_issues: usize,
    pub total_issues: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
    pub fixable: usize,
    pub fixed: usize,
    /// Issue counts keyed by kebab-case type
    pub by_type: BTreeMap<String, usize>,
}

impl ReportSummary {
    pub fn from_results(results: &[ScanResult]) -> Self {
        let mut summary = ReportSummary {
            files: results.len(),
            ..Default::default()
        };

        for result in results {
            if result.total > 0 {
                summary.files_with_issues += 1;
            }
            summary.total_issues += result.total;
            summary.fixable += result.fixable_count();
            summary.fixed += result.fixed;

            for issue in &result.issues {
                match issue.severity {
                    Severity::Error => summary.errors += 1,
                    Severity::Warning => summary.warnings += 1,
                    Severity::Info => summary.info += 1,
                }
                *summary
                    .by_type
                    .entry(issue.issue_type.to_string())
                    .or_insert(0) += 1;
            }
        }

        summary
    }
}

/// Render `results` in the requested format
pub fn generate_report(results: &[ScanResult], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => generate_text_report(results),
        OutputFormat::Json => generate_json_report(results),
        OutputFormat::Sarif => generate_sarif_report(results),
    }
}

fn generate_text_report(results: &[ScanResult]) -> String {
    let summary = ReportSummary::from_results(results);
    let mut output = String::new();

    output.push_str("=== a11ybot Accessibility Report ===\n\n");

    if summary.total_issues == 0 {
        output.push_str(&format!(
            "Scanned {} file(s). No accessibility issues found.\n",
            summary.files
        ));
        return output;
    }

    for result in results.iter().filter(|r| r.total > 0) {
        output.push_str(&format!("{} ({} issue(s)", result.file.display(), result.total));
        if result.fixed > 0 {
            output.push_str(&format!(", {} fixed", result.fixed));
        }
        output.push_str(")\n");

        for issue in &result.issues {
            output.push_str(&format!(
                "  {}:{} {} [{}] {}\n",
                issue.line, issue.column, issue.severity, issue.issue_type, issue.message
            ));
            if !issue.code.is_empty() {
                output.push_str(&format!("    {}\n", issue.code));
            }
            if let Some(ref fix) = issue.fix {
                output.push_str(&format!("    Fix: {}\n", fix.description));
            }
        }
        output.push('\n');
    }

    output.push_str(&format!(
        "Found {} issue(s) in {} of {} file(s): {} error(s), {} warning(s), {} info\n",
        summary.total_issues,
        summary.files_with_issues,
        summary.files,
        summary.errors,
        summary.warnings,
        summary.info
    ));
    if summary.fixed > 0 {
        output.push_str(&format!("Fixed {} issue(s)\n", summary.fixed));
    } else if summary.fixable > 0 {
        output.push_str(&format!(
            "{} issue(s) can be fixed automatically with --fix\n",
            summary.fixable
        ));
    }

    output
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    summary: ReportSummary,
    results: &'a [ScanResult],
}

fn generate_json_report(results: &[ScanResult]) -> String {
    let report = JsonReport {
        summary: ReportSummary::from_results(results),
        results,
    };
    serde_json::to_string_pretty(&report).unwrap_or_else(|e| {
        format!("{{\"error\": \"Failed to serialize results: {}\"}}", e)
    })
}

#[derive(Debug, Serialize)]
struct SarifReport {
    #[serde(rename = "$schema")]
    schema: String,
    version: String,
    runs: Vec<SarifRun>,
}

#[derive(Debug, Serialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Debug, Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifDriver {
    name: String,
    version: String,
    rules: Vec<SarifRule>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRule {
    id: String,
    short_description: SarifMessage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifResult {
    rule_id: String,
    level: String,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
}

#[derive(Debug, Serialize)]
struct SarifMessage {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifLocation {
    physical_location: SarifPhysicalLocation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifPhysicalLocation {
    artifact_location: SarifArtifactLocation,
    region: SarifRegion,
}

#[derive(Debug, Serialize)]
struct SarifArtifactLocation {
    uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRegion {
    start_line: usize,
    start_column: usize,
}

fn sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "note",
    }
}

fn generate_sarif_report(results: &[ScanResult]) -> String {
    let sarif_results: Vec<SarifResult> = results
        .iter()
        .flat_map(|result| {
            let uri = result.file.display().to_string().replace('\\', "/");
            result.issues.iter().map(move |issue| SarifResult {
                rule_id: issue.issue_type.to_string(),
                level: sarif_level(issue.severity).to_string(),
                message: SarifMessage {
                    text: issue.message.clone(),
                },
                locations: vec![SarifLocation {
                    physical_location: SarifPhysicalLocation {
                        artifact_location: SarifArtifactLocation { uri: uri.clone() },
                        region: SarifRegion {
                            start_line: issue.line,
                            start_column: issue.column,
                        },
                    },
                }],
            })
        })
        .collect();

    let rules = IssueType::ALL
        .iter()
        .map(|t| SarifRule {
            id: t.to_string(),
            short_description: SarifMessage {
                text: t.to_string().replace('-', " "),
            },
        })
        .collect();

    let report = SarifReport {
        schema: "https://json.schemastore.org/sarif-2.1.0.json".to_string(),
        version: "2.1.0".to_string(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: "a11ybot".to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    rules,
                },
            },
            results: sarif_results,
        }],
    };

    serde_json::to_string_pretty(&report).unwrap_or_else(|e| {
        format!("{{\"error\": \"Failed to serialize SARIF report: {}\"}}", e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Fix, Issue};
    use std::path::PathBuf;

    fn sample_results() -> Vec<ScanResult> {
        let alt = Issue::new(IssueType::MissingAltText, Severity::Error, "Image is missing an alt attribute.")
            .at(10, 3)
            .with_code("<img src=\"a.png\">");
        let fix = Fix::add_attribute("alt", "", alt.position(), "Add empty alt attribute");
        vec![
            ScanResult::new(
                PathBuf::from("site/index.html"),
                vec![
                    alt.with_fix(fix),
                    Issue::new(IssueType::MissingLandmark, Severity::Info, "No main landmark.").at(4, 1),
                ],
            ),
            ScanResult::empty(PathBuf::from("src/App.tsx")),
        ]
    }

    #[test]
    fn test_summary_counts() {
        let summary = ReportSummary::from_results(&sample_results());
        assert_eq!(summary.files, 2);
        assert_eq!(summary.files_with_issues, 1);
        assert_eq!(summary.total_issues, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.info, 1);
        assert_eq!(summary.fixable, 1);
        assert_eq!(summary.by_type.get("missing-alt-text"), Some(&1));
    }

    #[test]
    fn test_text_report_empty() {
        let report = generate_report(&[ScanResult::empty(PathBuf::from("a.html"))], OutputFormat::Text);
        assert!(report.contains("No accessibility issues found"));
    }

    #[test]
    fn test_text_report_with_issues() {
        let report = generate_report(&sample_results(), OutputFormat::Text);
        assert!(report.contains("site/index.html (2 issue(s))"));
        assert!(report.contains("10:3 ERROR [missing-alt-text]"));
        assert!(report.contains("Fix: Add empty alt attribute"));
        assert!(report.contains("1 issue(s) can be fixed automatically"));
        assert!(!report.contains("App.tsx"));
    }

    #[test]
    fn test_json_report() {
        let report = generate_report(&sample_results(), OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&report).expect("valid JSON");
        assert_eq!(parsed["summary"]["total_issues"], 2);
        assert_eq!(parsed["results"][0]["issues"][0]["type"], "missing-alt-text");
        assert_eq!(parsed["results"][0]["issues"][0]["severity"], "error");
    }

    #[test]
    fn test_sarif_report() {
        let report = generate_report(&sample_results(), OutputFormat::Sarif);
        let parsed: serde_json::Value = serde_json::from_str(&report).expect("valid JSON");
        assert_eq!(parsed["version"], "2.1.0");
        let results = parsed["runs"][0]["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["ruleId"], "missing-alt-text");
        assert_eq!(results[1]["level"], "note");
        assert_eq!(
            results[0]["locations"][0]["physicalLocation"]["region"]["startColumn"],
            3
        );
    }
}
