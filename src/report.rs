//! Output formatting for validation results.
//!
//! Supports three output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: every [`ValidationReport`] plus a run summary
//! - SARIF: Static Analysis Results Interchange Format for IDE/CI integration

use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::score;
use crate::validate::{Detection, DetectionKind, Severity, ValidationReport};

/// Result of checking every report against the confidence threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub files: usize,
    pub detections: usize,
    pub min_confidence: f64,
    /// Lowest confidence of any report, 1.0 when there are none.
    pub lowest_confidence: f64,
    pub below_threshold: usize,
}

impl RunSummary {
    pub fn new(reports: &[ValidationReport], min_confidence: f64) -> Self {
        Self {
            files: reports.len(),
            detections: reports.iter().map(|r| r.detections.len()).sum(),
            min_confidence,
            lowest_confidence: reports
                .iter()
                .map(|r| r.overall_confidence)
                .fold(1.0, f64::min),
            below_threshold: reports
                .iter()
                .filter(|r| r.overall_confidence < min_confidence)
                .count(),
        }
    }

    pub fn passed(&self) -> bool {
        self.below_threshold == 0
    }
}

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonOutput {
    pub version: String,
    pub path: String,
    pub files_validated: usize,
    pub min_confidence: f64,
    pub passed: bool,
    pub reports: Vec<ValidationReport>,
}

pub fn to_json(path: &str, reports: &[ValidationReport], summary: &RunSummary) -> anyhow::Result<String> {
    let output = JsonOutput {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: path.to_string(),
        files_validated: summary.files,
        min_confidence: summary.min_confidence,
        passed: summary.passed(),
        reports: reports.to_vec(),
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

// =============================================================================
// SARIF Format
// =============================================================================

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const TOOL_NAME: &str = "groundcheck";

#[derive(Serialize, Deserialize)]
struct SarifReport {
    version: String,
    #[serde(rename = "$schema")]
    schema: String,
    runs: Vec<SarifRun>,
}

#[derive(Serialize, Deserialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Serialize, Deserialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize, Deserialize)]
struct SarifDriver {
    name: String,
    version: String,
    rules: Vec<SarifRule>,
}

#[derive(Serialize, Deserialize)]
struct SarifRule {
    id: String,
    name: String,
    #[serde(rename = "shortDescription")]
    short_description: SarifMessage,
    #[serde(rename = "defaultConfiguration")]
    default_config: SarifRuleConfig,
}

#[derive(Serialize, Deserialize)]
struct SarifRuleConfig {
    level: String,
}

#[derive(Serialize, Deserialize)]
struct SarifResult {
    #[serde(rename = "ruleId")]
    rule_id: String,
    level: String,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
    properties: SarifProperties,
}

#[derive(Serialize, Deserialize)]
struct SarifProperties {
    confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct SarifMessage {
    text: String,
}

#[derive(Serialize, Deserialize)]
struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    physical_location: SarifPhysicalLocation,
}

#[derive(Serialize, Deserialize)]
struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    artifact_location: SarifArtifact,
    region: SarifRegion,
}

#[derive(Serialize, Deserialize)]
struct SarifArtifact {
    uri: String,
}

#[derive(Serialize, Deserialize)]
struct SarifRegion {
    #[serde(rename = "startLine")]
    start_line: usize,
}

/// Rule metadata for SARIF output.
struct RuleInfo {
    name: &'static str,
    short_description: &'static str,
    default_level: &'static str,
}

fn rule_info(kind: DetectionKind) -> RuleInfo {
    let (name, short_description, default_level) = match kind {
        DetectionKind::ComponentNotFound => ("ComponentNotFound", "A component is used but never declared or imported", "error"),
        DetectionKind::HookNotFound => ("HookNotFound", "A hook is called but never declared or imported", "error"),
        DetectionKind::SupabaseTableNotFound => ("TableNotFound", "A queried table does not exist in the database schema", "error"),
        DetectionKind::SupabaseFunctionNotFound => ("FunctionNotFound", "A called RPC function does not exist in the database schema", "error"),
        DetectionKind::RpcParameterTypeMismatch => ("RpcParameterTypeMismatch", "An RPC argument does not match the declared parameter type", "error"),
        DetectionKind::RpcMissingRequiredParam => ("RpcMissingRequiredParam", "A required RPC parameter is not provided", "error"),
        DetectionKind::RpcInvalidEnumValue => ("RpcInvalidEnumValue", "An RPC argument is not a member of the declared enum", "error"),
        DetectionKind::RpcInvalidJsonStructure => ("RpcInvalidJsonStructure", "A JSON RPC argument has the wrong shape", "error"),
        DetectionKind::RpcParameterCountMismatch => ("RpcParameterCountMismatch", "An RPC call passes too few or too many parameters", "error"),
        DetectionKind::IncorrectSignature => ("IncorrectSignature", "A call does not match the callee's signature", "warning"),
        DetectionKind::InvalidType => ("InvalidType", "A type reference is unknown or unsafe", "warning"),
        DetectionKind::BadPractice => ("BadPractice", "Code that works but should be written differently", "note"),
        DetectionKind::ImportNotFound => ("ImportNotFound", "A relative import does not resolve to a file", "error"),
        DetectionKind::AnalysisFailure => ("AnalysisFailure", "The file could not be validated", "error"),
    };
    RuleInfo {
        name,
        short_description,
        default_level,
    }
}

fn map_severity_to_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::High => "error",
        Severity::Medium => "warning",
        Severity::Low | Severity::Info => "note",
    }
}

pub fn to_sarif(reports: &[ValidationReport]) -> anyhow::Result<String> {
    let detections: Vec<&Detection> = reports.iter().flat_map(|r| r.detections.iter()).collect();

    let kinds: BTreeSet<DetectionKind> = detections.iter().map(|d| d.kind).collect();
    let rules: Vec<SarifRule> = kinds
        .into_iter()
        .map(|kind| {
            let info = rule_info(kind);
            SarifRule {
                id: kind.as_str().to_string(),
                name: info.name.to_string(),
                short_description: SarifMessage {
                    text: info.short_description.to_string(),
                },
                default_config: SarifRuleConfig {
                    level: info.default_level.to_string(),
                },
            }
        })
        .collect();

    let results: Vec<SarifResult> = detections
        .iter()
        .map(|d| SarifResult {
            rule_id: d.kind.as_str().to_string(),
            level: map_severity_to_level(d.severity).to_string(),
            message: SarifMessage {
                text: d.message.clone(),
            },
            locations: vec![SarifLocation {
                physical_location: SarifPhysicalLocation {
                    artifact_location: SarifArtifact {
                        uri: d.location.file.replace('\\', "/"),
                    },
                    region: SarifRegion {
                        start_line: d.line().max(1),
                    },
                },
            }],
            properties: SarifProperties {
                confidence: d.confidence,
                suggestion: d.suggestion.clone(),
            },
        })
        .collect();

    let report = SarifReport {
        version: SARIF_VERSION.to_string(),
        schema: SARIF_SCHEMA.to_string(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: TOOL_NAME.to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    rules,
                },
            },
            results,
        }],
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write reports in pretty (human-readable) format.
pub fn write_pretty(path: &str, reports: &[ValidationReport], summary: &RunSummary) {
    println!();
    print!("  ");
    print!("{}", "groundcheck".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();
    print!("  {}", "Validating: ".dimmed());
    println!("{}", path);
    println!();

    for report in reports {
        write_report(report);
    }

    write_final_status(summary);
    println!();
}

fn write_report(report: &ValidationReport) {
    print!("  {}", report.script_path.blue().bold());
    print!("  {}", report.language.as_str().dimmed());
    if !report.frameworks_detected.is_empty() {
        print!("  {}", format!("[{}]", report.frameworks_detected.join(", ")).dimmed());
    }
    println!();

    print!("    Confidence: ");
    write_colored_confidence(report.overall_confidence);
    print!("  Grade: ");
    write_colored_grade(score::grade(report.overall_confidence));
    println!();
    println!();

    if !report.detections.is_empty() {
        for d in &report.detections {
            write_severity_tag(d.severity);
            print!(" {:<30}", d.kind.as_str().dimmed());
            print!("{}", format!(":{}", d.line()).dimmed());
            println!();
            println!("            {}", d.message);
            if let Some(suggestion) = &d.suggestion {
                println!("            {}", format!("→ {}", suggestion).dimmed());
            }
        }
        println!();
    }

    if !report.recommendations.is_empty() {
        println!("    {}", "Recommendations:".bold());
        for r in &report.recommendations {
            println!("      - {}", r);
        }
        println!();
    }
}

fn write_colored_confidence(c: f64) {
    let text = format!("{:.2}", c);
    match c {
        c if c >= 0.9 => print!("{}", text.green().bold()),
        c if c >= 0.75 => print!("{}", text.green()),
        c if c >= 0.6 => print!("{}", text.yellow()),
        c if c >= 0.45 => print!("{}", text.yellow().bold()),
        _ => print!("{}", text.red()),
    }
}

fn write_colored_grade(grade: &str) {
    match grade {
        "A" => print!("{}", grade.green().bold()),
        "B" => print!("{}", grade.green()),
        "C" => print!("{}", grade.yellow()),
        "D" => print!("{}", grade.yellow().bold()),
        _ => print!("{}", grade.red()),
    }
}

fn write_severity_tag(severity: Severity) {
    match severity {
        Severity::Critical => print!("    {}", "CRIT ".red().bold()),
        Severity::High => print!("    {}", "HIGH ".red()),
        Severity::Medium => print!("    {}", "MED  ".yellow()),
        Severity::Low => print!("    {}", "LOW  ".blue()),
        Severity::Info => print!("    {}", "INFO ".dimmed()),
    }
}

fn write_final_status(summary: &RunSummary) {
    print!(
        "  {}",
        format!(
            "{} files, {} detections, min confidence {:.2}",
            summary.files, summary.detections, summary.min_confidence
        )
        .dimmed()
    );
    print!("  Lowest: ");
    write_colored_confidence(summary.lowest_confidence);
    print!("  ");
    if summary.passed() {
        print!("{}", "PASSED".green());
    } else {
        print!("{}", format!("FAILED ({} below threshold)", summary.below_threshold).red());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Language;
    use std::collections::BTreeSet;

    fn report(path: &str, detections: Vec<Detection>) -> ValidationReport {
        let mut r = ValidationReport::new(path, Language::TypeScript);
        r.detections = detections;
        r.finish(&BTreeSet::new(), Default::default());
        r
    }

    fn sample() -> Vec<ValidationReport> {
        vec![
            report(
                "src/App.tsx",
                vec![
                    Detection::new(DetectionKind::SupabaseTableNotFound, Severity::High, "missing", "src/App.tsx", 4)
                        .with_suggestion("Available tables: profiles"),
                    Detection::new(DetectionKind::BadPractice, Severity::Low, "style", "src/App.tsx", 9),
                ],
            ),
            report("src/ok.ts", vec![]),
        ]
    }

    #[test]
    fn test_summary_threshold() {
        let reports = sample();
        let summary = RunSummary::new(&reports, 0.9);
        assert_eq!(summary.files, 2);
        assert_eq!(summary.detections, 2);
        assert_eq!(summary.below_threshold, 1);
        assert!(!summary.passed());
        assert!(RunSummary::new(&reports, 0.0).passed());
        assert_eq!(RunSummary::new(&[], 0.5).lowest_confidence, 1.0);
    }

    #[test]
    fn test_json_output() {
        let reports = sample();
        let json = to_json(".", &reports, &RunSummary::new(&reports, 0.0)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["filesValidated"], 2);
        assert_eq!(value["passed"], true);
        assert_eq!(value["reports"][0]["detections"][0]["kind"], "SUPABASE_TABLE_NOT_FOUND");
        assert_eq!(value["reports"][0]["detections"][0]["severity"], "HIGH");
    }

    #[test]
    fn test_sarif_levels_and_rules() {
        let sarif = to_sarif(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&sarif).unwrap();
        assert_eq!(value["version"], "2.1.0");
        let run = &value["runs"][0];
        assert_eq!(run["tool"]["driver"]["rules"].as_array().unwrap().len(), 2);
        assert_eq!(run["results"][0]["level"], "error");
        assert_eq!(run["results"][1]["level"], "note");
        assert_eq!(
            run["results"][0]["locations"][0]["physicalLocation"]["region"]["startLine"],
            4
        );
        assert_eq!(map_severity_to_level(Severity::Medium), "warning");
    }
}
