//! Per-file validation report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::types::{Detection, DetectionKind, Severity};
use crate::analysis::Language;
use crate::score::overall_confidence;

/// Everything found in one validated file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub script_path: String,
    pub language: Language,
    pub analysis_timestamp: DateTime<Utc>,
    pub overall_confidence: f64,
    pub detections: Vec<Detection>,
    pub frameworks_detected: Vec<String>,
    pub recommendations: Vec<String>,
    pub statistics: BTreeMap<String, usize>,
}

/// Counts of backend accesses seen in a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendUsage {
    pub tables: usize,
    pub functions: usize,
}

impl BackendUsage {
    pub fn is_empty(&self) -> bool {
        self.tables == 0 && self.functions == 0
    }
}

impl ValidationReport {
    pub fn new(script_path: impl Into<String>, language: Language) -> Self {
        Self {
            script_path: script_path.into(),
            language,
            analysis_timestamp: Utc::now(),
            overall_confidence: 1.0,
            detections: Vec::new(),
            frameworks_detected: Vec::new(),
            recommendations: Vec::new(),
            statistics: BTreeMap::new(),
        }
    }

    /// Report for a file whose validation could not run.
    pub fn failed(script_path: impl Into<String>, language: Language, error: &str) -> Self {
        let script_path = script_path.into();
        let mut report = Self::new(script_path.clone(), language);
        report.detections.push(
            Detection::new(
                DetectionKind::AnalysisFailure,
                Severity::Critical,
                format!("Validation failed: {}", error),
                script_path,
                1,
            )
            .with_confidence(1.0),
        );
        report.finish(&BTreeSet::new(), BackendUsage::default());
        report
    }

    /// Sort detections, then derive confidence, recommendations and statistics.
    pub fn finish(&mut self, frameworks: &BTreeSet<String>, usage: BackendUsage) {
        self.detections.sort_by_key(|d| d.line());
        self.frameworks_detected = frameworks.iter().cloned().collect();
        self.overall_confidence = overall_confidence(&self.detections);
        self.recommendations = recommendations(self);
        self.statistics = statistics(self, usage);
    }

    pub fn count_severity(&self, severity: Severity) -> usize {
        self.detections.iter().filter(|d| d.severity == severity).count()
    }

    pub fn count_kind(&self, kind: DetectionKind) -> usize {
        self.detections.iter().filter(|d| d.kind == kind).count()
    }

    pub fn has_framework(&self, name: &str) -> bool {
        self.frameworks_detected.iter().any(|f| f == name)
    }

    pub fn is_clean(&self) -> bool {
        self.detections.is_empty()
    }
}

fn kind_counts(report: &ValidationReport) -> BTreeMap<DetectionKind, usize> {
    let mut counts = BTreeMap::new();
    for d in &report.detections {
        *counts.entry(d.kind).or_insert(0) += 1;
    }
    counts
}

/// Human-readable advice keyed off which kinds of detections occurred.
pub fn recommendations(report: &ValidationReport) -> Vec<String> {
    let counts = kind_counts(report);
    let count = |kind: DetectionKind| counts.get(&kind).copied().unwrap_or(0);
    let rpc_problems: usize = counts
        .iter()
        .filter(|(k, _)| k.is_rpc_parameter())
        .map(|(_, n)| n)
        .sum();

    let mut out = Vec::new();
    let n = count(DetectionKind::ComponentNotFound);
    if n > 0 {
        out.push(format!(
            "Found {} unknown components. Verify component imports and check that they exist in your codebase.",
            n
        ));
    }
    let n = count(DetectionKind::HookNotFound);
    if n > 0 {
        out.push(format!(
            "Found {} calls to undeclared hooks. Import them or check for typos in the hook name.",
            n
        ));
    }
    let n = count(DetectionKind::SupabaseTableNotFound);
    if n > 0 {
        out.push(format!(
            "Found {} references to non-existent Supabase tables. Update your database schema or fix table names in your code.",
            n
        ));
    }
    let n = count(DetectionKind::SupabaseFunctionNotFound);
    if n > 0 {
        out.push(format!(
            "Found {} calls to non-existent RPC functions. Check the function names against your database.",
            n
        ));
    }
    if rpc_problems > 0 {
        out.push(format!(
            "Found {} RPC parameter problems. Compare call arguments with the function's declared parameters.",
            rpc_problems
        ));
    }
    let n = count(DetectionKind::IncorrectSignature);
    if n > 0 {
        out.push(format!(
            "Found {} functions with incorrect signatures. Check framework documentation for correct function parameters.",
            n
        ));
    }
    let n = count(DetectionKind::BadPractice);
    if n > 0 {
        out.push(format!(
            "Found {} code style issues. Consider following React and TypeScript best practices.",
            n
        ));
    }
    if out.is_empty() {
        out.push("No major issues detected. Code appears to follow good practices.".into());
    }

    if report.has_framework("react") {
        out.push("Use React DevTools and ESLint React plugin for additional validation.".into());
        out.push("Follow React Hooks rules and best practices.".into());
    }
    match report.language {
        Language::TypeScript => {
            out.push("Enable TypeScript strict mode for better type checking.".into())
        }
        Language::JavaScript => {
            out.push("Consider migrating to TypeScript for better static analysis.".into())
        }
        _ => {}
    }
    out
}

/// Per-severity, per-kind and per-category counters.
pub fn statistics(report: &ValidationReport, usage: BackendUsage) -> BTreeMap<String, usize> {
    let mut stats = BTreeMap::new();
    stats.insert("total_detections".to_string(), report.detections.len());
    for severity in Severity::ALL {
        stats.insert(
            format!("{}_issues", severity.as_str().to_lowercase()),
            report.count_severity(severity),
        );
    }
    stats.insert("frameworks_detected".to_string(), report.frameworks_detected.len());
    if !usage.is_empty() {
        stats.insert("supabase_tables".to_string(), usage.tables);
        stats.insert("supabase_functions".to_string(), usage.functions);
    }
    for (kind, n) in kind_counts(report) {
        stats.insert(format!("kind:{}", kind.as_str()), n);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(kinds: &[(DetectionKind, Severity)], language: Language) -> ValidationReport {
        let mut report = ValidationReport::new("src/App.tsx", language);
        for (i, (kind, severity)) in kinds.iter().enumerate() {
            report
                .detections
                .push(Detection::new(*kind, *severity, "x", "src/App.tsx", 10 - i));
        }
        let frameworks: BTreeSet<String> = ["react".to_string()].into_iter().collect();
        report.finish(&frameworks, BackendUsage { tables: 2, functions: 1 });
        report
    }

    #[test]
    fn test_finish_sorts_and_scores() {
        let report = report_with(
            &[
                (DetectionKind::SupabaseTableNotFound, Severity::High),
                (DetectionKind::BadPractice, Severity::Low),
            ],
            Language::TypeScript,
        );
        assert_eq!(report.detections[0].line(), 9);
        assert!(report.overall_confidence < 1.0);
        assert_eq!(report.frameworks_detected, vec!["react"]);
    }

    #[test]
    fn test_statistics_keys() {
        let report = report_with(
            &[
                (DetectionKind::RpcMissingRequiredParam, Severity::High),
                (DetectionKind::RpcParameterCountMismatch, Severity::High),
                (DetectionKind::BadPractice, Severity::Low),
            ],
            Language::TypeScript,
        );
        let stats = &report.statistics;
        assert_eq!(stats["total_detections"], 3);
        assert_eq!(stats["high_issues"], 2);
        assert_eq!(stats["low_issues"], 1);
        assert_eq!(stats["critical_issues"], 0);
        assert_eq!(stats["frameworks_detected"], 1);
        assert_eq!(stats["supabase_tables"], 2);
        assert_eq!(stats["supabase_functions"], 1);
        assert_eq!(stats["kind:RPC_MISSING_REQUIRED_PARAM"], 1);
        assert!(!stats.contains_key("kind:COMPONENT_NOT_FOUND"));
    }

    #[test]
    fn test_recommendations() {
        let report = report_with(
            &[
                (DetectionKind::RpcInvalidEnumValue, Severity::High),
                (DetectionKind::SupabaseTableNotFound, Severity::High),
            ],
            Language::JavaScript,
        );
        let recs = &report.recommendations;
        assert!(recs[0].starts_with("Found 1 references to non-existent Supabase tables"));
        assert!(recs[1].starts_with("Found 1 RPC parameter problems"));
        assert!(recs.iter().any(|r| r.contains("React Hooks rules")));
        assert!(recs.last().unwrap().contains("migrating to TypeScript"));

        let clean = report_with(&[], Language::Python);
        assert_eq!(clean.recommendations[0], "No major issues detected. Code appears to follow good practices.");
        assert_eq!(clean.overall_confidence, 1.0);
    }

    #[test]
    fn test_failed_report() {
        let report = ValidationReport::failed("a.ts", Language::TypeScript, "boom");
        assert_eq!(report.detections.len(), 1);
        assert_eq!(report.detections[0].kind, DetectionKind::AnalysisFailure);
        assert!((report.overall_confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_serializes_camel_case() {
        let report = ValidationReport::new("a.py", Language::Python);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["scriptPath"], "a.py");
        assert_eq!(json["language"], "python");
        assert!(json.get("overallConfidence").is_some());
        assert!(json.get("frameworksDetected").is_some());
    }
}
