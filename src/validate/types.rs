//! Core types for validation findings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Severity levels for detections, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Info => "INFO",
        }
    }

    /// Map a sub-validator severity string, defaulting to MEDIUM.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or(Severity::Medium)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CRITICAL" => Ok(Severity::Critical),
            "HIGH" => Ok(Severity::High),
            "MEDIUM" => Ok(Severity::Medium),
            "LOW" => Ok(Severity::Low),
            "INFO" => Ok(Severity::Info),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Kinds of detections a report can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionKind {
    ComponentNotFound,
    HookNotFound,
    SupabaseTableNotFound,
    SupabaseFunctionNotFound,
    RpcParameterTypeMismatch,
    RpcMissingRequiredParam,
    RpcInvalidEnumValue,
    RpcInvalidJsonStructure,
    RpcParameterCountMismatch,
    IncorrectSignature,
    InvalidType,
    BadPractice,
    ImportNotFound,
    AnalysisFailure,
}

impl DetectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionKind::ComponentNotFound => "COMPONENT_NOT_FOUND",
            DetectionKind::HookNotFound => "HOOK_NOT_FOUND",
            DetectionKind::SupabaseTableNotFound => "SUPABASE_TABLE_NOT_FOUND",
            DetectionKind::SupabaseFunctionNotFound => "SUPABASE_FUNCTION_NOT_FOUND",
            DetectionKind::RpcParameterTypeMismatch => "RPC_PARAMETER_TYPE_MISMATCH",
            DetectionKind::RpcMissingRequiredParam => "RPC_MISSING_REQUIRED_PARAM",
            DetectionKind::RpcInvalidEnumValue => "RPC_INVALID_ENUM_VALUE",
            DetectionKind::RpcInvalidJsonStructure => "RPC_INVALID_JSON_STRUCTURE",
            DetectionKind::RpcParameterCountMismatch => "RPC_PARAMETER_COUNT_MISMATCH",
            DetectionKind::IncorrectSignature => "INCORRECT_SIGNATURE",
            DetectionKind::InvalidType => "INVALID_TYPE",
            DetectionKind::BadPractice => "BAD_PRACTICE",
            DetectionKind::ImportNotFound => "IMPORT_NOT_FOUND",
            DetectionKind::AnalysisFailure => "ANALYSIS_FAILURE",
        }
    }

    /// Whether this kind originates from the RPC parameter validator.
    pub fn is_rpc_parameter(&self) -> bool {
        matches!(
            self,
            DetectionKind::RpcParameterTypeMismatch
                | DetectionKind::RpcMissingRequiredParam
                | DetectionKind::RpcInvalidEnumValue
                | DetectionKind::RpcInvalidJsonStructure
                | DetectionKind::RpcParameterCountMismatch
        )
    }
}

impl std::fmt::Display for DetectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// File and line a detection points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line > 0 {
            write!(f, "{}:{}", self.file, self.line)
        } else {
            write!(f, "{}", self.file)
        }
    }
}

/// One typed, severity-ranked finding.
///
/// Detections are built once and never modified afterwards; use the
/// builder methods while constructing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub kind: DetectionKind,
    pub severity: Severity,
    pub message: String,
    pub location: Location,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

impl Detection {
    pub fn new(
        kind: DetectionKind,
        severity: Severity,
        message: impl Into<String>,
        file: impl Into<String>,
        line: usize,
    ) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            location: Location {
                file: file.into(),
                line,
            },
            confidence: 1.0,
            suggestion: None,
            context: BTreeMap::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        let s = suggestion.into();
        if !s.is_empty() {
            self.suggestion = Some(s);
        }
        self
    }

    pub fn with_context(mut self, key: &str, value: impl Into<String>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    pub fn line(&self) -> usize {
        self.location.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parse_and_default() {
        assert_eq!("high".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!(Severity::from_label("nonsense"), Severity::Medium);
        assert!(Severity::Critical < Severity::Info);
    }

    #[test]
    fn test_detection_serializes_upper_case() {
        let d = Detection::new(
            DetectionKind::RpcInvalidEnumValue,
            Severity::High,
            "bad enum",
            "src/a.ts",
            3,
        )
        .with_confidence(1.7)
        .with_context("parameter", "range");

        assert_eq!(d.confidence, 1.0);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "RPC_INVALID_ENUM_VALUE");
        assert_eq!(json["severity"], "HIGH");
        assert_eq!(json["location"]["line"], 3);
        assert!(json.get("suggestion").is_none());
    }
}
