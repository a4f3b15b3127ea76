//! Confidence scoring for validation reports.
//!
//! A report starts at full confidence (1.0) and loses confidence in
//! proportion to how severe and how certain its detections are.

use crate::validate::{Detection, Severity};

/// Per-severity weights used by [`overall_confidence`].
pub mod weights {
    pub const CRITICAL: f64 = 1.0;
    pub const HIGH: f64 = 0.8;
    pub const MEDIUM: f64 = 0.6;
    pub const LOW: f64 = 0.4;
    pub const INFO: f64 = 0.2;
}

/// Get the weight for a severity.
pub fn severity_weight(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => weights::CRITICAL,
        Severity::High => weights::HIGH,
        Severity::Medium => weights::MEDIUM,
        Severity::Low => weights::LOW,
        Severity::Info => weights::INFO,
    }
}

/// Compute `max(0, 1 - Σ weight(d)·confidence(d) / (2·n))`.
///
/// An empty detection list scores 1.0.
pub fn overall_confidence(detections: &[Detection]) -> f64 {
    if detections.is_empty() {
        return 1.0;
    }

    let penalty: f64 = detections
        .iter()
        .map(|d| severity_weight(d.severity) * d.confidence.clamp(0.0, 1.0))
        .sum();

    (1.0 - penalty / (2.0 * detections.len() as f64)).max(0.0)
}

/// Letter grade shown next to the confidence in pretty output.
pub fn grade(confidence: f64) -> &'static str {
    match confidence {
        c if c >= 0.9 => "A",
        c if c >= 0.75 => "B",
        c if c >= 0.6 => "C",
        c if c >= 0.45 => "D",
        _ => "F",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::DetectionKind;

    fn detection(severity: Severity, confidence: f64) -> Detection {
        Detection::new(DetectionKind::BadPractice, severity, "x", "f.ts", 1)
            .with_confidence(confidence)
    }

    #[test]
    fn test_empty_is_full_confidence() {
        assert_eq!(overall_confidence(&[]), 1.0);
    }

    #[test]
    fn test_single_critical() {
        let c = overall_confidence(&[detection(Severity::Critical, 1.0)]);
        assert!((c - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_mixed_severities() {
        let ds = vec![
            detection(Severity::High, 0.9),
            detection(Severity::Low, 0.5),
        ];
        // 1 - (0.72 + 0.2) / 4
        let c = overall_confidence(&ds);
        assert!((c - 0.77).abs() < 1e-9);
    }

    #[test]
    fn test_never_negative() {
        let ds: Vec<_> = (0..10).map(|_| detection(Severity::Critical, 1.0)).collect();
        assert!(overall_confidence(&ds) >= 0.0);
    }

    #[test]
    fn test_grade_bands() {
        assert_eq!(grade(1.0), "A");
        assert_eq!(grade(0.8), "B");
        assert_eq!(grade(0.1), "F");
    }
}
