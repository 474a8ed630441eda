//! Composite design-quality score.
//!
//! `score = (1 / elapsed) × (100 / utilization) × 1000`
//!
//! Faster and smaller designs score higher. A report without the resource
//! key is scored as if the design used the whole device.

use benchloop_types::{lookup_percentage, PercentageLookup, Score};
use tracing::warn;

use crate::error::{ScoreError, ScoreResult};

/// Multiplier bringing scores into a readable range.
pub const SCALE_CONSTANT: f64 = 1000.0;
/// Assumed utilization when the report does not mention the resource.
pub const DEFAULT_UTILIZATION_PERCENT: u32 = 100;
/// Floor applied to a reported 0%.
pub const MIN_UTILIZATION_PERCENT: u32 = 1;
/// Resource scored when none is configured.
pub const DEFAULT_RESOURCE_KEY: &str = "LUT";

/// First `KEY: N%` percentage for `key` in `report`.
///
/// Same rule as [`UtilizationReport::parse`](benchloop_types::UtilizationReport::parse).
pub fn extract_percentage(report: &str, key: &str) -> Option<u32> {
    lookup_percentage(report, key).value()
}

/// Score a measured run against a utilization report.
pub fn score(elapsed_seconds: f64, report: &str, resource_key: &str) -> ScoreResult<Score> {
    if !elapsed_seconds.is_finite() || elapsed_seconds <= 0.0 {
        return Err(ScoreError::NonPositiveElapsed(elapsed_seconds));
    }

    let (utilization, defaulted) = match lookup_percentage(report, resource_key) {
        PercentageLookup::Found(pct) => (pct, false),
        PercentageLookup::Unreadable(value) => {
            warn!(
                resource_key,
                value = %value,
                default = DEFAULT_UTILIZATION_PERCENT,
                "Utilization value out of range, assuming worst case"
            );
            (DEFAULT_UTILIZATION_PERCENT, true)
        }
        PercentageLookup::Missing => {
            warn!(
                resource_key,
                default = DEFAULT_UTILIZATION_PERCENT,
                "Resource not found in utilization report, assuming worst case"
            );
            (DEFAULT_UTILIZATION_PERCENT, true)
        }
    };
    let clamped = utilization < MIN_UTILIZATION_PERCENT;
    let utilization = utilization.max(MIN_UTILIZATION_PERCENT);

    let value = (1.0 / elapsed_seconds) * (100.0 / f64::from(utilization)) * SCALE_CONSTANT;
    Ok(Score {
        value,
        elapsed_seconds,
        resource_key: resource_key.to_string(),
        utilization_percent: utilization,
        defaulted,
        clamped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn half_the_device_in_one_second() {
        let s = score(1.0, "LUT: 50%", "LUT").unwrap();
        assert!(approx(s.value, 2000.0));
        assert_eq!(s.utilization_percent, 50);
        assert!(!s.defaulted);
    }

    #[test]
    fn slower_but_smaller_scores_the_same() {
        let s = score(2.0, "LUT: 25%", "LUT").unwrap();
        assert!(approx(s.value, 2000.0));
    }

    #[test]
    fn missing_key_scores_as_full_device() {
        let missing = score(1.5, "FF: 30%", "LUT").unwrap();
        let full = score(1.5, "LUT: 100%", "LUT").unwrap();
        assert!(approx(missing.value, full.value));
        assert!(missing.defaulted);
        assert_eq!(missing.utilization_percent, 100);
    }

    #[test]
    fn zero_percent_is_clamped() {
        let zero = score(1.0, "LUT: 0%", "LUT").unwrap();
        let one = score(1.0, "LUT: 1%", "LUT").unwrap();
        assert!(approx(zero.value, one.value));
        assert!(zero.clamped);
        assert!(!one.clamped);
    }

    #[test]
    fn rejects_non_positive_elapsed() {
        assert_eq!(
            score(0.0, "LUT: 50%", "LUT").unwrap_err(),
            ScoreError::NonPositiveElapsed(0.0)
        );
        assert!(score(-1.0, "LUT: 50%", "LUT").is_err());
        assert!(score(f64::NAN, "LUT: 50%", "LUT").is_err());
        assert!(score(f64::INFINITY, "LUT: 50%", "LUT").is_err());
    }

    #[test]
    fn extraction_is_word_bounded() {
        assert_eq!(extract_percentage("CLUT: 90%\nLUT: 40%", "LUT"), Some(40));
        assert_eq!(extract_percentage("LUT:12%", "LUT"), Some(12));
        assert_eq!(extract_percentage("LUT:  12%", "LUT"), None);
        assert_eq!(extract_percentage("LUT:\n12%", "LUT"), None);
        assert_eq!(extract_percentage("LUT: 45%, FF: 30%", "FF"), Some(30));
    }

    #[test]
    fn key_is_matched_literally() {
        assert_eq!(extract_percentage("L.T: 5%", "LUT"), None);
        assert_eq!(extract_percentage("LUT: 5%", "L.T"), None);
        assert_eq!(extract_percentage("LUT+: 5%", "LUT+"), Some(5));
    }

    #[test]
    fn duplicate_key_agrees_with_parsed_report() {
        let text = "LUT: 90%\nFF: 30%\nLUT: 40%";
        let s = score(1.0, text, "LUT").unwrap();
        let report = benchloop_types::UtilizationReport::parse(text);
        assert_eq!(report.percentage("LUT"), Some(s.utilization_percent));
        assert_eq!(s.utilization_percent, 90);
    }

    #[test]
    fn oversized_value_defaults() {
        let s = score(1.0, "LUT: 4294967296%", "LUT").unwrap();
        assert!(s.defaulted);
        assert_eq!(s.utilization_percent, DEFAULT_UTILIZATION_PERCENT);
    }

    #[test]
    fn mock_report_end_to_end_value() {
        let s = score(1.234, "Utilization Report\nLUT: 45%\nFF: 30%", "LUT").unwrap();
        let expected = (1.0 / 1.234) * (100.0 / 45.0) * 1000.0;
        assert!(approx(s.value, expected));
        assert!((s.value - 1800.8).abs() < 0.1);
    }
}
