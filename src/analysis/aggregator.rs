//! Result aggregation helpers.
//!
//! Key formatting for per-level entries, the overall accuracy mean, and the
//! run summary.

use crate::models::{PhaseResult, ResultValue, Summary};

/// Prefix of per-threshold entries in the accuracy result.
pub const THRESHOLD_PREFIX: &str = "threshold_";

/// Key of the mean accuracy in the accuracy result.
pub const OVERALL_ACCURACY: &str = "overall_accuracy";

/// Key under which a phase records its failure.
pub const ERROR_KEY: &str = "error";

/// Format a configured level for use inside a result key.
///
/// Whole numbers keep one decimal (`1.0`, not `1`) so keys look the same
/// whether the config wrote `1` or `1.0`.
pub fn format_level(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Result key for an accuracy threshold, e.g. `threshold_0.5`.
pub fn threshold_key(threshold: f64) -> String {
    format!("{}{}", THRESHOLD_PREFIX, format_level(threshold))
}

/// A phase result holding only an error message.
pub fn error_result(message: impl Into<String>) -> PhaseResult {
    let mut result = PhaseResult::new();
    result.insert(ERROR_KEY.to_string(), ResultValue::String(message.into()));
    result
}

/// Arithmetic mean of the `accuracy` field across all threshold entries.
///
/// Returns `None` when there are no threshold entries.
pub fn compute_overall_accuracy(results: &PhaseResult) -> Option<f64> {
    let accuracies: Vec<f64> = results
        .iter()
        .filter(|(key, _)| key.starts_with(THRESHOLD_PREFIX))
        .filter_map(|(_, value)| value.as_mapping()?.get("accuracy")?.as_f64())
        .collect();

    if accuracies.is_empty() {
        None
    } else {
        Some(accuracies.iter().sum::<f64>() / accuracies.len() as f64)
    }
}

/// Derive the run summary from the accuracy result.
///
/// The presence of `overall_accuracy` counts as one passed test and becomes
/// the overall score. No other phase contributes and nothing is ever counted
/// as failed.
pub fn summarize(accuracy_tests: &PhaseResult) -> Summary {
    let mut summary = Summary::default();

    if let Some(score) = accuracy_tests.get(OVERALL_ACCURACY).and_then(ResultValue::as_f64) {
        summary.overall_score = score;
        summary.tests_passed += 1;
    }

    summary.total_tests_run = summary.tests_passed + summary.tests_failed;
    summary
}
