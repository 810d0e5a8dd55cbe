//! Night vision phase.
//!
//! Placeholder mode derives low-light numbers from a fixed formula. With an
//! evaluator, the test samples are degraded per condition and re-evaluated.

use super::aggregator::{format_level, ERROR_KEY};
use crate::config::NightVisionOptions;
use crate::evaluator::Evaluator;
use crate::models::{Dataset, PhaseResult, Sample};
use std::time::Instant;
use tracing::{error, info};

/// Threshold used for degraded-condition evaluations.
pub const REFERENCE_THRESHOLD: f64 = 0.5;

const LOW_LIGHT: &str = "low_light_performance";
const NOISE: &str = "noise_robustness";
const CONTRAST: &str = "contrast_sensitivity";

/// Run the night vision phase.
pub fn run_night_vision_phase(
    data: &Dataset,
    options: &NightVisionOptions,
    evaluator: Option<&dyn Evaluator>,
) -> PhaseResult {
    match evaluator {
        Some(evaluator) => evaluate_conditions(data, options, evaluator),
        None => simulated_results(options),
    }
}

/// Placeholder results: accuracy degrades linearly with brightness and
/// processing time grows as brightness drops.
pub fn simulated_results(options: &NightVisionOptions) -> PhaseResult {
    let mut low_light = PhaseResult::new();

    for &condition in &options.low_light_conditions {
        let mut entry = PhaseResult::new();
        entry.insert("accuracy".into(), (0.85 * condition + 0.1).into());
        // No finite time at zero brightness.
        let processing_time = (condition != 0.0).then(|| 1.2 / condition);
        entry.insert("processing_time".into(), processing_time.into());
        low_light.insert(format!("brightness_{}", format_level(condition)), entry.into());
    }

    let mut results = PhaseResult::new();
    results.insert(LOW_LIGHT.into(), low_light.into());
    results.insert(NOISE.into(), PhaseResult::new().into());
    results.insert(CONTRAST.into(), PhaseResult::new().into());
    results
}

fn evaluate_conditions(
    data: &Dataset,
    options: &NightVisionOptions,
    evaluator: &dyn Evaluator,
) -> PhaseResult {
    let samples = data.test_samples();
    let mut results = PhaseResult::new();

    let groups: [(&str, &str, &[f64], fn(&mut Sample, f64)); 3] = [
        (LOW_LIGHT, "brightness", options.low_light_conditions.as_slice(), |s, c| {
            s.brightness *= c
        }),
        (NOISE, "noise", options.noise_levels.as_slice(), |s, n| s.noise_level = n),
        (CONTRAST, "contrast", options.contrast_adjustments.as_slice(), |s, a| {
            s.contrast += a
        }),
    ];

    for (group, prefix, levels, degrade) in groups {
        let mut entries = PhaseResult::new();

        for &level in levels {
            info!("   Evaluating {} at {}", prefix, level);
            let degraded: Vec<Sample> = samples
                .iter()
                .cloned()
                .map(|mut s| {
                    degrade(&mut s, level);
                    s
                })
                .collect();

            let started = Instant::now();
            match evaluator.evaluate(&degraded, REFERENCE_THRESHOLD) {
                Ok(metrics) => {
                    let mut entry = PhaseResult::new();
                    entry.insert("accuracy".into(), metrics.accuracy.into());
                    entry.insert(
                        "processing_time".into(),
                        started.elapsed().as_secs_f64().into(),
                    );
                    entries.insert(format!("{}_{}", prefix, format_level(level)), entry.into());
                }
                Err(e) => {
                    error!("Night vision tests failed: {}", e);
                    results.insert(group.into(), entries.into());
                    results.insert(ERROR_KEY.into(), e.to_string().into());
                    return results;
                }
            }
        }

        results.insert(group.into(), entries.into());
    }

    results
}
