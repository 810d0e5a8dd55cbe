//! Accuracy phase.

use super::aggregator::{compute_overall_accuracy, threshold_key, ERROR_KEY, OVERALL_ACCURACY};
use crate::config::AccuracyOptions;
use crate::evaluator::Evaluator;
use crate::models::{Dataset, Metrics, PhaseResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info, warn};

/// Seed of the placeholder metrics.
pub const MOCK_SEED: u64 = 42;

/// Run the accuracy phase.
///
/// Each configured threshold is evaluated once and stored under
/// `threshold_{value}`, followed by `overall_accuracy`. Without an evaluator
/// seeded placeholder metrics of the same shape are produced. An evaluator
/// failure stops the phase and is recorded under `error`.
pub fn run_accuracy_phase(
    data: &Dataset,
    options: &AccuracyOptions,
    evaluator: Option<&dyn Evaluator>,
) -> PhaseResult {
    let Some(evaluator) = evaluator else {
        return mock_accuracy_results(&options.thresholds);
    };

    let samples = data.test_samples();
    let mut results = PhaseResult::new();

    for &threshold in &options.thresholds {
        info!("   Testing at threshold: {}", threshold);
        match evaluator.evaluate(samples, threshold) {
            Ok(metrics) => {
                results.insert(threshold_key(threshold), metrics.to_phase_result().into());
            }
            Err(e) => {
                error!("Accuracy tests failed: {}", e);
                results.insert(ERROR_KEY.to_string(), e.to_string().into());
                return results;
            }
        }
    }

    if let Some(overall) = compute_overall_accuracy(&results) {
        results.insert(OVERALL_ACCURACY.to_string(), overall.into());
    }
    results
}

/// Seeded placeholder metrics for when no evaluator is available.
pub fn mock_accuracy_results(thresholds: &[f64]) -> PhaseResult {
    warn!("🎭 Using mock accuracy results - evaluator not available");

    let mut rng = StdRng::seed_from_u64(MOCK_SEED);
    let mut results = PhaseResult::new();

    for &threshold in thresholds {
        let metrics = Metrics {
            accuracy: rng.gen_range(0.8..0.95),
            precision: rng.gen_range(0.75..0.92),
            recall: rng.gen_range(0.78..0.94),
            f1_score: rng.gen_range(0.76..0.93),
        };
        results.insert(threshold_key(threshold), metrics.to_phase_result().into());
    }

    if let Some(overall) = compute_overall_accuracy(&results) {
        results.insert(OVERALL_ACCURACY.to_string(), overall.into());
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvaluatorError;
    use crate::models::{ResultValue, Sample};
    use std::sync::Mutex;

    struct FixedEvaluator {
        calls: Mutex<Vec<f64>>,
    }

    impl Evaluator for FixedEvaluator {
        fn name(&self) -> &str {
            "fixed"
        }

        fn evaluate(&self, _samples: &[Sample], threshold: f64) -> Result<Metrics, EvaluatorError> {
            self.calls.lock().unwrap().push(threshold);
            Ok(Metrics {
                accuracy: threshold,
                precision: 0.5,
                recall: 0.5,
                f1_score: 0.5,
            })
        }
    }

    struct FailingEvaluator;

    impl Evaluator for FailingEvaluator {
        fn name(&self) -> &str {
            "failing"
        }

        fn evaluate(&self, _samples: &[Sample], _threshold: f64) -> Result<Metrics, EvaluatorError> {
            Err(EvaluatorError::Other("model weights missing".to_string()))
        }
    }

    fn empty_dataset() -> Dataset {
        Dataset {
            sources: Vec::new(),
            samples: Vec::new(),
            synthetic_count: 0,
            test_split_ratio: 0.2,
        }
    }

    fn options(thresholds: Vec<f64>) -> AccuracyOptions {
        AccuracyOptions {
            thresholds,
            metrics: Vec::new(),
            cross_validation_folds: 5,
        }
    }

    fn accuracy_of(results: &PhaseResult, key: &str) -> f64 {
        results[key].as_mapping().unwrap()["accuracy"].as_f64().unwrap()
    }

    #[test]
    fn test_mock_has_one_key_per_threshold_plus_overall() {
        let thresholds = vec![0.5, 0.7, 0.9];
        let results = mock_accuracy_results(&thresholds);

        let threshold_keys = results.keys().filter(|k| k.starts_with("threshold_")).count();
        assert_eq!(threshold_keys, 3);
        assert_eq!(results.len(), 4);

        let mean = thresholds
            .iter()
            .map(|t| accuracy_of(&results, &threshold_key(*t)))
            .sum::<f64>()
            / 3.0;
        let overall = results[OVERALL_ACCURACY].as_f64().unwrap();
        assert!((overall - mean).abs() < 1e-12);
    }

    #[test]
    fn test_mock_is_deterministic() {
        let a = mock_accuracy_results(&[0.5, 0.7]);
        let b = mock_accuracy_results(&[0.5, 0.7]);
        assert_eq!(
            serde_json::to_string(&ResultValue::Mapping(a).to_json()).unwrap(),
            serde_json::to_string(&ResultValue::Mapping(b).to_json()).unwrap()
        );
    }

    #[test]
    fn test_mock_ranges() {
        let results = mock_accuracy_results(&[0.1, 0.2, 0.3, 0.4, 0.5]);
        for (key, value) in results.iter().filter(|(k, _)| k.starts_with("threshold_")) {
            let metrics = value.as_mapping().unwrap();
            let accuracy = metrics["accuracy"].as_f64().unwrap();
            assert!((0.8..0.95).contains(&accuracy), "{key}: {accuracy}");
            assert!(metrics.contains_key("f1_score"));
        }
    }

    #[test]
    fn test_mock_without_thresholds() {
        let results = mock_accuracy_results(&[]);
        assert!(results.is_empty());
    }

    #[test]
    fn test_evaluator_called_once_per_threshold() {
        let evaluator = FixedEvaluator {
            calls: Mutex::new(Vec::new()),
        };
        let results =
            run_accuracy_phase(&empty_dataset(), &options(vec![0.5, 0.7]), Some(&evaluator));

        assert_eq!(*evaluator.calls.lock().unwrap(), vec![0.5, 0.7]);
        assert_eq!(accuracy_of(&results, "threshold_0.5"), 0.5);
        assert_eq!(accuracy_of(&results, "threshold_0.7"), 0.7);
        let overall = results[OVERALL_ACCURACY].as_f64().unwrap();
        assert!((overall - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_evaluator_failure_recorded_as_error() {
        let results =
            run_accuracy_phase(&empty_dataset(), &options(vec![0.5]), Some(&FailingEvaluator));

        assert_eq!(
            results.get(ERROR_KEY),
            Some(&ResultValue::String(
                "evaluator failed: model weights missing".to_string()
            ))
        );
        assert!(!results.contains_key(OVERALL_ACCURACY));
    }

    #[test]
    fn test_evaluator_receives_test_split() {
        struct CountingEvaluator(Mutex<usize>);

        impl Evaluator for CountingEvaluator {
            fn name(&self) -> &str {
                "counting"
            }

            fn evaluate(&self, samples: &[Sample], _threshold: f64) -> Result<Metrics, EvaluatorError> {
                *self.0.lock().unwrap() = samples.len();
                Ok(Metrics {
                    accuracy: 1.0,
                    precision: 1.0,
                    recall: 1.0,
                    f1_score: 1.0,
                })
            }
        }

        let dataset = crate::data::SyntheticDataGenerator::default().generate_test_dataset(10, 0.2);
        let evaluator = CountingEvaluator(Mutex::new(0));
        run_accuracy_phase(&dataset, &options(vec![0.5]), Some(&evaluator));
        assert_eq!(*evaluator.0.lock().unwrap(), 2);
    }
}
