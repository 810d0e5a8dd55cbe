//! Configuration file handling.
//!
//! Loading happens in two steps: the TOML document is parsed into a
//! `RawConfig` where every field is optional, then `TestConfiguration::from_raw`
//! fills the documented defaults and validates the result. The finished
//! configuration is never mutated afterwards.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Fully populated configuration for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestConfiguration {
    /// Directories or files to load samples from.
    pub data_sources: Vec<String>,
    /// Fraction of generated samples mixed into sourced data.
    pub synthetic_data_ratio: f64,
    /// Fraction of samples held out for testing.
    pub test_split_ratio: f64,
    /// Number of samples produced by the synthetic generator.
    pub synthetic_samples: usize,
    /// Command of the external evaluator, if configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<String>,

    pub save_intermediate_results: bool,
    pub generate_visualizations: bool,
    pub detailed_logging: bool,

    // Tables last so the TOML template stays valid.
    pub accuracy_tests: AccuracyOptions,
    pub performance_tests: PerformanceOptions,
    pub night_vision_tests: NightVisionOptions,
}

/// Accuracy phase options.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyOptions {
    pub thresholds: Vec<f64>,
    pub metrics: Vec<String>,
    pub cross_validation_folds: u32,
}

/// Performance phase options.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceOptions {
    pub batch_sizes: Vec<usize>,
    pub measure_memory: bool,
    pub measure_cpu_usage: bool,
    pub iterations: u32,
}

/// Night vision phase options.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NightVisionOptions {
    pub low_light_conditions: Vec<f64>,
    pub noise_levels: Vec<f64>,
    pub contrast_adjustments: Vec<f64>,
}

/// Configuration as written in the file, before defaults are applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default)]
    pub data_sources: Option<Vec<String>>,
    #[serde(default)]
    pub synthetic_data_ratio: Option<f64>,
    #[serde(default)]
    pub test_split_ratio: Option<f64>,
    #[serde(default)]
    pub synthetic_samples: Option<usize>,
    #[serde(default)]
    pub evaluator: Option<String>,
    #[serde(default)]
    pub accuracy_tests: Option<RawAccuracyOptions>,
    #[serde(default)]
    pub performance_tests: Option<RawPerformanceOptions>,
    #[serde(default)]
    pub night_vision_tests: Option<RawNightVisionOptions>,
    #[serde(default)]
    pub save_intermediate_results: Option<bool>,
    #[serde(default)]
    pub generate_visualizations: Option<bool>,
    #[serde(default)]
    pub detailed_logging: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawAccuracyOptions {
    pub thresholds: Option<Vec<f64>>,
    pub metrics: Option<Vec<String>>,
    pub cross_validation_folds: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPerformanceOptions {
    pub batch_sizes: Option<Vec<usize>>,
    pub measure_memory: Option<bool>,
    pub measure_cpu_usage: Option<bool>,
    pub iterations: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawNightVisionOptions {
    pub low_light_conditions: Option<Vec<f64>>,
    pub noise_levels: Option<Vec<f64>>,
    pub contrast_adjustments: Option<Vec<f64>>,
}

fn default_synthetic_data_ratio() -> f64 {
    0.3
}

fn default_test_split_ratio() -> f64 {
    0.2
}

fn default_synthetic_samples() -> usize {
    1000
}

fn default_thresholds() -> Vec<f64> {
    vec![0.5, 0.7, 0.9]
}

fn default_metrics() -> Vec<String> {
    vec!["accuracy", "precision", "recall", "f1"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_folds() -> u32 {
    5
}

fn default_batch_sizes() -> Vec<usize> {
    vec![1, 8, 16, 32]
}

fn default_iterations() -> u32 {
    100
}

fn default_low_light_conditions() -> Vec<f64> {
    vec![0.1, 0.3, 0.5]
}

fn default_noise_levels() -> Vec<f64> {
    vec![0.1, 0.2, 0.3]
}

fn default_contrast_adjustments() -> Vec<f64> {
    vec![-0.3, 0.0, 0.3]
}

impl From<RawAccuracyOptions> for AccuracyOptions {
    fn from(raw: RawAccuracyOptions) -> Self {
        Self {
            thresholds: raw.thresholds.unwrap_or_else(default_thresholds),
            metrics: raw.metrics.unwrap_or_else(default_metrics),
            cross_validation_folds: raw.cross_validation_folds.unwrap_or_else(default_folds),
        }
    }
}

impl From<RawPerformanceOptions> for PerformanceOptions {
    fn from(raw: RawPerformanceOptions) -> Self {
        Self {
            batch_sizes: raw.batch_sizes.unwrap_or_else(default_batch_sizes),
            measure_memory: raw.measure_memory.unwrap_or(true),
            measure_cpu_usage: raw.measure_cpu_usage.unwrap_or(true),
            iterations: raw.iterations.unwrap_or_else(default_iterations),
        }
    }
}

impl From<RawNightVisionOptions> for NightVisionOptions {
    fn from(raw: RawNightVisionOptions) -> Self {
        Self {
            low_light_conditions: raw
                .low_light_conditions
                .unwrap_or_else(default_low_light_conditions),
            noise_levels: raw.noise_levels.unwrap_or_else(default_noise_levels),
            contrast_adjustments: raw
                .contrast_adjustments
                .unwrap_or_else(default_contrast_adjustments),
        }
    }
}

impl Default for TestConfiguration {
    fn default() -> Self {
        // An empty raw config always passes validation.
        Self::fill_defaults(RawConfig::default())
    }
}

impl TestConfiguration {
    /// Apply defaults to every absent field. Pure; performs no validation.
    pub fn fill_defaults(raw: RawConfig) -> Self {
        Self {
            data_sources: raw.data_sources.unwrap_or_default(),
            synthetic_data_ratio: raw
                .synthetic_data_ratio
                .unwrap_or_else(default_synthetic_data_ratio),
            test_split_ratio: raw.test_split_ratio.unwrap_or_else(default_test_split_ratio),
            synthetic_samples: raw
                .synthetic_samples
                .unwrap_or_else(default_synthetic_samples),
            evaluator: raw.evaluator,
            accuracy_tests: raw.accuracy_tests.unwrap_or_default().into(),
            performance_tests: raw.performance_tests.unwrap_or_default().into(),
            night_vision_tests: raw.night_vision_tests.unwrap_or_default().into(),
            save_intermediate_results: raw.save_intermediate_results.unwrap_or(true),
            generate_visualizations: raw.generate_visualizations.unwrap_or(true),
            detailed_logging: raw.detailed_logging.unwrap_or(true),
        }
    }

    /// Fill defaults and validate.
    pub fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let config = Self::fill_defaults(raw);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let fractions = [
            ("synthetic_data_ratio", self.synthetic_data_ratio),
            ("test_split_ratio", self.test_split_ratio),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }

        if let Some(t) = self
            .accuracy_tests
            .thresholds
            .iter()
            .find(|t| !t.is_finite())
        {
            return Err(ConfigError::Invalid(format!(
                "accuracy threshold must be finite, got {}",
                t
            )));
        }

        if self.performance_tests.batch_sizes.contains(&0) {
            return Err(ConfigError::Invalid(
                "batch sizes must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse a configuration document.
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_raw(raw)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Load configuration, falling back to defaults on any failure.
    ///
    /// A missing or malformed file is never fatal.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to load config: {}", e);
                info!("Using default configuration");
                Self::default()
            }
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}
