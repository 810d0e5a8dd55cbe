//! The test bench run aggregator.
//!
//! `TestBenchEngine` executes the phases in a fixed order (data preparation,
//! accuracy, performance, night vision, summary) and collects every phase's
//! result under its own key of a single `RunResult`.

use crate::analysis::aggregator::error_result;
use crate::analysis::{run_accuracy_phase, run_night_vision_phase, run_performance_phase, summarize};
use crate::config::TestConfiguration;
use crate::data::{DataFeeder, SyntheticDataGenerator};
use crate::evaluator::{Evaluator, EvaluatorHandle};
use crate::models::{Dataset, PhaseResult, ResultValue, RunResult};
use crate::report::persist::TEMP_PREFIX;
use crate::report::{persist_results, remove_stale_temp_files, write_html_report, RESULTS_FILE};
use anyhow::{Context, Result};
use chrono::Utc;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Subdirectory of the output directory holding generated data.
pub const SYNTHETIC_DATA_DIR: &str = "synthetic_data";

/// File name of the HTML report written after a full run.
pub const REPORT_FILE: &str = "test_report.html";

/// Runs the configured test phases and aggregates their results.
pub struct TestBenchEngine {
    config: TestConfiguration,
    config_path: PathBuf,
    output_dir: PathBuf,
    synthetic_only: bool,
    skip_benchmarks: bool,
    evaluator: Option<EvaluatorHandle>,
    show_progress: bool,
}

impl TestBenchEngine {
    /// Create an engine in placeholder mode.
    pub fn new(config: TestConfiguration, config_path: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            config,
            config_path,
            output_dir,
            synthetic_only: false,
            skip_benchmarks: false,
            evaluator: None,
            show_progress: false,
        }
    }

    pub fn synthetic_only(mut self, enabled: bool) -> Self {
        self.synthetic_only = enabled;
        self
    }

    pub fn skip_benchmarks(mut self, enabled: bool) -> Self {
        self.skip_benchmarks = enabled;
        self
    }

    /// Attach the evaluator found at startup. `None` keeps placeholder mode.
    pub fn with_evaluator(mut self, evaluator: Option<EvaluatorHandle>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn results_file(&self) -> PathBuf {
        self.output_dir.join(RESULTS_FILE)
    }

    pub fn report_file(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILE)
    }

    fn evaluator(&self) -> Option<&dyn Evaluator> {
        self.evaluator.as_deref()
    }

    /// Whether this run works on generated data only.
    ///
    /// Sourced data is only worth loading when an evaluator can look at it.
    pub fn uses_synthetic_data(&self) -> bool {
        self.synthetic_only || self.evaluator.is_none() || self.config.data_sources.is_empty()
    }

    /// Log what a run with the current settings would do.
    pub fn show_test_plan(&self) {
        info!("📋 Test plan");
        info!("   Config file: {}", self.config_path.display());
        info!("   Output directory: {}", self.output_dir.display());
        info!(
            "   Evaluator: {}",
            self.evaluator
                .as_ref()
                .map(|e| e.name().to_string())
                .unwrap_or_else(|| "none (placeholder results)".to_string())
        );
        info!("   Synthetic only: {}", self.uses_synthetic_data());
        info!("   Skip benchmarks: {}", self.skip_benchmarks);

        if self.config.data_sources.is_empty() {
            info!("   Data sources: none");
        } else {
            info!("   Data sources:");
            for source in &self.config.data_sources {
                info!("     - {}", source);
            }
        }

        let mut phases = vec!["Data preparation", "Accuracy tests"];
        if !self.skip_benchmarks {
            phases.push("Performance benchmarks");
        }
        phases.push("Night vision tests");
        phases.push("Summary and results");

        info!("   Phases:");
        for (i, phase) in phases.iter().enumerate() {
            info!("     {}. {}", i + 1, phase);
        }
    }

    /// Make sure the output directory exists and can be written to.
    pub fn validate_environment(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.output_dir.display()
            )
        })?;

        // An interrupted earlier run may have left temporary files behind.
        let stale = remove_stale_temp_files(&self.output_dir)
            + remove_stale_temp_files(&self.output_dir.join(SYNTHETIC_DATA_DIR));
        if stale > 0 {
            info!("Removed {} stale temporary file(s) from an interrupted run", stale);
        }

        tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.output_dir)
            .with_context(|| {
                format!(
                    "Output directory is not writable: {}",
                    self.output_dir.display()
                )
            })?;

        debug!("Output directory ready: {}", self.output_dir.display());
        Ok(())
    }

    /// Load or generate the samples for this run.
    pub fn prepare_data(&self) -> Result<Dataset> {
        if self.uses_synthetic_data() {
            info!("🧪 Preparing synthetic test data...");
            let generator = SyntheticDataGenerator::default();
            let dataset = generator
                .generate_test_dataset(self.config.synthetic_samples, self.config.test_split_ratio);

            if self.config.save_intermediate_results {
                let dir = self.output_dir.join(SYNTHETIC_DATA_DIR);
                if let Err(e) = generator.write_manifest(&dataset, &dir) {
                    warn!("Failed to save synthetic data manifest: {}", e);
                }
            }
            return Ok(dataset);
        }

        info!("📂 Loading test data from configured sources...");
        let dataset = DataFeeder::new(&self.config)
            .load_test_data()
            .context("Failed to load test data")?;
        info!(
            "   Loaded {} samples ({} synthetic)",
            dataset.samples.len(),
            dataset.synthetic_count
        );
        Ok(dataset)
    }

    /// Run every phase and aggregate the results.
    ///
    /// Phase failures are recorded in that phase's result; only data
    /// preparation can fail the run.
    pub fn run_full_test_suite(&self) -> Result<RunResult> {
        let started = Instant::now();
        info!("🚀 Starting comprehensive test suite");

        info!("📊 Phase 1: Data preparation");
        let dataset = self.prepare_data()?;

        info!("🎯 Phase 2: Accuracy tests");
        let accuracy_tests = guarded("accuracy", || {
            run_accuracy_phase(&dataset, &self.config.accuracy_tests, self.evaluator())
        });

        let performance_tests = if self.skip_benchmarks {
            info!("⏭️  Skipping performance benchmarks");
            PhaseResult::new()
        } else {
            info!("⚡ Phase 3: Performance benchmarks");
            guarded("performance", || {
                run_performance_phase(
                    &dataset,
                    &self.config.performance_tests,
                    self.evaluator(),
                    self.show_progress,
                )
            })
        };

        info!("🌙 Phase 4: Night vision tests");
        let night_vision_tests = guarded("night vision", || {
            run_night_vision_phase(&dataset, &self.config.night_vision_tests, self.evaluator())
        });

        info!("📈 Phase 5: Summary");
        let summary = summarize(&accuracy_tests);
        let metadata = self.metadata(&dataset, started.elapsed().as_secs_f64());

        info!("✅ Test suite completed in {:.2}s", started.elapsed().as_secs_f64());
        Ok(RunResult {
            metadata,
            accuracy_tests,
            performance_tests,
            night_vision_tests,
            summary,
        })
    }

    fn metadata(&self, dataset: &Dataset, execution_time: f64) -> PhaseResult {
        let now = Utc::now();
        let mut metadata = PhaseResult::new();

        metadata.insert("timestamp".into(), now.to_rfc3339().into());
        metadata.insert("unix_timestamp".into(), now.timestamp().into());
        metadata.insert("execution_time".into(), execution_time.into());
        metadata.insert("config_file".into(), self.config_path.clone().into());
        metadata.insert("output_dir".into(), self.output_dir.clone().into());
        metadata.insert("synthetic_only".into(), self.uses_synthetic_data().into());
        metadata.insert("skip_benchmarks".into(), self.skip_benchmarks.into());
        metadata.insert(
            "production_module_available".into(),
            self.evaluator.is_some().into(),
        );
        metadata.insert(
            "evaluator".into(),
            self.evaluator.as_ref().map(|e| e.name().to_string()).into(),
        );
        metadata.insert("dataset".into(), dataset.describe().into());
        metadata.insert("version".into(), env!("CARGO_PKG_VERSION").into());

        metadata
    }

    /// Write the results document to `<output>/test_results.json`.
    pub fn save_results(&self, results: &RunResult) -> Result<PathBuf> {
        let path = self.results_file();
        persist_results(results, &path)
            .with_context(|| format!("Failed to save results to {}", path.display()))?;
        Ok(path)
    }

    /// Write the HTML report to `<output>/test_report.html`.
    pub fn generate_report(&self, results: &RunResult) -> Result<PathBuf> {
        let path = self.report_file();
        write_html_report(results, &path)
            .with_context(|| format!("Failed to write report to {}", path.display()))
    }
}

/// Run a phase, turning a panic inside it into an `error` entry.
fn guarded<F>(phase: &str, run: F) -> PhaseResult
where
    F: FnOnce() -> PhaseResult,
{
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!("{} phase aborted: {}", phase, message);
            error_result(format!("{} phase aborted: {}", phase, message))
        }
    }
}

/// Overall average processing time reported by the performance phase.
pub fn overall_processing_time(results: &RunResult) -> Option<f64> {
    results
        .performance_tests
        .get("avg_processing_time")
        .and_then(ResultValue::as_f64)
}
