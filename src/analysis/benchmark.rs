//! Performance benchmarking phase.
//!
//! Times repeated evaluator calls for each configured batch size.

use super::aggregator::ERROR_KEY;
use crate::config::PerformanceOptions;
use crate::evaluator::Evaluator;
use crate::models::{Dataset, PhaseResult, ResultValue};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Threshold used for benchmark calls.
pub const BENCHMARK_THRESHOLD: f64 = 0.5;

/// Timings collected for one batch size.
#[derive(Debug, Clone, Default)]
struct BatchTiming {
    calls: u32,
    samples: usize,
    elapsed: Duration,
}

impl BatchTiming {
    fn avg_processing_time(&self) -> Option<f64> {
        (self.calls > 0).then(|| self.elapsed.as_secs_f64() / f64::from(self.calls))
    }

    fn throughput_fps(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        (secs > 0.0).then(|| (self.samples as f64) / secs)
    }

    fn to_phase_result(&self) -> PhaseResult {
        let mut map = PhaseResult::new();
        map.insert("iterations".into(), self.calls.into());
        map.insert("avg_processing_time".into(), self.avg_processing_time().into());
        map.insert("throughput_fps".into(), self.throughput_fps().into());
        map
    }
}

/// Run the performance phase.
///
/// With an evaluator, every batch size is evaluated `iterations` times on
/// the first `batch_size` test samples. Without one, fixed placeholder
/// numbers are returned.
pub fn run_performance_phase(
    data: &Dataset,
    options: &PerformanceOptions,
    evaluator: Option<&dyn Evaluator>,
    show_progress: bool,
) -> PhaseResult {
    let Some(evaluator) = evaluator else {
        return mock_performance_results();
    };

    let test_samples = data.test_samples();
    let total_calls = options.batch_sizes.len() as u64 * u64::from(options.iterations);
    let progress = if show_progress {
        let pb = ProgressBar::new(total_calls);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut results = PhaseResult::new();
    let mut batches = PhaseResult::new();
    let mut overall = BatchTiming::default();

    for &batch_size in &options.batch_sizes {
        let batch = &test_samples[..batch_size.min(test_samples.len())];
        info!("   Benchmarking batch size {} ({} samples)", batch_size, batch.len());

        let mut timing = BatchTiming::default();
        for _ in 0..options.iterations {
            let started = Instant::now();
            if let Err(e) = evaluator.evaluate(batch, BENCHMARK_THRESHOLD) {
                progress.finish_and_clear();
                error!("Performance benchmark failed: {}", e);
                results.insert("batch_sizes".into(), batches.into());
                results.insert(ERROR_KEY.into(), e.to_string().into());
                return results;
            }
            timing.elapsed += started.elapsed();
            timing.calls += 1;
            timing.samples += batch.len();
            progress.inc(1);
        }

        debug!(
            "Batch size {}: {:?} over {} calls",
            batch_size, timing.elapsed, timing.calls
        );
        overall.elapsed += timing.elapsed;
        overall.calls += timing.calls;
        overall.samples += timing.samples;
        batches.insert(format!("batch_{}", batch_size), timing.to_phase_result().into());
    }
    progress.finish_and_clear();

    results.insert("batch_sizes".into(), batches.into());
    results.insert("avg_processing_time".into(), overall.avg_processing_time().into());
    results.insert("throughput_fps".into(), overall.throughput_fps().into());

    if options.measure_memory {
        match peak_memory_mb() {
            Some(mb) => {
                results.insert("memory_usage_mb".into(), mb.into());
            }
            None => debug!("Peak memory is not available on this platform"),
        }
    }
    if options.measure_cpu_usage {
        debug!("CPU usage sampling is not supported for external evaluators");
    }

    results
}

/// Fixed placeholder numbers for when no evaluator is available.
pub fn mock_performance_results() -> PhaseResult {
    warn!("🎭 Using mock performance results");

    let mut results = PhaseResult::new();
    results.insert("avg_processing_time".into(), ResultValue::Float(0.245));
    results.insert("memory_usage_mb".into(), ResultValue::Float(156.7));
    results.insert("cpu_usage_percent".into(), ResultValue::Float(23.4));
    results.insert("throughput_fps".into(), ResultValue::Float(4.08));
    results
}

/// Peak resident set size of this process in MiB.
///
/// Read from `/proc/self/status`, so only available on Linux. Evaluators
/// running in a child process are not included.
fn peak_memory_mb() -> Option<f64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_hwm_kb(&status).map(|kb| kb / 1024.0)
}

fn parse_vm_hwm_kb(status: &str) -> Option<f64> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmHWM:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
}
