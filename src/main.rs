//! wmbench - test bench for the water monitoring module
//!
//! Runs the configured test phases against an external evaluator (or
//! placeholder results when none is available), aggregates the results into
//! one JSON document and renders an HTML report.
//!
//! Exit codes:
//!   0   - Success
//!   1   - Runtime error (output directory, data loading, results write, etc.)
//!   130 - Interrupted

mod analysis;
mod cli;
mod config;
mod data;
mod engine;
mod error;
mod evaluator;
mod models;
mod report;

use anyhow::{Context, Result};
use cli::Args;
use config::TestConfiguration;
use engine::{overall_processing_time, TestBenchEngine};
use models::RunResult;
use std::fs::File;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const EXIT_SUCCESS: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_INTERRUPTED: i32 = 130;

/// File name of the report written in report-only mode.
const REGENERATED_REPORT_FILE: &str = "report.html";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(EXIT_FAILURE);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        let code = match handle_init_config(&args) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("❌ Error: {:#}", e);
                EXIT_FAILURE
            }
        };
        std::process::exit(code);
    }

    if let Err(e) = init_logging(&args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(EXIT_FAILURE);
    }

    info!("wmbench v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let interrupted = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                warn!("Cannot listen for interrupts: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    // The run is blocking; an interrupt wins the race and exits right away.
    // Results are written atomically, so no half-written file is left behind.
    // A temporary file from an interrupted write is removed by the next run.
    let code = tokio::select! {
        joined = tokio::task::spawn_blocking(move || run(args)) => match joined {
            Ok(Ok(code)) => code,
            Ok(Err(e)) => {
                error!("Test run failed: {:#}", e);
                eprintln!("\n❌ Error: {:#}", e);
                EXIT_FAILURE
            }
            Err(e) => {
                error!("Test run aborted: {}", e);
                EXIT_FAILURE
            }
        },
        _ = interrupted => {
            warn!("⏹️  Interrupted, stopping test run");
            EXIT_INTERRUPTED
        }
    };

    std::process::exit(code);
}

/// Handle --init-config: write the default configuration to the config path.
fn handle_init_config(args: &Args) -> Result<i32> {
    let path = &args.config;

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            path.display()
        );
        return Ok(EXIT_FAILURE);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let content = TestConfiguration::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Created {} with default settings.", path.display());
    println!("   Edit it to customize thresholds, batch sizes, and data sources.");
    Ok(EXIT_SUCCESS)
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` takes precedence over `--verbose`/`--quiet`.
fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(LevelFilter::from_level(args.log_level()).into())
    });

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let file_layer = match args.log_file {
        Some(ref path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to set tracing subscriber")?;

    Ok(())
}

/// Run the selected workflow. Returns the exit code.
fn run(args: Args) -> Result<i32> {
    if let Some(ref input) = args.generate_report_only {
        return handle_report_only(input, &args);
    }

    // Load configuration
    let config = TestConfiguration::load_or_default(&args.config);
    if config.detailed_logging {
        debug!("Configuration: {:?}", config);
    }
    let evaluator =
        evaluator::discover(args.evaluator_command(config.evaluator.as_deref()));
    let generate_report = config.generate_visualizations;

    let engine = TestBenchEngine::new(config, args.config.clone(), args.output.clone())
        .synthetic_only(args.synthetic_only)
        .skip_benchmarks(args.skip_benchmarks)
        .with_evaluator(evaluator)
        .show_progress(!args.quiet);

    engine.show_test_plan();

    // Handle --dry-run: show the plan and exit
    if args.dry_run {
        info!("✅ Dry run complete. No tests were run.");
        return Ok(EXIT_SUCCESS);
    }

    engine.validate_environment()?;
    let results = engine.run_full_test_suite()?;

    if let Err(e) = engine.save_results(&results) {
        error!("{:#}", e);
        log_summary(&results);
        return Ok(EXIT_FAILURE);
    }

    if generate_report {
        if let Err(e) = engine.generate_report(&results) {
            warn!("{:#}", e);
        }
    }

    log_summary(&results);
    info!(
        "\n✅ Testing complete! Results saved to: {}",
        engine.output_dir().display()
    );
    Ok(EXIT_SUCCESS)
}

/// Handle --generate-report-only: render a report from saved results.
fn handle_report_only(input: &std::path::Path, args: &Args) -> Result<i32> {
    let results_file = report::results_path(input);
    let output = args.output.join(REGENERATED_REPORT_FILE);
    info!("📄 Generating report from {}", results_file.display());

    report::generate_from_results(&results_file, &output).with_context(|| {
        format!(
            "Failed to generate report from {}",
            results_file.display()
        )
    })?;

    Ok(EXIT_SUCCESS)
}

fn log_summary(results: &RunResult) {
    let summary = &results.summary;

    info!("\n📊 Test Summary:");
    info!(
        "   Tests run: {} | ✅ Passed: {} | ❌ Failed: {}",
        summary.total_tests_run, summary.tests_passed, summary.tests_failed
    );
    if summary.tests_passed > 0 {
        info!("   Overall accuracy: {:.2}%", summary.overall_score * 100.0);
    }
    match overall_processing_time(results) {
        Some(secs) => info!("   Avg processing time: {:.3}s", secs),
        None => debug!("No processing time recorded"),
    }
}
