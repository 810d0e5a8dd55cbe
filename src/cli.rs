//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// wmbench - test bench for the water monitoring module
///
/// Runs accuracy, performance and night vision tests against an external
/// water monitoring evaluator, or placeholder results when none is available,
/// and writes a JSON results document plus an HTML report.
///
/// Examples:
///   wmbench
///   wmbench --config configs/quick_test.toml --synthetic-only
///   wmbench --evaluator ./water-monitor --skip-benchmarks
///   wmbench --generate-report-only results/ --output reports
///   wmbench --init-config --config configs/custom.toml
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to the test configuration file
    ///
    /// A missing or invalid file falls back to the default configuration.
    #[arg(
        short,
        long,
        default_value = "configs/comprehensive.toml",
        value_name = "FILE"
    )]
    pub config: PathBuf,

    /// Output directory for results and reports
    #[arg(short, long, default_value = "results", value_name = "DIR")]
    pub output: PathBuf,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Use generated data only, ignoring configured data sources
    #[arg(long)]
    pub synthetic_only: bool,

    /// Skip the performance benchmarks
    #[arg(long)]
    pub skip_benchmarks: bool,

    /// Regenerate the HTML report from existing results and exit
    ///
    /// Accepts a results directory or a test_results.json file.
    #[arg(long, value_name = "DIR")]
    pub generate_report_only: Option<PathBuf>,

    /// Dry run: show the test plan without running any phase
    #[arg(long)]
    pub dry_run: bool,

    /// Command of the external water monitoring evaluator
    ///
    /// Overrides the `evaluator` setting of the configuration file.
    #[arg(long, value_name = "CMD", env = "WATER_MONITORING_EVALUATOR")]
    pub evaluator: Option<String>,

    /// Write the default configuration to the --config path and exit
    #[arg(long, conflicts_with_all = ["generate_report_only", "dry_run"])]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.output.as_os_str().is_empty() {
            return Err("Output directory must not be empty".to_string());
        }

        if let Some(ref input) = self.generate_report_only {
            if !input.exists() {
                return Err(format!("Results path does not exist: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// The evaluator command, from the flag or else the configuration.
    pub fn evaluator_command<'a>(&'a self, configured: Option<&'a str>) -> Option<&'a str> {
        self.evaluator.as_deref().or(configured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            config: PathBuf::from("configs/comprehensive.toml"),
            output: PathBuf::from("results"),
            verbose: false,
            quiet: false,
            log_file: None,
            synthetic_only: false,
            skip_benchmarks: false,
            generate_report_only: None,
            dry_run: false,
            evaluator: None,
            init_config: false,
        }
    }

    #[test]
    fn test_defaults_from_command_line() {
        let args = Args::try_parse_from(["wmbench"]).unwrap();
        assert_eq!(args.config, PathBuf::from("configs/comprehensive.toml"));
        assert_eq!(args.output, PathBuf::from("results"));
        assert!(!args.synthetic_only);
        assert!(!args.skip_benchmarks);
        assert!(args.generate_report_only.is_none());
    }

    #[test]
    fn test_flags_from_command_line() {
        let args = Args::try_parse_from([
            "wmbench",
            "-c",
            "configs/quick_test.toml",
            "-o",
            "out",
            "--synthetic-only",
            "--skip-benchmarks",
            "--evaluator",
            "water-monitor",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("configs/quick_test.toml"));
        assert_eq!(args.output, PathBuf::from("out"));
        assert!(args.synthetic_only);
        assert!(args.skip_benchmarks);
        assert_eq!(args.evaluator.as_deref(), Some("water-monitor"));
    }

    #[test]
    fn test_init_config_conflicts_with_dry_run() {
        assert!(Args::try_parse_from(["wmbench", "--init-config", "--dry-run"]).is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_report_input() {
        let mut args = make_args();
        args.generate_report_only = Some(PathBuf::from("/nonexistent/results"));
        assert!(args.validate().is_err());

        let dir = tempfile::tempdir().unwrap();
        args.generate_report_only = Some(dir.path().to_path_buf());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_evaluator_flag_overrides_config() {
        let mut args = make_args();
        assert_eq!(args.evaluator_command(Some("from-config")), Some("from-config"));

        args.evaluator = Some("from-flag".to_string());
        assert_eq!(args.evaluator_command(Some("from-config")), Some("from-flag"));
        assert_eq!(args.evaluator_command(None), Some("from-flag"));
    }
}
