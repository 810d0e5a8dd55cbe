//! Results persistence and report generation.

pub mod generator;
pub mod persist;

pub use generator::{generate_from_results, write_html_report};
pub use persist::{
    persist_results, remove_stale_temp_files, results_path, write_atomic, RESULTS_FILE,
};
