//! Error types for the test bench.
//!
//! Each subsystem gets its own error enum so callers can decide which
//! failures are recoverable (configuration, phase) and which abort the run
//! (environment, persistence).

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a test configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised by an external evaluator.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("failed to launch evaluator {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("evaluator I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("evaluator exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("evaluator returned malformed metrics: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("evaluator failed: {0}")]
    Other(String),
}

/// Errors raised by the data feeder.
#[derive(Debug, Error)]
pub enum FeederError {
    #[error("failed to walk data source {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Errors raised while persisting or reloading results.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode results: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode results from {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("results document is missing required key `{0}`")]
    MissingKey(&'static str),

    #[error("results key `{0}` is not a mapping")]
    NotAMapping(String),

    #[error("results summary is malformed: {0}")]
    InvalidSummary(#[source] serde_json::Error),
}
