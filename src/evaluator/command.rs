//! Subprocess-backed evaluator.
//!
//! The evaluator is invoked as `<command> evaluate --threshold <t>`. The
//! request (`{"threshold": t, "samples": [...]}`) is written to its stdin and
//! it must print a metrics object (`accuracy`, `precision`, `recall`, `f1`)
//! on stdout.

use super::Evaluator;
use crate::error::EvaluatorError;
use crate::models::{Metrics, Sample};
use serde::Serialize;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

#[derive(Debug, Serialize)]
struct EvaluationRequest<'a> {
    threshold: f64,
    samples: &'a [Sample],
}

/// An evaluator living in an external executable.
#[derive(Debug, Clone)]
pub struct CommandEvaluator {
    program: PathBuf,
    args: Vec<String>,
    label: String,
}

impl CommandEvaluator {
    /// Resolve a command line to an executable.
    ///
    /// The first word is the program; it is used as-is when it contains a
    /// path separator and looked up on `PATH` otherwise. Returns `None` when
    /// the program cannot be found.
    pub fn discover(command: &str) -> Option<Self> {
        let mut words = command.split_whitespace();
        let program = words.next()?;
        let args: Vec<String> = words.map(String::from).collect();

        let resolved = resolve_program(program)?;
        debug!("Resolved evaluator {} -> {}", program, resolved.display());

        Some(Self {
            program: resolved,
            args,
            label: command.to_string(),
        })
    }
}

fn resolve_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|p| p.is_file())
}

impl Evaluator for CommandEvaluator {
    fn name(&self) -> &str {
        &self.label
    }

    fn evaluate(&self, samples: &[Sample], threshold: f64) -> Result<Metrics, EvaluatorError> {
        let request = serde_json::to_vec(&EvaluationRequest { threshold, samples })
            .map_err(|e| EvaluatorError::Other(format!("failed to encode request: {}", e)))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("evaluate")
            .arg("--threshold")
            .arg(threshold.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EvaluatorError::Spawn {
                command: self.label.clone(),
                source,
            })?;

        // Feed stdin from its own thread while the output pipes are drained
        // here, otherwise a chatty evaluator and a large request deadlock.
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || -> std::io::Result<()> {
                stdin.write_all(&request)?;
                stdin.flush()
            })
        });

        let output = child.wait_with_output()?;
        let write_result = match writer {
            Some(handle) => handle
                .join()
                .map_err(|_| EvaluatorError::Other("stdin writer panicked".to_string()))?,
            None => Ok(()),
        };

        if !output.status.success() {
            return Err(EvaluatorError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        match write_result {
            // The evaluator answered without reading its whole input.
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                debug!("Evaluator {} closed stdin early", self.label);
            }
            other => other?,
        }

        let metrics: Metrics = serde_json::from_slice(&output.stdout)?;
        debug!(
            "Evaluator {} at threshold {}: accuracy {:.3}",
            self.label, threshold, metrics.accuracy
        );
        Ok(metrics)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;

    fn script_evaluator(dir: &Path, body: &str) -> CommandEvaluator {
        let script = dir.join("evaluator.sh");
        fs::write(&script, body).unwrap();
        CommandEvaluator::discover(&format!("sh {}", script.display())).unwrap()
    }

    fn samples() -> Vec<Sample> {
        vec![Sample {
            id: "s0".to_string(),
            path: None,
            brightness: 1.0,
            noise_level: 0.0,
            contrast: 0.0,
            water_present: Some(true),
        }]
    }

    #[test]
    fn test_evaluate_reads_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let evaluator = script_evaluator(
            dir.path(),
            "cat > /dev/null\necho '{\"accuracy\": 0.9, \"precision\": 0.8, \"recall\": 0.85, \"f1\": 0.82}'\n",
        );

        let metrics = evaluator.evaluate(&samples(), 0.5).unwrap();
        assert_eq!(metrics.accuracy, 0.9);
        assert_eq!(metrics.f1_score, 0.82);
    }

    #[test]
    fn test_evaluate_passes_threshold() {
        let dir = tempfile::tempdir().unwrap();
        // $3 is the threshold after "evaluate --threshold".
        let evaluator = script_evaluator(
            dir.path(),
            "cat > /dev/null\necho \"{\\\"accuracy\\\": $3, \\\"precision\\\": 0, \\\"recall\\\": 0, \\\"f1\\\": 0}\"\n",
        );

        let metrics = evaluator.evaluate(&samples(), 0.7).unwrap();
        assert_eq!(metrics.accuracy, 0.7);
    }

    #[test]
    fn test_evaluate_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let evaluator = script_evaluator(dir.path(), "cat > /dev/null\necho boom >&2\nexit 3\n");

        let err = evaluator.evaluate(&samples(), 0.5).unwrap_err();
        match err {
            EvaluatorError::Exit { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_evaluate_malformed_output() {
        let dir = tempfile::tempdir().unwrap();
        let evaluator = script_evaluator(dir.path(), "cat > /dev/null\necho not-json\n");

        assert!(matches!(
            evaluator.evaluate(&samples(), 0.5),
            Err(EvaluatorError::Decode(_))
        ));
    }

    #[test]
    fn test_large_request_with_chatty_evaluator() {
        let dir = tempfile::tempdir().unwrap();
        // Fills the stderr pipe before reading any input.
        let evaluator = script_evaluator(
            dir.path(),
            "head -c 200000 /dev/zero >&2\ncat > /dev/null\necho '{\"accuracy\": 0.5, \"precision\": 0.5, \"recall\": 0.5, \"f1\": 0.5}'\n",
        );
        let samples = crate::data::SyntheticDataGenerator::default().generate_samples(5000);

        let metrics = evaluator.evaluate(&samples, 0.5).unwrap();
        assert_eq!(metrics.accuracy, 0.5);
    }

    #[test]
    fn test_evaluator_ignoring_stdin_still_answers() {
        let dir = tempfile::tempdir().unwrap();
        let evaluator = script_evaluator(
            dir.path(),
            "echo '{\"accuracy\": 0.6, \"precision\": 0.5, \"recall\": 0.5, \"f1\": 0.5}'\n",
        );
        let samples = crate::data::SyntheticDataGenerator::default().generate_samples(5000);

        let metrics = evaluator.evaluate(&samples, 0.5).unwrap();
        assert_eq!(metrics.accuracy, 0.6);
    }

    #[test]
    fn test_discover_explicit_path() {
        assert!(CommandEvaluator::discover("/definitely/not/here/eval").is_none());
    }
}
