//! Results persistence.
//!
//! Every file is written to a temporary file in the target directory and
//! renamed into place, so readers see either the previous file or the
//! complete new one.

use crate::error::PersistError;
use crate::models::RunResult;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the results document inside the output directory.
pub const RESULTS_FILE: &str = "test_results.json";

/// Name prefix of in-flight temporary files.
pub const TEMP_PREFIX: &str = ".wmbench-";

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistError + '_ {
    move |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `bytes` to `path` all-or-nothing, creating parent directories.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(io_error(parent))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(parent)
        .map_err(io_error(parent))?;
    tmp.write_all(bytes).map_err(io_error(path))?;
    tmp.as_file().sync_all().map_err(io_error(path))?;
    tmp.persist(path).map_err(|e| PersistError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}

/// Delete temporary files left in `dir` by an interrupted write.
///
/// Returns the number of files removed. A missing directory is not an error.
pub fn remove_stale_temp_files(dir: &Path) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let is_temp = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(TEMP_PREFIX));
        let is_file = entry.file_type().is_ok_and(|t| t.is_file());
        if is_temp && is_file && fs::remove_file(entry.path()).is_ok() {
            debug!("Removed stale temporary file {}", entry.path().display());
            removed += 1;
        }
    }
    removed
}

/// Serialize a results document to indented JSON.
pub fn encode_results(results: &RunResult) -> Result<Vec<u8>, PersistError> {
    let mut bytes = serde_json::to_vec_pretty(&results.to_json()).map_err(PersistError::Encode)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Persist a results document to `path`.
pub fn persist_results(results: &RunResult, path: &Path) -> Result<(), PersistError> {
    let bytes = encode_results(results)?;
    write_atomic(path, &bytes)?;
    info!("💾 Results saved to: {}", path.display());
    Ok(())
}

/// Locate the results document for report-only mode.
///
/// Accepts either a results directory or the JSON file itself.
pub fn results_path(input: &Path) -> PathBuf {
    if input.is_dir() {
        input.join(RESULTS_FILE)
    } else {
        input.to_path_buf()
    }
}

/// Load a previously persisted results document.
pub fn load_results(path: &Path) -> Result<RunResult, PersistError> {
    let content = fs::read(path).map_err(io_error(path))?;
    let value: serde_json::Value =
        serde_json::from_slice(&content).map_err(|source| PersistError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    RunResult::from_json(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PhaseResult, ResultValue, Summary};

    fn sample_results() -> RunResult {
        let mut metadata = PhaseResult::new();
        metadata.insert("config_file".into(), PathBuf::from("configs/quick.toml").into());
        metadata.insert("synthetic_only".into(), true.into());

        let mut threshold = PhaseResult::new();
        threshold.insert("accuracy".into(), ResultValue::Float(0.9));

        let mut accuracy = PhaseResult::new();
        accuracy.insert("threshold_0.5".into(), threshold.into());
        accuracy.insert("overall_accuracy".into(), ResultValue::Float(0.9));

        RunResult {
            metadata,
            accuracy_tests: accuracy,
            performance_tests: PhaseResult::new(),
            night_vision_tests: PhaseResult::new(),
            summary: Summary {
                total_tests_run: 1,
                tests_passed: 1,
                tests_failed: 0,
                overall_score: 0.9,
            },
        }
    }

    #[test]
    fn test_persist_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RESULTS_FILE);
        let results = sample_results();

        persist_results(&results, &path).unwrap();
        let loaded = load_results(&path).unwrap();

        let mut expected = results;
        expected
            .metadata
            .insert("config_file".into(), ResultValue::String("configs/quick.toml".into()));
        assert_eq!(loaded, expected);
    }

    #[test]
    fn test_encoded_keys_are_sorted() {
        let text = String::from_utf8(encode_results(&sample_results()).unwrap()).unwrap();
        let order: Vec<usize> = [
            "\"accuracy_tests\"",
            "\"metadata\"",
            "\"night_vision_tests\"",
            "\"performance_tests\"",
            "\"summary\"",
        ]
        .iter()
        .map(|key| text.find(key).unwrap())
        .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_failed_write_leaves_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RESULTS_FILE);
        write_atomic(&path, b"{}").unwrap();

        // A file where the parent directory should be makes the write fail.
        let blocked = dir.path().join("blocker");
        fs::write(&blocked, b"file, not dir").unwrap();
        assert!(write_atomic(&blocked.join(RESULTS_FILE), b"{}").is_err());

        assert_eq!(fs::read(&path).unwrap(), b"{}");
    }

    #[test]
    fn test_stale_temp_files_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(format!("{}abc123", TEMP_PREFIX)), b"partial").unwrap();
        fs::write(dir.path().join(RESULTS_FILE), b"{}").unwrap();
        fs::write(dir.path().join(".tmpUserFile"), b"keep").unwrap();

        assert_eq!(remove_stale_temp_files(dir.path()), 1);
        assert!(dir.path().join(RESULTS_FILE).exists());
        assert!(dir.path().join(".tmpUserFile").exists());
        assert_eq!(remove_stale_temp_files(&dir.path().join("absent")), 0);
    }

    #[test]
    fn test_results_path_accepts_dir_or_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(results_path(dir.path()), dir.path().join(RESULTS_FILE));

        let file = dir.path().join("other.json");
        assert_eq!(results_path(&file), file);
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RESULTS_FILE);
        fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(load_results(&path), Err(PersistError::Decode { .. })));
    }
}
