//! Loads samples from the configured data sources.

use super::synthetic::SyntheticDataGenerator;
use crate::config::TestConfiguration;
use crate::error::FeederError;
use crate::models::{fraction_count, Dataset, Sample};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Image and video extensions picked up from data sources.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "bmp", "tif", "tiff", "mp4", "avi", "mov", "mkv",
];

/// Data feeder for file-based sources.
#[derive(Debug, Clone)]
pub struct DataFeeder {
    sources: Vec<PathBuf>,
    test_split_ratio: f64,
    synthetic_data_ratio: f64,
}

impl DataFeeder {
    pub fn new(config: &TestConfiguration) -> Self {
        Self {
            sources: config.data_sources.iter().map(PathBuf::from).collect(),
            test_split_ratio: config.test_split_ratio,
            synthetic_data_ratio: config.synthetic_data_ratio,
        }
    }

    /// Load every media file below the configured sources.
    ///
    /// Missing sources are skipped with a warning. Files are ordered by
    /// source, then by path, so the test split is reproducible. The result is
    /// augmented with `ceil(len * synthetic_data_ratio)` generated samples,
    /// placed ahead of the sourced ones so they only pad the training split.
    pub fn load_test_data(&self) -> Result<Dataset, FeederError> {
        let mut sourced = Vec::new();

        for source in &self.sources {
            if !source.exists() {
                warn!("Data source not found, skipping: {}", source.display());
                continue;
            }
            let found = scan_source(source)?;
            info!("Loaded {} samples from {}", found.len(), source.display());
            sourced.extend(found);
        }

        let synthetic_count = if sourced.is_empty() {
            0
        } else {
            fraction_count(sourced.len(), self.synthetic_data_ratio)
        };

        // Generated samples go first so the trailing test split stays sourced.
        let mut samples = Vec::with_capacity(synthetic_count + sourced.len());
        if synthetic_count > 0 {
            debug!("Augmenting with {} synthetic samples", synthetic_count);
            samples.extend(SyntheticDataGenerator::default().generate_samples(synthetic_count));
        }
        samples.extend(sourced);

        Ok(Dataset {
            sources: self.sources.clone(),
            samples,
            synthetic_count,
            test_split_ratio: self.test_split_ratio,
        })
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

fn is_media(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| MEDIA_EXTENSIONS.contains(&e.as_str()))
}

fn scan_source(source: &Path) -> Result<Vec<Sample>, FeederError> {
    let mut samples = Vec::new();

    let walker = WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = entry.map_err(|source_err| FeederError::Walk {
            path: source.to_path_buf(),
            source: source_err,
        })?;

        if !entry.file_type().is_file() || !is_media(entry.path()) {
            continue;
        }

        let id = entry
            .path()
            .strip_prefix(source)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .to_string();

        samples.push(Sample {
            id,
            path: Some(entry.path().to_path_buf()),
            brightness: 1.0,
            noise_level: 0.0,
            contrast: 0.0,
            water_present: None,
        });
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config_for(sources: &[&Path], synthetic_data_ratio: f64) -> TestConfiguration {
        TestConfiguration {
            data_sources: sources.iter().map(|p| p.display().to_string()).collect(),
            synthetic_data_ratio,
            ..TestConfiguration::default()
        }
    }

    #[test]
    fn test_loads_media_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("river/night")).unwrap();
        fs::write(dir.path().join("river/a.jpg"), b"x").unwrap();
        fs::write(dir.path().join("river/night/b.MP4"), b"x").unwrap();
        fs::write(dir.path().join("river/notes.txt"), b"x").unwrap();
        fs::create_dir_all(dir.path().join("river/.cache")).unwrap();
        fs::write(dir.path().join("river/.cache/c.png"), b"x").unwrap();

        let feeder = DataFeeder::new(&config_for(&[dir.path().join("river").as_path()], 0.0));
        let dataset = feeder.load_test_data().unwrap();

        let ids: Vec<_> = dataset.samples.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids[0].ends_with("a.jpg"));
        assert!(ids[1].ends_with("b.MP4"));
        assert_eq!(dataset.synthetic_count, 0);
        assert_eq!(dataset.origin(), "sources");
    }

    #[test]
    fn test_missing_source_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let feeder = DataFeeder::new(&config_for(&[dir.path().join("absent").as_path()], 0.3));
        let dataset = feeder.load_test_data().unwrap();
        assert!(dataset.samples.is_empty());
        assert_eq!(dataset.synthetic_count, 0);
    }

    #[test]
    fn test_synthetic_augmentation() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..4 {
            fs::write(dir.path().join(format!("{i}.png")), b"x").unwrap();
        }

        let feeder = DataFeeder::new(&config_for(&[dir.path()], 0.3));
        let dataset = feeder.load_test_data().unwrap();

        // ceil(4 * 0.3) = 2
        assert_eq!(dataset.synthetic_count, 2);
        assert_eq!(dataset.samples.len(), 6);
        assert_eq!(dataset.origin(), "mixed");
    }

    #[test]
    fn test_sourced_samples_reach_test_split() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..10 {
            fs::write(dir.path().join(format!("frame_{i:02}.png")), b"x").unwrap();
        }

        // Default ratios: 0.3 synthetic, 0.2 test.
        let feeder = DataFeeder::new(&config_for(&[dir.path()], 0.3));
        let dataset = feeder.load_test_data().unwrap();
        assert_eq!(dataset.samples.len(), 13);

        let test = dataset.test_samples();
        assert_eq!(test.len(), 2);
        assert!(test.iter().all(|s| s.path.is_some() && s.water_present.is_none()));
        assert!(test[1].id.ends_with("frame_09.png"));
    }
}
