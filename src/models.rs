//! Data models for the test bench.
//!
//! This module contains the result tree (`ResultValue`), the aggregated
//! `RunResult` document, the derived `Summary`, and the dataset types passed
//! to evaluators.

use crate::error::PersistError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A phase's result: string keys mapped to arbitrary values.
///
/// `BTreeMap` keeps keys sorted, which makes the encoded JSON stable.
pub type PhaseResult = BTreeMap<String, ResultValue>;

/// A value inside a result tree.
///
/// This is a closed set: anything a phase wants to report must be expressed
/// with these variants. `Path` exists so callers can store filesystem paths
/// directly; it is flattened to a string when encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<ResultValue>),
    Mapping(PhaseResult),
    Path(PathBuf),
}

impl ResultValue {
    /// Convert into a JSON value. Paths become their string form and
    /// non-finite floats become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            ResultValue::Null => Value::Null,
            ResultValue::Bool(b) => Value::Bool(*b),
            ResultValue::Integer(i) => Value::Number((*i).into()),
            ResultValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            ResultValue::String(s) => Value::String(s.clone()),
            ResultValue::Sequence(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            ResultValue::Mapping(map) => Value::Object(mapping_to_json(map)),
            ResultValue::Path(p) => Value::String(p.to_string_lossy().into_owned()),
        }
    }

    /// Build a result value from decoded JSON.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => ResultValue::Null,
            Value::Bool(b) => ResultValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ResultValue::Integer(i),
                None => ResultValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => ResultValue::String(s),
            Value::Array(items) => {
                ResultValue::Sequence(items.into_iter().map(Self::from_json).collect())
            }
            Value::Object(map) => ResultValue::Mapping(mapping_from_json(map)),
        }
    }

    /// Numeric view of the value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ResultValue::Integer(i) => Some(*i as f64),
            ResultValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&PhaseResult> {
        match self {
            ResultValue::Mapping(map) => Some(map),
            _ => None,
        }
    }
}

/// Encode a phase result as a JSON object.
pub fn mapping_to_json(map: &PhaseResult) -> Map<String, Value> {
    map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
}

/// Decode a JSON object into a phase result.
pub fn mapping_from_json(map: Map<String, Value>) -> PhaseResult {
    map.into_iter()
        .map(|(k, v)| (k, ResultValue::from_json(v)))
        .collect()
}

impl From<bool> for ResultValue {
    fn from(v: bool) -> Self {
        ResultValue::Bool(v)
    }
}

impl From<i64> for ResultValue {
    fn from(v: i64) -> Self {
        ResultValue::Integer(v)
    }
}

impl From<usize> for ResultValue {
    fn from(v: usize) -> Self {
        i64::try_from(v).map_or(ResultValue::Float(v as f64), ResultValue::Integer)
    }
}

impl From<u32> for ResultValue {
    fn from(v: u32) -> Self {
        ResultValue::Integer(i64::from(v))
    }
}

impl From<f64> for ResultValue {
    fn from(v: f64) -> Self {
        ResultValue::Float(v)
    }
}

impl From<&str> for ResultValue {
    fn from(v: &str) -> Self {
        ResultValue::String(v.to_string())
    }
}

impl From<String> for ResultValue {
    fn from(v: String) -> Self {
        ResultValue::String(v)
    }
}

impl From<PathBuf> for ResultValue {
    fn from(v: PathBuf) -> Self {
        ResultValue::Path(v)
    }
}

impl From<PhaseResult> for ResultValue {
    fn from(v: PhaseResult) -> Self {
        ResultValue::Mapping(v)
    }
}

impl<T: Into<ResultValue>> From<Vec<T>> for ResultValue {
    fn from(v: Vec<T>) -> Self {
        ResultValue::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ResultValue>> From<Option<T>> for ResultValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ResultValue::Null, Into::into)
    }
}

/// Metrics reported for one threshold.
///
/// External evaluators report `f1`; the placeholder generator reports
/// `f1_score`. Both decode into the same field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    #[serde(alias = "f1")]
    pub f1_score: f64,
}

impl Metrics {
    pub fn to_phase_result(&self) -> PhaseResult {
        let mut map = PhaseResult::new();
        map.insert("accuracy".into(), self.accuracy.into());
        map.insert("precision".into(), self.precision.into());
        map.insert("recall".into(), self.recall.into());
        map.insert("f1_score".into(), self.f1_score.into());
        map
    }
}

/// Derived summary of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_tests_run: u32,
    pub tests_passed: u32,
    pub tests_failed: u32,
    pub overall_score: f64,
}

impl Summary {
    pub fn to_phase_result(&self) -> PhaseResult {
        let mut map = PhaseResult::new();
        map.insert("total_tests_run".into(), self.total_tests_run.into());
        map.insert("tests_passed".into(), self.tests_passed.into());
        map.insert("tests_failed".into(), self.tests_failed.into());
        map.insert("overall_score".into(), self.overall_score.into());
        map
    }
}

/// The complete results document of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub metadata: PhaseResult,
    pub accuracy_tests: PhaseResult,
    pub performance_tests: PhaseResult,
    pub night_vision_tests: PhaseResult,
    pub summary: Summary,
}

impl RunResult {
    /// View the whole document as a single result tree.
    pub fn to_value(&self) -> ResultValue {
        let mut root = PhaseResult::new();
        root.insert("metadata".into(), self.metadata.clone().into());
        root.insert("accuracy_tests".into(), self.accuracy_tests.clone().into());
        root.insert(
            "performance_tests".into(),
            self.performance_tests.clone().into(),
        );
        root.insert(
            "night_vision_tests".into(),
            self.night_vision_tests.clone().into(),
        );
        root.insert("summary".into(), self.summary.to_phase_result().into());
        ResultValue::Mapping(root)
    }

    pub fn to_json(&self) -> Value {
        self.to_value().to_json()
    }

    /// Rebuild a results document from decoded JSON.
    pub fn from_json(value: Value) -> Result<Self, PersistError> {
        let Value::Object(mut root) = value else {
            return Err(PersistError::NotAMapping("<root>".to_string()));
        };

        let summary = root
            .remove("summary")
            .ok_or(PersistError::MissingKey("summary"))?;
        let summary: Summary =
            serde_json::from_value(summary).map_err(PersistError::InvalidSummary)?;

        Ok(Self {
            metadata: take_mapping(&mut root, "metadata")?,
            accuracy_tests: take_mapping(&mut root, "accuracy_tests")?,
            performance_tests: take_mapping(&mut root, "performance_tests")?,
            night_vision_tests: take_mapping(&mut root, "night_vision_tests")?,
            summary,
        })
    }
}

fn take_mapping(root: &mut Map<String, Value>, key: &'static str) -> Result<PhaseResult, PersistError> {
    match root.remove(key) {
        Some(Value::Object(map)) => Ok(mapping_from_json(map)),
        Some(_) => Err(PersistError::NotAMapping(key.to_string())),
        None => Err(PersistError::MissingKey(key)),
    }
}

/// `ceil(len * ratio)`, tolerant of float error such as `10 * 0.3`.
pub fn fraction_count(len: usize, ratio: f64) -> usize {
    ((len as f64) * ratio - 1e-9).ceil().max(0.0) as usize
}

/// One input sample handed to an evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: String,
    /// Source file, absent for generated samples.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Relative scene brightness, 1.0 is nominal daylight.
    pub brightness: f64,
    pub noise_level: f64,
    /// Contrast offset, 0.0 is unmodified.
    pub contrast: f64,
    /// Ground truth label, only known for generated samples.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_present: Option<bool>,
}

/// Samples prepared for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Configured sources the samples were loaded from. Empty for purely
    /// synthetic data.
    pub sources: Vec<PathBuf>,
    pub samples: Vec<Sample>,
    /// Number of generated samples included in `samples`. When the dataset
    /// also has sourced samples, the generated ones come first.
    pub synthetic_count: usize,
    pub test_split_ratio: f64,
}

impl Dataset {
    pub fn origin(&self) -> &'static str {
        match (self.sources.is_empty(), self.synthetic_count > 0) {
            (true, _) => "synthetic",
            (false, true) => "mixed",
            (false, false) => "sources",
        }
    }

    /// Samples the test split is drawn from.
    ///
    /// Generated samples only pad the training portion of a mixed dataset,
    /// so evaluators always see sourced data there.
    fn split_pool(&self) -> &[Sample] {
        if self.sources.is_empty() || self.synthetic_count >= self.samples.len() {
            &self.samples
        } else {
            &self.samples[self.synthetic_count..]
        }
    }

    /// The trailing test fraction of the samples.
    ///
    /// A non-empty dataset always yields at least one test sample.
    pub fn test_samples(&self) -> &[Sample] {
        let pool = self.split_pool();
        let len = pool.len();
        if len == 0 {
            return &[];
        }
        let count = fraction_count(len, self.test_split_ratio).clamp(1, len);
        &pool[len - count..]
    }

    /// Describe the dataset for the run metadata.
    pub fn describe(&self) -> PhaseResult {
        let mut map = PhaseResult::new();
        map.insert("origin".into(), self.origin().into());
        map.insert("sample_count".into(), self.samples.len().into());
        map.insert("test_sample_count".into(), self.test_samples().len().into());
        map.insert("synthetic_sample_count".into(), self.synthetic_count.into());
        map.insert("sources".into(), self.sources.clone().into());
        map
    }
}
