//! Trajectory novelty scoring.
//!
//! The engine never assumes a particular outlier algorithm. It talks to a
//! [`NoveltyScorer`] implementation through a narrow contract:
//!
//! - **Training**: [`FeatureAccumulator`] collects vectors from normal
//!   footage and persists them as a [`FeatureDataset`] for offline fitting.
//! - **Persistence**: [`NoveltyModelStore`] wraps a scorer's opaque state in
//!   a versioned envelope that pins the feature layout.
//! - **Inference**: [`NoveltyMonitor`] feeds live track vectors through
//!   `score`/`predict` and reports a missing model as
//!   [`NoveltyError::ModelUnavailable`].
//!
//! Both files are gzip-compressed JSON.

pub mod accumulator;
pub mod monitor;
pub mod store;

pub use accumulator::{FeatureAccumulator, FeatureDataset, DATASET_FORMAT_VERSION};
pub use monitor::{NoveltyMonitor, TrackNovelty};
pub use store::{ModelEnvelope, NoveltyModelStore, MODEL_FORMAT_VERSION};

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use vigil_models::{FeatureVector, FEATURE_DIM, FEATURE_NAMES, FEATURE_SCHEMA_VERSION};

/// Result type for novelty operations.
pub type NoveltyResult<T> = Result<T, NoveltyError>;

/// Errors at the novelty boundary.
#[derive(Debug, Error)]
pub enum NoveltyError {
    #[error("Novelty model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Novelty scorer has not been trained")]
    NotTrained,

    #[error("Cannot fit a novelty scorer on an empty training set")]
    EmptyTrainingSet,

    #[error("Feature schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Unsupported format version {found} (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Scorer error: {0}")]
    Scorer(String),
}

impl NoveltyError {
    pub fn model_unavailable(message: impl Into<String>) -> Self {
        Self::ModelUnavailable(message.into())
    }

    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch(message.into())
    }

    pub fn scorer(message: impl Into<String>) -> Self {
        Self::Scorer(message.into())
    }
}

/// Pluggable outlier model over [`FeatureVector`]s.
///
/// Higher scores are more anomalous. State is opaque to the engine and is
/// carried as JSON so any implementation can be persisted by
/// [`NoveltyModelStore`].
pub trait NoveltyScorer: Send + Sync {
    /// Stable identifier stored alongside the persisted state.
    fn name(&self) -> &str;

    /// Fit on vectors from normal footage.
    fn fit(&mut self, vectors: &[FeatureVector]) -> NoveltyResult<()>;

    /// One score per input vector, in input order.
    fn score(&self, vectors: &[FeatureVector]) -> NoveltyResult<Vec<f64>>;

    /// Threshold learned during fitting.
    fn threshold(&self) -> f64;

    /// One flag per input vector: `score > threshold`.
    ///
    /// `threshold` overrides the learned one when given.
    fn predict(&self, vectors: &[FeatureVector], threshold: Option<f64>) -> NoveltyResult<Vec<bool>> {
        let threshold = threshold.unwrap_or_else(|| self.threshold());
        Ok(self
            .score(vectors)?
            .into_iter()
            .map(|s| s > threshold)
            .collect())
    }

    fn is_trained(&self) -> bool;

    /// Export trained state.
    fn state(&self) -> NoveltyResult<serde_json::Value>;

    /// Replace the current state with a previously exported one.
    fn restore(&mut self, state: serde_json::Value) -> NoveltyResult<()>;
}

/// Reject persisted feature layouts that differ from the current one.
pub(crate) fn check_feature_layout(
    schema_version: u32,
    feature_dim: usize,
    feature_names: &[String],
) -> NoveltyResult<()> {
    if schema_version != FEATURE_SCHEMA_VERSION {
        return Err(NoveltyError::schema_mismatch(format!(
            "feature schema version {} does not match {}",
            schema_version, FEATURE_SCHEMA_VERSION
        )));
    }
    if feature_dim != FEATURE_DIM {
        return Err(NoveltyError::schema_mismatch(format!(
            "expected {} features, found {}",
            FEATURE_DIM, feature_dim
        )));
    }
    let matches = feature_names.len() == FEATURE_DIM
        && feature_names.iter().zip(FEATURE_NAMES.iter()).all(|(a, b)| a == b);
    if !matches {
        return Err(NoveltyError::schema_mismatch(format!(
            "feature order {:?} does not match {:?}",
            feature_names, FEATURE_NAMES
        )));
    }
    Ok(())
}

pub(crate) fn current_feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|n| n.to_string()).collect()
}

/// Write `value` as gzip-compressed JSON, replacing any existing file.
pub(crate) fn write_gzip_json<T: Serialize>(path: &Path, value: &T) -> NoveltyResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(value)
        .map_err(|e| NoveltyError::Serialization(format!("Failed to serialize: {}", e)))?;

    let file = File::create(path)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    encoder.write_all(json.as_bytes())?;
    encoder.finish()?.flush()?;
    Ok(())
}

/// Read a gzip-compressed JSON file written by [`write_gzip_json`].
pub(crate) fn read_gzip_json<T: DeserializeOwned>(path: &Path) -> NoveltyResult<T> {
    let file = File::open(path)?;
    let mut decoder = GzDecoder::new(BufReader::new(file));
    let mut json = String::new();
    decoder.read_to_string(&mut json)?;

    serde_json::from_str(&json)
        .map_err(|e| NoveltyError::Serialization(format!("Failed to deserialize {}: {}", path.display(), e)))
}
