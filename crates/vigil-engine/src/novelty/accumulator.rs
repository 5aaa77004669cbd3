//! Training-set collection from normal footage.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vigil_models::{FeatureVector, TrackId, FEATURE_DIM, FEATURE_SCHEMA_VERSION};

use super::{
    check_feature_layout, current_feature_names, read_gzip_json, write_gzip_json, NoveltyError, NoveltyResult,
};
use crate::config::NoveltyConfig;
use crate::features::TrajectoryFeatureExtractor;
use crate::history::TrackHistoryStore;

/// Current on-disk dataset format.
pub const DATASET_FORMAT_VERSION: u32 = 1;

/// Persisted training vectors plus the layout they were extracted with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDataset {
    pub format_version: u32,
    pub feature_schema_version: u32,
    pub feature_dim: usize,
    pub feature_names: Vec<String>,
    pub vectors: Vec<FeatureVector>,
    /// Vectors discarded because the accumulator was full
    #[serde(default)]
    pub dropped: usize,
    pub collected_at: DateTime<Utc>,
}

impl FeatureDataset {
    pub fn new(vectors: Vec<FeatureVector>, dropped: usize) -> Self {
        Self {
            format_version: DATASET_FORMAT_VERSION,
            feature_schema_version: FEATURE_SCHEMA_VERSION,
            feature_dim: FEATURE_DIM,
            feature_names: current_feature_names(),
            vectors,
            dropped,
            collected_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Merge another dataset with the same layout.
    pub fn extend(&mut self, other: FeatureDataset) {
        self.vectors.extend(other.vectors);
        self.dropped += other.dropped;
    }

    /// Write as gzip JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> NoveltyResult<()> {
        let path = path.as_ref();
        write_gzip_json(path, self)?;
        info!(
            path = %path.display(),
            vectors = self.vectors.len(),
            dropped = self.dropped,
            "Saved feature dataset"
        );
        Ok(())
    }

    /// Read a dataset, rejecting unknown versions and foreign layouts.
    pub fn load(path: impl AsRef<Path>) -> NoveltyResult<Self> {
        let dataset: Self = read_gzip_json(path.as_ref())?;
        if dataset.format_version != DATASET_FORMAT_VERSION {
            return Err(NoveltyError::VersionMismatch {
                found: dataset.format_version,
                expected: DATASET_FORMAT_VERSION,
            });
        }
        check_feature_layout(
            dataset.feature_schema_version,
            dataset.feature_dim,
            &dataset.feature_names,
        )?;
        Ok(dataset)
    }
}

/// Collects feature vectors for offline fitting.
#[derive(Debug, Clone)]
pub struct FeatureAccumulator {
    min_history: usize,
    max_vectors: Option<usize>,
    vectors: Vec<FeatureVector>,
    dropped: usize,
}

impl FeatureAccumulator {
    /// `min_history` is the shortest history worth describing; `max_vectors`
    /// caps memory, with excess vectors counted and dropped.
    pub fn new(min_history: usize, max_vectors: Option<usize>) -> Self {
        Self {
            min_history,
            max_vectors,
            vectors: Vec::new(),
            dropped: 0,
        }
    }

    pub fn from_config(config: &NoveltyConfig) -> Self {
        Self::new(config.min_history, config.max_training_vectors)
    }

    /// Add a single vector. Returns `false` when the cap dropped it.
    pub fn push(&mut self, vector: FeatureVector) -> bool {
        if self.max_vectors.is_some_and(|cap| self.vectors.len() >= cap) {
            self.dropped += 1;
            return false;
        }
        self.vectors.push(vector);
        true
    }

    /// Describe the given tracks that have at least `min_history` samples.
    ///
    /// `track_ids` are the tracks seen in the current frame, so a track that
    /// has left the scene stops contributing. Unknown ids are skipped and
    /// tracks are visited in id order. Returns the number of vectors kept.
    pub fn collect_from(
        &mut self,
        store: &TrackHistoryStore,
        extractor: &TrajectoryFeatureExtractor,
        track_ids: &[TrackId],
    ) -> usize {
        let mut ids: Vec<TrackId> = track_ids
            .iter()
            .copied()
            .filter(|id| store.get(*id).is_some_and(|h| h.len() >= self.min_history))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let mut kept = 0;
        for id in ids {
            let vector = extractor.extract(&store.history_of(id));
            if self.push(vector) {
                kept += 1;
            }
        }
        if kept > 0 {
            debug!(kept, total = self.vectors.len(), "Accumulated training features");
        }
        kept
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn vectors(&self) -> &[FeatureVector] {
        &self.vectors
    }

    pub fn into_dataset(self) -> FeatureDataset {
        FeatureDataset::new(self.vectors, self.dropped)
    }
}
