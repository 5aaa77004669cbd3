//! Versioned persistence of trained scorer state.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use vigil_models::{FEATURE_DIM, FEATURE_SCHEMA_VERSION};

use super::{
    check_feature_layout, current_feature_names, read_gzip_json, write_gzip_json, NoveltyError, NoveltyResult,
    NoveltyScorer,
};

/// Current on-disk model format.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// On-disk wrapper around a scorer's opaque state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEnvelope {
    pub format_version: u32,
    /// [`NoveltyScorer::name`] of the implementation that produced `scorer`
    pub scorer_name: String,
    /// Feature layout revision the scorer was fitted on
    pub feature_schema_version: u32,
    pub feature_dim: usize,
    pub feature_names: Vec<String>,
    pub scorer: serde_json::Value,
    pub trained_at: DateTime<Utc>,
}

/// Named location for a persisted novelty model.
#[derive(Debug, Clone)]
pub struct NoveltyModelStore {
    path: PathBuf,
}

impl NoveltyModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Persist a trained scorer.
    pub fn save(&self, scorer: &dyn NoveltyScorer) -> NoveltyResult<ModelEnvelope> {
        if !scorer.is_trained() {
            return Err(NoveltyError::NotTrained);
        }

        let envelope = ModelEnvelope {
            format_version: MODEL_FORMAT_VERSION,
            scorer_name: scorer.name().to_string(),
            feature_schema_version: FEATURE_SCHEMA_VERSION,
            feature_dim: FEATURE_DIM,
            feature_names: current_feature_names(),
            scorer: scorer.state()?,
            trained_at: Utc::now(),
        };
        write_gzip_json(&self.path, &envelope)?;

        info!(
            path = %self.path.display(),
            scorer = %envelope.scorer_name,
            "Saved novelty model"
        );
        Ok(envelope)
    }

    /// Read and validate the envelope without touching a scorer.
    pub fn load_envelope(&self) -> NoveltyResult<ModelEnvelope> {
        if !self.exists() {
            return Err(NoveltyError::model_unavailable(format!(
                "no model at {}",
                self.path.display()
            )));
        }

        let envelope: ModelEnvelope = read_gzip_json(&self.path)?;
        if envelope.format_version != MODEL_FORMAT_VERSION {
            return Err(NoveltyError::VersionMismatch {
                found: envelope.format_version,
                expected: MODEL_FORMAT_VERSION,
            });
        }
        check_feature_layout(
            envelope.feature_schema_version,
            envelope.feature_dim,
            &envelope.feature_names,
        )?;
        Ok(envelope)
    }

    /// Restore persisted state into `scorer`.
    ///
    /// The envelope must have been written by an implementation with the
    /// same name.
    pub fn load_into(&self, scorer: &mut dyn NoveltyScorer) -> NoveltyResult<ModelEnvelope> {
        let envelope = self.load_envelope()?;
        if envelope.scorer_name != scorer.name() {
            return Err(NoveltyError::schema_mismatch(format!(
                "model was trained by '{}', cannot restore into '{}'",
                envelope.scorer_name,
                scorer.name()
            )));
        }
        scorer.restore(envelope.scorer.clone())?;

        info!(
            path = %self.path.display(),
            scorer = %envelope.scorer_name,
            trained_at = %envelope.trained_at,
            "Loaded novelty model"
        );
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::novelty::testing::MeanDistanceScorer;
    use vigil_models::FeatureVector;

    fn trained() -> MeanDistanceScorer {
        let mut scorer = MeanDistanceScorer::default();
        scorer
            .fit(&[FeatureVector::zeros(), FeatureVector::new([1.0; FEATURE_DIM])])
            .unwrap();
        scorer
    }

    #[test]
    fn test_save_and_restore() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoveltyModelStore::new(dir.path().join("model.json.gz"));
        let scorer = trained();
        store.save(&scorer).unwrap();

        let mut restored = MeanDistanceScorer::default();
        let envelope = store.load_into(&mut restored).unwrap();

        assert_eq!(envelope.feature_dim, FEATURE_DIM);
        assert_eq!(envelope.feature_schema_version, FEATURE_SCHEMA_VERSION);
        assert!(restored.is_trained());
        assert_eq!(restored.threshold(), scorer.threshold());
    }

    #[test]
    fn test_untrained_scorer_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoveltyModelStore::new(dir.path().join("model.json.gz"));
        assert!(matches!(
            store.save(&MeanDistanceScorer::default()),
            Err(NoveltyError::NotTrained)
        ));
        assert!(!store.exists());
    }

    #[test]
    fn test_missing_model_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoveltyModelStore::new(dir.path().join("absent.json.gz"));
        let mut scorer = MeanDistanceScorer::default();
        assert!(matches!(
            store.load_into(&mut scorer),
            Err(NoveltyError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_foreign_layout_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json.gz");
        let store = NoveltyModelStore::new(&path);
        let mut envelope = store.save(&trained()).unwrap();

        envelope.feature_names.reverse();
        write_gzip_json(&path, &envelope).unwrap();

        assert!(matches!(
            store.load_envelope(),
            Err(NoveltyError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_other_feature_schema_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json.gz");
        let store = NoveltyModelStore::new(&path);
        let mut envelope = store.save(&trained()).unwrap();

        envelope.feature_schema_version = FEATURE_SCHEMA_VERSION + 1;
        write_gzip_json(&path, &envelope).unwrap();

        let mut scorer = MeanDistanceScorer::default();
        assert!(matches!(
            store.load_into(&mut scorer),
            Err(NoveltyError::SchemaMismatch(_))
        ));
        assert!(!scorer.is_trained());
    }

    #[test]
    fn test_version_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json.gz");
        let store = NoveltyModelStore::new(&path);
        let mut envelope = store.save(&trained()).unwrap();

        envelope.format_version = 2;
        write_gzip_json(&path, &envelope).unwrap();

        assert!(matches!(
            store.load_envelope(),
            Err(NoveltyError::VersionMismatch { found: 2, .. })
        ));
    }
}
