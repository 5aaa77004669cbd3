//! Live novelty scoring of tracked trajectories.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use vigil_models::TrackId;

use super::{NoveltyError, NoveltyModelStore, NoveltyResult, NoveltyScorer};
use crate::features::TrajectoryFeatureExtractor;
use crate::history::TrackHistoryStore;
use crate::metrics;

/// Novelty verdict for one live track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackNovelty {
    pub track_id: TrackId,
    pub score: f64,
    pub is_novel: bool,
}

/// Inference-side wrapper around an optional trained scorer.
pub struct NoveltyMonitor {
    scorer: Option<Box<dyn NoveltyScorer>>,
    threshold: Option<f64>,
    min_history: usize,
}

impl fmt::Debug for NoveltyMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoveltyMonitor")
            .field("scorer", &self.scorer.as_ref().map(|s| s.name().to_string()))
            .field("threshold", &self.threshold)
            .field("min_history", &self.min_history)
            .finish()
    }
}

impl NoveltyMonitor {
    /// Monitor backed by `scorer`, which should already be trained.
    pub fn new(scorer: Box<dyn NoveltyScorer>, min_history: usize) -> Self {
        Self {
            scorer: Some(scorer),
            threshold: None,
            min_history,
        }
    }

    /// Monitor with no model; every scoring call reports `ModelUnavailable`.
    pub fn unavailable(min_history: usize) -> Self {
        Self {
            scorer: None,
            threshold: None,
            min_history,
        }
    }

    /// Restore `scorer` from `store` and wrap it.
    pub fn load(
        store: &NoveltyModelStore,
        mut scorer: Box<dyn NoveltyScorer>,
        min_history: usize,
    ) -> NoveltyResult<Self> {
        store.load_into(scorer.as_mut())?;
        Ok(Self::new(scorer, min_history))
    }

    /// Override the scorer's learned threshold.
    pub fn with_threshold(mut self, threshold: Option<f64>) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn is_available(&self) -> bool {
        self.scorer.as_ref().is_some_and(|s| s.is_trained())
    }

    pub fn min_history(&self) -> usize {
        self.min_history
    }

    /// Score the given tracks that have at least `min_history` samples.
    ///
    /// `track_ids` are the tracks seen in the current frame; unknown ids are
    /// skipped and results come back in id order.
    pub fn score_tracks(
        &self,
        store: &TrackHistoryStore,
        extractor: &TrajectoryFeatureExtractor,
        track_ids: &[TrackId],
    ) -> NoveltyResult<Vec<TrackNovelty>> {
        let scorer = match &self.scorer {
            Some(scorer) if scorer.is_trained() => scorer,
            Some(scorer) => {
                return Err(NoveltyError::model_unavailable(format!(
                    "scorer '{}' has no trained state",
                    scorer.name()
                )))
            }
            None => return Err(NoveltyError::model_unavailable("no scorer configured")),
        };

        let mut ids: Vec<TrackId> = track_ids
            .iter()
            .copied()
            .filter(|id| store.get(*id).is_some_and(|h| h.len() >= self.min_history))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let vectors: Vec<_> = ids
            .iter()
            .map(|id| extractor.extract(&store.history_of(*id)))
            .collect();
        let scores = scorer.score(&vectors)?;
        let flags = scorer.predict(&vectors, self.threshold)?;
        if scores.len() != ids.len() || flags.len() != ids.len() {
            return Err(NoveltyError::scorer(format!(
                "expected {} results, got {} scores and {} flags",
                ids.len(),
                scores.len(),
                flags.len()
            )));
        }

        let results: Vec<TrackNovelty> = ids
            .into_iter()
            .zip(scores)
            .zip(flags)
            .map(|((track_id, score), is_novel)| TrackNovelty {
                track_id,
                score,
                is_novel,
            })
            .collect();

        let flagged = results.iter().filter(|r| r.is_novel).count();
        debug!(scored = results.len(), flagged, "Scored live tracks for novelty");
        metrics::record_novelty_flags(flagged);
        Ok(results)
    }
}
