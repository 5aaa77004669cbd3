//! Per-source orchestration.
//!
//! A [`SurveillanceEngine`] owns every piece of per-track state for one
//! video source: the feature history store, both rule detectors with their
//! cooldown gates, and the optional novelty accumulator and monitor. Sources
//! never share an engine.

use tracing::{debug, info, warn};
use vigil_models::{Alert, FeatureVector, FrameObservations, TrackId};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::features::TrajectoryFeatureExtractor;
use crate::history::{TrackHistoryStore, TrackSample};
use crate::metrics;
use crate::novelty::{FeatureAccumulator, FeatureDataset, NoveltyError, NoveltyMonitor, NoveltyResult, TrackNovelty};
use crate::rules::{AbandonmentDetector, LoiteringDetector, RuleDetector};

/// Store name used for the feature history in metrics.
const FEATURE_STORE: &str = "features";

/// Everything one frame produced.
#[derive(Debug)]
pub struct FrameReport {
    pub frame_id: u64,
    /// Loitering alerts first, then abandonment alerts
    pub alerts: Vec<Alert>,
    /// Present on scoring frames when a novelty monitor is attached
    pub novelty: Option<NoveltyResult<Vec<TrackNovelty>>>,
    /// Tracks evicted across all stores on this frame
    pub pruned: usize,
}

impl FrameReport {
    /// Live tracks flagged as novel on this frame, if any were scored.
    pub fn novel_tracks(&self) -> Vec<TrackId> {
        match &self.novelty {
            Some(Ok(results)) => results.iter().filter(|r| r.is_novel).map(|r| r.track_id).collect(),
            _ => Vec::new(),
        }
    }
}

/// Rule engine for a single source.
#[derive(Debug)]
pub struct SurveillanceEngine {
    config: EngineConfig,
    extractor: TrajectoryFeatureExtractor,
    features: TrackHistoryStore,
    loitering: LoiteringDetector,
    abandonment: AbandonmentDetector,
    accumulator: Option<FeatureAccumulator>,
    novelty: Option<NoveltyMonitor>,
    last_frame: Option<u64>,
    /// Frame of the last periodic prune; 0 before the first
    last_prune_frame: u64,
    /// Frame of the last novelty scoring pass; 0 before the first
    last_score_frame: u64,
    frames_processed: u64,
    novelty_warned: bool,
}

impl SurveillanceEngine {
    /// Build an engine from validated configuration.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;

        let fps = config.fps;
        let accumulator = config
            .novelty
            .accumulate
            .then(|| FeatureAccumulator::from_config(&config.novelty));

        Ok(Self {
            extractor: TrajectoryFeatureExtractor::new(fps),
            features: TrackHistoryStore::new(config.history.window_samples),
            loitering: LoiteringDetector::new(config.loitering.clone(), fps),
            abandonment: AbandonmentDetector::new(config.abandonment.clone(), fps),
            accumulator,
            novelty: None,
            last_frame: None,
            last_prune_frame: 0,
            last_score_frame: 0,
            frames_processed: 0,
            novelty_warned: false,
            config,
        })
    }

    /// Attach a novelty monitor. Its threshold defaults to the configured one.
    pub fn with_novelty(mut self, monitor: NoveltyMonitor) -> Self {
        let monitor = match self.config.novelty.threshold {
            Some(threshold) => monitor.with_threshold(Some(threshold)),
            None => monitor,
        };
        self.novelty = Some(monitor);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn loitering(&self) -> &LoiteringDetector {
        &self.loitering
    }

    pub fn abandonment(&self) -> &AbandonmentDetector {
        &self.abandonment
    }

    pub fn accumulator(&self) -> Option<&FeatureAccumulator> {
        self.accumulator.as_ref()
    }

    /// Tracks currently held in the feature history store.
    pub fn live_tracks(&self) -> usize {
        self.features.len()
    }

    /// Feature-window samples for a track, oldest first. Empty if unknown.
    pub fn history_of(&self, track_id: TrackId) -> Vec<TrackSample> {
        self.features.history_of(track_id)
    }

    /// Current feature vector for a track; zeros when unknown or too short.
    pub fn features_of(&self, track_id: TrackId) -> FeatureVector {
        self.extractor.extract(&self.features.history_of(track_id))
    }

    /// Ingest one frame.
    ///
    /// Frame ids must be strictly increasing; anything else is rejected with
    /// [`EngineError::OutOfOrderFrame`] and leaves the engine untouched.
    pub fn process_frame(&mut self, frame: &FrameObservations) -> EngineResult<FrameReport> {
        if let Some(last) = self.last_frame {
            if frame.frame_id <= last {
                return Err(EngineError::out_of_order(last, frame.frame_id));
            }
        }
        self.last_frame = Some(frame.frame_id);

        for obs in &frame.observations {
            self.features.update(obs.track_id, &obs.bbox, frame.frame_id);
        }

        let mut alerts = Vec::new();
        for detector in self.detectors_mut() {
            alerts.extend(detector.evaluate(frame));
        }

        // intervals are measured in elapsed frame ids, not id multiples
        let prune_interval = self.config.history.prune_interval_frames.max(1);
        let pruned = if frame.frame_id - self.last_prune_frame >= prune_interval {
            self.last_prune_frame = frame.frame_id;
            self.prune_at(frame.frame_id)
        } else {
            0
        };

        let observed = frame.track_ids();
        if let Some(accumulator) = self.accumulator.as_mut() {
            accumulator.collect_from(&self.features, &self.extractor, &observed);
        }

        let novelty = self.score_novelty(frame.frame_id, &observed);

        self.frames_processed += 1;
        metrics::record_frame();

        Ok(FrameReport {
            frame_id: frame.frame_id,
            alerts,
            novelty,
            pruned,
        })
    }

    /// Evict idle tracks from every store in lockstep.
    pub fn prune_at(&mut self, current_frame: u64) -> usize {
        let max_inactive = self.config.history.max_inactive_frames;

        let removed = self.features.prune(current_frame, max_inactive);
        metrics::record_prune(FEATURE_STORE, removed.len(), self.features.len());

        let mut total = removed.len();
        for detector in self.detectors_mut() {
            total += detector.prune(current_frame, max_inactive);
        }

        if total > 0 {
            debug!(current_frame, removed = total, "Pruned idle tracks");
        }
        total
    }

    /// Final prune at end of stream. Hands back the accumulated training
    /// features when accumulation was enabled.
    pub fn finish(mut self) -> Option<FeatureDataset> {
        if let Some(last) = self.last_frame {
            self.prune_at(last);
        }

        let dataset = self.accumulator.take().map(FeatureAccumulator::into_dataset);
        info!(
            frames = self.frames_processed,
            last_frame = ?self.last_frame,
            live_tracks = self.features.len(),
            training_vectors = dataset.as_ref().map(|d| d.len()),
            "Engine finished"
        );
        dataset
    }

    fn detectors_mut(&mut self) -> [&mut dyn RuleDetector; 2] {
        [&mut self.loitering, &mut self.abandonment]
    }

    fn score_novelty(&mut self, frame_id: u64, observed: &[TrackId]) -> Option<NoveltyResult<Vec<TrackNovelty>>> {
        let monitor = self.novelty.as_ref()?;
        let interval = self.config.novelty.score_interval_frames.max(1);
        if frame_id - self.last_score_frame < interval {
            return None;
        }
        self.last_score_frame = frame_id;

        let result = monitor.score_tracks(&self.features, &self.extractor, observed);
        match &result {
            Err(NoveltyError::ModelUnavailable(reason)) => {
                if !self.novelty_warned {
                    warn!(frame_id, reason = %reason, "Novelty model unavailable, skipping scoring");
                    self.novelty_warned = true;
                }
            }
            Err(e) => warn!(frame_id, error = %e, "Novelty scoring failed"),
            Ok(_) => {}
        }
        Some(result)
    }
}
