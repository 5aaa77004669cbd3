//! Loitering rule.
//!
//! A person track loiters when, over a full window of samples, its net
//! centroid displacement stays below `min_displacement_px`. Only full windows
//! count, so the check always spans the configured duration.

use tracing::info;
use vigil_models::{Alert, AlertType, FrameObservations, ObjectLabel, TrackId};

use super::RuleDetector;
use crate::config::{min_rule_samples, LoiteringConfig};
use crate::cooldown::CooldownGate;
use crate::history::TrackHistoryStore;
use crate::metrics;

/// Where a person track stands with respect to the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoiteringState {
    /// Window not yet full (or track unknown)
    InsufficientHistory,
    /// Window full, no alert inside the current suppression window
    Monitored,
    /// Alerted recently; further alerts are suppressed
    Alerted,
}

/// Per-source loitering detector.
#[derive(Debug, Clone)]
pub struct LoiteringDetector {
    config: LoiteringConfig,
    history: TrackHistoryStore,
    gate: CooldownGate,
    min_samples: usize,
}

impl LoiteringDetector {
    pub fn new(config: LoiteringConfig, fps: f64) -> Self {
        let window = config.window_frames(fps);
        let gate = CooldownGate::for_type(AlertType::Loitering, config.cooldown_frames(fps));
        Self {
            config,
            history: TrackHistoryStore::new(window),
            gate,
            min_samples: min_rule_samples(fps),
        }
    }

    /// Samples required for a full window.
    pub fn window_frames(&self) -> usize {
        self.history.capacity()
    }

    pub fn state_of(&self, track_id: TrackId, current_frame: u64) -> LoiteringState {
        let ready = self
            .history
            .get(track_id)
            .map(|h| h.len() >= self.min_samples && h.is_full())
            .unwrap_or(false);
        if !ready {
            return LoiteringState::InsufficientHistory;
        }
        if self.gate.last_emitted(track_id, AlertType::Loitering).is_some()
            && !self.gate.allow(track_id, AlertType::Loitering, current_frame)
        {
            LoiteringState::Alerted
        } else {
            LoiteringState::Monitored
        }
    }

    fn score(&self, displacement: f64) -> f64 {
        let threshold = self.config.min_displacement_px;
        ((threshold - displacement) / threshold).max(0.0)
    }
}

impl RuleDetector for LoiteringDetector {
    fn name(&self) -> &'static str {
        "loitering"
    }

    fn evaluate(&mut self, frame: &FrameObservations) -> Vec<Alert> {
        for obs in frame.labeled(ObjectLabel::Person) {
            self.history.update(obs.track_id, &obs.bbox, frame.frame_id);
        }

        let mut alerts = Vec::new();
        for obs in frame.labeled(ObjectLabel::Person) {
            let Some(history) = self.history.get(obs.track_id) else {
                continue;
            };
            if history.len() < self.min_samples || !history.is_full() {
                continue;
            }
            let Some(displacement) = history.net_displacement() else {
                continue;
            };
            if !(displacement < self.config.min_displacement_px) {
                continue;
            }
            if !self
                .gate
                .try_acquire(obs.track_id, AlertType::Loitering, frame.frame_id)
            {
                continue;
            }

            let score = self.score(displacement);
            info!(
                track_id = obs.track_id,
                frame_id = frame.frame_id,
                displacement,
                score,
                "Loitering detected"
            );
            metrics::record_alert(AlertType::Loitering);

            alerts.push(Alert {
                alert_type: AlertType::Loitering,
                subject_label: ObjectLabel::Person,
                track_id: obs.track_id,
                score,
                frame_id: frame.frame_id,
                time_sec: frame.time_sec,
                bbox: obs.bbox,
                extra: format!("displacement={:.1}px", displacement),
            });
        }
        alerts
    }

    fn prune(&mut self, current_frame: u64, max_inactive_frames: u64) -> usize {
        let removed = self.history.prune(current_frame, max_inactive_frames);
        self.gate.forget(&removed);
        metrics::record_prune(self.name(), removed.len(), self.history.len());
        removed.len()
    }

    fn live_tracks(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_models::BoundingBox;

    fn person_frame(frame_id: u64, track_id: TrackId, cx: f64, cy: f64) -> FrameObservations {
        FrameObservations::new(frame_id, frame_id as f64 / 30.0).with(
            track_id,
            ObjectLabel::Person,
            BoundingBox::from_center(cx, cy, 40.0, 100.0),
        )
    }

    fn short_window() -> LoiteringConfig {
        LoiteringConfig {
            window_sec: 1.0,
            min_displacement_px: 40.0,
            cooldown_sec: 1.0,
        }
    }

    #[test]
    fn test_alerts_when_window_fills() {
        let mut detector = LoiteringDetector::new(short_window(), 30.0);
        for frame in 1..30 {
            assert!(detector.evaluate(&person_frame(frame, 1, 100.0, 100.0)).is_empty());
        }
        let alerts = detector.evaluate(&person_frame(30, 1, 100.0, 100.0));

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::Loitering);
        assert_eq!(alerts[0].frame_id, 30);
        assert!((alerts[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_moving_person_does_not_alert() {
        let mut detector = LoiteringDetector::new(short_window(), 30.0);
        let mut total = 0;
        for frame in 1..=120 {
            total += detector
                .evaluate(&person_frame(frame, 1, frame as f64 * 3.0, 100.0))
                .len();
        }
        assert_eq!(total, 0);
    }

    #[test]
    fn test_score_is_graded() {
        let mut detector = LoiteringDetector::new(short_window(), 30.0);
        let mut alerts = Vec::new();
        for frame in 1..=30 {
            // drift 30 px over the window
            let cx = 100.0 + (frame - 1) as f64 * (30.0 / 29.0);
            alerts.extend(detector.evaluate(&person_frame(frame, 1, cx, 100.0)));
        }
        assert_eq!(alerts.len(), 1);
        assert!((alerts[0].score - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_ignores_other_labels() {
        let mut detector = LoiteringDetector::new(short_window(), 30.0);
        for frame in 1..=60 {
            let f = FrameObservations::new(frame, 0.0)
                .with(1, ObjectLabel::Bag, BoundingBox::from_center(10.0, 10.0, 5.0, 5.0))
                .with(2, ObjectLabel::Bicycle, BoundingBox::from_center(10.0, 10.0, 5.0, 5.0));
            assert!(detector.evaluate(&f).is_empty());
        }
        assert_eq!(detector.live_tracks(), 0);
    }

    #[test]
    fn test_cooldown_then_realert() {
        let mut detector = LoiteringDetector::new(short_window(), 30.0);
        let mut alert_frames = Vec::new();
        for frame in 1..=100 {
            for alert in detector.evaluate(&person_frame(frame, 1, 100.0, 100.0)) {
                alert_frames.push(alert.frame_id);
            }
        }
        assert_eq!(alert_frames, vec![30, 61, 92]);
    }

    #[test]
    fn test_state_transitions() {
        let mut detector = LoiteringDetector::new(short_window(), 30.0);
        assert_eq!(detector.state_of(1, 0), LoiteringState::InsufficientHistory);

        for frame in 1..=30 {
            detector.evaluate(&person_frame(frame, 1, 100.0, 100.0));
        }
        assert_eq!(detector.state_of(1, 30), LoiteringState::Alerted);
        assert_eq!(detector.state_of(1, 61), LoiteringState::Monitored);
    }

    #[test]
    fn test_prune_clears_cooldown() {
        let mut detector = LoiteringDetector::new(short_window(), 30.0);
        for frame in 1..=30 {
            detector.evaluate(&person_frame(frame, 1, 100.0, 100.0));
        }
        assert_eq!(detector.prune(500, 150), 1);
        assert_eq!(detector.live_tracks(), 0);
        assert!(detector.gate.is_empty());
    }
}
