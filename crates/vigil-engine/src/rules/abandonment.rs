//! Abandoned-bag rule.
//!
//! A bag is abandoned when it is stationary over its window and no person
//! centroid has been within `near_px` for `unattended_sec`. The unattended
//! clock counts elapsed frames, so tracking gaps extend it.
//!
//! A bag that was never near a person counts from frame 0 and becomes
//! eligible as soon as the unattended duration has elapsed, unless
//! `require_prior_attendance` is set.

use std::collections::HashMap;

use tracing::info;
use vigil_models::{Alert, AlertType, FrameObservations, ObjectLabel, TrackId};

use super::RuleDetector;
use crate::config::{min_rule_samples, AbandonmentConfig};
use crate::cooldown::CooldownGate;
use crate::history::TrackHistoryStore;
use crate::metrics;
use crate::proximity::ProximityIndex;

/// Per-source abandoned-bag detector.
#[derive(Debug, Clone)]
pub struct AbandonmentDetector {
    config: AbandonmentConfig,
    history: TrackHistoryStore,
    gate: CooldownGate,
    /// Last frame a person was within `near_px`, per bag
    last_near_person: HashMap<TrackId, u64>,
    /// Nearest person distance in the bag's latest frame (diagnostics only)
    nearest_person: HashMap<TrackId, f64>,
    min_samples: usize,
    unattended_frames: u64,
}

impl AbandonmentDetector {
    pub fn new(config: AbandonmentConfig, fps: f64) -> Self {
        let window = config.window_frames(fps);
        let gate = CooldownGate::for_type(AlertType::AbandonedBag, config.cooldown_frames(fps));
        let unattended_frames = config.unattended_frames(fps);
        Self {
            config,
            history: TrackHistoryStore::new(window),
            gate,
            last_near_person: HashMap::new(),
            nearest_person: HashMap::new(),
            min_samples: min_rule_samples(fps),
            unattended_frames,
        }
    }

    pub fn unattended_frames(&self) -> u64 {
        self.unattended_frames
    }

    /// Last frame a person was seen near the bag, if ever.
    pub fn last_near_person(&self, track_id: TrackId) -> Option<u64> {
        self.last_near_person.get(&track_id).copied()
    }

    /// Nearest person distance recorded for the bag's latest frame.
    pub fn nearest_person_distance(&self, track_id: TrackId) -> Option<f64> {
        self.nearest_person.get(&track_id).copied()
    }

    fn is_stationary(&self, track_id: TrackId) -> bool {
        self.history
            .get(track_id)
            .filter(|h| h.len() >= self.min_samples)
            .and_then(|h| h.net_displacement())
            .map(|d| d < self.config.bag_stationary_px)
            .unwrap_or(false)
    }

    fn is_unattended(&self, track_id: TrackId, current_frame: u64) -> bool {
        let last_near = match self.last_near_person.get(&track_id) {
            Some(frame) => *frame,
            None if self.config.require_prior_attendance => return false,
            None => 0,
        };
        current_frame.saturating_sub(last_near) >= self.unattended_frames
    }
}

impl RuleDetector for AbandonmentDetector {
    fn name(&self) -> &'static str {
        "abandonment"
    }

    fn evaluate(&mut self, frame: &FrameObservations) -> Vec<Alert> {
        let persons = ProximityIndex::from_frame(frame, ObjectLabel::Person);

        for bag in frame.labeled(ObjectLabel::Bag) {
            self.history.update(bag.track_id, &bag.bbox, frame.frame_id);
        }

        let mut alerts = Vec::new();
        for bag in frame.labeled(ObjectLabel::Bag) {
            let stationary = self.is_stationary(bag.track_id);

            let proximity = persons.query(bag.bbox.centroid(), self.config.near_px);
            self.nearest_person
                .insert(bag.track_id, proximity.min_distance);
            if proximity.any_within_threshold {
                self.last_near_person.insert(bag.track_id, frame.frame_id);
            }

            if !stationary || !self.is_unattended(bag.track_id, frame.frame_id) {
                continue;
            }
            if !self
                .gate
                .try_acquire(bag.track_id, AlertType::AbandonedBag, frame.frame_id)
            {
                continue;
            }

            info!(
                track_id = bag.track_id,
                frame_id = frame.frame_id,
                min_person_dist = proximity.min_distance,
                last_near_person = self.last_near_person(bag.track_id),
                "Abandoned bag detected"
            );
            metrics::record_alert(AlertType::AbandonedBag);

            alerts.push(Alert {
                alert_type: AlertType::AbandonedBag,
                subject_label: ObjectLabel::Bag,
                track_id: bag.track_id,
                score: 1.0,
                frame_id: frame.frame_id,
                time_sec: frame.time_sec,
                bbox: bag.bbox,
                extra: format!("min_person_dist={:.1}px", proximity.min_distance),
            });
        }
        alerts
    }

    fn prune(&mut self, current_frame: u64, max_inactive_frames: u64) -> usize {
        let removed = self.history.prune(current_frame, max_inactive_frames);
        for id in &removed {
            self.last_near_person.remove(id);
            self.nearest_person.remove(id);
        }
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

    const BAG: TrackId = 7;
    const PERSON: TrackId = 1;

    fn bag_box() -> BoundingBox {
        BoundingBox::from_center(500.0, 500.0, 30.0, 30.0)
    }

    fn frame_with_bag(frame_id: u64) -> FrameObservations {
        FrameObservations::new(frame_id, frame_id as f64 / 30.0).with(BAG, ObjectLabel::Bag, bag_box())
    }

    /// 1 s window, 2 s unattended, 1 s cooldown at 30 fps.
    fn fast_config() -> AbandonmentConfig {
        AbandonmentConfig {
            window_sec: 1.0,
            bag_stationary_px: 20.0,
            unattended_sec: 2.0,
            near_px: 140.0,
            cooldown_sec: 1.0,
            require_prior_attendance: false,
        }
    }

    fn run(detector: &mut AbandonmentDetector, frames: impl IntoIterator<Item = FrameObservations>) -> Vec<Alert> {
        frames.into_iter().flat_map(|f| detector.evaluate(&f)).collect()
    }

    #[test]
    fn test_lonely_bag_alerts_at_unattended_frame() {
        let mut detector = AbandonmentDetector::new(fast_config(), 30.0);
        let alerts = run(&mut detector, (1..=60).map(frame_with_bag));

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].frame_id, 60);
        assert_eq!(alerts[0].score, 1.0);
        assert_eq!(alerts[0].extra, "min_person_dist=1000000000.0px");
    }

    #[test]
    fn test_nearby_person_resets_clock() {
        let mut detector = AbandonmentDetector::new(fast_config(), 30.0);
        let frames = (1..=200).map(|f| {
            let frame = frame_with_bag(f);
            if f == 50 {
                frame.with(PERSON, ObjectLabel::Person, BoundingBox::from_center(560.0, 500.0, 40.0, 100.0))
            } else {
                frame
            }
        });
        let alerts = run(&mut detector, frames);

        // alert at 60 is blocked because the person at frame 50 restarts the clock
        assert_eq!(alerts[0].frame_id, 110);
        assert_eq!(detector.last_near_person(BAG), Some(50));
    }

    #[test]
    fn test_distant_person_does_not_attend() {
        let mut detector = AbandonmentDetector::new(fast_config(), 30.0);
        let frames = (1..=60).map(|f| {
            frame_with_bag(f).with(
                PERSON,
                ObjectLabel::Person,
                BoundingBox::from_center(800.0, 500.0, 40.0, 100.0),
            )
        });
        let alerts = run(&mut detector, frames);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].extra, "min_person_dist=300.0px");
        assert_eq!(detector.nearest_person_distance(BAG), Some(300.0));
    }

    #[test]
    fn test_moving_bag_is_not_stationary() {
        let mut detector = AbandonmentDetector::new(fast_config(), 30.0);
        let frames = (1..=120).map(|f| {
            FrameObservations::new(f, 0.0).with(
                BAG,
                ObjectLabel::Bag,
                BoundingBox::from_center(f as f64 * 2.0, 500.0, 30.0, 30.0),
            )
        });
        assert!(run(&mut detector, frames).is_empty());
    }

    #[test]
    fn test_cooldown_separates_alerts() {
        let mut detector = AbandonmentDetector::new(fast_config(), 30.0);
        let frames: Vec<u64> = run(&mut detector, (1..=130).map(frame_with_bag))
            .iter()
            .map(|a| a.frame_id)
            .collect();
        assert_eq!(frames, vec![60, 91, 122]);
    }

    #[test]
    fn test_prior_attendance_required() {
        let config = AbandonmentConfig {
            require_prior_attendance: true,
            ..fast_config()
        };
        let mut detector = AbandonmentDetector::new(config, 30.0);
        assert!(run(&mut detector, (1..=100).map(frame_with_bag)).is_empty());

        let frames = (101..=200).map(|f| {
            let frame = frame_with_bag(f);
            if f == 101 {
                frame.with(PERSON, ObjectLabel::Person, BoundingBox::from_center(500.0, 520.0, 40.0, 100.0))
            } else {
                frame
            }
        });
        let alerts = run(&mut detector, frames);
        assert_eq!(alerts[0].frame_id, 161);
    }

    #[test]
    fn test_configured_stationary_threshold_is_used() {
        let config = AbandonmentConfig {
            bag_stationary_px: 50.0,
            ..fast_config()
        };
        let mut detector = AbandonmentDetector::new(config, 30.0);
        // 1 px per frame: 29 px across a 30-sample window
        let frames = (1..=60).map(|f| {
            FrameObservations::new(f, 0.0).with(
                BAG,
                ObjectLabel::Bag,
                BoundingBox::from_center(500.0 + f as f64, 500.0, 30.0, 30.0),
            )
        });
        assert_eq!(run(&mut detector, frames).len(), 1);
    }

    #[test]
    fn test_prune_drops_aux_state() {
        let mut detector = AbandonmentDetector::new(fast_config(), 30.0);
        run(&mut detector, (1..=60).map(frame_with_bag));

        assert_eq!(detector.prune(1000, 150), 1);
        assert!(detector.nearest_person.is_empty());
        assert!(detector.last_near_person.is_empty());
        assert!(detector.gate.is_empty());
        assert_eq!(detector.prune(1000, 150), 0);
    }
}
