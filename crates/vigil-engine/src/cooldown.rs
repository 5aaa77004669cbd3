//! Alert de-duplication.
//!
//! A persistent condition re-triggers every frame; the gate lets one alert
//! through per `(track_id, alert_type)` and suppresses the rest until the
//! suppression window has passed.

use std::collections::HashMap;

use vigil_models::{AlertType, TrackId};

/// Per-detector suppression state.
#[derive(Debug, Clone, Default)]
pub struct CooldownGate {
    suppression: HashMap<AlertType, u64>,
    last_emitted: HashMap<(TrackId, AlertType), u64>,
}

impl CooldownGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate with a single alert type configured.
    pub fn for_type(alert_type: AlertType, suppression_frames: u64) -> Self {
        Self::new().with_suppression(alert_type, suppression_frames)
    }

    /// Set the suppression window for an alert type. Unconfigured types use 0.
    pub fn with_suppression(mut self, alert_type: AlertType, frames: u64) -> Self {
        self.suppression.insert(alert_type, frames);
        self
    }

    pub fn suppression_frames(&self, alert_type: AlertType) -> u64 {
        self.suppression.get(&alert_type).copied().unwrap_or(0)
    }

    /// Whether an alert may be emitted at `current_frame`.
    ///
    /// Allowed when nothing was recorded for the key, or strictly more than
    /// the suppression window has elapsed since the last emission.
    pub fn allow(&self, track_id: TrackId, alert_type: AlertType, current_frame: u64) -> bool {
        match self.last_emitted.get(&(track_id, alert_type)) {
            None => true,
            Some(&last) => {
                current_frame.saturating_sub(last) > self.suppression_frames(alert_type)
            }
        }
    }

    /// Remember an emission.
    pub fn record(&mut self, track_id: TrackId, alert_type: AlertType, current_frame: u64) {
        self.last_emitted.insert((track_id, alert_type), current_frame);
    }

    /// `allow` followed by `record` when allowed.
    pub fn try_acquire(&mut self, track_id: TrackId, alert_type: AlertType, current_frame: u64) -> bool {
        if self.allow(track_id, alert_type, current_frame) {
            self.record(track_id, alert_type, current_frame);
            true
        } else {
            false
        }
    }

    pub fn last_emitted(&self, track_id: TrackId, alert_type: AlertType) -> Option<u64> {
        self.last_emitted.get(&(track_id, alert_type)).copied()
    }

    /// Drop every entry of the given tracks.
    pub fn forget(&mut self, track_ids: &[TrackId]) {
        if track_ids.is_empty() {
            return;
        }
        self.last_emitted.retain(|(id, _), _| !track_ids.contains(id));
    }

    pub fn len(&self) -> usize {
        self.last_emitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_emitted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_emission_allowed() {
        let gate = CooldownGate::for_type(AlertType::Loitering, 90);
        assert!(gate.allow(1, AlertType::Loitering, 0));
    }

    #[test]
    fn test_suppression_window_is_exclusive() {
        let mut gate = CooldownGate::for_type(AlertType::Loitering, 90);
        gate.record(1, AlertType::Loitering, 360);

        assert!(!gate.allow(1, AlertType::Loitering, 361));
        assert!(!gate.allow(1, AlertType::Loitering, 450));
        assert!(gate.allow(1, AlertType::Loitering, 451));
    }

    #[test]
    fn test_keys_are_independent() {
        let mut gate = CooldownGate::new()
            .with_suppression(AlertType::Loitering, 90)
            .with_suppression(AlertType::AbandonedBag, 150);
        gate.record(1, AlertType::Loitering, 100);

        assert!(gate.allow(2, AlertType::Loitering, 101));
        assert!(gate.allow(1, AlertType::AbandonedBag, 101));
    }

    #[test]
    fn test_try_acquire_records() {
        let mut gate = CooldownGate::for_type(AlertType::AbandonedBag, 150);
        assert!(gate.try_acquire(3, AlertType::AbandonedBag, 360));
        assert!(!gate.try_acquire(3, AlertType::AbandonedBag, 400));
        assert_eq!(gate.last_emitted(3, AlertType::AbandonedBag), Some(360));
    }

    #[test]
    fn test_forget_drops_entries() {
        let mut gate = CooldownGate::for_type(AlertType::Loitering, 90);
        gate.record(1, AlertType::Loitering, 10);
        gate.record(2, AlertType::Loitering, 10);

        gate.forget(&[1]);
        assert_eq!(gate.len(), 1);
        assert!(gate.allow(1, AlertType::Loitering, 11));
        assert!(!gate.allow(2, AlertType::Loitering, 11));
    }

    #[test]
    fn test_earlier_frame_is_suppressed() {
        let mut gate = CooldownGate::for_type(AlertType::Loitering, 0);
        gate.record(1, AlertType::Loitering, 100);
        assert!(!gate.allow(1, AlertType::Loitering, 50));
        assert!(gate.allow(1, AlertType::Loitering, 101));
    }
}
