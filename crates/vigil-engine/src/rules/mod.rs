//! Windowed behavioral rules.
//!
//! Each detector owns its own history window, cooldown gate and per-track
//! auxiliary state; no state is shared between detectors or sources.

pub mod abandonment;
pub mod loitering;

pub use abandonment::AbandonmentDetector;
pub use loitering::{LoiteringDetector, LoiteringState};

use vigil_models::{Alert, FrameObservations};

/// A rule evaluated once per frame.
pub trait RuleDetector {
    /// Short name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Ingest the frame's observations and return the alerts it triggers.
    ///
    /// Frames must arrive in strictly increasing `frame_id` order.
    fn evaluate(&mut self, frame: &FrameObservations) -> Vec<Alert>;

    /// Evict tracks idle for more than `max_inactive_frames`, together with
    /// their cooldown and auxiliary state. Returns the number evicted.
    fn prune(&mut self, current_frame: u64, max_inactive_frames: u64) -> usize;

    /// Tracks currently held.
    fn live_tracks(&self) -> usize;
}
