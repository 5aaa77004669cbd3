//! Engine metrics collection.
//!
//! Recording is a no-op until the host process installs a recorder
//! (the runner installs the Prometheus exporter).

use metrics::{counter, gauge};
use vigil_models::AlertType;

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Alerts emitted, by alert type.
    pub const ALERTS_TOTAL: &str = "vigil_alerts_total";

    /// Tracks evicted by prune passes, by store.
    pub const TRACKS_PRUNED_TOTAL: &str = "vigil_tracks_pruned_total";

    /// Tracks currently held, by store.
    pub const LIVE_TRACKS: &str = "vigil_live_tracks";

    /// Frames evaluated by an engine.
    pub const FRAMES_PROCESSED_TOTAL: &str = "vigil_frames_processed_total";

    /// Live tracks the novelty scorer flagged.
    pub const NOVELTY_FLAGS_TOTAL: &str = "vigil_novelty_flags_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

pub fn record_alert(alert_type: AlertType) {
    counter!(names::ALERTS_TOTAL, "type" => alert_type.as_str()).increment(1);
}

pub fn record_prune(store: &'static str, removed: usize, remaining: usize) {
    if removed > 0 {
        counter!(names::TRACKS_PRUNED_TOTAL, "store" => store).increment(removed as u64);
    }
    gauge!(names::LIVE_TRACKS, "store" => store).set(remaining as f64);
}

pub fn record_frame() {
    counter!(names::FRAMES_PROCESSED_TOTAL).increment(1);
}

pub fn record_novelty_flags(flagged: usize) {
    if flagged > 0 {
        counter!(names::NOVELTY_FLAGS_TOTAL).increment(flagged as u64);
    }
}
