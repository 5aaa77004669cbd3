//! Engine configuration.
//!
//! Durations are expressed in seconds and converted to frame counts with an
//! integer frame rate floored at 1, so that 29.97 fps sources use 29-frame
//! seconds exactly like the rules were tuned with.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};

/// Integer frame rate used to turn seconds into frame counts.
pub fn frame_rate(fps: f64) -> u64 {
    if fps.is_finite() && fps >= 1.0 {
        fps as u64
    } else {
        1
    }
}

/// Minimum number of samples a rule needs before it looks at displacement
/// (half a second, never fewer than 6).
pub fn min_rule_samples(fps: f64) -> usize {
    ((frame_rate(fps) as f64 * 0.5) as usize).max(6)
}

fn seconds_to_frames(seconds: f64, fps: f64) -> u64 {
    (seconds * frame_rate(fps) as f64).max(0.0) as u64
}

/// Top-level configuration for one source's engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Source frame rate
    pub fps: f64,
    pub history: HistoryConfig,
    pub loitering: LoiteringConfig,
    pub abandonment: AbandonmentConfig,
    pub novelty: NoveltyConfig,
}

/// Feature-history store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Samples kept per track for feature extraction (default: 30)
    pub window_samples: usize,
    /// Tracks idle for more than this many frames are pruned (default: 150)
    pub max_inactive_frames: u64,
    /// Run the prune pass every N frames (default: 30)
    pub prune_interval_frames: u64,
}

/// Loitering rule settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoiteringConfig {
    /// Window the person must stay within, in seconds (default: 12)
    pub window_sec: f64,
    /// Net displacement below which the person counts as loitering (default: 40)
    pub min_displacement_px: f64,
    /// Suppression between repeated alerts, in seconds (default: 3)
    pub cooldown_sec: f64,
}

/// Abandoned-bag rule settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbandonmentConfig {
    /// Stationarity window, in seconds (default: 6)
    pub window_sec: f64,
    /// Displacement below which the bag counts as stationary (default: 20)
    pub bag_stationary_px: f64,
    /// Time without a nearby person before the bag is unattended (default: 12)
    pub unattended_sec: f64,
    /// Person-to-bag centroid distance that counts as attending (default: 140)
    pub near_px: f64,
    /// Suppression between repeated alerts, in seconds (default: 5)
    pub cooldown_sec: f64,
    /// Only start the unattended clock once a person has been near the bag
    /// (default: false, bags that arrive alone are eligible from frame 0)
    pub require_prior_attendance: bool,
}

/// Novelty feature accumulation and scoring settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoveltyConfig {
    /// Collect feature vectors for offline fitting
    pub accumulate: bool,
    /// Minimum history length for a track to produce a vector (default: 6)
    pub min_history: usize,
    /// Upper bound on accumulated vectors, excess is dropped
    pub max_training_vectors: Option<usize>,
    /// Score live tracks every N frames when a scorer is attached (default: 30)
    pub score_interval_frames: u64,
    /// Score threshold for flagging; `None` defers to the scorer
    pub threshold: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            history: HistoryConfig::default(),
            loitering: LoiteringConfig::default(),
            abandonment: AbandonmentConfig::default(),
            novelty: NoveltyConfig::default(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window_samples: 30,
            max_inactive_frames: 150,
            prune_interval_frames: 30,
        }
    }
}

impl Default for LoiteringConfig {
    fn default() -> Self {
        Self {
            window_sec: 12.0,
            min_displacement_px: 40.0,
            cooldown_sec: 3.0,
        }
    }
}

impl Default for AbandonmentConfig {
    fn default() -> Self {
        Self {
            window_sec: 6.0,
            bag_stationary_px: 20.0,
            unattended_sec: 12.0,
            near_px: 140.0,
            cooldown_sec: 5.0,
            require_prior_attendance: false,
        }
    }
}

impl Default for NoveltyConfig {
    fn default() -> Self {
        Self {
            accumulate: false,
            min_history: 6,
            max_training_vectors: None,
            score_interval_frames: 30,
            threshold: None,
        }
    }
}

impl LoiteringConfig {
    /// Samples in the loitering window.
    pub fn window_frames(&self, fps: f64) -> usize {
        seconds_to_frames(self.window_sec, fps).max(1) as usize
    }

    pub fn cooldown_frames(&self, fps: f64) -> u64 {
        seconds_to_frames(self.cooldown_sec, fps)
    }
}

impl AbandonmentConfig {
    /// Samples in the stationarity window.
    pub fn window_frames(&self, fps: f64) -> usize {
        seconds_to_frames(self.window_sec, fps).max(1) as usize
    }

    pub fn unattended_frames(&self, fps: f64) -> u64 {
        seconds_to_frames(self.unattended_sec, fps)
    }

    pub fn cooldown_frames(&self, fps: f64) -> u64 {
        seconds_to_frames(self.cooldown_sec, fps)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl EngineConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            fps: env_or("VIGIL_FPS", defaults.fps),
            history: HistoryConfig {
                window_samples: env_or("VIGIL_FEATURE_WINDOW", defaults.history.window_samples),
                max_inactive_frames: env_or(
                    "VIGIL_MAX_INACTIVE_FRAMES",
                    defaults.history.max_inactive_frames,
                ),
                prune_interval_frames: env_or(
                    "VIGIL_PRUNE_INTERVAL",
                    defaults.history.prune_interval_frames,
                ),
            },
            loitering: LoiteringConfig {
                window_sec: env_or("VIGIL_LOITER_WINDOW_SEC", defaults.loitering.window_sec),
                min_displacement_px: env_or(
                    "VIGIL_LOITER_MIN_DISP_PX",
                    defaults.loitering.min_displacement_px,
                ),
                cooldown_sec: env_or("VIGIL_LOITER_COOLDOWN_SEC", defaults.loitering.cooldown_sec),
            },
            abandonment: AbandonmentConfig {
                window_sec: env_or("VIGIL_ABANDON_WINDOW_SEC", defaults.abandonment.window_sec),
                bag_stationary_px: env_or(
                    "VIGIL_BAG_STATIONARY_PX",
                    defaults.abandonment.bag_stationary_px,
                ),
                unattended_sec: env_or("VIGIL_UNATTENDED_SEC", defaults.abandonment.unattended_sec),
                near_px: env_or("VIGIL_NEAR_PX", defaults.abandonment.near_px),
                cooldown_sec: env_or(
                    "VIGIL_ABANDON_COOLDOWN_SEC",
                    defaults.abandonment.cooldown_sec,
                ),
                require_prior_attendance: env_or(
                    "VIGIL_REQUIRE_PRIOR_ATTENDANCE",
                    defaults.abandonment.require_prior_attendance,
                ),
            },
            novelty: NoveltyConfig {
                accumulate: env_or("VIGIL_ACCUMULATE_FEATURES", defaults.novelty.accumulate),
                min_history: env_or("VIGIL_NOVELTY_MIN_HISTORY", defaults.novelty.min_history),
                max_training_vectors: std::env::var("VIGIL_MAX_TRAINING_VECTORS")
                    .ok()
                    .and_then(|s| s.trim().parse().ok()),
                score_interval_frames: env_or(
                    "VIGIL_NOVELTY_INTERVAL",
                    defaults.novelty.score_interval_frames,
                ),
                threshold: std::env::var("VIGIL_NOVELTY_THRESHOLD")
                    .ok()
                    .and_then(|s| s.trim().parse().ok()),
            },
        }
    }

    /// Load a (possibly partial) JSON config file; missing fields use defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the rules cannot work with.
    pub fn validate(&self) -> EngineResult<()> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(EngineError::invalid_config(format!(
                "fps must be positive, got {}",
                self.fps
            )));
        }
        if self.history.window_samples == 0 {
            return Err(EngineError::invalid_config("history.window_samples must be > 0"));
        }

        let positive = [
            ("loitering.window_sec", self.loitering.window_sec),
            ("loitering.min_displacement_px", self.loitering.min_displacement_px),
            ("abandonment.window_sec", self.abandonment.window_sec),
            ("abandonment.bag_stationary_px", self.abandonment.bag_stationary_px),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(EngineError::invalid_config(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("loitering.cooldown_sec", self.loitering.cooldown_sec),
            ("abandonment.unattended_sec", self.abandonment.unattended_sec),
            ("abandonment.near_px", self.abandonment.near_px),
            ("abandonment.cooldown_sec", self.abandonment.cooldown_sec),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::invalid_config(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }

        if let Some(threshold) = self.novelty.threshold {
            if !threshold.is_finite() {
                return Err(EngineError::invalid_config("novelty.threshold must be finite"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_frame_counts() {
        let config = EngineConfig::default();
        assert_eq!(config.loitering.window_frames(config.fps), 360);
        assert_eq!(config.loitering.cooldown_frames(config.fps), 90);
        assert_eq!(config.abandonment.window_frames(config.fps), 180);
        assert_eq!(config.abandonment.unattended_frames(config.fps), 360);
        assert_eq!(config.abandonment.cooldown_frames(config.fps), 150);
        assert_eq!(min_rule_samples(config.fps), 15);
    }

    #[test]
    fn test_fractional_fps_is_floored() {
        assert_eq!(frame_rate(29.97), 29);
        assert_eq!(frame_rate(0.2), 1);
        assert_eq!(frame_rate(f64::NAN), 1);
        assert_eq!(min_rule_samples(5.0), 6);
    }

    #[test]
    fn test_validate_rejects_bad_fps() {
        let config = EngineConfig {
            fps: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"fps": 25.0, "abandonment": {"near_px": 120.0}}"#).unwrap();
        assert_eq!(config.fps, 25.0);
        assert_eq!(config.abandonment.near_px, 120.0);
        assert_eq!(config.abandonment.bag_stationary_px, 20.0);
        assert_eq!(config.loitering.window_sec, 12.0);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"loitering": {"min_displacement_px": 25.0}}"#).unwrap();

        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.loitering.min_displacement_px, 25.0);
    }
}
