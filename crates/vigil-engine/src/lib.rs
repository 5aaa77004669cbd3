//! Trajectory tracking and behavioral rules for tracked objects.
//!
//! This crate provides:
//! - Bounded per-track history windows with inactivity pruning
//! - 12-component trajectory feature extraction
//! - Per-frame proximity queries between label classes
//! - Loitering and abandoned-bag detectors with per-track cooldown
//! - A pluggable novelty-scoring contract with versioned persistence
//! - Alert sinks and a per-source engine tying it all together

pub mod config;
pub mod cooldown;
pub mod engine;
pub mod error;
pub mod features;
pub mod history;
pub mod metrics;
pub mod novelty;
pub mod proximity;
pub mod rules;
pub mod sink;

pub use config::{
    AbandonmentConfig, EngineConfig, HistoryConfig, LoiteringConfig, NoveltyConfig,
};
pub use cooldown::CooldownGate;
pub use engine::{FrameReport, SurveillanceEngine};
pub use error::{EngineError, EngineResult};
pub use features::TrajectoryFeatureExtractor;
pub use history::{TrackHistory, TrackHistoryStore, TrackSample};
pub use novelty::{
    FeatureAccumulator, FeatureDataset, NoveltyError, NoveltyModelStore, NoveltyMonitor,
    NoveltyResult, NoveltyScorer, TrackNovelty,
};
pub use proximity::{ProximityIndex, ProximityResult};
pub use rules::{AbandonmentDetector, LoiteringDetector, LoiteringState, RuleDetector};
pub use sink::{AlertSink, JsonlAlertSink, MemoryAlertSink, SinkError, SinkResult};
