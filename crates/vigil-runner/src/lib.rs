//! Offline replay of tracked-detection logs.
//!
//! This crate provides:
//! - The JSON-lines detection log format and frame grouping
//! - Concurrent per-source replay through independent engines
//! - A single alert-log writer shared by all sources
//! - Training-feature export for offline novelty fitting

pub mod config;
pub mod detection;
pub mod error;
pub mod replay;

pub use config::RunnerConfig;
pub use detection::{DetectionRecord, FrameGrouper};
pub use error::{RunnerError, RunnerResult};
pub use replay::{replay_source, run, source_info, spawn_sink_writer, RunSummary, SourceSummary};
