//! Shared data models for the Vigil behavioral-rule engine.
//!
//! This crate provides Serde-serializable types for:
//! - Object labels and pixel bounding boxes
//! - Per-frame track observations coming from an external tracker
//! - Behavioral alerts and the sink record they are persisted as
//! - Fixed-length trajectory feature vectors

pub mod alert;
pub mod feature;
pub mod geometry;
pub mod label;
pub mod observation;

// Re-export common types
pub use alert::{Alert, AlertRecord, AlertType, SourceInfo};
pub use feature::{FeatureVector, FEATURE_DIM, FEATURE_NAMES, FEATURE_SCHEMA_VERSION};
pub use geometry::{BoundingBox, Point};
pub use label::{ObjectLabel, UnknownLabel};
pub use observation::{FrameObservations, TrackId, TrackObservation};
