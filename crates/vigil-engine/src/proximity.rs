//! Per-frame nearest-neighbour queries between label classes.

use vigil_models::{FrameObservations, ObjectLabel, Point};

/// Distance reported when there is nothing to measure against.
pub const NO_NEIGHBOR_DISTANCE: f64 = 1e9;

/// Outcome of a proximity query. Transient, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityResult {
    /// Smallest finite distance seen, or [`NO_NEIGHBOR_DISTANCE`]
    pub min_distance: f64,
    /// Whether any neighbour was within the query threshold (inclusive)
    pub any_within_threshold: bool,
}

/// Centroids of every visible object of one label in the current frame.
#[derive(Debug, Clone, Default)]
pub struct ProximityIndex {
    centroids: Vec<Point>,
}

impl ProximityIndex {
    /// Index the centroids of all `label` observations in a frame.
    pub fn from_frame(frame: &FrameObservations, label: ObjectLabel) -> Self {
        Self {
            centroids: frame.labeled(label).map(|o| o.bbox.centroid()).collect(),
        }
    }

    pub fn from_points(centroids: Vec<Point>) -> Self {
        Self { centroids }
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    /// Scan every indexed centroid against `point`.
    ///
    /// Non-finite distances are skipped rather than poisoning the minimum.
    pub fn query(&self, point: Point, threshold: f64) -> ProximityResult {
        let mut min_distance = NO_NEIGHBOR_DISTANCE;
        let mut any_within_threshold = false;

        for centroid in &self.centroids {
            let d = centroid.distance(&point);
            if !d.is_finite() {
                continue;
            }
            if d < min_distance {
                min_distance = d;
            }
            if d <= threshold {
                any_within_threshold = true;
            }
        }

        ProximityResult {
            min_distance,
            any_within_threshold,
        }
    }
}
