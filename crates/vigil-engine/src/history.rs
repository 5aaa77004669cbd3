//! Per-track sliding-window history.
//!
//! Each track keeps a fixed-capacity ring of `(cx, cy, w, h, frame_id)`
//! samples, oldest first. Appending past capacity evicts the oldest sample.
//! Whole tracks only disappear through [`TrackHistoryStore::prune`]; nothing
//! expires implicitly on read.

use std::collections::{HashMap, VecDeque};

use tracing::debug;
use vigil_models::{BoundingBox, Point, TrackId};

/// One recorded observation of a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackSample {
    pub cx: f64,
    pub cy: f64,
    pub width: f64,
    pub height: f64,
    pub frame_id: u64,
}

impl TrackSample {
    pub fn from_bbox(bbox: &BoundingBox, frame_id: u64) -> Self {
        Self {
            cx: bbox.cx(),
            cy: bbox.cy(),
            width: bbox.width(),
            height: bbox.height(),
            frame_id,
        }
    }

    #[inline]
    pub fn centroid(&self) -> Point {
        Point::new(self.cx, self.cy)
    }
}

/// Bounded, insertion-ordered history of one track.
#[derive(Debug, Clone)]
pub struct TrackHistory {
    samples: VecDeque<TrackSample>,
    capacity: usize,
}

impl TrackHistory {
    fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, sample: TrackSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the window holds exactly `capacity` samples.
    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn oldest(&self) -> Option<&TrackSample> {
        self.samples.front()
    }

    pub fn newest(&self) -> Option<&TrackSample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackSample> + '_ {
        self.samples.iter()
    }

    /// Distance between the oldest and newest centroid.
    pub fn net_displacement(&self) -> Option<f64> {
        let first = self.oldest()?;
        let last = self.newest()?;
        Some(first.centroid().distance(&last.centroid()))
    }

    /// Oldest-to-newest copy of the samples.
    pub fn to_vec(&self) -> Vec<TrackSample> {
        self.samples.iter().copied().collect()
    }
}

/// Owner of every track's history for one source.
#[derive(Debug, Clone)]
pub struct TrackHistoryStore {
    capacity: usize,
    tracks: HashMap<TrackId, TrackHistory>,
}

impl TrackHistoryStore {
    /// Create a store whose histories hold at most `capacity` samples.
    ///
    /// A zero capacity is raised to 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tracks: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a sample derived from `bbox`, creating the history if needed.
    pub fn update(&mut self, track_id: TrackId, bbox: &BoundingBox, frame_id: u64) {
        let capacity = self.capacity;
        self.tracks
            .entry(track_id)
            .or_insert_with(|| TrackHistory::new(capacity))
            .push(TrackSample::from_bbox(bbox, frame_id));
    }

    /// Borrow a track's history.
    pub fn get(&self, track_id: TrackId) -> Option<&TrackHistory> {
        self.tracks.get(&track_id)
    }

    /// Snapshot of a track's samples, oldest first. Empty for unknown tracks.
    pub fn history_of(&self, track_id: TrackId) -> Vec<TrackSample> {
        self.tracks
            .get(&track_id)
            .map(TrackHistory::to_vec)
            .unwrap_or_default()
    }

    /// Remove tracks whose newest sample is more than `max_inactive_frames`
    /// behind `current_frame`, plus any empty history.
    ///
    /// Returns the removed ids so owners can drop dependent per-track state.
    pub fn prune(&mut self, current_frame: u64, max_inactive_frames: u64) -> Vec<TrackId> {
        let stale: Vec<TrackId> = self
            .tracks
            .iter()
            .filter_map(|(id, history)| match history.newest() {
                None => Some(*id),
                Some(last) if current_frame.saturating_sub(last.frame_id) > max_inactive_frames => {
                    Some(*id)
                }
                Some(_) => None,
            })
            .collect();

        for id in &stale {
            self.tracks.remove(id);
        }

        if !stale.is_empty() {
            debug!(
                current_frame,
                removed = stale.len(),
                remaining = self.tracks.len(),
                "Pruned inactive track histories"
            );
        }
        stale
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn contains(&self, track_id: TrackId) -> bool {
        self.tracks.contains_key(&track_id)
    }

    pub fn track_ids(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.tracks.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TrackId, &TrackHistory)> + '_ {
        self.tracks.iter().map(|(id, h)| (*id, h))
    }

    /// Drop all histories.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}
