//! Track observations delivered by the external detector/tracker.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{BoundingBox, ObjectLabel};

/// Identity assigned by the external tracker. Unique within one source only.
pub type TrackId = u32;

/// One tracked object in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrackObservation {
    pub track_id: TrackId,
    pub label: ObjectLabel,
    pub bbox: BoundingBox,
    pub frame_id: u64,
    /// Position of the frame in the source, in seconds
    pub time_sec: f64,
}

impl TrackObservation {
    pub fn new(
        track_id: TrackId,
        label: ObjectLabel,
        bbox: BoundingBox,
        frame_id: u64,
        time_sec: f64,
    ) -> Self {
        Self {
            track_id,
            label,
            bbox,
            frame_id,
            time_sec,
        }
    }
}

/// Every observation the tracker produced for a single frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameObservations {
    pub frame_id: u64,
    pub time_sec: f64,
    pub observations: Vec<TrackObservation>,
}

impl FrameObservations {
    pub fn new(frame_id: u64, time_sec: f64) -> Self {
        Self {
            frame_id,
            time_sec,
            observations: Vec::new(),
        }
    }

    /// Add an observation, stamping it with this frame's id and time.
    pub fn push(&mut self, track_id: TrackId, label: ObjectLabel, bbox: BoundingBox) {
        self.observations.push(TrackObservation::new(
            track_id,
            label,
            bbox,
            self.frame_id,
            self.time_sec,
        ));
    }

    /// Builder-style variant of [`FrameObservations::push`].
    pub fn with(mut self, track_id: TrackId, label: ObjectLabel, bbox: BoundingBox) -> Self {
        self.push(track_id, label, bbox);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Observations carrying the given label.
    pub fn labeled(&self, label: ObjectLabel) -> impl Iterator<Item = &TrackObservation> + '_ {
        self.observations.iter().filter(move |o| o.label == label)
    }

    /// Distinct track ids seen in this frame, ascending.
    pub fn track_ids(&self) -> Vec<TrackId> {
        let mut ids: Vec<TrackId> = self.observations.iter().map(|o| o.track_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
