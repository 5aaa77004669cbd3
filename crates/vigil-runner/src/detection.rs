//! Tracked-detection log format.
//!
//! One JSON object per line, as written by the upstream detector/tracker:
//!
//! ```json
//! {"frame_id": 12, "time_sec": 0.4, "track_id": 3, "class_name": "backpack", "bbox": [10, 20, 40, 60]}
//! ```
//!
//! Lines of the same frame must be contiguous. Class names outside the
//! engine's label set are dropped, but their frame still advances the
//! stream.

use serde::Deserialize;
use tracing::warn;
use vigil_models::{BoundingBox, FrameObservations, ObjectLabel, TrackId};

/// One tracked detection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectionRecord {
    pub frame_id: u64,
    #[serde(default)]
    pub time_sec: Option<f64>,
    pub track_id: TrackId,
    pub class_name: String,
    /// `[x1, y1, x2, y2]` in pixels
    pub bbox: [f64; 4],
}

impl DetectionRecord {
    /// Parse a line; blank lines and `#` comments yield `None`.
    pub fn parse_line(line: &str) -> Result<Option<Self>, serde_json::Error> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }
        serde_json::from_str(trimmed).map(Some)
    }

    pub fn label(&self) -> Option<ObjectLabel> {
        ObjectLabel::from_class_name(&self.class_name)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let [x1, y1, x2, y2] = self.bbox;
        BoundingBox::new(x1, y1, x2, y2)
    }
}

/// Folds contiguous records into whole frames.
#[derive(Debug)]
pub struct FrameGrouper {
    fps: f64,
    current: Option<FrameObservations>,
}

impl FrameGrouper {
    /// `fps` derives `time_sec` for records that omit it.
    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 30.0 };
        Self { fps, current: None }
    }

    /// Add a record. Returns the previous frame once a new frame id starts.
    pub fn push(&mut self, record: DetectionRecord) -> Option<FrameObservations> {
        let same_frame = self
            .current
            .as_ref()
            .is_some_and(|frame| frame.frame_id == record.frame_id);
        let finished = if same_frame {
            None
        } else {
            let time_sec = record
                .time_sec
                .unwrap_or(record.frame_id as f64 / self.fps);
            self.current
                .replace(FrameObservations::new(record.frame_id, time_sec))
        };

        let bbox = record.bounding_box();
        match record.label() {
            Some(label) if bbox.is_finite() => {
                if let Some(frame) = self.current.as_mut() {
                    frame.push(record.track_id, label, bbox);
                }
            }
            Some(_) => warn!(
                frame_id = record.frame_id,
                track_id = record.track_id,
                "Skipping detection with non-finite box"
            ),
            None => {}
        }
        finished
    }

    /// Flush the frame in progress.
    pub fn finish(&mut self) -> Option<FrameObservations> {
        self.current.take()
    }
}
