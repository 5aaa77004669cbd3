//! Behavioral alerts and the record format handed to alert sinks.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{BoundingBox, ObjectLabel, TrackId};

/// Kind of behavioral alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    /// A person stayed within a small region for a full window
    Loitering,
    /// A bag stayed stationary with no person nearby for too long
    AbandonedBag,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Loitering => "LOITERING",
            AlertType::AbandonedBag => "ABANDONED_BAG",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert raised by a rule detector.
///
/// The engine keeps no reference to an alert once it is returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub subject_label: ObjectLabel,
    pub track_id: TrackId,
    /// Non-negative confidence-like score
    pub score: f64,
    pub frame_id: u64,
    pub time_sec: f64,
    pub bbox: BoundingBox,
    /// Free-form diagnostics for operators
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub extra: String,
}

/// Where an alert came from, attached by the caller before persisting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SourceInfo {
    /// File name (or stream name) of the source video
    pub source_video: String,
    /// Folder or dataset the source belongs to
    pub source_folder: String,
}

impl SourceInfo {
    pub fn new(source_video: impl Into<String>, source_folder: impl Into<String>) -> Self {
        Self {
            source_video: source_video.into(),
            source_folder: source_folder.into(),
        }
    }
}

/// One append-only row in the alert log.
///
/// Fields serialize in log column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AlertRecord {
    /// Wall-clock time the record was written
    pub timestamp: DateTime<Utc>,
    pub video_time_sec: f64,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub object_label: ObjectLabel,
    pub track_id: TrackId,
    pub score: f64,
    pub frame: u64,
    /// Integer box corners, kept so a snapshot can be produced later
    pub bbox: [i64; 4],
    /// Reference to a captured snapshot, if the sink produced one
    pub snapshot_ref: Option<String>,
    pub source_video: String,
    pub source_folder: String,
    pub extra: String,
}

impl AlertRecord {
    /// Build a record from an alert, stamped with the current time.
    pub fn from_alert(alert: &Alert, source: &SourceInfo) -> Self {
        Self::from_alert_at(alert, source, Utc::now())
    }

    pub fn from_alert_at(alert: &Alert, source: &SourceInfo, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            video_time_sec: alert.time_sec,
            alert_type: alert.alert_type,
            object_label: alert.subject_label,
            track_id: alert.track_id,
            score: alert.score,
            frame: alert.frame_id,
            bbox: alert.bbox.to_pixels(),
            snapshot_ref: None,
            source_video: source.source_video.clone(),
            source_folder: source.source_folder.clone(),
            extra: alert.extra.clone(),
        }
    }

    /// Attach a snapshot reference.
    pub fn with_snapshot(mut self, snapshot_ref: impl Into<String>) -> Self {
        self.snapshot_ref = Some(snapshot_ref.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_alert() -> Alert {
        Alert {
            alert_type: AlertType::AbandonedBag,
            subject_label: ObjectLabel::Bag,
            track_id: 9,
            score: 1.0,
            frame_id: 360,
            time_sec: 12.0,
            bbox: BoundingBox::new(490.4, 490.0, 510.9, 510.0),
            extra: "min_person_dist=1000000000.0px".to_string(),
        }
    }

    #[test]
    fn test_alert_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&AlertType::AbandonedBag).unwrap(),
            "\"ABANDONED_BAG\""
        );
        assert_eq!(AlertType::Loitering.to_string(), "LOITERING");
    }

    #[test]
    fn test_record_from_alert() {
        let alert = sample_alert();
        let source = SourceInfo::new("Test001.avi", "Avenue");
        let record = AlertRecord::from_alert(&alert, &source).with_snapshot("snaps/a.jpg");

        assert_eq!(record.frame, 360);
        assert_eq!(record.object_label, ObjectLabel::Bag);
        assert_eq!(record.bbox, [490, 490, 510, 510]);
        assert_eq!(record.source_folder, "Avenue");
        assert_eq!(record.snapshot_ref.as_deref(), Some("snaps/a.jpg"));
    }

    #[test]
    fn test_alert_serializes_type_field() {
        let value = serde_json::to_value(sample_alert()).unwrap();
        assert_eq!(value["type"], "ABANDONED_BAG");
        assert_eq!(value["subject_label"], "bag");
    }

    #[test]
    fn test_record_keys_keep_log_column_order() {
        let record = AlertRecord::from_alert(&sample_alert(), &SourceInfo::new("Test001.avi", "Avenue"));
        let line = serde_json::to_string(&record).unwrap();

        let columns = [
            "timestamp",
            "video_time_sec",
            "type",
            "object_label",
            "track_id",
            "score",
            "frame",
            "bbox",
            "snapshot_ref",
            "source_video",
            "source_folder",
            "extra",
        ];
        let positions: Vec<usize> = columns
            .iter()
            .map(|c| line.find(&format!("\"{}\":", c)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", line);
    }
}
