//! Object labels understood by the rule engine.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a detector class name has no engine label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown object class: {0}")]
pub struct UnknownLabel(pub String);

/// Normalized category of a tracked object.
///
/// Detector vocabularies are richer than what the rules need; every bag-like
/// class collapses to [`ObjectLabel::Bag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ObjectLabel {
    Person,
    Bag,
    Bicycle,
}

impl ObjectLabel {
    /// Class names that normalize to [`ObjectLabel::Bag`].
    pub const BAG_CLASSES: [&'static str; 4] = ["backpack", "handbag", "suitcase", "bag"];

    /// Map a raw detector class name onto an engine label.
    ///
    /// Matching is case-insensitive. Returns `None` for classes the engine
    /// does not track, which callers drop silently.
    pub fn from_class_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "person" => Some(Self::Person),
            "bicycle" => Some(Self::Bicycle),
            n if Self::BAG_CLASSES.contains(&n) => Some(Self::Bag),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectLabel::Person => "person",
            ObjectLabel::Bag => "bag",
            ObjectLabel::Bicycle => "bicycle",
        }
    }
}

impl fmt::Display for ObjectLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_class_name(s).ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bag_classes_normalize() {
        for name in ["backpack", "Handbag", "SUITCASE", " bag "] {
            assert_eq!(ObjectLabel::from_class_name(name), Some(ObjectLabel::Bag));
        }
    }

    #[test]
    fn test_unknown_class_is_none() {
        assert_eq!(ObjectLabel::from_class_name("car"), None);
        assert_eq!(
            "dog".parse::<ObjectLabel>(),
            Err(UnknownLabel("dog".to_string()))
        );
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&ObjectLabel::Person).unwrap();
        assert_eq!(json, "\"person\"");
        let label: ObjectLabel = serde_json::from_str("\"bicycle\"").unwrap();
        assert_eq!(label, ObjectLabel::Bicycle);
    }
}
