//! Trajectory feature vectors exchanged with the novelty model.
//!
//! The layout below is part of the persisted model contract: a model fitted
//! on one layout cannot score vectors of another. Bump
//! [`FEATURE_SCHEMA_VERSION`] whenever names, order or count change.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Number of components in a [`FeatureVector`].
pub const FEATURE_DIM: usize = 12;

/// Schema version for compatibility checking.
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

/// Component names, in output order.
pub const FEATURE_NAMES: [&str; FEATURE_DIM] = [
    "displacement",
    "path_length",
    "mean_speed",
    "step_std",
    "max_step",
    "heading_variance",
    "mean_width",
    "mean_height",
    "size_variance",
    "span",
    "dwell_fraction",
    "sample_count",
];

/// Fixed-length trajectory descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct FeatureVector(pub [f64; FEATURE_DIM]);

impl FeatureVector {
    /// Sentinel returned for histories too short to describe.
    pub const fn zeros() -> Self {
        Self([0.0; FEATURE_DIM])
    }

    pub fn new(values: [f64; FEATURE_DIM]) -> Self {
        Self(values)
    }

    /// Whether this is the "insufficient data" sentinel.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Look up a component by its schema name.
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.0[idx])
    }

    pub fn displacement(&self) -> f64 {
        self.0[0]
    }

    pub fn dwell_fraction(&self) -> f64 {
        self.0[10]
    }

    pub fn sample_count(&self) -> f64 {
        self.0[11]
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::zeros()
    }
}

impl Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.0[idx]
    }
}

impl From<[f64; FEATURE_DIM]> for FeatureVector {
    fn from(values: [f64; FEATURE_DIM]) -> Self {
        Self(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_is_sentinel() {
        assert!(FeatureVector::zeros().is_zero());
        assert!(FeatureVector::default().is_zero());
    }

    #[test]
    fn test_named_lookup_matches_accessors() {
        let mut values = [0.0; FEATURE_DIM];
        values[10] = 0.75;
        values[11] = 30.0;
        let v = FeatureVector::new(values);

        assert_eq!(v.get("dwell_fraction"), Some(0.75));
        assert_eq!(v.dwell_fraction(), 0.75);
        assert_eq!(v.sample_count(), 30.0);
        assert_eq!(v.get("not_a_feature"), None);
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let json = serde_json::to_string(&FeatureVector::zeros()).unwrap();
        assert!(json.starts_with('['));
        let back: FeatureVector = serde_json::from_str(&json).unwrap();
        assert!(back.is_zero());
    }
}
