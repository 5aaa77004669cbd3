//! Trajectory feature extraction.
//!
//! Turns a track's window of samples into the fixed 12-component
//! [`FeatureVector`] consumed by the novelty model. Component order is
//! defined by [`vigil_models::FEATURE_NAMES`].

use tracing::warn;
use vigil_models::{FeatureVector, FEATURE_DIM};

use crate::history::TrackSample;

/// Histories shorter than this produce the zero vector.
pub const MIN_FEATURE_SAMPLES: usize = 3;

/// Horizontal offset added before `atan2` so a vertical step is not singular.
const HEADING_EPSILON: f64 = 1e-6;

/// Span is compared against this many object-sizes for the dwell fraction.
const DWELL_SIZE_FACTOR: f64 = 10.0;

/// Stateless extractor parameterized by the source frame rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryFeatureExtractor {
    fps: f64,
}

impl TrajectoryFeatureExtractor {
    /// Create an extractor. Non-positive or non-finite rates fall back to 1 fps.
    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 1.0 };
        Self { fps }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Describe a history ordered oldest to newest.
    pub fn extract(&self, history: &[TrackSample]) -> FeatureVector {
        extract(history, self.fps)
    }
}

impl Default for TrajectoryFeatureExtractor {
    fn default() -> Self {
        Self::new(30.0)
    }
}

/// Describe a history ordered oldest to newest.
///
/// Returns [`FeatureVector::zeros`] for fewer than [`MIN_FEATURE_SAMPLES`]
/// samples. Every returned component is finite.
pub fn extract(history: &[TrackSample], fps: f64) -> FeatureVector {
    let n = history.len();
    if n < MIN_FEATURE_SAMPLES {
        return FeatureVector::zeros();
    }
    let fps = if fps.is_finite() && fps > 0.0 { fps } else { 1.0 };

    let first = &history[0];
    let last = &history[n - 1];

    let mut elapsed = (last.frame_id as f64 - first.frame_id as f64) / fps;
    if elapsed <= 0.0 {
        elapsed = 1.0 / fps;
    }

    let displacement = first.centroid().distance(&last.centroid());

    let mut steps = Vec::with_capacity(n - 1);
    let mut headings = Vec::with_capacity(n - 1);
    for pair in history.windows(2) {
        let dx = pair[1].cx - pair[0].cx;
        let dy = pair[1].cy - pair[0].cy;
        steps.push(dx.hypot(dy));
        headings.push(dy.atan2(dx + HEADING_EPSILON));
    }

    let path_length: f64 = steps.iter().sum();
    let mean_speed = path_length / elapsed;
    let max_step = steps.iter().copied().fold(0.0, f64::max);
    let step_std = variance(&steps).sqrt();

    let finite_headings: Vec<f64> = headings.into_iter().filter(|a| !a.is_nan()).collect();
    let heading_variance = variance(&finite_headings);

    let widths: Vec<f64> = history.iter().map(|s| s.width).collect();
    let heights: Vec<f64> = history.iter().map(|s| s.height).collect();
    let mean_width = mean(&widths);
    let mean_height = mean(&heights);
    let size_variance = variance(&widths) + variance(&heights);

    let (min_x, max_x) = min_max(history.iter().map(|s| s.cx));
    let (min_y, max_y) = min_max(history.iter().map(|s| s.cy));
    let span = (max_x - min_x).max(max_y - min_y);

    let size_scale = (mean_width.max(mean_height) * DWELL_SIZE_FACTOR).max(1.0);
    let dwell_fraction = 1.0 - (span / size_scale).min(1.0);

    let mut values: [f64; FEATURE_DIM] = [
        displacement,
        path_length,
        mean_speed,
        step_std,
        max_step,
        heading_variance,
        mean_width,
        mean_height,
        size_variance,
        span,
        dwell_fraction,
        n as f64,
    ];

    let mut replaced = 0usize;
    for value in values.iter_mut() {
        if !value.is_finite() {
            *value = 0.0;
            replaced += 1;
        }
    }
    if replaced > 0 {
        warn!(
            replaced,
            samples = n,
            "Non-finite trajectory features replaced with 0"
        );
    }
    values[10] = values[10].clamp(0.0, 1.0);

    FeatureVector::new(values)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by `n`).
fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(cx: f64, cy: f64, w: f64, h: f64, frame_id: u64) -> TrackSample {
        TrackSample {
            cx,
            cy,
            width: w,
            height: h,
            frame_id,
        }
    }

    fn straight_line(n: usize, step: f64) -> Vec<TrackSample> {
        (0..n)
            .map(|i| sample(i as f64 * step, 0.0, 20.0, 40.0, i as u64 + 1))
            .collect()
    }

    #[test]
    fn test_short_history_is_zero() {
        assert!(extract(&[], 30.0).is_zero());
        assert!(extract(&straight_line(1, 1.0), 30.0).is_zero());
        assert!(extract(&straight_line(2, 5.0), 30.0).is_zero());
    }

    #[test]
    fn test_straight_line_features() {
        let history = straight_line(31, 2.0);
        let v = extract(&history, 30.0);

        assert!((v[0] - 60.0).abs() < 1e-9); // displacement
        assert!((v[1] - 60.0).abs() < 1e-9); // path length
        assert!((v[2] - 60.0).abs() < 1e-9); // 60 px over 30 frames at 30 fps
        assert!(v[3].abs() < 1e-9); // constant steps
        assert!((v[4] - 2.0).abs() < 1e-9);
        assert!(v[5].abs() < 1e-9); // constant heading
        assert_eq!(v[6], 20.0);
        assert_eq!(v[7], 40.0);
        assert_eq!(v[8], 0.0);
        assert!((v[9] - 60.0).abs() < 1e-9);
        assert!((v[10] - (1.0 - 60.0 / 400.0)).abs() < 1e-9);
        assert_eq!(v[11], 31.0);
    }

    #[test]
    fn test_same_frame_elapsed_is_floored() {
        let history = vec![
            sample(0.0, 0.0, 10.0, 10.0, 5),
            sample(3.0, 4.0, 10.0, 10.0, 5),
            sample(6.0, 8.0, 10.0, 10.0, 5),
        ];
        let v = extract(&history, 10.0);
        // path 10 px over the 0.1 s floor
        assert!((v[2] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_vertical_steps_are_not_singular() {
        let history: Vec<_> = (0..5)
            .map(|i| sample(0.0, i as f64 * 3.0, 10.0, 10.0, i))
            .collect();
        let v = extract(&history, 30.0);
        assert!(v.as_slice().iter().all(|x| x.is_finite()));
        assert!(v[5].abs() < 1e-9);
    }

    #[test]
    fn test_dwell_fraction_bounds() {
        let stationary: Vec<_> = (0..10).map(|i| sample(100.0, 100.0, 0.0, 0.0, i)).collect();
        assert_eq!(extract(&stationary, 30.0).dwell_fraction(), 1.0);

        let far = vec![
            sample(0.0, 0.0, 1.0, 1.0, 0),
            sample(500.0, 0.0, 1.0, 1.0, 1),
            sample(1000.0, 0.0, 1.0, 1.0, 2),
        ];
        assert_eq!(extract(&far, 30.0).dwell_fraction(), 0.0);
    }

    #[test]
    fn test_non_finite_geometry_is_sanitized() {
        let history = vec![
            sample(0.0, 0.0, 10.0, 10.0, 0),
            sample(f64::NAN, 0.0, 10.0, 10.0, 1),
            sample(f64::INFINITY, 0.0, f64::NAN, 10.0, 2),
        ];
        let v = extract(&history, 30.0);
        assert!(v.as_slice().iter().all(|x| x.is_finite()));
        assert!((0.0..=1.0).contains(&v.dwell_fraction()));
    }

    #[test]
    fn test_size_variance_sums_axes() {
        let history = vec![
            sample(0.0, 0.0, 10.0, 20.0, 0),
            sample(0.0, 0.0, 20.0, 20.0, 1),
            sample(0.0, 0.0, 30.0, 50.0, 2),
        ];
        let v = extract(&history, 30.0);
        // var(w) = 66.67, var(h) = 200
        assert!((v[8] - (200.0 / 3.0 + 200.0)).abs() < 1e-9);
    }

    #[test]
    fn test_extractor_guards_fps() {
        let extractor = TrajectoryFeatureExtractor::new(0.0);
        assert_eq!(extractor.fps(), 1.0);
        let v = extractor.extract(&straight_line(4, 1.0));
        assert_eq!(v.sample_count(), 4.0);
    }
}
