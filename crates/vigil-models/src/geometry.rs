//! Pixel-space geometry shared by the tracker boundary and the rules.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned bounding box in corner form (`x1,y1` top-left, `x2,y2`
/// bottom-right), as emitted by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Create a box centered on `(cx, cy)`.
    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self {
            x1: cx - width / 2.0,
            y1: cy - height / 2.0,
            x2: cx + width / 2.0,
            y2: cy + height / 2.0,
        }
    }

    /// Center x-coordinate.
    #[inline]
    pub fn cx(&self) -> f64 {
        (self.x1 + self.x2) / 2.0
    }

    /// Center y-coordinate.
    #[inline]
    pub fn cy(&self) -> f64 {
        (self.y1 + self.y2) / 2.0
    }

    #[inline]
    pub fn centroid(&self) -> Point {
        Point::new(self.cx(), self.cy())
    }

    /// Box width. Not clamped: inverted boxes yield a negative width.
    #[inline]
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    /// Box height. Not clamped: inverted boxes yield a negative height.
    #[inline]
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Box area in pixels, zero for degenerate or inverted boxes.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Whether every corner coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }

    /// Integer corners, for sink records and overlays.
    pub fn to_pixels(&self) -> [i64; 4] {
        [
            self.x1 as i64,
            self.y1 as i64,
            self.x2 as i64,
            self.y2 as i64,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centroid_and_size() {
        let bbox = BoundingBox::new(10.0, 20.0, 50.0, 100.0);
        assert_eq!(bbox.centroid(), Point::new(30.0, 60.0));
        assert_eq!(bbox.width(), 40.0);
        assert_eq!(bbox.height(), 80.0);
        assert_eq!(bbox.area(), 3200.0);
    }

    #[test]
    fn test_from_center_round_trip() {
        let bbox = BoundingBox::from_center(100.0, 100.0, 20.0, 40.0);
        assert_eq!(bbox.cx(), 100.0);
        assert_eq!(bbox.cy(), 100.0);
        assert_eq!(bbox.width(), 20.0);
    }

    #[test]
    fn test_degenerate_area_is_zero() {
        let bbox = BoundingBox::new(50.0, 50.0, 40.0, 40.0);
        assert_eq!(bbox.area(), 0.0);
        assert!(!BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0).is_finite());
    }

    #[test]
    fn test_point_distance() {
        assert_eq!(Point::new(0.0, 0.0).distance(&Point::new(3.0, 4.0)), 5.0);
    }
}
