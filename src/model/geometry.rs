//! Pointer and bounding-box geometry as reported by the rendering layer.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self { Point { x, y } }
}

/// Axis-aligned rectangle, `y` growing downwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Rect { left, top, width, height }
    }

    pub fn right(&self) -> f64 { self.left + self.width }

    pub fn bottom(&self) -> f64 { self.top + self.height }

    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite()) || self.width <= 0.0 || self.height <= 0.0
    }

    /// Half-open containment: the left and top edges are inside, the right and
    /// bottom edges belong to the next rectangle over.
    pub fn contains(&self, point: Point) -> bool {
        !self.is_degenerate()
            && point.x >= self.left
            && point.x < self.right()
            && point.y >= self.top
            && point.y < self.bottom()
    }

    /// Position of `point` relative to this rectangle, `(0, 0)` at the top-left
    /// corner and `(1, 1)` at the bottom-right one. An axis with no usable
    /// extent, or a non-finite coordinate, maps to the middle.
    pub fn normalize(&self, point: Point) -> (f64, f64) {
        (
            Self::fraction(point.x, self.left, self.width),
            Self::fraction(point.y, self.top, self.height),
        )
    }

    fn fraction(value: f64, start: f64, extent: f64) -> f64 {
        if !extent.is_finite() || extent <= 0.0 {
            return 0.5;
        }
        let f = (value - start) / extent;
        if f.is_finite() { f } else { 0.5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_maps_corners() {
        let r = Rect::new(100.0, 50.0, 200.0, 100.0);
        assert_eq!((0.0, 0.0), r.normalize(Point::new(100.0, 50.0)));
        assert_eq!((1.0, 1.0), r.normalize(Point::new(300.0, 150.0)));
        assert_eq!((0.5, 0.25), r.normalize(Point::new(200.0, 75.0)));
    }

    #[test]
    fn degenerate_axes_map_to_middle() {
        let flat = Rect::new(0.0, 0.0, 0.0, 10.0);
        assert_eq!((0.5, 0.2), flat.normalize(Point::new(3.0, 2.0)));
        let nan = Rect::new(0.0, 0.0, f64::NAN, f64::INFINITY);
        assert_eq!((0.5, 0.5), nan.normalize(Point::new(3.0, 2.0)));
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!((0.5, 0.5), r.normalize(Point::new(f64::NAN, f64::INFINITY)));
    }

    #[test]
    fn containment_is_half_open() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(Point::new(0.0, 0.0)));
        assert!(r.contains(Point::new(9.99, 9.99)));
        assert!(!r.contains(Point::new(10.0, 5.0)));
        assert!(!r.contains(Point::new(5.0, 10.0)));
        assert!(!Rect::new(0.0, 0.0, 0.0, 0.0).contains(Point::new(0.0, 0.0)));
    }
}
