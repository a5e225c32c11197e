//! Plane geometry shared by the layout engine and the renderers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Width and height of a viewport, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(Point::ORIGIN, Point::new(size.width, size.height))
    }

    /// Square of half-width `r` around `c`.
    pub fn around(c: Point, r: f64) -> Self {
        Self::new(Point::new(c.x - r, c.y - r), Point::new(c.x + r, c.y + r))
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Zero width or zero height.
    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn inflate(&self, by: f64) -> Self {
        Self::new(
            Point::new(self.min.x - by, self.min.y - by),
            Point::new(self.max.x + by, self.max.y + by),
        )
    }
}

/// Bounding box of the finite points, or `None` when there are none.
pub fn bounding_box(points: impl IntoIterator<Item = Point>) -> Option<Rect> {
    points
        .into_iter()
        .filter(Point::is_finite)
        .fold(None, |acc: Option<Rect>, p| {
            Some(match acc {
                None => Rect::new(p, p),
                Some(r) => Rect::new(
                    Point::new(r.min.x.min(p.x), r.min.y.min(p.y)),
                    Point::new(r.max.x.max(p.x), r.max.y.max(p.y)),
                ),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_skips_non_finite() {
        let bbox = bounding_box([
            Point::new(1.0, 2.0),
            Point::new(f64::NAN, 0.0),
            Point::new(-3.0, 5.0),
            Point::new(f64::INFINITY, 1.0),
        ])
        .unwrap();
        assert_eq!(bbox.min, Point::new(-3.0, 2.0));
        assert_eq!(bbox.max, Point::new(1.0, 5.0));
        assert!(bounding_box([Point::new(f64::NAN, 1.0)]).is_none());
    }

    #[test]
    fn test_single_point_box_is_degenerate() {
        let bbox = bounding_box([Point::new(4.0, 4.0)]).unwrap();
        assert!(bbox.is_degenerate());
        let line = bounding_box([Point::new(0.0, 1.0), Point::new(5.0, 1.0)]).unwrap();
        assert!(line.is_degenerate());
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        assert!(a.intersects(&Rect::around(Point::new(12.0, 5.0), 3.0)));
        assert!(!a.intersects(&Rect::around(Point::new(20.0, 5.0), 3.0)));
        assert!(a.contains(a.center()));
    }
}
