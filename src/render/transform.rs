//! Pan/zoom transform and animated transitions between transforms.
//!
//! Screen coordinates are `world * k + (tx, ty)`.

use crate::layout::{Point, Rect, Size, bounding_box};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub k: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewTransform {
    pub const IDENTITY: ViewTransform = ViewTransform {
        k: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn new(k: f64, tx: f64, ty: f64) -> Self {
        Self { k, tx, ty }
    }

    /// World to screen.
    pub fn apply(&self, p: Point) -> Point {
        Point::new(p.x * self.k + self.tx, p.y * self.k + self.ty)
    }

    /// Screen to world.
    pub fn invert(&self, p: Point) -> Point {
        Point::new((p.x - self.tx) / self.k, (p.y - self.ty) / self.k)
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.k, self.tx + dx, self.ty + dy)
    }

    /// Scale by `factor` keeping the world point under `anchor` fixed on
    /// screen. The resulting scale is clamped to `[min, max]`.
    pub fn zoomed_at(&self, anchor: Point, factor: f64, min: f64, max: f64) -> Self {
        let k = (self.k * factor).clamp(min, max);
        let world = self.invert(anchor);
        Self::new(k, anchor.x - world.x * k, anchor.y - world.y * k)
    }

    /// Region of the world currently on screen.
    pub fn visible_world(&self, viewport: Size) -> Rect {
        Rect::new(
            self.invert(Point::ORIGIN),
            self.invert(Point::new(viewport.width, viewport.height)),
        )
    }

    pub fn lerp(&self, to: &ViewTransform, t: f64) -> Self {
        Self::new(
            self.k + (to.k - self.k) * t,
            self.tx + (to.tx - self.tx) * t,
            self.ty + (to.ty - self.ty) * t,
        )
    }
}

/// Wheel zoom factor for a vertical scroll delta in pixels.
pub fn wheel_factor(delta_y: f64) -> f64 {
    2f64.powf(-delta_y * 0.002)
}

/// Transform that centers the finite `points` and fits them into `viewport`
/// leaving `margin` (a fraction) free around them.
///
/// `None` when no point is finite or the bounding box has zero width or
/// height.
pub fn fit_transform(
    points: impl IntoIterator<Item = Point>,
    viewport: Size,
    margin: f64,
) -> Option<ViewTransform> {
    if viewport.is_empty() {
        return None;
    }
    let bbox = bounding_box(points)?;
    if bbox.is_degenerate() {
        return None;
    }
    let k = (1.0 - margin) / (bbox.width() / viewport.width).max(bbox.height() / viewport.height);
    let c = bbox.center();
    Some(ViewTransform::new(
        k,
        viewport.width / 2.0 - k * c.x,
        viewport.height / 2.0 - k * c.y,
    ))
}

fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

/// Fixed-duration eased move from one transform to another.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    from: ViewTransform,
    to: ViewTransform,
    elapsed: Duration,
    duration: Duration,
}

impl Transition {
    pub fn new(from: ViewTransform, to: ViewTransform, duration: Duration) -> Self {
        Self {
            from,
            to,
            elapsed: Duration::ZERO,
            duration,
        }
    }

    pub fn target(&self) -> ViewTransform {
        self.to
    }

    pub fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Advance by `dt` and return the transform for the new instant.
    pub fn step(&mut self, dt: Duration) -> ViewTransform {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.current()
    }

    pub fn current(&self) -> ViewTransform {
        if self.duration.is_zero() || self.is_done() {
            return self.to;
        }
        let t = self.elapsed.as_secs_f64() / self.duration.as_secs_f64();
        self.from.lerp(&self.to, ease_cubic_in_out(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn test_apply_and_invert_are_inverse() {
        let t = ViewTransform::new(2.5, 40.0, -10.0);
        let p = Point::new(12.0, -7.5);
        assert!(close(t.invert(t.apply(p)), p));
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed_and_clamps() {
        let t = ViewTransform::new(1.0, 10.0, 20.0);
        let anchor = Point::new(300.0, 200.0);
        let zoomed = t.zoomed_at(anchor, 2.0, 0.1, 5.0);
        assert_eq!(zoomed.k, 2.0);
        assert!(close(zoomed.apply(t.invert(anchor)), anchor));

        assert_eq!(t.zoomed_at(anchor, 100.0, 0.1, 5.0).k, 5.0);
        assert_eq!(t.zoomed_at(anchor, 0.001, 0.1, 5.0).k, 0.1);
    }

    #[test]
    fn test_wheel_factor_direction() {
        assert!(wheel_factor(-100.0) > 1.0);
        assert!(wheel_factor(100.0) < 1.0);
        assert_eq!(wheel_factor(0.0), 1.0);
    }

    #[test]
    fn test_fit_places_points_inside_viewport() {
        let viewport = Size::new(800.0, 600.0);
        let points = [
            Point::new(-500.0, -20.0),
            Point::new(900.0, 300.0),
            Point::new(120.0, 1200.0),
        ];
        let t = fit_transform(points, viewport, 0.15).unwrap();
        for p in points {
            let s = t.apply(p);
            assert!(s.x >= 0.0 && s.x <= viewport.width, "{:?}", s);
            assert!(s.y >= 0.0 && s.y <= viewport.height, "{:?}", s);
        }
        // The limiting axis keeps exactly the margin.
        let fitted_height = 1220.0 * t.k;
        assert!((fitted_height - 0.85 * 600.0).abs() < 1e-6);
    }

    #[test]
    fn test_fit_is_noop_for_degenerate_input() {
        let viewport = Size::new(800.0, 600.0);
        assert!(fit_transform(Vec::<Point>::new(), viewport, 0.15).is_none());
        assert!(fit_transform([Point::new(3.0, 3.0)], viewport, 0.15).is_none());
        assert!(fit_transform([Point::new(f64::NAN, 0.0)], viewport, 0.15).is_none());
        assert!(
            fit_transform([Point::new(0.0, 5.0), Point::new(10.0, 5.0)], viewport, 0.15)
                .is_none()
        );
    }

    #[test]
    fn test_transition_eases_to_target() {
        let to = ViewTransform::new(2.0, 100.0, 50.0);
        let mut tr = Transition::new(ViewTransform::IDENTITY, to, Duration::from_millis(500));
        let mid = tr.step(Duration::from_millis(250));
        assert!((mid.k - 1.5).abs() < 1e-9);
        assert!(!tr.is_done());
        let end = tr.step(Duration::from_millis(400));
        assert_eq!(end, to);
        assert!(tr.is_done());
    }
}
