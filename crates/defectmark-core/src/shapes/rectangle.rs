//! Rectangle geometry.

use super::{Drawable, ShapeGeometry};
use crate::viewport::Viewport;
use kurbo::{Point, Rect, Shape as KurboShape};

/// Axis-aligned rectangle normalized from two corner points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangleGeometry {
    /// Top-left corner (image space).
    pub top_left: Point,
    pub width: f64,
    pub height: f64,
}

/// Normalize two corners in any drag direction.
pub fn rectangle_bounds(p1: Point, p2: Point) -> RectangleGeometry {
    RectangleGeometry {
        top_left: Point::new(p1.x.min(p2.x), p1.y.min(p2.y)),
        width: (p2.x - p1.x).abs(),
        height: (p2.y - p1.y).abs(),
    }
}

impl RectangleGeometry {
    /// Get the rectangle as a kurbo Rect.
    pub fn as_rect(&self) -> Rect {
        Rect::new(
            self.top_left.x,
            self.top_left.y,
            self.top_left.x + self.width,
            self.top_left.y + self.height,
        )
    }
}

impl ShapeGeometry for RectangleGeometry {
    fn bounds(&self) -> Rect {
        self.as_rect()
    }

    fn contains(&self, point: Point, _scale: f64) -> bool {
        // Inclusive on all edges, unlike kurbo's half-open Rect::contains.
        let r = self.as_rect();
        point.x >= r.x0 && point.x <= r.x1 && point.y >= r.y0 && point.y <= r.y1
    }

    fn to_drawable(&self, viewport: &Viewport) -> Drawable {
        let top_left = viewport.to_view(self.top_left);
        let bottom_right = viewport.to_view(Point::new(
            self.top_left.x + self.width,
            self.top_left.y + self.height,
        ));
        let path = (!self.is_degenerate())
            .then(|| Rect::from_points(top_left, bottom_right).to_path(0.1));
        Drawable {
            path,
            anchor: top_left,
        }
    }

    fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Size, Vec2};

    #[test]
    fn test_reverse_drag_normalizes() {
        let rect = rectangle_bounds(Point::new(50.0, 50.0), Point::new(10.0, 10.0));
        assert_eq!(rect.top_left, Point::new(10.0, 10.0));
        assert!((rect.width - 40.0).abs() < f64::EPSILON);
        assert!((rect.height - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mixed_direction() {
        let rect = rectangle_bounds(Point::new(10.0, 90.0), Point::new(30.0, 20.0));
        assert_eq!(rect.top_left, Point::new(10.0, 20.0));
        assert!((rect.width - 20.0).abs() < f64::EPSILON);
        assert!((rect.height - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_contains_inclusive_edges() {
        let rect = rectangle_bounds(Point::new(10.0, 10.0), Point::new(90.0, 90.0));
        assert!(rect.contains(Point::new(50.0, 50.0), 1.0));
        assert!(rect.contains(Point::new(90.0, 90.0), 1.0));
        assert!(rect.contains(Point::new(10.0, 50.0), 1.0));
        assert!(!rect.contains(Point::new(5.0, 5.0), 1.0));
        assert!(!rect.contains(Point::new(91.0, 50.0), 1.0));
    }

    #[test]
    fn test_zero_area_is_degenerate() {
        let flat = rectangle_bounds(Point::new(10.0, 10.0), Point::new(60.0, 10.0));
        assert!(flat.is_degenerate());
        let drawable = flat.to_drawable(&Viewport::new());
        assert!(drawable.path.is_none());
        assert_eq!(drawable.anchor, Point::new(10.0, 10.0));
    }

    #[test]
    fn test_to_drawable_applies_viewport() {
        let mut viewport = Viewport::new();
        viewport.fit(Size::new(800.0, 600.0), Size::new(1600.0, 800.0));
        viewport.pan(Vec2::new(5.0, 0.0));
        let rect = rectangle_bounds(Point::new(100.0, 100.0), Point::new(300.0, 200.0));
        let drawable = rect.to_drawable(&viewport);
        assert_eq!(drawable.anchor, Point::new(55.0, 100.0));
        let bbox = drawable.path.unwrap().bounding_box();
        assert!((bbox.width() - 100.0).abs() < 1e-9);
        assert!((bbox.height() - 50.0).abs() < 1e-9);
    }
}
