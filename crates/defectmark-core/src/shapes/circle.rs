//! Circle geometry.

use super::{Drawable, ShapeGeometry};
use crate::viewport::Viewport;
use kurbo::{Circle, Point, Rect, Shape as KurboShape};

/// Circle defined by its center and the distance to an edge point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleGeometry {
    pub center: Point,
    pub radius: f64,
}

/// Center at `p1`, radius reaching `p2`.
pub fn circle_geometry(p1: Point, p2: Point) -> CircleGeometry {
    CircleGeometry {
        center: p1,
        radius: p1.distance(p2),
    }
}

impl ShapeGeometry for CircleGeometry {
    fn bounds(&self) -> Rect {
        Rect::new(
            self.center.x - self.radius,
            self.center.y - self.radius,
            self.center.x + self.radius,
            self.center.y + self.radius,
        )
    }

    fn contains(&self, point: Point, _scale: f64) -> bool {
        self.center.distance(point) <= self.radius
    }

    fn to_drawable(&self, viewport: &Viewport) -> Drawable {
        let center = viewport.to_view(self.center);
        let radius = self.radius * viewport.scale;
        let path = (!self.is_degenerate()).then(|| Circle::new(center, radius).to_path(0.1));
        Drawable {
            path,
            anchor: Point::new(center.x - radius, center.y - radius),
        }
    }

    fn is_degenerate(&self) -> bool {
        self.radius <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_is_distance() {
        let circle = circle_geometry(Point::new(10.0, 10.0), Point::new(13.0, 14.0));
        assert_eq!(circle.center, Point::new(10.0, 10.0));
        assert!((circle.radius - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_contains() {
        let circle = circle_geometry(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert!(circle.contains(Point::new(0.0, 0.0), 1.0));
        assert!(circle.contains(Point::new(10.0, 0.0), 1.0));
        assert!(circle.contains(Point::new(6.0, 6.0), 1.0));
        assert!(!circle.contains(Point::new(8.0, 8.0), 1.0));
    }

    #[test]
    fn test_bounds() {
        let circle = circle_geometry(Point::new(50.0, 50.0), Point::new(50.0, 80.0));
        let bounds = circle.bounds();
        assert!((bounds.x0 - 20.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_drawable_scales_radius() {
        let mut viewport = Viewport::new();
        viewport.scale = 2.0;
        let circle = circle_geometry(Point::new(10.0, 10.0), Point::new(20.0, 10.0));
        let drawable = circle.to_drawable(&viewport);
        let bbox = drawable.path.unwrap().bounding_box();
        assert!((bbox.width() - 40.0).abs() < 1e-6);
        assert_eq!(drawable.anchor, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_zero_radius_is_degenerate() {
        let circle = circle_geometry(Point::new(3.0, 3.0), Point::new(3.0, 3.0));
        assert!(circle.is_degenerate());
        assert!(circle.to_drawable(&Viewport::new()).path.is_none());
    }
}
