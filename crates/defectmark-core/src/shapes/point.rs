//! Point marker geometry.

use super::{Drawable, ShapeGeometry};
use crate::viewport::Viewport;
use kurbo::{Circle, Point, Rect, Shape as KurboShape};

/// Marker radius in view pixels.
pub const DEFAULT_MARKER_RADIUS: f64 = 8.0;

/// A single-point marker drawn at a fixed view-space size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointMarker {
    pub center: Point,
    /// View-space radius; not scaled by zoom.
    pub radius: f64,
}

pub fn point_marker(p: Point) -> PointMarker {
    PointMarker {
        center: p,
        radius: DEFAULT_MARKER_RADIUS,
    }
}

impl PointMarker {
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }
}

impl ShapeGeometry for PointMarker {
    fn bounds(&self) -> Rect {
        Rect::from_points(self.center, self.center)
    }

    fn contains(&self, point: Point, scale: f64) -> bool {
        self.center.distance(point) <= self.radius / scale
    }

    fn to_drawable(&self, viewport: &Viewport) -> Drawable {
        let center = viewport.to_view(self.center);
        Drawable {
            path: Some(Circle::new(center, self.radius).to_path(0.1)),
            anchor: Point::new(center.x - self.radius, center.y - self.radius),
        }
    }

    fn is_degenerate(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_radius_shrinks_with_zoom() {
        let marker = point_marker(Point::new(100.0, 100.0));
        assert!(marker.contains(Point::new(107.0, 100.0), 1.0));
        // At 2x zoom the marker covers 4 image pixels.
        assert!(!marker.contains(Point::new(107.0, 100.0), 2.0));
        assert!(marker.contains(Point::new(103.0, 100.0), 2.0));
        // Zoomed out it covers more image pixels.
        assert!(marker.contains(Point::new(130.0, 100.0), 0.25));
    }

    #[test]
    fn test_view_size_independent_of_zoom() {
        let marker = point_marker(Point::new(10.0, 10.0));
        for scale in [0.1, 1.0, 5.0] {
            let mut viewport = Viewport::new();
            viewport.scale = scale;
            let bbox = marker.to_drawable(&viewport).path.unwrap().bounding_box();
            assert!((bbox.width() - 16.0).abs() < 1e-6);
        }
    }
}
