//! Per-shape geometry for annotations.
//!
//! All inputs are image-space points. View-space output is only produced by
//! [`ShapeGeometry::to_drawable`], which applies a [`Viewport`] transform.

mod circle;
mod point;
mod polygon;
mod rectangle;

pub use circle::{CircleGeometry, circle_geometry};
pub use point::{DEFAULT_MARKER_RADIUS, PointMarker, point_marker};
pub use polygon::{MIN_POLYGON_VERTICES, PolygonGeometry, point_in_polygon, polygon_path};
pub use rectangle::{RectangleGeometry, rectangle_bounds};

use crate::annotation::{Annotation, AnnotationKind};
use crate::viewport::Viewport;
use kurbo::{BezPath, Point, Rect};

/// View-space drawing instructions for one annotation.
#[derive(Debug, Clone)]
pub struct Drawable {
    /// Outline to fill and stroke, or `None` when the shape is degenerate.
    pub path: Option<BezPath>,
    /// Where the label's bottom-left sits before the label offset is applied.
    pub anchor: Point,
}

/// Capabilities shared by every shape kind.
pub trait ShapeGeometry {
    /// Image-space bounding box.
    fn bounds(&self) -> Rect;

    /// Check if an image-space point lies inside the shape.
    ///
    /// `scale` is the current viewport scale, needed by shapes whose size is
    /// fixed in view space.
    fn contains(&self, point: Point, scale: f64) -> bool;

    /// Convert to view-space drawing instructions.
    fn to_drawable(&self, viewport: &Viewport) -> Drawable;

    /// True when there is nothing to fill or stroke.
    fn is_degenerate(&self) -> bool;
}

/// Tagged geometry for the four annotation kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Rectangle(RectangleGeometry),
    Circle(CircleGeometry),
    Polygon(PolygonGeometry),
    Point(PointMarker),
    /// Wrong point count for a fixed-cardinality kind. Never hit, never drawn.
    Invalid(AnnotationKind),
}

impl Geometry {
    /// Build geometry from a kind and its image-space points.
    pub fn from_points(kind: AnnotationKind, points: &[Point]) -> Self {
        match (kind, points) {
            (AnnotationKind::Rectangle, [p1, p2]) => Geometry::Rectangle(rectangle_bounds(*p1, *p2)),
            (AnnotationKind::Circle, [p1, p2]) => Geometry::Circle(circle_geometry(*p1, *p2)),
            (AnnotationKind::Point, [p]) => Geometry::Point(point_marker(*p)),
            (AnnotationKind::Polygon, vertices) => Geometry::Polygon(polygon_path(vertices)),
            (kind, _) => Geometry::Invalid(kind),
        }
    }

    /// Geometry of an annotation.
    pub fn of(annotation: &Annotation) -> Self {
        Self::from_points(annotation.kind, &annotation.points)
    }

    /// Override the view-space radius of point markers.
    pub fn with_marker_radius(self, radius: f64) -> Self {
        match self {
            Geometry::Point(marker) => Geometry::Point(marker.with_radius(radius)),
            other => other,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Geometry::Invalid(_))
    }
}

impl ShapeGeometry for Geometry {
    fn bounds(&self) -> Rect {
        match self {
            Geometry::Rectangle(g) => g.bounds(),
            Geometry::Circle(g) => g.bounds(),
            Geometry::Polygon(g) => g.bounds(),
            Geometry::Point(g) => g.bounds(),
            Geometry::Invalid(_) => Rect::ZERO,
        }
    }

    fn contains(&self, point: Point, scale: f64) -> bool {
        match self {
            Geometry::Rectangle(g) => g.contains(point, scale),
            Geometry::Circle(g) => g.contains(point, scale),
            Geometry::Polygon(g) => g.contains(point, scale),
            Geometry::Point(g) => g.contains(point, scale),
            Geometry::Invalid(_) => false,
        }
    }

    fn to_drawable(&self, viewport: &Viewport) -> Drawable {
        match self {
            Geometry::Rectangle(g) => g.to_drawable(viewport),
            Geometry::Circle(g) => g.to_drawable(viewport),
            Geometry::Polygon(g) => g.to_drawable(viewport),
            Geometry::Point(g) => g.to_drawable(viewport),
            Geometry::Invalid(_) => Drawable {
                path: None,
                anchor: viewport.to_view(Point::ZERO),
            },
        }
    }

    fn is_degenerate(&self) -> bool {
        match self {
            Geometry::Rectangle(g) => g.is_degenerate(),
            Geometry::Circle(g) => g.is_degenerate(),
            Geometry::Polygon(g) => g.is_degenerate(),
            Geometry::Point(g) => g.is_degenerate(),
            Geometry::Invalid(_) => true,
        }
    }
}
