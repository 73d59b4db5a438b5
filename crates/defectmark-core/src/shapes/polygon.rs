//! Polygon geometry.

use super::{Drawable, ShapeGeometry};
use crate::viewport::Viewport;
use kurbo::{BezPath, Point, Rect};

/// Minimum number of vertices for a drawable polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Closed polygon over image-space vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonGeometry {
    pub vertices: Vec<Point>,
}

/// Build a polygon. Fewer than three vertices yields a degenerate polygon.
pub fn polygon_path(points: &[Point]) -> PolygonGeometry {
    PolygonGeometry {
        vertices: points.to_vec(),
    }
}

/// Ray-casting point-in-polygon test.
pub fn point_in_polygon(point: Point, vertices: &[Point]) -> bool {
    if vertices.len() < MIN_POLYGON_VERTICES {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (a, b) = (vertices[i], vertices[j]);
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

impl ShapeGeometry for PolygonGeometry {
    fn bounds(&self) -> Rect {
        let Some(first) = self.vertices.first() else {
            return Rect::ZERO;
        };
        self.vertices
            .iter()
            .skip(1)
            .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
    }

    fn contains(&self, point: Point, _scale: f64) -> bool {
        point_in_polygon(point, &self.vertices)
    }

    fn to_drawable(&self, viewport: &Viewport) -> Drawable {
        let bounds = self.bounds();
        let anchor = viewport.to_view(Point::new(bounds.x0, bounds.y0));
        if self.is_degenerate() {
            return Drawable { path: None, anchor };
        }

        let mut path = BezPath::new();
        for (i, vertex) in self.vertices.iter().enumerate() {
            let v = viewport.to_view(*vertex);
            if i == 0 {
                path.move_to(v);
            } else {
                path.line_to(v);
            }
        }
        path.close_path();
        Drawable {
            path: Some(path),
            anchor,
        }
    }

    fn is_degenerate(&self) -> bool {
        self.vertices.len() < MIN_POLYGON_VERTICES
    }
}
