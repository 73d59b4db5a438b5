//! Annotation records.

use chrono::{DateTime, Utc};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for annotations within a store.
pub type AnnotationId = String;

/// Shape kind of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Rectangle,
    Circle,
    Polygon,
    Point,
}

impl AnnotationKind {
    /// Capitalized name, used as the default label.
    pub fn display_name(self) -> &'static str {
        match self {
            AnnotationKind::Rectangle => "Rectangle",
            AnnotationKind::Circle => "Circle",
            AnnotationKind::Polygon => "Polygon",
            AnnotationKind::Point => "Point",
        }
    }

    /// Exact number of points required, or `None` for polygons.
    pub fn required_points(self) -> Option<usize> {
        match self {
            AnnotationKind::Rectangle | AnnotationKind::Circle => Some(2),
            AnnotationKind::Point => Some(1),
            AnnotationKind::Polygon => None,
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A defect marker anchored to image pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub defect_type_id: String,
    /// Image-space coordinates.
    pub points: Vec<Point>,
    pub label: String,
    /// Percent in `[0, 100]`.
    pub confidence: Option<f64>,
    #[serde(default)]
    pub verified: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl Annotation {
    /// Label text with the confidence suffix, e.g. `Scratch (87%)`.
    pub fn display_label(&self) -> String {
        match self.confidence {
            Some(c) => format!("{} ({:.0}%)", self.label, c),
            None => self.label.clone(),
        }
    }
}

/// Clamp a confidence into `[0, 100]`; NaN becomes absent.
pub fn clamp_confidence(value: Option<f64>) -> Option<f64> {
    value.filter(|c| !c.is_nan()).map(|c| c.clamp(0.0, 100.0))
}

/// Fields for creating an annotation. Unset fields get store defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnnotation {
    pub id: Option<AnnotationId>,
    pub kind: AnnotationKind,
    pub defect_type_id: String,
    pub points: Vec<Point>,
    pub label: Option<String>,
    pub confidence: Option<f64>,
    pub verified: bool,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
}

impl NewAnnotation {
    pub fn new(kind: AnnotationKind, defect_type_id: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            id: None,
            kind,
            defect_type_id: defect_type_id.into(),
            points,
            label: None,
            confidence: None,
            verified: false,
            notes: None,
            created_at: None,
            created_by: None,
        }
    }

    pub fn rectangle(defect_type_id: impl Into<String>, p1: Point, p2: Point) -> Self {
        Self::new(AnnotationKind::Rectangle, defect_type_id, vec![p1, p2])
    }

    pub fn circle(defect_type_id: impl Into<String>, center: Point, edge: Point) -> Self {
        Self::new(AnnotationKind::Circle, defect_type_id, vec![center, edge])
    }

    pub fn polygon(defect_type_id: impl Into<String>, vertices: Vec<Point>) -> Self {
        Self::new(AnnotationKind::Polygon, defect_type_id, vertices)
    }

    pub fn point(defect_type_id: impl Into<String>, at: Point) -> Self {
        Self::new(AnnotationKind::Point, defect_type_id, vec![at])
    }

    pub fn with_id(mut self, id: impl Into<AnnotationId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn verified(mut self, verified: bool) -> Self {
        self.verified = verified;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }
}

/// Partial update. `None` leaves a field untouched; for the optional fields
/// `Some(None)` clears them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationPatch {
    pub points: Option<Vec<Point>>,
    pub label: Option<String>,
    pub defect_type_id: Option<String>,
    pub confidence: Option<Option<f64>>,
    pub verified: Option<bool>,
    pub notes: Option<Option<String>>,
}

impl AnnotationPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(mut self, points: Vec<Point>) -> Self {
        self.points = Some(points);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn defect_type(mut self, id: impl Into<String>) -> Self {
        self.defect_type_id = Some(id.into());
        self
    }

    pub fn confidence(mut self, confidence: Option<f64>) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn verified(mut self, verified: bool) -> Self {
        self.verified = Some(verified);
        self
    }

    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = Some(notes);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
