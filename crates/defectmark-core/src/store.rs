//! Annotation store: ordered records, selection, search and hit-testing.

use crate::annotation::{
    Annotation, AnnotationId, AnnotationKind, AnnotationPatch, NewAnnotation, clamp_confidence,
};
use crate::shapes::{DEFAULT_MARKER_RADIUS, Geometry, ShapeGeometry};
use chrono::Utc;
use kurbo::{Point, Vec2};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

/// Store errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Annotation not found: {0}")]
    AnnotationNotFound(AnnotationId),
    #[error("Duplicate annotation id: {0}")]
    DuplicateId(AnnotationId),
    #[error("{kind} annotation needs exactly {expected} point(s), got {actual}")]
    InvalidPointCount {
        kind: AnnotationKind,
        expected: usize,
        actual: usize,
    },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Which defect types a listing includes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DefectTypeFilter {
    #[default]
    All,
    Only(String),
}

/// Ordering of a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// `createdAt` ascending; ties keep insertion order.
    #[default]
    Inserted,
    /// `createdAt` descending.
    Newest,
    /// Label, case-insensitive.
    Label,
    /// Highest confidence first; annotations without one go last.
    ConfidenceDesc,
}

/// Filter for [`AnnotationStore::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Case-insensitive substring matched against label or notes.
    pub search: Option<String>,
    pub defect_type: DefectTypeFilter,
    pub order: SortOrder,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn defect_type(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.defect_type = if id == "all" {
            DefectTypeFilter::All
        } else {
            DefectTypeFilter::Only(id)
        };
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    fn matches(&self, annotation: &Annotation) -> bool {
        if let DefectTypeFilter::Only(id) = &self.defect_type {
            if annotation.defect_type_id != *id {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                annotation.label.to_lowercase().contains(&needle)
                    || annotation
                        .notes
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&needle))
            }
        }
    }
}

/// Ordered collection of annotations for one image.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    annotations: HashMap<AnnotationId, Annotation>,
    /// Insertion order (back to front for drawing).
    order: Vec<AnnotationId>,
    selected: Option<AnnotationId>,
    /// Default `createdBy` for new annotations.
    operator: String,
    /// View-space radius used when hit-testing point markers.
    marker_radius: f64,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            annotations: HashMap::new(),
            order: Vec::new(),
            selected: None,
            operator: "operator".to_string(),
            marker_radius: DEFAULT_MARKER_RADIUS,
        }
    }

    /// Set the default `createdBy` for new annotations.
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = operator.into();
        self
    }

    /// Set the view-space point marker radius used for hit-testing.
    pub fn with_marker_radius(mut self, radius: f64) -> Self {
        self.marker_radius = radius;
        self
    }

    /// Add an annotation, returning its id.
    pub fn create(&mut self, new: NewAnnotation) -> StoreResult<AnnotationId> {
        check_point_count(new.kind, &new.points)?;
        let id = new.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        if self.annotations.contains_key(&id) {
            return Err(StoreError::DuplicateId(id));
        }

        let annotation = Annotation {
            id: id.clone(),
            kind: new.kind,
            defect_type_id: new.defect_type_id,
            points: new.points,
            label: new.label.unwrap_or_else(|| new.kind.display_name().to_string()),
            confidence: clamp_confidence(new.confidence),
            verified: new.verified,
            notes: new.notes,
            created_at: new.created_at.unwrap_or_else(Utc::now),
            created_by: new.created_by.unwrap_or_else(|| self.operator.clone()),
        };
        log::debug!("Created {} annotation {}", annotation.kind, id);
        self.order.push(id.clone());
        self.annotations.insert(id.clone(), annotation);
        Ok(id)
    }

    /// Merge a patch into an existing annotation.
    pub fn update(&mut self, id: &str, patch: AnnotationPatch) -> StoreResult<()> {
        let annotation = self
            .annotations
            .get_mut(id)
            .ok_or_else(|| StoreError::AnnotationNotFound(id.to_string()))?;

        if let Some(points) = &patch.points {
            check_point_count(annotation.kind, points)?;
        }
        if let Some(points) = patch.points {
            annotation.points = points;
        }
        if let Some(label) = patch.label {
            annotation.label = label;
        }
        if let Some(defect_type_id) = patch.defect_type_id {
            annotation.defect_type_id = defect_type_id;
        }
        if let Some(confidence) = patch.confidence {
            annotation.confidence = clamp_confidence(confidence);
        }
        if let Some(verified) = patch.verified {
            annotation.verified = verified;
        }
        if let Some(notes) = patch.notes {
            annotation.notes = notes;
        }
        Ok(())
    }

    /// Remove an annotation. Clears the selection if it was selected.
    pub fn delete(&mut self, id: &str) -> StoreResult<Annotation> {
        let removed = self
            .annotations
            .remove(id)
            .ok_or_else(|| StoreError::AnnotationNotFound(id.to_string()))?;
        self.order.retain(|other| other != id);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        log::debug!("Deleted annotation {id}");
        Ok(removed)
    }

    /// Select an annotation, or clear the selection with `None`.
    pub fn select(&mut self, id: Option<&str>) -> StoreResult<()> {
        match id {
            Some(id) if !self.annotations.contains_key(id) => {
                Err(StoreError::AnnotationNotFound(id.to_string()))
            }
            Some(id) => {
                self.selected = Some(id.to_string());
                Ok(())
            }
            None => {
                self.selected = None;
                Ok(())
            }
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.as_deref() == Some(id)
    }

    /// Move every point of an annotation by an image-space delta.
    pub fn translate(&mut self, id: &str, delta: Vec2) -> StoreResult<()> {
        let annotation = self
            .annotations
            .get_mut(id)
            .ok_or_else(|| StoreError::AnnotationNotFound(id.to_string()))?;
        for p in &mut annotation.points {
            *p += delta;
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Annotation> {
        self.annotations.get(id)
    }

    /// Annotations in insertion order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Annotation> {
        self.order.iter().filter_map(|id| self.annotations.get(id))
    }

    /// Owned copy of all annotations in insertion order, for rendering.
    pub fn snapshot(&self) -> Vec<Annotation> {
        self.iter().cloned().collect()
    }

    /// Filtered, ordered listing.
    pub fn list(&self, filter: &ListFilter) -> Vec<Annotation> {
        let mut out: Vec<Annotation> = self.iter().filter(|a| filter.matches(a)).cloned().collect();
        match filter.order {
            SortOrder::Inserted => out.sort_by_key(|a| a.created_at),
            SortOrder::Newest => out.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::Label => out.sort_by_key(|a| a.label.to_lowercase()),
            SortOrder::ConfidenceDesc => out.sort_by(|a, b| {
                let (a, b) = (a.confidence.unwrap_or(-1.0), b.confidence.unwrap_or(-1.0));
                b.total_cmp(&a)
            }),
        }
        out
    }

    /// Topmost annotation containing an image-space point.
    ///
    /// Scans newest first so the most recently created shape wins on overlap.
    pub fn hit_test(&self, point: Point, scale: f64) -> Option<AnnotationId> {
        self.iter()
            .rev()
            .find(|a| {
                Geometry::of(a)
                    .with_marker_radius(self.marker_radius)
                    .contains(point, scale)
            })
            .map(|a| a.id.clone())
    }

    /// Replace all annotations. Nothing changes if any record is invalid.
    pub fn import(&mut self, annotations: Vec<Annotation>) -> StoreResult<()> {
        let mut seen = HashSet::new();
        for annotation in &annotations {
            check_point_count(annotation.kind, &annotation.points)?;
            if !seen.insert(annotation.id.as_str()) {
                return Err(StoreError::DuplicateId(annotation.id.clone()));
            }
        }

        self.clear();
        for mut annotation in annotations {
            annotation.confidence = clamp_confidence(annotation.confidence);
            self.order.push(annotation.id.clone());
            self.annotations.insert(annotation.id.clone(), annotation);
        }
        log::debug!("Imported {} annotations", self.order.len());
        Ok(())
    }

    /// Remove everything and clear the selection.
    pub fn clear(&mut self) {
        self.annotations.clear();
        self.order.clear();
        self.selected = None;
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn check_point_count(kind: AnnotationKind, points: &[Point]) -> StoreResult<()> {
    match kind.required_points() {
        Some(expected) if points.len() != expected => Err(StoreError::InvalidPointCount {
            kind,
            expected,
            actual: points.len(),
        }),
        _ => Ok(()),
    }
}
