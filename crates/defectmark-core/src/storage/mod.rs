//! Storage abstraction for persisting annotation sets.
//!
//! Hosts receive the complete annotation set for an image on an explicit
//! save. Sets are keyed by image id.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::annotation::Annotation;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Annotation set not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// All annotations for one image, in the interchange shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationSet {
    pub image_id: String,
    pub annotations: Vec<Annotation>,
}

impl AnnotationSet {
    pub fn new(image_id: impl Into<String>, annotations: Vec<Annotation>) -> Self {
        Self {
            image_id: image_id.into(),
            annotations,
        }
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Trait for annotation storage backends.
pub trait Storage: Send + Sync {
    /// Save the annotation set for an image, replacing any previous one.
    fn save(&self, set: &AnnotationSet) -> BoxFuture<'_, StorageResult<()>>;

    /// Load the annotation set for an image.
    fn load(&self, image_id: &str) -> BoxFuture<'_, StorageResult<AnnotationSet>>;

    /// Delete the annotation set for an image.
    fn delete(&self, image_id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List all stored image ids.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    /// Check if an annotation set exists.
    fn exists(&self, image_id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interchange_shape() {
        let json = r#"{
            "imageId": "img-001",
            "annotations": [{
                "id": "a1", "type": "circle", "defectTypeId": "dent",
                "points": [{"x": 10, "y": 10}, {"x": 20, "y": 10}],
                "label": "Circle", "confidence": 55.5, "verified": false,
                "notes": "rim", "createdAt": "2024-05-02T10:00:00Z", "createdBy": "qa"
            }]
        }"#;
        let set = AnnotationSet::from_json(json).unwrap();
        assert_eq!(set.image_id, "img-001");
        assert_eq!(set.annotations.len(), 1);
        assert_eq!(set.annotations[0].notes.as_deref(), Some("rim"));

        let value: serde_json::Value = serde_json::from_str(&set.to_json().unwrap()).unwrap();
        assert_eq!(value["imageId"], "img-001");
        assert_eq!(value["annotations"][0]["type"], "circle");
        assert_eq!(value["annotations"][0]["confidence"], 55.5);
    }
}
