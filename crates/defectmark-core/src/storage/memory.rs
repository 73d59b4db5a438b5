//! In-memory storage implementation.

use super::{AnnotationSet, BoxFuture, Storage, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and embedding hosts.
#[derive(Default)]
pub struct MemoryStorage {
    sets: RwLock<HashMap<String, AnnotationSet>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn save(&self, set: &AnnotationSet) -> BoxFuture<'_, StorageResult<()>> {
        let set = set.clone();
        Box::pin(async move {
            let mut sets = self
                .sets
                .write()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            sets.insert(set.image_id.clone(), set);
            Ok(())
        })
    }

    fn load(&self, image_id: &str) -> BoxFuture<'_, StorageResult<AnnotationSet>> {
        let image_id = image_id.to_string();
        Box::pin(async move {
            let sets = self
                .sets
                .read()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            sets.get(&image_id)
                .cloned()
                .ok_or(StorageError::NotFound(image_id))
        })
    }

    fn delete(&self, image_id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let image_id = image_id.to_string();
        Box::pin(async move {
            let mut sets = self
                .sets
                .write()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            sets.remove(&image_id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let sets = self
                .sets
                .read()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            Ok(sets.keys().cloned().collect())
        })
    }

    fn exists(&self, image_id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let image_id = image_id.to_string();
        Box::pin(async move {
            let sets = self
                .sets
                .read()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            Ok(sets.contains_key(&image_id))
        })
    }
}
