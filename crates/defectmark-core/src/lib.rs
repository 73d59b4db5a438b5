//! DefectMark Core Library
//!
//! Platform-agnostic engine for annotating defects on inspection images:
//! viewport transform, annotation store, shape geometry, authoring tools
//! and image loading.

pub mod annotation;
pub mod catalog;
pub mod config;
pub mod loader;
pub mod schedule;
pub mod session;
pub mod shapes;
pub mod storage;
pub mod store;
pub mod tools;
pub mod viewport;

pub use annotation::{Annotation, AnnotationId, AnnotationKind, AnnotationPatch, NewAnnotation};
pub use catalog::{CatalogError, DefectCatalog, DefectType, HexColor};
pub use config::{ConfigError, EngineConfig};
pub use loader::{FileSource, ImageLoadError, ImageLoader, ImageSource, LoadOutcome, LoadedImage, MemorySource};
pub use schedule::{Debouncer, RenderRequest, RenderScheduler};
pub use session::{DisplayOptions, Session, SessionEvent, Transition};
pub use shapes::{Drawable, Geometry, ShapeGeometry};
pub use storage::{AnnotationSet, FileStorage, MemoryStorage, Storage, StorageError, StorageResult};
pub use store::{AnnotationStore, ListFilter, SortOrder, StoreError, StoreResult};
pub use tools::{ShapeDraft, ToolKind, ToolManager};
pub use viewport::Viewport;
