//! Asynchronous image loading with "latest request wins" semantics.
//!
//! Every call to [`ImageLoader::load`] takes a new generation number before
//! the returned future is polled. When the future completes it compares its
//! generation with the newest one issued; older results come back as
//! [`LoadOutcome::Superseded`] and must not be committed.

use crate::catalog::HexColor;
use crate::config::EngineConfig;
use crate::storage::BoxFuture;
use image::{Rgba, RgbaImage};
use kurbo::Size;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Caption drawn on the substituted image.
pub const PLACEHOLDER_CAPTION: &str = "Image unavailable";

const DEFAULT_PLACEHOLDER_COLOR: HexColor = HexColor::new(0xe5, 0xe7, 0xeb, 0xff);

/// Image loading errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImageLoadError {
    #[error("Image not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Failed to decode image: {0}")]
    Decode(String),
}

/// Result type for image fetches.
pub type ImageLoadResult<T> = Result<T, ImageLoadError>;

/// Where encoded image bytes come from.
pub trait ImageSource: Send + Sync {
    /// Fetch the encoded bytes for a URL or blob name.
    fn fetch(&self, url: &str) -> BoxFuture<'_, ImageLoadResult<Vec<u8>>>;
}

/// Named in-memory blobs.
#[derive(Default)]
pub struct MemorySource {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MemorySource::insert`].
    pub fn with(self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(name, bytes);
        self
    }

    /// Register or replace a blob.
    pub fn insert(&self, name: impl Into<String>, bytes: Vec<u8>) {
        match self.blobs.write() {
            Ok(mut blobs) => {
                blobs.insert(name.into(), bytes);
            }
            Err(e) => log::warn!("Memory source lock poisoned: {}", e),
        }
    }
}

impl ImageSource for MemorySource {
    fn fetch(&self, url: &str) -> BoxFuture<'_, ImageLoadResult<Vec<u8>>> {
        let url = url.to_string();
        Box::pin(async move {
            let blobs = self
                .blobs
                .read()
                .map_err(|e| ImageLoadError::Io(format!("Lock error: {}", e)))?;
            blobs.get(&url).cloned().ok_or(ImageLoadError::NotFound(url))
        })
    }
}

/// Files under a base directory. Accepts relative names and `file://` URLs.
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
        if path.is_absolute() {
            path
        } else {
            self.root.join(path)
        }
    }
}

impl ImageSource for FileSource {
    fn fetch(&self, url: &str) -> BoxFuture<'_, ImageLoadResult<Vec<u8>>> {
        let path = self.resolve(url);
        let url = url.to_string();
        Box::pin(async move {
            fs::read(&path).map_err(|e| match e.kind() {
                ErrorKind::NotFound => ImageLoadError::NotFound(url),
                _ => ImageLoadError::Io(format!("Failed to read {}: {}", path.display(), e)),
            })
        })
    }
}

/// A decoded image (or its placeholder) ready to commit to a session.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Generation of the request that produced this image.
    pub generation: u64,
    /// URL or blob name that was requested.
    pub source: String,
    pub image: Arc<RgbaImage>,
    /// True when the load failed and this is the substitute.
    pub placeholder: bool,
    /// Text drawn over the image, if any.
    pub caption: Option<String>,
    /// Why the load failed.
    pub failure: Option<String>,
}

impl LoadedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> Size {
        Size::new(f64::from(self.image.width()), f64::from(self.image.height()))
    }
}

/// Result of a finished load request.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// The newest request finished; commit this image.
    Ready(LoadedImage),
    /// A newer request was issued while this one was in flight.
    Superseded { generation: u64, source: String },
}

impl LoadOutcome {
    pub fn generation(&self) -> u64 {
        match self {
            LoadOutcome::Ready(image) => image.generation,
            LoadOutcome::Superseded { generation, .. } => *generation,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, LoadOutcome::Superseded { .. })
    }
}

/// Substitute image used when a load fails.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placeholder {
    pub width: u32,
    pub height: u32,
    pub color: HexColor,
}

impl Default for Placeholder {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            color: DEFAULT_PLACEHOLDER_COLOR,
        }
    }
}

impl Placeholder {
    pub fn from_config(config: &EngineConfig) -> Self {
        let color = HexColor::parse(&config.placeholder_color).unwrap_or_else(|e| {
            log::warn!("{}; using default placeholder color", e);
            DEFAULT_PLACEHOLDER_COLOR
        });
        Self {
            width: config.placeholder_width.max(1),
            height: config.placeholder_height.max(1),
            color,
        }
    }

    fn render(&self) -> RgbaImage {
        let c = self.color;
        RgbaImage::from_pixel(self.width, self.height, Rgba([c.r, c.g, c.b, c.a]))
    }
}

/// Loads images through an [`ImageSource`], tagging each request with a generation.
#[derive(Clone)]
pub struct ImageLoader {
    source: Arc<dyn ImageSource>,
    latest: Arc<AtomicU64>,
    placeholder: Placeholder,
}

impl ImageLoader {
    pub fn new(source: Arc<dyn ImageSource>) -> Self {
        Self {
            source,
            latest: Arc::new(AtomicU64::new(0)),
            placeholder: Placeholder::default(),
        }
    }

    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Draw generations from a shared counter.
    ///
    /// Loaders sharing a counter supersede each other's requests.
    pub fn with_generations(mut self, latest: Arc<AtomicU64>) -> Self {
        self.latest = latest;
        self
    }

    /// Newest generation issued so far (0 before the first request).
    pub fn latest_generation(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// Request an image.
    ///
    /// The generation is taken now, not when the future is first polled.
    /// Failures resolve to the placeholder image instead of an error.
    pub fn load(&self, url: &str) -> BoxFuture<'_, LoadOutcome> {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let source = url.to_string();
        log::debug!("Image load requested: {} (generation {})", source, generation);
        let fetch = self.source.fetch(url);

        Box::pin(async move {
            let decoded = fetch.await.and_then(|bytes| decode(&bytes));

            let latest = self.latest.load(Ordering::SeqCst);
            if latest != generation {
                log::debug!(
                    "Discarding image {} (generation {}, latest {})",
                    source,
                    generation,
                    latest
                );
                return LoadOutcome::Superseded { generation, source };
            }

            match decoded {
                Ok(image) => LoadOutcome::Ready(LoadedImage {
                    generation,
                    source,
                    image: Arc::new(image),
                    placeholder: false,
                    caption: None,
                    failure: None,
                }),
                Err(e) => {
                    log::warn!("Failed to load image {}: {}; using placeholder", source, e);
                    LoadOutcome::Ready(LoadedImage {
                        generation,
                        source,
                        image: Arc::new(self.placeholder.render()),
                        placeholder: true,
                        caption: Some(PLACEHOLDER_CAPTION.to_string()),
                        failure: Some(e.to_string()),
                    })
                }
            }
        })
    }
}

fn decode(bytes: &[u8]) -> ImageLoadResult<RgbaImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| ImageLoadError::Decode(e.to_string()))
}
