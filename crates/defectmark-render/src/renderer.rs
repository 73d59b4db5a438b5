//! Renderer trait abstraction.

use defectmark_core::Session;
use kurbo::Size;
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid surface size {width}x{height}")]
    InvalidSurface { width: f64, height: f64 },
    #[error("Render failed: {0}")]
    RenderFailed(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// What a frame showed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    /// No image committed yet; only the loading placeholder was drawn.
    #[default]
    Loading,
    /// Image and overlays were drawn.
    Drawn,
}

/// Counters for a rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub state: FrameState,
    /// Annotations that were filled and stroked.
    pub annotations_drawn: usize,
    /// Degenerate annotations whose shape was skipped.
    pub degenerate_skipped: usize,
    pub labels_drawn: usize,
}

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// The session to render.
    pub session: &'a Session,
    /// Surface size in pixels; the viewport's container.
    pub viewport_size: Size,
    /// Background color behind the image.
    pub background_color: Color,
    /// Fill shown while no image is loaded.
    pub loading_color: Color,
    /// Color of label and caption text.
    pub text_color: Color,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(session: &'a Session, viewport_size: Size) -> Self {
        Self {
            session,
            viewport_size,
            background_color: Color::from_rgba8(17, 24, 39, 255),
            loading_color: Color::from_rgba8(31, 41, 55, 255),
            text_color: Color::from_rgba8(255, 255, 255, 255),
        }
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    /// Set the loading placeholder color.
    pub fn with_loading_color(mut self, color: Color) -> Self {
        self.loading_color = color;
        self
    }

    /// Set the text color.
    pub fn with_text_color(mut self, color: Color) -> Self {
        self.text_color = color;
        self
    }
}

/// Trait for rendering backends.
pub trait Renderer: Send + Sync {
    /// Draw one frame of the session.
    fn render(&mut self, ctx: &RenderContext) -> RenderResult<FrameStats>;

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}
