//! Viewport module for the image-space ↔ view-space transform.

use crate::config::EngineConfig;
use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Container and image sizes remembered from the last fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitBasis {
    pub container: Size,
    pub image: Size,
}

/// Viewport manages the transform used to draw an image and its annotations.
///
/// `scale` maps image pixels to view pixels and `offset` is where the image
/// origin lands in view space. Annotation points are never touched by any
/// viewport operation; only this transform changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Image pixels → view pixels.
    pub scale: f64,
    /// View-space position of the image origin.
    pub offset: Vec2,
    pub min_scale: f64,
    pub max_scale: f64,
    /// Factor applied by one zoom step.
    pub zoom_step: f64,
    basis: Option<FitBasis>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Vec2::ZERO,
            min_scale: 0.1,
            max_scale: 5.0,
            zoom_step: 1.2,
            basis: None,
        }
    }
}

impl Viewport {
    /// Create a viewport with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a viewport using the limits from a config.
    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            zoom_step: config.zoom_step,
            ..Self::default()
        }
    }

    /// Affine transform from image space to view space.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale)
    }

    /// Affine transform from view space to image space.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.offset)
    }

    /// Convert an image-space point to view space.
    pub fn to_view(&self, p: Point) -> Point {
        Point::new(self.offset.x + p.x * self.scale, self.offset.y + p.y * self.scale)
    }

    /// Convert a view-space point to image space.
    pub fn to_image(&self, v: Point) -> Point {
        Point::new((v.x - self.offset.x) / self.scale, (v.y - self.offset.y) / self.scale)
    }

    /// Convert a view-space length to image space.
    pub fn view_len_to_image(&self, len: f64) -> f64 {
        len / self.scale
    }

    /// Fit the image into the container, centered, without upscaling.
    pub fn fit(&mut self, container: Size, image: Size) {
        if !is_positive(container) || !is_positive(image) {
            log::warn!("Ignoring fit with empty size (container {container:?}, image {image:?})");
            return;
        }

        let scale = (container.width / image.width)
            .min(container.height / image.height)
            .min(1.0);
        self.scale = self.clamp_scale(scale);
        self.offset = Vec2::new(
            (container.width - image.width * self.scale) / 2.0,
            (container.height - image.height * self.scale) / 2.0,
        );
        self.basis = Some(FitBasis { container, image });
    }

    /// Zoom in by one step. The offset is kept (top-left pivot).
    pub fn zoom_in(&mut self) {
        self.scale = self.clamp_scale(self.scale * self.zoom_step);
    }

    /// Zoom out by one step. The offset is kept (top-left pivot).
    pub fn zoom_out(&mut self) {
        self.scale = self.clamp_scale(self.scale / self.zoom_step);
    }

    /// Re-fit using the last container and image sizes.
    pub fn reset(&mut self) {
        if let Some(basis) = self.basis {
            self.fit(basis.container, basis.image);
        }
    }

    /// Pan by a delta in view coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Re-fit after the container changed size.
    pub fn resize_container(&mut self, container: Size) {
        match self.basis {
            Some(basis) => self.fit(container, basis.image),
            None => log::debug!("Container resized to {container:?} before any image was fitted"),
        }
    }

    /// Sizes used by the last successful fit.
    pub fn basis(&self) -> Option<FitBasis> {
        self.basis
    }

    fn clamp_scale(&self, scale: f64) -> f64 {
        // Must not panic on inverted or NaN bounds.
        scale.max(self.min_scale).min(self.max_scale)
    }
}

fn is_positive(size: Size) -> bool {
    size.width > 0.0 && size.height > 0.0
}
