//! DefectMark Render Library
//!
//! Renderer abstraction and a CPU raster implementation for DefectMark
//! sessions. Labels use an 8x8 bitmap font.

pub mod label;
mod renderer;
mod skia_impl;

pub use renderer::{FrameState, FrameStats, RenderContext, RenderResult, Renderer, RendererError};
pub use skia_impl::SkiaRenderer;
