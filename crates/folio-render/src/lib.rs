//! Folio Render - Page Rendering Pipeline
//!
//! Composites an ordered list of page objects onto a pixel sink.
//!
//! This crate provides:
//! - Render options (color scheme, anti-aliasing flags, cache limit, optional content)
//! - A per-page cache of decoded image bitmaps with cost/recency eviction
//! - Layered render contexts with per-layer transforms
//! - A resumable, pause-aware progressive renderer
//! - Clip, transparency-group and nested-form handling per layer
//! - Batched text drawing from positioned glyph lists
//! - A tiny-skia raster device and a recording display-list device

pub mod bitmap;
pub mod context;
pub mod device;
pub mod geometry;
pub mod image;
pub mod object;
pub mod options;
pub mod path;
pub mod pause;
pub mod progressive;
pub mod status;
pub mod text;

pub use bitmap::{Dib, DibFormat};
pub use context::{Layer, RenderContext};
pub use device::{
    DeviceClass, DisplayListDevice, DrawCommand, GlyphRun, PathPaint, PixmapDevice, RenderDevice,
    TextDrawFlags,
};
pub use geometry::{IntRect, Matrix, Rect};
pub use self::image::{
    EncodedFormat, EncodedImage, ImageCacheEntry, ImageDecoder, ImageId, ImageResource, LoadState,
    PageRenderCache, RawImage, HUGE_IMAGE_SIZE, MIN_RESIDENT_ENTRIES,
};
pub use object::{
    BlendMode, FormObject, GraphicsState, ImageObject, ObjectKind, ObjectList, PageObject,
    PageObjectHolder, ParseState, PathObject, Shading, ShadingKind, ShadingObject, TextObject,
    TextRenderMode, Transparency,
};
pub use options::{ColorScheme, RenderOptions, DEFAULT_CACHE_SIZE_LIMIT};
pub use path::{ClipPath, FillRule, Path, PathSegment};
pub use pause::{DeadlinePause, NeverPause, PauseIndicator};
pub use progressive::{ProgressiveRenderer, RenderState, STEP_LIMIT};
pub use status::{RenderStatus, MAX_RECURSION_DEPTH};
pub use text::TextRenderer;

use serde::{Deserialize, Serialize};

/// Color (RGBA, straight alpha)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Build from a packed 0xAARRGGBB value
    pub const fn from_argb(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    /// Pack as 0xAARRGGBB
    pub const fn to_argb(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    /// Same color with alpha scaled by `alpha` (0.0..=1.0)
    pub fn with_alpha(self, alpha: f32) -> Self {
        let a = (f32::from(self.a) * alpha.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    /// Rec. 601 luma
    pub fn luminance(self) -> u8 {
        ((u32::from(self.r) * 30 + u32::from(self.g) * 59 + u32::from(self.b) * 11) / 100) as u8
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}

/// Render error types
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Invalid device size: {width}x{height}")]
    InvalidDeviceSize { width: u32, height: u32 },

    #[error("Unsupported image format")]
    UnsupportedImageFormat,

    #[error("Image decode failed: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;
