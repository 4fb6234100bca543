//! Render devices
//!
//! A device is the pixel sink the render status draws into. Coordinates
//! handed to a device are already in device space unless a matrix is passed
//! alongside.

mod display_list;
mod pixmap;

pub use display_list::{DisplayListDevice, DrawCommand};
pub use pixmap::PixmapDevice;

use std::fmt;

use folio_text::{CharPos, OutlineSegment, TextFont};

use crate::bitmap::Dib;
use crate::geometry::{IntRect, Matrix, Rect};
use crate::object::{BlendMode, Shading};
use crate::path::{FillRule, Path};
use crate::Color;

/// Kind of output a device produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceClass {
    /// Screen or offscreen raster
    #[default]
    Display,
    /// Print spooler; image masks may not straddle a pause
    Printer,
}

/// Fill and stroke settings for one path draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPaint {
    pub fill: Option<(FillRule, Color)>,
    /// Stroke width in path space and color
    pub stroke: Option<(f32, Color)>,
    pub anti_alias: bool,
    pub blend: BlendMode,
}

impl PathPaint {
    pub fn fill(rule: FillRule, color: Color) -> Self {
        Self { fill: Some((rule, color)), stroke: None, anti_alias: true, blend: BlendMode::Normal }
    }
}

/// Text rasterization flags derived from the render options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextDrawFlags {
    pub clear_type: bool,
    pub bgr_stripe: bool,
    pub no_smooth: bool,
    pub print_graphic_text: bool,
    pub print_image_text: bool,
    pub no_native_text: bool,
    /// Glyphs come from a CID-keyed font
    pub cid_font: bool,
}

/// Glyphs of one fallback slot, drawn in a single device call
#[derive(Clone, Copy)]
pub struct GlyphRun<'a> {
    pub font: &'a dyn TextFont,
    /// `None` for the primary font
    pub fallback_slot: Option<usize>,
    pub glyphs: &'a [CharPos],
    pub font_size: f32,
    /// Text space to device space
    pub matrix: Matrix,
}

impl GlyphRun<'_> {
    /// Outline of one glyph in text space, `None` if the font has none
    pub fn glyph_path(&self, pos: &CharPos) -> Option<Path> {
        let glyph = pos.glyph?;
        let outline = self.font.glyph_outline(self.fallback_slot, glyph)?;
        let [a, b, c, d] = pos.adjust.unwrap_or([1.0, 0.0, 0.0, 1.0]);
        // Font outlines are y-up; text space is y-down.
        let m = Matrix::new(a, b, c, d, 0.0, 0.0)
            .then(Matrix::scale(self.font_size, -self.font_size))
            .then(Matrix::translate(pos.origin_x, -pos.origin_y));

        let mut path = Path::new();
        let mut last = (0.0, 0.0);
        for seg in outline {
            match seg {
                OutlineSegment::MoveTo(x, y) => {
                    let (x, y) = m.transform_point(x, y);
                    path.move_to(x, y);
                    last = (x, y);
                }
                OutlineSegment::LineTo(x, y) => {
                    let (x, y) = m.transform_point(x, y);
                    path.line_to(x, y);
                    last = (x, y);
                }
                OutlineSegment::QuadTo(x1, y1, x, y) => {
                    let (qx, qy) = m.transform_point(x1, y1);
                    let (x, y) = m.transform_point(x, y);
                    // Degree elevation
                    let c1 = (
                        last.0 + 2.0 / 3.0 * (qx - last.0),
                        last.1 + 2.0 / 3.0 * (qy - last.1),
                    );
                    let c2 = (x + 2.0 / 3.0 * (qx - x), y + 2.0 / 3.0 * (qy - y));
                    path.cubic_to(c1.0, c1.1, c2.0, c2.1, x, y);
                    last = (x, y);
                }
                OutlineSegment::CubicTo(x1, y1, x2, y2, x, y) => {
                    let (x1, y1) = m.transform_point(x1, y1);
                    let (x2, y2) = m.transform_point(x2, y2);
                    let (x, y) = m.transform_point(x, y);
                    path.cubic_to(x1, y1, x2, y2, x, y);
                    last = (x, y);
                }
                OutlineSegment::Close => path.close(),
            }
        }
        Some(path)
    }

    /// Character codes of the run, in order
    pub fn char_codes(&self) -> Vec<u32> {
        self.glyphs.iter().map(|g| g.char_code).collect()
    }
}

impl fmt::Debug for GlyphRun<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlyphRun")
            .field("fallback_slot", &self.fallback_slot)
            .field("glyphs", &self.glyphs.len())
            .field("font_size", &self.font_size)
            .field("matrix", &self.matrix)
            .finish()
    }
}

/// Pixel sink
///
/// Draw calls return `false` when the device could not perform them; the
/// render status treats that as a soft failure of the object.
pub trait RenderDevice {
    fn device_class(&self) -> DeviceClass {
        DeviceClass::Display
    }

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Push the clip state
    fn save_state(&mut self);

    /// Return to the last saved clip state; keep it saved when `keep_saved`
    fn restore_state(&mut self, keep_saved: bool);

    /// Bounds of the current clip in device space
    fn clip_box(&self) -> Rect;

    fn intersect_clip_rect(&mut self, rect: &Rect);

    /// Intersect the clip with `path` mapped through `matrix`
    fn set_clip_path(&mut self, path: &Path, matrix: &Matrix, fill_rule: FillRule) -> bool;

    fn fill_rect(&mut self, rect: &IntRect, color: Color) -> bool;

    fn draw_path(&mut self, path: &Path, matrix: &Matrix, paint: &PathPaint) -> bool;

    /// Draw a bitmap; `matrix` maps the unit square to device space
    fn draw_bitmap(
        &mut self,
        bitmap: &Dib,
        matrix: &Matrix,
        alpha: f32,
        blend: BlendMode,
        smooth: bool,
    ) -> bool;

    /// Composite a device-space bitmap at (`left`, `top`)
    fn composite_bitmap(
        &mut self,
        bitmap: &Dib,
        left: i32,
        top: i32,
        alpha: f32,
        blend: BlendMode,
    ) -> bool;

    /// Paint `area` (shading space) with `shading`
    fn draw_shading(&mut self, shading: &Shading, area: &Rect, matrix: &Matrix, alpha: f32) -> bool;

    fn draw_normal_text(&mut self, run: &GlyphRun<'_>, color: Color, flags: TextDrawFlags) -> bool;

    /// Text as outlines, filled and/or stroked
    fn draw_text_path(
        &mut self,
        run: &GlyphRun<'_>,
        fill: Option<Color>,
        stroke: Option<(f32, Color)>,
        flags: TextDrawFlags,
    ) -> bool;
}
