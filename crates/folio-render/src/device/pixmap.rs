//! tiny-skia raster device
//!
//! Backs on-screen rendering as well as the offscreen buffers used for
//! transparency groups and backdrops.

use tiny_skia::{
    FillRule as SkFillRule, GradientStop, LinearGradient, Mask, Paint, Pixmap, PixmapPaint, Point,
    RadialGradient, SpreadMode, Stroke, Transform,
};

use super::{DeviceClass, GlyphRun, PathPaint, RenderDevice, TextDrawFlags};
use crate::bitmap::Dib;
use crate::geometry::{IntRect, Matrix, Rect};
use crate::object::{BlendMode, Shading, ShadingKind};
use crate::path::{FillRule, Path};
use crate::{Color, RenderError, Result};

/// Clip state: optional coverage mask plus its bounds
#[derive(Clone)]
struct ClipState {
    mask: Option<Mask>,
    bounds: Rect,
}

/// Raster device over a tiny-skia pixmap
pub struct PixmapDevice {
    pixmap: Pixmap,
    clip: ClipState,
    saved: Vec<ClipState>,
}

impl PixmapDevice {
    /// Transparent device of the given size
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap =
            Pixmap::new(width, height).ok_or(RenderError::InvalidDeviceSize { width, height })?;
        Ok(Self {
            pixmap,
            clip: ClipState {
                mask: None,
                bounds: Rect::new(0.0, 0.0, width as f32, height as f32),
            },
            saved: Vec::new(),
        })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Straight-alpha copy of the pixels
    pub fn to_dib(&self) -> Dib {
        Dib::from_pixmap(&self.pixmap)
    }

    fn paint_for(color: Color, anti_alias: bool, blend: BlendMode) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color(color.to_skia());
        paint.anti_alias = anti_alias;
        paint.blend_mode = blend.to_skia();
        paint
    }

    fn fill_skia_path(
        &mut self,
        path: &Path,
        transform: Transform,
        rule: SkFillRule,
        paint: &Paint<'_>,
    ) -> bool {
        let Some(sk_path) = path.to_skia() else {
            return false;
        };
        self.pixmap.fill_path(&sk_path, paint, rule, transform, self.clip.mask.as_ref());
        true
    }

    fn stroke_skia_path(
        &mut self,
        path: &Path,
        transform: Transform,
        width: f32,
        paint: &Paint<'_>,
    ) -> bool {
        let Some(sk_path) = path.to_skia() else {
            return false;
        };
        let stroke = Stroke { width, ..Stroke::default() };
        self.pixmap.stroke_path(&sk_path, paint, &stroke, transform, self.clip.mask.as_ref());
        true
    }

    fn draw_glyphs(
        &mut self,
        run: &GlyphRun<'_>,
        fill: Option<Color>,
        stroke: Option<(f32, Color)>,
        anti_alias: bool,
    ) -> bool {
        let transform = run.matrix.to_skia();
        let mut drawn = false;
        for pos in run.glyphs {
            let Some(path) = run.glyph_path(pos) else {
                continue;
            };
            if let Some(color) = fill {
                let paint = Self::paint_for(color, anti_alias, BlendMode::Normal);
                drawn |= self.fill_skia_path(&path, transform, SkFillRule::Winding, &paint);
            }
            if let Some((width, color)) = stroke {
                let paint = Self::paint_for(color, anti_alias, BlendMode::Normal);
                drawn |= self.stroke_skia_path(&path, transform, width, &paint);
            }
        }
        drawn
    }
}

impl RenderDevice for PixmapDevice {
    fn device_class(&self) -> DeviceClass {
        DeviceClass::Display
    }

    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn save_state(&mut self) {
        self.saved.push(self.clip.clone());
    }

    fn restore_state(&mut self, keep_saved: bool) {
        let restored = if keep_saved { self.saved.last().cloned() } else { self.saved.pop() };
        if let Some(state) = restored {
            self.clip = state;
        }
    }

    fn clip_box(&self) -> Rect {
        self.clip.bounds
    }

    fn intersect_clip_rect(&mut self, rect: &Rect) {
        self.set_clip_path(&Path::rect(rect), &Matrix::identity(), FillRule::NonZero);
    }

    fn set_clip_path(&mut self, path: &Path, matrix: &Matrix, fill_rule: FillRule) -> bool {
        let bounds = matrix.transform_rect(&path.bounds());
        self.clip.bounds = self.clip.bounds.intersect(&bounds);

        let Some(sk_path) = path.to_skia() else {
            // Degenerate clip: nothing stays visible.
            self.clip.bounds = Rect::default();
            self.clip.mask = Mask::new(self.pixmap.width(), self.pixmap.height());
            return true;
        };
        let transform = matrix.to_skia();
        match self.clip.mask.as_mut() {
            Some(mask) => mask.intersect_path(&sk_path, fill_rule.to_skia(), true, transform),
            None => {
                let Some(mut mask) = Mask::new(self.pixmap.width(), self.pixmap.height()) else {
                    return false;
                };
                mask.fill_path(&sk_path, fill_rule.to_skia(), true, transform);
                self.clip.mask = Some(mask);
            }
        }
        true
    }

    fn fill_rect(&mut self, rect: &IntRect, color: Color) -> bool {
        let Some(sk_rect) = tiny_skia::Rect::from_ltrb(
            rect.left as f32,
            rect.top as f32,
            rect.right as f32,
            rect.bottom as f32,
        ) else {
            return false;
        };
        let paint = Self::paint_for(color, false, BlendMode::Normal);
        self.pixmap.fill_rect(sk_rect, &paint, Transform::identity(), self.clip.mask.as_ref());
        true
    }

    fn draw_path(&mut self, path: &Path, matrix: &Matrix, paint: &PathPaint) -> bool {
        let transform = matrix.to_skia();
        let mut drawn = false;
        if let Some((rule, color)) = paint.fill {
            let sk_paint = Self::paint_for(color, paint.anti_alias, paint.blend);
            drawn |= self.fill_skia_path(path, transform, rule.to_skia(), &sk_paint);
        }
        if let Some((width, color)) = paint.stroke {
            let sk_paint = Self::paint_for(color, paint.anti_alias, paint.blend);
            drawn |= self.stroke_skia_path(path, transform, width, &sk_paint);
        }
        drawn
    }

    fn draw_bitmap(
        &mut self,
        bitmap: &Dib,
        matrix: &Matrix,
        alpha: f32,
        blend: BlendMode,
        smooth: bool,
    ) -> bool {
        let Some(src) = bitmap.to_pixmap() else {
            return false;
        };
        let unit = Matrix::scale(1.0 / bitmap.width() as f32, 1.0 / bitmap.height() as f32)
            .then(*matrix);
        let paint = PixmapPaint {
            opacity: alpha.clamp(0.0, 1.0),
            blend_mode: blend.to_skia(),
            quality: if smooth {
                tiny_skia::FilterQuality::Bilinear
            } else {
                tiny_skia::FilterQuality::Nearest
            },
        };
        let mask = self.clip.mask.as_ref();
        self.pixmap.draw_pixmap(0, 0, src.as_ref(), &paint, unit.to_skia(), mask);
        true
    }

    fn composite_bitmap(
        &mut self,
        bitmap: &Dib,
        left: i32,
        top: i32,
        alpha: f32,
        blend: BlendMode,
    ) -> bool {
        let Some(src) = bitmap.to_pixmap() else {
            return false;
        };
        let paint = PixmapPaint {
            opacity: alpha.clamp(0.0, 1.0),
            blend_mode: blend.to_skia(),
            quality: tiny_skia::FilterQuality::Nearest,
        };
        let mask = self.clip.mask.as_ref();
        self.pixmap.draw_pixmap(left, top, src.as_ref(), &paint, Transform::identity(), mask);
        true
    }

    fn draw_shading(
        &mut self,
        shading: &Shading,
        area: &Rect,
        matrix: &Matrix,
        alpha: f32,
    ) -> bool {
        let stops: Vec<GradientStop> = shading
            .stops
            .iter()
            .map(|&(offset, color)| GradientStop::new(offset, color.with_alpha(alpha).to_skia()))
            .collect();
        let shader = match shading.kind {
            ShadingKind::Axial { start, end } => LinearGradient::new(
                Point::from_xy(start.0, start.1),
                Point::from_xy(end.0, end.1),
                stops,
                SpreadMode::Pad,
                Transform::identity(),
            ),
            ShadingKind::Radial { center, radius } => {
                let c = Point::from_xy(center.0, center.1);
                RadialGradient::new(c, c, radius, stops, SpreadMode::Pad, Transform::identity())
            }
        };
        let Some(shader) = shader else {
            return false;
        };
        let Some(sk_rect) =
            tiny_skia::Rect::from_ltrb(area.left, area.top, area.right, area.bottom)
        else {
            return false;
        };
        let mut paint = Paint::default();
        paint.shader = shader;
        paint.anti_alias = true;
        self.pixmap.fill_rect(sk_rect, &paint, matrix.to_skia(), self.clip.mask.as_ref());
        true
    }

    fn draw_normal_text(&mut self, run: &GlyphRun<'_>, color: Color, flags: TextDrawFlags) -> bool {
        self.draw_glyphs(run, Some(color), None, !flags.no_smooth)
    }

    fn draw_text_path(
        &mut self,
        run: &GlyphRun<'_>,
        fill: Option<Color>,
        stroke: Option<(f32, Color)>,
        flags: TextDrawFlags,
    ) -> bool {
        self.draw_glyphs(run, fill, stroke, !flags.no_smooth)
    }
}
