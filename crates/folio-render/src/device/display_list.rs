//! Recording device
//!
//! Records every device call as a [`DrawCommand`] instead of rasterizing.
//! Useful for hit testing, printing back-ends and tests.

use super::{DeviceClass, GlyphRun, PathPaint, RenderDevice, TextDrawFlags};
use crate::bitmap::Dib;
use crate::geometry::{IntRect, Matrix, Rect};
use crate::object::{BlendMode, Shading};
use crate::path::{FillRule, Path};
use crate::Color;

/// Recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    SaveState,
    RestoreState { keep_saved: bool },
    IntersectClipRect(Rect),
    /// Clip path, recorded by its device-space bounds
    SetClipPath { bounds: Rect, fill_rule: FillRule },
    FillRect { rect: IntRect, color: Color },
    DrawPath { bounds: Rect, fill: Option<Color>, stroke: Option<Color> },
    DrawBitmap { width: u32, height: u32, matrix: Matrix, alpha: f32, blend: BlendMode },
    CompositeBitmap { width: u32, height: u32, left: i32, top: i32, alpha: f32, blend: BlendMode },
    DrawShading { bounds: Rect, alpha: f32 },
    NormalText {
        fallback_slot: Option<usize>,
        char_codes: Vec<u32>,
        color: Color,
        flags: TextDrawFlags,
    },
    TextPath {
        fallback_slot: Option<usize>,
        char_codes: Vec<u32>,
        fill: Option<Color>,
        stroke: Option<Color>,
    },
}

/// Device that records draw calls
#[derive(Debug, Clone)]
pub struct DisplayListDevice {
    width: u32,
    height: u32,
    class: DeviceClass,
    clip: Rect,
    saved: Vec<Rect>,
    commands: Vec<DrawCommand>,
}

impl DisplayListDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            class: DeviceClass::Display,
            clip: Rect::new(0.0, 0.0, width as f32, height as f32),
            saved: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: DeviceClass) -> Self {
        self.class = class;
        self
    }

    /// Start with a clip narrower than the device
    pub fn with_clip_box(mut self, clip: Rect) -> Self {
        self.clip = clip;
        self
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Paint commands only (no state or clip changes)
    pub fn paint_commands(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands.iter().filter(|cmd| {
            !matches!(
                cmd,
                DrawCommand::SaveState
                    | DrawCommand::RestoreState { .. }
                    | DrawCommand::IntersectClipRect(_)
                    | DrawCommand::SetClipPath { .. }
            )
        })
    }

    /// Saved-state depth
    pub fn depth(&self) -> usize {
        self.saved.len()
    }
}

impl RenderDevice for DisplayListDevice {
    fn device_class(&self) -> DeviceClass {
        self.class
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn save_state(&mut self) {
        self.saved.push(self.clip);
        self.commands.push(DrawCommand::SaveState);
    }

    fn restore_state(&mut self, keep_saved: bool) {
        let restored = if keep_saved { self.saved.last().copied() } else { self.saved.pop() };
        if let Some(clip) = restored {
            self.clip = clip;
        }
        self.commands.push(DrawCommand::RestoreState { keep_saved });
    }

    fn clip_box(&self) -> Rect {
        self.clip
    }

    fn intersect_clip_rect(&mut self, rect: &Rect) {
        self.clip = self.clip.intersect(rect);
        self.commands.push(DrawCommand::IntersectClipRect(*rect));
    }

    fn set_clip_path(&mut self, path: &Path, matrix: &Matrix, fill_rule: FillRule) -> bool {
        let bounds = matrix.transform_rect(&path.bounds());
        self.clip = self.clip.intersect(&bounds);
        self.commands.push(DrawCommand::SetClipPath { bounds, fill_rule });
        true
    }

    fn fill_rect(&mut self, rect: &IntRect, color: Color) -> bool {
        self.commands.push(DrawCommand::FillRect { rect: *rect, color });
        true
    }

    fn draw_path(&mut self, path: &Path, matrix: &Matrix, paint: &PathPaint) -> bool {
        self.commands.push(DrawCommand::DrawPath {
            bounds: matrix.transform_rect(&path.bounds()),
            fill: paint.fill.map(|(_, color)| color),
            stroke: paint.stroke.map(|(_, color)| color),
        });
        true
    }

    fn draw_bitmap(
        &mut self,
        bitmap: &Dib,
        matrix: &Matrix,
        alpha: f32,
        blend: BlendMode,
        _smooth: bool,
    ) -> bool {
        self.commands.push(DrawCommand::DrawBitmap {
            width: bitmap.width(),
            height: bitmap.height(),
            matrix: *matrix,
            alpha,
            blend,
        });
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
        self.commands.push(DrawCommand::CompositeBitmap {
            width: bitmap.width(),
            height: bitmap.height(),
            left,
            top,
            alpha,
            blend,
        });
        true
    }

    fn draw_shading(
        &mut self,
        _shading: &Shading,
        area: &Rect,
        matrix: &Matrix,
        alpha: f32,
    ) -> bool {
        self.commands.push(DrawCommand::DrawShading { bounds: matrix.transform_rect(area), alpha });
        true
    }

    fn draw_normal_text(&mut self, run: &GlyphRun<'_>, color: Color, flags: TextDrawFlags) -> bool {
        self.commands.push(DrawCommand::NormalText {
            fallback_slot: run.fallback_slot,
            char_codes: run.char_codes(),
            color,
            flags,
        });
        true
    }

    fn draw_text_path(
        &mut self,
        run: &GlyphRun<'_>,
        fill: Option<Color>,
        stroke: Option<(f32, Color)>,
        _flags: TextDrawFlags,
    ) -> bool {
        self.commands.push(DrawCommand::TextPath {
            fallback_slot: run.fallback_slot,
            char_codes: run.char_codes(),
            fill,
            stroke: stroke.map(|(_, color)| color),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_keep_saved() {
        let mut dev = DisplayListDevice::new(100, 100);
        dev.save_state();
        dev.intersect_clip_rect(&Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(dev.clip_box(), Rect::new(0.0, 0.0, 10.0, 10.0));

        dev.restore_state(true);
        assert_eq!(dev.clip_box(), Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(dev.depth(), 1);

        dev.restore_state(false);
        assert_eq!(dev.depth(), 0);
    }

    #[test]
    fn test_clip_path_narrows_clip_box() {
        let mut dev = DisplayListDevice::new(100, 100);
        let path = Path::rect(&Rect::new(0.0, 0.0, 10.0, 10.0));
        dev.set_clip_path(&path, &Matrix::translate(20.0, 20.0), FillRule::NonZero);
        assert_eq!(dev.clip_box(), Rect::new(20.0, 20.0, 30.0, 30.0));
    }

    #[test]
    fn test_paint_commands_skip_state() {
        let mut dev = DisplayListDevice::new(10, 10);
        dev.save_state();
        dev.fill_rect(&IntRect::new(0, 0, 5, 5), Color::WHITE);
        dev.restore_state(false);
        assert_eq!(dev.commands().len(), 3);
        assert_eq!(dev.paint_commands().count(), 1);
    }
}
