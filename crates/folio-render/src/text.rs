//! Text Rendering
//!
//! Positions the glyphs of a text object and hands them to the device in
//! batches: one call per run of glyphs sharing a fallback font.

use folio_text::{CharPosList, TextFont};

use crate::device::{GlyphRun, RenderDevice, TextDrawFlags};
use crate::geometry::Matrix;
use crate::object::TextObject;
use crate::options::RenderOptions;
use crate::Color;

/// Batched text drawing
pub struct TextRenderer;

impl TextRenderer {
    /// Device flags for drawing text in `font`
    pub fn text_flags(options: &RenderOptions, font: &dyn TextFont) -> TextDrawFlags {
        TextDrawFlags {
            clear_type: options.clear_type,
            bgr_stripe: options.clear_type && options.bgr_stripe,
            no_smooth: options.no_text_smooth,
            print_graphic_text: options.print_graphic_text,
            print_image_text: options.print_image_text,
            no_native_text: options.no_native_text,
            cid_font: font.is_cid_font(),
        }
    }

    /// Filled glyphs; `matrix` maps text space to device space.
    ///
    /// A run the device cannot draw natively is retried as filled outlines.
    pub fn draw_normal_text(
        device: &mut dyn RenderDevice,
        text: &TextObject,
        matrix: &Matrix,
        color: Color,
        options: &RenderOptions,
    ) -> bool {
        let font = text.font.as_ref();
        let list = CharPosList::load(&text.char_codes, &text.char_positions, font, text.font_size);
        if list.is_empty() {
            return true;
        }
        let flags = Self::text_flags(options, font);

        let mut drawn = true;
        for (fallback_slot, glyphs) in list.fallback_runs() {
            let run = GlyphRun {
                font,
                fallback_slot,
                glyphs,
                font_size: text.font_size,
                matrix: *matrix,
            };
            if device.draw_normal_text(&run, color, flags) {
                continue;
            }
            tracing::debug!(
                ?fallback_slot,
                glyphs = glyphs.len(),
                "native text failed, drawing outlines"
            );
            drawn &= device.draw_text_path(&run, Some(color), None, flags);
        }
        drawn
    }

    /// Glyph outlines, filled and/or stroked
    pub fn draw_text_path(
        device: &mut dyn RenderDevice,
        text: &TextObject,
        matrix: &Matrix,
        fill: Option<Color>,
        stroke: Option<(f32, Color)>,
        options: &RenderOptions,
    ) -> bool {
        let font = text.font.as_ref();
        let list = CharPosList::load(&text.char_codes, &text.char_positions, font, text.font_size);
        if list.is_empty() {
            return true;
        }
        let flags = Self::text_flags(options, font);

        let mut drawn = true;
        for (fallback_slot, glyphs) in list.fallback_runs() {
            let run = GlyphRun {
                font,
                fallback_slot,
                glyphs,
                font_size: text.font_size,
                matrix: *matrix,
            };
            drawn &= device.draw_text_path(&run, fill, stroke, flags);
        }
        drawn
    }
}
