//! Glyph position assembly
//!
//! Turns a shown string (character codes plus cumulative advances) into one
//! positioned glyph record per character, resolving fallbacks, vertical
//! origins and width mismatches between the font dictionary and the face.

use crate::font::TextFont;

/// Character code that marks a skipped position
pub const SKIPPED_CHAR_CODE: u32 = u32::MAX;

/// A positioned glyph
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharPos {
    /// Original character code
    pub char_code: u32,
    /// Unicode value, or the character code when the font has no mapping
    pub unicode: u32,
    /// Glyph index, `None` when neither primary nor fallback font has it
    pub glyph: Option<u32>,
    /// Fallback font slot the glyph comes from (`None` = primary font)
    pub fallback_slot: Option<usize>,
    /// Origin in text space, x
    pub origin_x: f32,
    /// Origin in text space, y
    pub origin_y: f32,
    /// Nominal width for substituted simple fonts, 0 otherwise
    pub font_char_width: i32,
    /// 2x2 glyph adjustment (a, b, c, d) applied before positioning
    pub adjust: Option<[f32; 4]>,
    /// Glyph is the vertical variant of the character
    pub is_vertical: bool,
    /// Glyph belongs to a CID-keyed font
    pub cid_font: bool,
}

impl CharPos {
    /// Glyph index was resolved
    pub fn is_resolved(&self) -> bool {
        self.glyph.is_some()
    }
}

/// Positioned glyphs for one shown string
#[derive(Debug, Clone, Default)]
pub struct CharPosList {
    positions: Vec<CharPos>,
}

impl CharPosList {
    /// Build positions for `char_codes`.
    ///
    /// `char_pos[i - 1]` is the cumulative offset of character `i`; the first
    /// character sits at the origin. Codes equal to [`SKIPPED_CHAR_CODE`]
    /// produce no record.
    pub fn load(char_codes: &[u32], char_pos: &[f32], font: &dyn TextFont, font_size: f32) -> Self {
        let cid_metrics = font.cid_metrics();
        let vert_writing = font.is_vert_writing();
        let mut positions = Vec::with_capacity(char_codes.len());

        for (i, &char_code) in char_codes.iter().enumerate() {
            if char_code == SKIPPED_CHAR_CODE {
                continue;
            }

            let lookup = font.glyph_from_char_code(char_code);
            let (glyph, fallback_slot) = match lookup.glyph {
                Some(glyph) => (Some(glyph), None),
                None => match font.fallback_slot(char_code) {
                    Some(slot) => (font.fallback_glyph(slot, char_code), Some(slot)),
                    None => (None, None),
                },
            };
            if glyph.is_none() {
                tracing::trace!(char_code, "glyph unresolved in primary and fallback fonts");
            }

            let font_char_width = if !font.is_embedded() && !font.is_cid_font() {
                font.char_width(char_code)
            } else {
                0
            };

            let mut origin_x =
                if i > 0 { char_pos.get(i - 1).copied().unwrap_or(0.0) } else { 0.0 };
            let mut origin_y = 0.0;
            let mut adjust = None;
            let mut scale = 1.0;

            if !font.is_embedded() && font.has_font_widths() && !lookup.vertical {
                if let Some(glyph) = glyph {
                    let nominal = font.char_width(char_code);
                    let physical = font.glyph_width(fallback_slot, glyph);
                    if physical != 0 && nominal > physical + 1 {
                        // Center the narrower physical glyph in its nominal cell.
                        origin_x += (nominal - physical) as f32 * font_size / 2000.0;
                    } else if nominal != 0 && physical != 0 && nominal < physical {
                        scale = nominal as f32 / physical as f32;
                        adjust = Some([scale, 0.0, 0.0, 1.0]);
                    }
                }
            }

            if let Some(cid_metrics) = cid_metrics {
                let cid = cid_metrics.cid_from_char_code(char_code);
                if vert_writing {
                    let (vx, vy) = cid_metrics.vertical_origin(cid);
                    origin_y = origin_x;
                    origin_x = 0.0;
                    origin_x -= font_size * f32::from(vx) / 1000.0;
                    origin_y -= font_size * f32::from(vy) / 1000.0;
                }
                // Vertical variants are already upright; the stored transform is for the rest.
                if let Some(t) = cid_metrics.cid_transform(cid).filter(|_| !lookup.vertical) {
                    adjust = Some([
                        cid_transform_to_float(t[0]) * scale,
                        cid_transform_to_float(t[1]) * scale,
                        cid_transform_to_float(t[2]),
                        cid_transform_to_float(t[3]),
                    ]);
                    origin_x += cid_transform_to_float(t[4]) * font_size;
                    origin_y += cid_transform_to_float(t[5]) * font_size;
                }
            }

            positions.push(CharPos {
                char_code,
                unicode: font
                    .unicode_from_char_code(char_code)
                    .map(u32::from)
                    .unwrap_or(char_code),
                glyph,
                fallback_slot,
                origin_x,
                origin_y,
                font_char_width,
                adjust,
                is_vertical: lookup.vertical,
                cid_font: cid_metrics.is_some(),
            });
        }

        Self { positions }
    }

    /// All positioned glyphs
    pub fn positions(&self) -> &[CharPos] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Maximal contiguous runs sharing one fallback slot, in order
    pub fn fallback_runs(&self) -> Vec<(Option<usize>, &[CharPos])> {
        let mut runs = Vec::new();
        let mut start = 0;
        for i in 1..self.positions.len() {
            if self.positions[i].fallback_slot != self.positions[start].fallback_slot {
                runs.push((self.positions[start].fallback_slot, &self.positions[start..i]));
                start = i;
            }
        }
        if start < self.positions.len() {
            runs.push((self.positions[start].fallback_slot, &self.positions[start..]));
        }
        runs
    }
}

/// Signed byte of a CID glyph transform, scaled to roughly [-1, 1]
fn cid_transform_to_float(ch: u8) -> f32 {
    let value = if ch < 128 { f32::from(ch) } else { f32::from(ch) - 255.0 };
    value / 127.0
}
