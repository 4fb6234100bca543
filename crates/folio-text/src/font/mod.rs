//! Font access
//!
//! The renderer never parses font programs itself. Everything it needs from a
//! font goes through [`TextFont`], implemented by the font collaborator.

mod face;

pub use face::FaceFont;

/// Glyph found for a character code in the primary font
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphLookup {
    /// Glyph index, `None` when the primary font lacks the character
    pub glyph: Option<u32>,
    /// Glyph was replaced by its vertical variant
    pub vertical: bool,
}

impl GlyphLookup {
    pub fn horizontal(glyph: u32) -> Self {
        Self { glyph: Some(glyph), vertical: false }
    }

    pub fn vertical(glyph: u32) -> Self {
        Self { glyph: Some(glyph), vertical: true }
    }

    pub fn missing() -> Self {
        Self::default()
    }
}

/// One segment of a glyph outline, in em units (1.0 = font size)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutlineSegment {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    QuadTo(f32, f32, f32, f32),
    CubicTo(f32, f32, f32, f32, f32, f32),
    Close,
}

/// Data only CID-keyed fonts carry
pub trait CidMetrics {
    /// Map a character code to its CID
    fn cid_from_char_code(&self, char_code: u32) -> u16;

    /// Vertical origin of a CID, in 1/1000 em
    fn vertical_origin(&self, cid: u16) -> (i16, i16);

    /// Six-byte glyph transform stored in the font data, if any
    fn cid_transform(&self, cid: u16) -> Option<[u8; 6]>;
}

/// Font as seen by the text pipeline
///
/// Widths are expressed in 1/1000 em. Fallback fonts are addressed by slot;
/// a slot of `None` always means the primary font.
pub trait TextFont {
    /// Look up the glyph for a character code in the primary font
    fn glyph_from_char_code(&self, char_code: u32) -> GlyphLookup;

    /// Unicode value for a character code, if the font knows one
    fn unicode_from_char_code(&self, _char_code: u32) -> Option<char> {
        None
    }

    /// Font program is embedded in the document
    fn is_embedded(&self) -> bool;

    /// Font dictionary carries explicit character widths
    fn has_font_widths(&self) -> bool;

    /// Nominal width of a character from the font dictionary
    fn char_width(&self, char_code: u32) -> i32;

    /// Width the face actually draws the glyph with
    fn glyph_width(&self, slot: Option<usize>, glyph: u32) -> i32;

    /// Fallback slot able to draw a character the primary font lacks
    fn fallback_slot(&self, _char_code: u32) -> Option<usize> {
        None
    }

    /// Glyph index for a character inside a fallback font
    fn fallback_glyph(&self, _slot: usize, _char_code: u32) -> Option<u32> {
        None
    }

    /// CID data, present only for CID-keyed fonts
    fn cid_metrics(&self) -> Option<&dyn CidMetrics> {
        None
    }

    /// Outline of a glyph in em units
    fn glyph_outline(&self, _slot: Option<usize>, _glyph: u32) -> Option<Vec<OutlineSegment>> {
        None
    }

    /// Text in this font is laid out top to bottom
    ///
    /// A property of the whole font, unlike [`GlyphLookup::vertical`] which
    /// only says that one glyph was substituted by a vertical variant.
    fn is_vert_writing(&self) -> bool {
        false
    }

    /// Font is CID-keyed
    fn is_cid_font(&self) -> bool {
        self.cid_metrics().is_some()
    }
}
