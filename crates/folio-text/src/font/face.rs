//! TrueType/OpenType font backed by ttf-parser
//!
//! Character codes are interpreted as Unicode scalar values, which covers
//! simple fonts with a standard encoding and the common fallback case.

use ttf_parser::{Face, GlyphId, OutlineBuilder};

use super::{GlyphLookup, OutlineSegment, TextFont};
use crate::{Result, TextError};

/// Explicit widths taken from a font dictionary
#[derive(Debug, Clone)]
struct Widths {
    first_char: u32,
    widths: Vec<i32>,
}

/// Parsed font face with optional fallback faces
pub struct FaceFont<'a> {
    /// The underlying ttf-parser face
    face: Face<'a>,
    /// Faces consulted when the primary face lacks a character
    fallbacks: Vec<Face<'a>>,
    /// Widths from the font dictionary
    widths: Option<Widths>,
    embedded: bool,
}

impl<'a> FaceFont<'a> {
    /// Parse a font face from data
    pub fn parse(data: &'a [u8], index: u32) -> Result<Self> {
        let face = Face::parse(data, index).map_err(|e| TextError::FontParsing(e.to_string()))?;
        Ok(Self { face, fallbacks: Vec::new(), widths: None, embedded: true })
    }

    /// Mark the face as a system substitute rather than an embedded program
    pub fn substituted(mut self) -> Self {
        self.embedded = false;
        self
    }

    /// Attach the dictionary widths for codes `first_char..`
    pub fn with_widths(mut self, first_char: u32, widths: Vec<i32>) -> Self {
        self.widths = Some(Widths { first_char, widths });
        self
    }

    /// Append a fallback face; its slot is the number of fallbacks before it
    pub fn with_fallback(mut self, data: &'a [u8], index: u32) -> Result<Self> {
        let face = Face::parse(data, index).map_err(|e| TextError::FontParsing(e.to_string()))?;
        self.fallbacks.push(face);
        Ok(self)
    }

    /// Number of fallback faces
    pub fn fallback_count(&self) -> usize {
        self.fallbacks.len()
    }

    fn face_for(&self, slot: Option<usize>) -> Option<&Face<'a>> {
        match slot {
            None => Some(&self.face),
            Some(slot) => self.fallbacks.get(slot),
        }
    }
}

fn glyph_in(face: &Face<'_>, char_code: u32) -> Option<u32> {
    char::from_u32(char_code)
        .and_then(|c| face.glyph_index(c))
        .map(|g| u32::from(g.0))
}

impl TextFont for FaceFont<'_> {
    fn glyph_from_char_code(&self, char_code: u32) -> GlyphLookup {
        match glyph_in(&self.face, char_code) {
            Some(glyph) => GlyphLookup::horizontal(glyph),
            None => GlyphLookup::missing(),
        }
    }

    fn unicode_from_char_code(&self, char_code: u32) -> Option<char> {
        char::from_u32(char_code)
    }

    fn is_embedded(&self) -> bool {
        self.embedded
    }

    fn has_font_widths(&self) -> bool {
        self.widths.is_some()
    }

    fn char_width(&self, char_code: u32) -> i32 {
        let Some(widths) = &self.widths else {
            return 0;
        };
        char_code
            .checked_sub(widths.first_char)
            .and_then(|i| widths.widths.get(i as usize))
            .copied()
            .unwrap_or(0)
    }

    fn glyph_width(&self, slot: Option<usize>, glyph: u32) -> i32 {
        let Some(face) = self.face_for(slot) else {
            return 0;
        };
        let Ok(glyph) = u16::try_from(glyph) else {
            return 0;
        };
        let units = i32::from(face.units_per_em().max(1));
        face.glyph_hor_advance(GlyphId(glyph))
            .map(|advance| i32::from(advance) * 1000 / units)
            .unwrap_or(0)
    }

    fn fallback_slot(&self, char_code: u32) -> Option<usize> {
        self.fallbacks
            .iter()
            .position(|face| glyph_in(face, char_code).is_some())
    }

    fn fallback_glyph(&self, slot: usize, char_code: u32) -> Option<u32> {
        self.fallbacks.get(slot).and_then(|face| glyph_in(face, char_code))
    }

    fn glyph_outline(&self, slot: Option<usize>, glyph: u32) -> Option<Vec<OutlineSegment>> {
        let face = self.face_for(slot)?;
        let glyph = u16::try_from(glyph).ok()?;
        let mut builder = SegmentBuilder {
            scale: 1.0 / f32::from(face.units_per_em().max(1)),
            segments: Vec::new(),
        };
        face.outline_glyph(GlyphId(glyph), &mut builder)?;
        Some(builder.segments)
    }
}

/// Collects ttf-parser outline callbacks into em-space segments
struct SegmentBuilder {
    scale: f32,
    segments: Vec<OutlineSegment>,
}

impl OutlineBuilder for SegmentBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let s = self.scale;
        self.segments.push(OutlineSegment::MoveTo(x * s, y * s));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let s = self.scale;
        self.segments.push(OutlineSegment::LineTo(x * s, y * s));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let s = self.scale;
        self.segments.push(OutlineSegment::QuadTo(x1 * s, y1 * s, x * s, y * s));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let s = self.scale;
        self.segments
            .push(OutlineSegment::CubicTo(x1 * s, y1 * s, x2 * s, y2 * s, x * s, y * s));
    }

    fn close(&mut self) {
        self.segments.push(OutlineSegment::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_garbage() {
        let data = [0u8; 16];
        assert!(matches!(FaceFont::parse(&data, 0), Err(TextError::FontParsing(_))));
    }

    #[test]
    fn test_segment_builder_scales_to_em() {
        let mut builder = SegmentBuilder { scale: 0.5, segments: Vec::new() };
        builder.move_to(2.0, 4.0);
        builder.line_to(6.0, 8.0);
        builder.close();
        assert_eq!(
            builder.segments,
            vec![
                OutlineSegment::MoveTo(1.0, 2.0),
                OutlineSegment::LineTo(3.0, 4.0),
                OutlineSegment::Close,
            ]
        );
    }
}
