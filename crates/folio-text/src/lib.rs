//! Folio Text - Glyph Positioning
//!
//! This crate provides the text side of the folio page renderer:
//! - Font access behind the [`TextFont`] trait (glyph lookup, widths, fallbacks, CID data)
//! - A ttf-parser backed font ([`FaceFont`])
//! - Per-glyph position assembly for shown strings ([`CharPosList`])

pub mod char_pos;
pub mod font;

pub use char_pos::{CharPos, CharPosList};
pub use font::{CidMetrics, FaceFont, GlyphLookup, OutlineSegment, TextFont};

/// Text error types
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    #[error("Failed to parse font: {0}")]
    FontParsing(String),
}

pub type Result<T> = std::result::Result<T, TextError>;
