//! Image resources backed by pixels or encoded bytes
//!
//! [`RawImage`] wraps an already decoded bitmap. [`EncodedImage`] holds
//! PNG, JPEG or GIF bytes. Non-interlaced PNGs are streamed row by row with
//! the `png` crate, so a pause indicator can interrupt the decode itself
//! between bands. Other formats are decoded whole by the `image` crate on
//! the first step and only the copy into the working bitmap is banded.

use std::cell::Cell;
use std::io::Cursor;
use std::rc::Rc;

use image::{ImageFormat as ImgFormat, RgbaImage};

use super::source::{ImageDecoder, ImageId, ImageResource, LoadState};
use crate::bitmap::{Dib, DibFormat};
use crate::pause::PauseIndicator;
use crate::{Color, RenderError, Result};

/// Rows copied per decode step
const BAND_ROWS: u32 = 64;

/// Supported encoded formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedFormat {
    Png,
    Jpeg,
    Gif,
}

impl EncodedFormat {
    /// Detect format from magic bytes
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }
        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }
        None
    }

    fn to_image_format(self) -> ImgFormat {
        match self {
            Self::Png => ImgFormat::Png,
            Self::Jpeg => ImgFormat::Jpeg,
            Self::Gif => ImgFormat::Gif,
        }
    }
}

/// Already decoded image, optionally with a soft mask and matte
#[derive(Debug)]
pub struct RawImage {
    id: ImageId,
    bitmap: Rc<Dib>,
    mask: Option<Rc<Dib>>,
    matte: Option<Color>,
    is_mask: bool,
    decoders: Cell<usize>,
}

impl RawImage {
    pub fn new(id: ImageId, bitmap: Dib) -> Self {
        Self {
            id,
            bitmap: Rc::new(bitmap),
            mask: None,
            matte: None,
            is_mask: false,
            decoders: Cell::new(0),
        }
    }

    /// Stencil mask: `coverage` is a Gray8 bitmap painted with the fill color
    pub fn stencil(id: ImageId, coverage: Dib) -> Self {
        Self { is_mask: true, ..Self::new(id, coverage) }
    }

    pub fn with_soft_mask(mut self, mask: Dib) -> Self {
        self.mask = Some(Rc::new(mask));
        self
    }

    pub fn with_matte(mut self, matte: Color) -> Self {
        self.matte = Some(matte);
        self
    }

    /// Number of decoders created so far
    pub fn decode_count(&self) -> usize {
        self.decoders.get()
    }
}

impl ImageResource for RawImage {
    fn id(&self) -> ImageId {
        self.id
    }

    fn width(&self) -> u32 {
        self.bitmap.width()
    }

    fn height(&self) -> u32 {
        self.bitmap.height()
    }

    fn is_mask(&self) -> bool {
        self.is_mask
    }

    fn create_decoder(&self) -> Box<dyn ImageDecoder> {
        self.decoders.set(self.decoders.get() + 1);
        Box::new(RawDecoder {
            source: Rc::clone(&self.bitmap),
            source_mask: self.mask.clone(),
            matte: self.matte,
            bitmap: None,
            mask: None,
        })
    }
}

struct RawDecoder {
    source: Rc<Dib>,
    source_mask: Option<Rc<Dib>>,
    matte: Option<Color>,
    bitmap: Option<Dib>,
    mask: Option<Dib>,
}

impl ImageDecoder for RawDecoder {
    fn start(&mut self) -> LoadState {
        self.bitmap = Some(self.source.working_copy());
        self.mask = self.source_mask.as_ref().map(|m| m.working_copy());
        LoadState::Success
    }

    fn continue_decode(&mut self, _pause: Option<&dyn PauseIndicator>) -> LoadState {
        if self.bitmap.is_some() { LoadState::Success } else { LoadState::Fail }
    }

    fn bitmap(&self) -> Option<&Dib> {
        self.bitmap.as_ref()
    }

    fn mask(&self) -> Option<&Dib> {
        self.mask.as_ref()
    }

    fn take_bitmap(&mut self) -> Option<Dib> {
        self.bitmap.take()
    }

    fn take_mask(&mut self) -> Option<Dib> {
        self.mask.take()
    }

    fn matte_color(&self) -> Option<Color> {
        self.matte
    }
}

/// Encoded image bytes (PNG, JPEG, GIF)
///
/// JPEG, GIF and interlaced PNG pixels are decoded in one blocking call
/// when the decode starts; pauses only take effect between the row bands
/// that follow.
#[derive(Debug)]
pub struct EncodedImage {
    id: ImageId,
    data: Rc<[u8]>,
    format: EncodedFormat,
    width: u32,
    height: u32,
    decoders: Cell<usize>,
}

impl EncodedImage {
    /// Sniff the format and read the dimensions; pixels are decoded later
    pub fn new(id: ImageId, data: Vec<u8>) -> Result<Self> {
        let format = EncodedFormat::from_bytes(&data).ok_or(RenderError::UnsupportedImageFormat)?;
        let (width, height) =
            image::ImageReader::with_format(Cursor::new(&data), format.to_image_format())
                .into_dimensions()
                .map_err(decode_error)?;
        Ok(Self {
            id,
            data: data.into(),
            format,
            width,
            height,
            decoders: Cell::new(0),
        })
    }

    pub fn format(&self) -> EncodedFormat {
        self.format
    }

    /// Number of decoders created so far
    pub fn decode_count(&self) -> usize {
        self.decoders.get()
    }
}

impl ImageResource for EncodedImage {
    fn id(&self) -> ImageId {
        self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn create_decoder(&self) -> Box<dyn ImageDecoder> {
        self.decoders.set(self.decoders.get() + 1);
        Box::new(EncodedDecoder {
            data: Rc::clone(&self.data),
            format: self.format,
            width: self.width,
            height: self.height,
            source: None,
            bitmap: None,
            next_row: 0,
        })
    }
}

/// Where decoded rows come from
enum RowSource {
    /// Rows streamed from a PNG reader
    Png(Box<png::Reader<Cursor<Rc<[u8]>>>>),
    /// Whole image decoded up front
    Decoded(RgbaImage),
}

struct EncodedDecoder {
    data: Rc<[u8]>,
    format: EncodedFormat,
    width: u32,
    height: u32,
    source: Option<RowSource>,
    bitmap: Option<Dib>,
    next_row: u32,
}

fn decode_error(e: impl std::fmt::Display) -> RenderError {
    RenderError::Decode(e.to_string())
}

impl EncodedDecoder {
    fn open_source(&self) -> Result<RowSource> {
        if self.format == EncodedFormat::Png {
            let mut decoder = png::Decoder::new(Cursor::new(Rc::clone(&self.data)));
            decoder
                .set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
            let reader = decoder.read_info().map_err(decode_error)?;
            let info = reader.info();
            if (info.width, info.height) != (self.width, self.height) {
                return Err(RenderError::Decode(format!(
                    "PNG is {}x{}, header said {}x{}",
                    info.width, info.height, self.width, self.height
                )));
            }
            // Adam7 passes do not arrive in row order.
            if !info.interlaced {
                return Ok(RowSource::Png(Box::new(reader)));
            }
        }

        let decoded = image::load(Cursor::new(&self.data[..]), self.format.to_image_format())
            .map_err(decode_error)?
            .into_rgba8();
        if decoded.dimensions() != (self.width, self.height) {
            let (w, h) = decoded.dimensions();
            return Err(RenderError::Decode(format!(
                "image is {w}x{h}, header said {}x{}",
                self.width, self.height
            )));
        }
        Ok(RowSource::Decoded(decoded))
    }

    /// Fill the next band of rows of the working bitmap
    fn read_band(&mut self) -> Result<()> {
        let (Some(source), Some(bitmap)) = (self.source.as_mut(), self.bitmap.as_mut()) else {
            return Err(RenderError::Decode("decoder not started".into()));
        };
        let row_bytes = self.width as usize * 4;
        let end = (self.next_row + BAND_ROWS).min(self.height);
        for y in self.next_row..end {
            match source {
                RowSource::Decoded(pixels) => {
                    let start = y as usize * row_bytes;
                    bitmap.row_mut(y).copy_from_slice(&pixels.as_raw()[start..start + row_bytes]);
                }
                RowSource::Png(reader) => {
                    let (color, _) = reader.output_color_type();
                    let row = reader
                        .next_row()
                        .map_err(decode_error)?
                        .ok_or_else(|| RenderError::Decode(format!("PNG ended at row {y}")))?;
                    if !expand_png_row(color, row.data(), bitmap.row_mut(y)) {
                        return Err(RenderError::Decode(format!("unexpected PNG output {color:?}")));
                    }
                }
            }
        }
        self.next_row = end;
        Ok(())
    }
}

/// Widen one 8-bit PNG row to straight RGBA
fn expand_png_row(color: png::ColorType, src: &[u8], dst: &mut [u8]) -> bool {
    let dst = dst.chunks_exact_mut(4);
    match color {
        png::ColorType::Rgba => {
            dst.zip(src.chunks_exact(4)).for_each(|(d, s)| d.copy_from_slice(s))
        }
        png::ColorType::Rgb => dst
            .zip(src.chunks_exact(3))
            .for_each(|(d, s)| d.copy_from_slice(&[s[0], s[1], s[2], 255])),
        png::ColorType::GrayscaleAlpha => dst
            .zip(src.chunks_exact(2))
            .for_each(|(d, s)| d.copy_from_slice(&[s[0], s[0], s[0], s[1]])),
        png::ColorType::Grayscale => {
            dst.zip(src).for_each(|(d, &g)| d.copy_from_slice(&[g, g, g, 255]))
        }
        // Palettes are expanded by the reader.
        png::ColorType::Indexed => return false,
    }
    true
}

impl ImageDecoder for EncodedDecoder {
    fn start(&mut self) -> LoadState {
        if self.width == 0 || self.height == 0 {
            return LoadState::Fail;
        }
        self.bitmap = Some(Dib::new_working(self.width, self.height, DibFormat::Rgba32));
        self.next_row = 0;
        LoadState::Continue
    }

    fn continue_decode(&mut self, pause: Option<&dyn PauseIndicator>) -> LoadState {
        if self.bitmap.is_none() {
            return LoadState::Fail;
        }
        if self.source.is_none() {
            match self.open_source() {
                Ok(source) => self.source = Some(source),
                Err(e) => {
                    tracing::warn!(error = %e, "image decode failed");
                    return LoadState::Fail;
                }
            }
        }

        loop {
            if let Err(e) = self.read_band() {
                tracing::warn!(error = %e, row = self.next_row, "image decode failed");
                self.source = None;
                return LoadState::Fail;
            }
            if self.next_row >= self.height {
                self.source = None;
                return LoadState::Success;
            }
            if pause.is_some_and(|p| p.need_to_pause_now()) {
                return LoadState::Continue;
            }
        }
    }

    fn bitmap(&self) -> Option<&Dib> {
        self.bitmap.as_ref()
    }

    fn mask(&self) -> Option<&Dib> {
        None
    }

    fn take_bitmap(&mut self) -> Option<Dib> {
        self.bitmap.take()
    }

    fn take_mask(&mut self) -> Option<Dib> {
        None
    }
}
