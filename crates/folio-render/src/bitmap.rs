//! Device-independent bitmaps
//!
//! Decoders write into *working* bitmaps whose stride is rounded up to a
//! power-of-two bucket so buffers can be grown in place. Settled cache copies
//! are *realized*: compact, with `stride == width * bytes_per_pixel`.

use crate::Color;

/// Pixel layout of a [`Dib`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DibFormat {
    /// Straight (non-premultiplied) RGBA, 4 bytes per pixel
    Rgba32,
    /// Single coverage/gray channel, used for masks
    Gray8,
    /// Palette index, 1 byte per pixel
    Indexed8,
}

impl DibFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            DibFormat::Rgba32 => 4,
            DibFormat::Gray8 | DibFormat::Indexed8 => 1,
        }
    }
}

fn next_power_of_2(n: u32) -> u32 {
    if n == 0 { return 1; }
    let mut v = n - 1;
    v |= v >> 1;
    v |= v >> 2;
    v |= v >> 4;
    v |= v >> 8;
    v |= v >> 16;
    v + 1
}

/// In-memory raster with explicit stride and optional palette
#[derive(Debug, Clone, PartialEq)]
pub struct Dib {
    width: u32,
    height: u32,
    /// Bytes per row, at least `width * bytes_per_pixel`
    stride: usize,
    format: DibFormat,
    palette: Vec<Color>,
    data: Vec<u8>,
}

impl Dib {
    /// Compact zeroed bitmap
    pub fn new(width: u32, height: u32, format: DibFormat) -> Self {
        let stride = width as usize * format.bytes_per_pixel();
        Self::with_stride(width, height, stride, format)
    }

    /// Zeroed bitmap with the row width rounded up to a power-of-two bucket
    pub fn new_working(width: u32, height: u32, format: DibFormat) -> Self {
        let stride = next_power_of_2(width.max(64)) as usize * format.bytes_per_pixel();
        Self::with_stride(width, height, stride, format)
    }

    fn with_stride(width: u32, height: u32, stride: usize, format: DibFormat) -> Self {
        Self {
            width,
            height,
            stride,
            format,
            palette: Vec::new(),
            data: vec![0; stride * height as usize],
        }
    }

    /// Wrap compact RGBA data, `None` if the length does not match
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        Self::from_compact(width, height, DibFormat::Rgba32, data)
    }

    /// Wrap compact gray/coverage data, `None` if the length does not match
    pub fn from_gray(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        Self::from_compact(width, height, DibFormat::Gray8, data)
    }

    /// Wrap palette indices, `None` if the length does not match
    pub fn from_indexed(
        width: u32,
        height: u32,
        data: Vec<u8>,
        palette: Vec<Color>,
    ) -> Option<Self> {
        let mut dib = Self::from_compact(width, height, DibFormat::Indexed8, data)?;
        dib.palette = palette;
        Some(dib)
    }

    fn from_compact(width: u32, height: u32, format: DibFormat, data: Vec<u8>) -> Option<Self> {
        let stride = width as usize * format.bytes_per_pixel();
        if data.len() != stride * height as usize {
            return None;
        }
        Some(Self { width, height, stride, format, palette: Vec::new(), data })
    }

    /// Solid RGBA bitmap
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        let mut dib = Self::new(width, height, DibFormat::Rgba32);
        for px in dib.data.chunks_exact_mut(4) {
            px.copy_from_slice(&[color.r, color.g, color.b, color.a]);
        }
        dib
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> DibFormat {
        self.format
    }

    pub fn palette(&self) -> &[Color] {
        &self.palette
    }

    /// Stride equals the packed row width
    pub fn is_compact(&self) -> bool {
        self.stride == self.row_bytes()
    }

    fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Pixel bytes of row `y`, without padding
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.row_bytes()]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let len = self.row_bytes();
        &mut self.data[start..start + len]
    }

    /// Byte cost used for cache accounting
    pub fn estimated_size(&self) -> usize {
        self.stride * self.height as usize + self.palette.len() * 4
    }

    /// Pixel as straight RGBA
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let row = self.row(y);
        Some(match self.format {
            DibFormat::Rgba32 => {
                let i = x as usize * 4;
                Color::rgba(row[i], row[i + 1], row[i + 2], row[i + 3])
            }
            DibFormat::Gray8 => {
                let v = row[x as usize];
                Color::rgb(v, v, v)
            }
            DibFormat::Indexed8 => self
                .palette
                .get(row[x as usize] as usize)
                .copied()
                .unwrap_or(Color::TRANSPARENT),
        })
    }

    /// Coverage value for masks (gray channel, or alpha for RGBA)
    fn coverage(&self, x: u32, y: u32) -> u8 {
        match self.format {
            DibFormat::Gray8 => self.row(y)[x as usize],
            _ => self.pixel(x, y).map(|c| c.a).unwrap_or(0),
        }
    }

    /// Compact copy of this bitmap
    pub fn realize(&self) -> Dib {
        let mut out = Dib::new(self.width, self.height, self.format);
        out.palette = self.palette.clone();
        for y in 0..self.height {
            out.row_mut(y).copy_from_slice(self.row(y));
        }
        out
    }

    /// Padded working copy, as a decoder would produce it
    pub fn working_copy(&self) -> Dib {
        let mut out = Dib::new_working(self.width, self.height, self.format);
        out.palette = self.palette.clone();
        for y in 0..self.height {
            out.row_mut(y).copy_from_slice(self.row(y));
        }
        out
    }

    /// Expand to compact RGBA
    pub fn to_rgba(&self) -> Dib {
        if self.format == DibFormat::Rgba32 {
            return self.realize();
        }
        let mut out = Dib::new(self.width, self.height, DibFormat::Rgba32);
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.pixel(x, y).unwrap_or(Color::TRANSPARENT);
                let i = x as usize * 4;
                out.row_mut(y)[i..i + 4].copy_from_slice(&[c.r, c.g, c.b, c.a]);
            }
        }
        out
    }

    /// Apply a soft mask to alpha, un-premultiplying against `matte` first.
    ///
    /// A mask of a different size is sampled nearest-neighbour.
    pub fn with_mask(&self, mask: &Dib, matte: Option<Color>) -> Dib {
        let mut out = self.to_rgba();
        if mask.width == 0 || mask.height == 0 {
            return out;
        }
        for y in 0..out.height {
            let my = (u64::from(y) * u64::from(mask.height) / u64::from(out.height.max(1))) as u32;
            for x in 0..out.width {
                let mx =
                    (u64::from(x) * u64::from(mask.width) / u64::from(out.width.max(1))) as u32;
                let coverage = mask.coverage(mx, my);
                let i = x as usize * 4;
                let px = &mut out.row_mut(y)[i..i + 4];
                if let Some(matte) = matte {
                    for (channel, m) in px[..3].iter_mut().zip([matte.r, matte.g, matte.b]) {
                        *channel = unmatte(*channel, m, coverage);
                    }
                }
                px[3] = mul_div_255(px[3], coverage);
            }
        }
        out
    }

    /// Colorize a stencil mask: coverage becomes alpha of `color`
    pub fn stencil(mask: &Dib, color: Color) -> Dib {
        let mut out = Dib::new(mask.width, mask.height, DibFormat::Rgba32);
        for y in 0..mask.height {
            for x in 0..mask.width {
                let a = mul_div_255(color.a, mask.coverage(x, y));
                let i = x as usize * 4;
                out.row_mut(y)[i..i + 4].copy_from_slice(&[color.r, color.g, color.b, a]);
            }
        }
        out
    }

    /// Premultiplied tiny-skia pixmap, `None` for empty bitmaps
    pub fn to_pixmap(&self) -> Option<tiny_skia::Pixmap> {
        let rgba = self.to_rgba();
        let mut data = Vec::with_capacity(rgba.data.len());
        for px in rgba.data.chunks_exact(4) {
            let a = px[3];
            data.extend_from_slice(&[
                mul_div_255(px[0], a),
                mul_div_255(px[1], a),
                mul_div_255(px[2], a),
                a,
            ]);
        }
        let size = tiny_skia::IntSize::from_wh(self.width, self.height)?;
        tiny_skia::Pixmap::from_vec(data, size)
    }

    /// Straight RGBA copy of a pixmap
    pub fn from_pixmap(pixmap: &tiny_skia::Pixmap) -> Dib {
        let mut out = Dib::new(pixmap.width(), pixmap.height(), DibFormat::Rgba32);
        for (dst, src) in out.data.chunks_exact_mut(4).zip(pixmap.pixels()) {
            let c = src.demultiply();
            dst.copy_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }
}

fn mul_div_255(a: u8, b: u8) -> u8 {
    ((u16::from(a) * u16::from(b) + 127) / 255) as u8
}

/// Undo blending of `c` against matte color `m` at coverage `alpha`
fn unmatte(c: u8, m: u8, alpha: u8) -> u8 {
    if alpha == 0 {
        return 0;
    }
    let v = i32::from(m) + (i32::from(c) - i32::from(m)) * 255 / i32::from(alpha);
    v.clamp(0, 255) as u8
}
