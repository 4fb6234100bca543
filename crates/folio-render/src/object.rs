//! Page Objects
//!
//! The renderer borrows page objects from an object holder (the content
//! parser's output) and never mutates them. Each object carries its bounding
//! box in layer space, an optional clip path and its graphics state.

use std::fmt;
use std::rc::Rc;

use folio_text::TextFont;

use crate::geometry::{Matrix, Rect};
use crate::image::ImageResource;
use crate::path::{ClipPath, FillRule, Path};
use crate::pause::PauseIndicator;
use crate::Color;

/// Separable and non-separable blend modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    pub fn to_skia(self) -> tiny_skia::BlendMode {
        use tiny_skia::BlendMode as Sk;
        match self {
            BlendMode::Normal => Sk::SourceOver,
            BlendMode::Multiply => Sk::Multiply,
            BlendMode::Screen => Sk::Screen,
            BlendMode::Overlay => Sk::Overlay,
            BlendMode::Darken => Sk::Darken,
            BlendMode::Lighten => Sk::Lighten,
            BlendMode::ColorDodge => Sk::ColorDodge,
            BlendMode::ColorBurn => Sk::ColorBurn,
            BlendMode::HardLight => Sk::HardLight,
            BlendMode::SoftLight => Sk::SoftLight,
            BlendMode::Difference => Sk::Difference,
            BlendMode::Exclusion => Sk::Exclusion,
            BlendMode::Hue => Sk::Hue,
            BlendMode::Saturation => Sk::Saturation,
            BlendMode::Color => Sk::Color,
            BlendMode::Luminosity => Sk::Luminosity,
        }
    }
}

/// Draw-time state of an object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphicsState {
    pub fill_color: Color,
    pub stroke_color: Color,
    /// Constant fill alpha (0.0..=1.0), also the group alpha of forms
    pub fill_alpha: f32,
    pub stroke_alpha: f32,
    pub line_width: f32,
    pub blend: BlendMode,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            fill_color: Color::BLACK,
            stroke_color: Color::BLACK,
            fill_alpha: 1.0,
            stroke_alpha: 1.0,
            line_width: 1.0,
            blend: BlendMode::Normal,
        }
    }
}

/// Transparency group descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transparency {
    /// Content forms a transparency group
    pub group: bool,
    /// Group composites against a transparent backdrop
    pub isolated: bool,
    /// Elements of the group do not composite with each other
    pub knockout: bool,
}

impl Transparency {
    pub fn isolated_group() -> Self {
        Self { group: true, isolated: true, knockout: false }
    }

    pub fn non_isolated_group() -> Self {
        Self { group: true, isolated: false, knockout: false }
    }
}

/// Vector path, filled and/or stroked
#[derive(Debug, Clone, PartialEq)]
pub struct PathObject {
    pub path: Path,
    /// Object space to layer space
    pub matrix: Matrix,
    pub fill: Option<FillRule>,
    pub stroke: bool,
    /// Path is an axis-aligned rectangle
    pub is_rect: bool,
}

impl PathObject {
    pub fn filled(path: Path) -> Self {
        Self {
            path,
            matrix: Matrix::identity(),
            fill: Some(FillRule::NonZero),
            stroke: false,
            is_rect: false,
        }
    }

    pub fn stroked(path: Path) -> Self {
        Self { path, matrix: Matrix::identity(), fill: None, stroke: true, is_rect: false }
    }

    /// Filled rectangle
    pub fn rect(rect: &Rect) -> Self {
        Self { is_rect: true, ..Self::filled(Path::rect(rect)) }
    }

    pub fn with_matrix(mut self, matrix: Matrix) -> Self {
        self.matrix = matrix;
        self
    }
}

/// Image placed by a matrix mapping the unit square to layer space
#[derive(Clone)]
pub struct ImageObject {
    pub image: Rc<dyn ImageResource>,
    pub matrix: Matrix,
}

impl ImageObject {
    pub fn new(image: Rc<dyn ImageResource>, matrix: Matrix) -> Self {
        Self { image, matrix }
    }
}

impl fmt::Debug for ImageObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageObject")
            .field("image", &self.image.id())
            .field("matrix", &self.matrix)
            .finish()
    }
}

/// Text render mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextRenderMode {
    #[default]
    Fill,
    Stroke,
    FillStroke,
    Invisible,
    /// Only contributes to clipping, never painted
    Clip,
}

/// A shown string
#[derive(Clone)]
pub struct TextObject {
    pub font: Rc<dyn TextFont>,
    pub font_size: f32,
    pub char_codes: Vec<u32>,
    /// Cumulative offsets, `char_positions[i - 1]` for character `i`
    pub char_positions: Vec<f32>,
    /// Text space to layer space; the baseline origin is (0, 0)
    pub matrix: Matrix,
    pub mode: TextRenderMode,
}

impl TextObject {
    pub fn new(
        font: Rc<dyn TextFont>,
        font_size: f32,
        char_codes: Vec<u32>,
        char_positions: Vec<f32>,
    ) -> Self {
        Self {
            font,
            font_size,
            char_codes,
            char_positions,
            matrix: Matrix::identity(),
            mode: TextRenderMode::Fill,
        }
    }

    pub fn with_matrix(mut self, matrix: Matrix) -> Self {
        self.matrix = matrix;
        self
    }

    pub fn with_mode(mut self, mode: TextRenderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Text space extent: baseline at y = 0, glyphs rise towards negative y
    fn text_bounds(&self) -> Rect {
        let advance = self.char_positions.last().copied().unwrap_or(0.0);
        Rect::new(0.0, -self.font_size, advance + self.font_size, self.font_size * 0.25)
    }
}

impl fmt::Debug for TextObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextObject")
            .field("font_size", &self.font_size)
            .field("char_codes", &self.char_codes)
            .field("matrix", &self.matrix)
            .field("mode", &self.mode)
            .finish()
    }
}

/// Shading geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShadingKind {
    Axial { start: (f32, f32), end: (f32, f32) },
    Radial { center: (f32, f32), radius: f32 },
}

/// Smooth shading: geometry plus color stops at offsets 0.0..=1.0
#[derive(Debug, Clone, PartialEq)]
pub struct Shading {
    pub kind: ShadingKind,
    pub stops: Vec<(f32, Color)>,
}

impl Shading {
    pub fn axial(start: (f32, f32), end: (f32, f32), stops: Vec<(f32, Color)>) -> Self {
        Self { kind: ShadingKind::Axial { start, end }, stops }
    }

    pub fn radial(center: (f32, f32), radius: f32, stops: Vec<(f32, Color)>) -> Self {
        Self { kind: ShadingKind::Radial { center, radius }, stops }
    }
}

/// Shading painted over an area
#[derive(Debug, Clone, PartialEq)]
pub struct ShadingObject {
    pub shading: Shading,
    /// Painted area in shading space
    pub area: Rect,
    /// Shading space to layer space
    pub matrix: Matrix,
}

/// Nested content stream (form XObject), optionally a transparency group
#[derive(Debug, Clone)]
pub struct FormObject {
    pub objects: ObjectList,
    /// Form space to layer space
    pub matrix: Matrix,
    pub group: Option<Transparency>,
}

impl FormObject {
    pub fn new(objects: ObjectList, matrix: Matrix) -> Self {
        Self { objects, matrix, group: None }
    }

    pub fn with_group(mut self, group: Transparency) -> Self {
        self.group = Some(group);
        self
    }
}

/// Page object variants
#[derive(Debug, Clone)]
pub enum ObjectKind {
    Path(PathObject),
    Image(ImageObject),
    Text(TextObject),
    Shading(ShadingObject),
    Form(FormObject),
}

/// One page object
#[derive(Debug, Clone)]
pub struct PageObject {
    /// Bounding box in layer space
    pub bbox: Rect,
    pub clip: Option<ClipPath>,
    pub state: GraphicsState,
    /// Optional-content group the object belongs to
    pub content_group: Option<String>,
    pub kind: ObjectKind,
}

impl PageObject {
    /// Object with its bounding box computed from its geometry
    pub fn new(kind: ObjectKind) -> Self {
        let bbox = match &kind {
            ObjectKind::Path(p) => p.matrix.transform_rect(&p.path.bounds()),
            ObjectKind::Image(i) => i.matrix.transform_rect(&Rect::new(0.0, 0.0, 1.0, 1.0)),
            ObjectKind::Text(t) => t.matrix.transform_rect(&t.text_bounds()),
            ObjectKind::Shading(s) => s.matrix.transform_rect(&s.area),
            ObjectKind::Form(f) => f.matrix.transform_rect(&f.objects.bounds()),
        };
        Self {
            bbox,
            clip: None,
            state: GraphicsState::default(),
            content_group: None,
            kind,
        }
    }

    pub fn with_bbox(mut self, bbox: Rect) -> Self {
        self.bbox = bbox;
        self
    }

    pub fn with_clip(mut self, clip: ClipPath) -> Self {
        self.clip = Some(clip);
        self
    }

    pub fn with_state(mut self, state: GraphicsState) -> Self {
        self.state = state;
        self
    }

    pub fn with_fill_color(mut self, color: Color) -> Self {
        self.state.fill_color = color;
        self
    }

    pub fn with_content_group(mut self, group: impl Into<String>) -> Self {
        self.content_group = Some(group.into());
        self
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, ObjectKind::Image(_))
    }

    /// Image object whose resource is a stencil mask
    pub fn is_image_mask(&self) -> bool {
        matches!(&self.kind, ObjectKind::Image(i) if i.image.is_mask())
    }

    /// Forms and shadings end the current step batch
    pub fn is_expensive(&self) -> bool {
        matches!(self.kind, ObjectKind::Form(_) | ObjectKind::Shading(_))
    }
}

/// Parse progress of an object holder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseState {
    #[default]
    NotParsed,
    Parsing,
    Parsed,
}

/// Owner of a page object list (page, form or annotation appearance)
///
/// Holders may fill their list incrementally; the progressive renderer
/// calls `continue_parse` when it runs out of objects before the holder is
/// `Parsed`.
pub trait PageObjectHolder {
    /// Objects parsed so far, in paint order
    fn objects(&self) -> &[PageObject];

    fn parse_state(&self) -> ParseState;

    /// Parse more content, honouring `pause`
    fn continue_parse(&mut self, pause: Option<&dyn PauseIndicator>);

    /// Group attributes of the holder's content
    fn transparency(&self) -> Transparency {
        Transparency::default()
    }
}

/// Fully parsed object list
#[derive(Debug, Clone, Default)]
pub struct ObjectList {
    objects: Vec<PageObject>,
    transparency: Transparency,
}

impl ObjectList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transparency(mut self, transparency: Transparency) -> Self {
        self.transparency = transparency;
        self
    }

    pub fn push(&mut self, object: PageObject) {
        self.objects.push(object);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PageObject> {
        self.objects.iter()
    }

    /// Union of all object boxes
    pub fn bounds(&self) -> Rect {
        self.objects
            .iter()
            .map(|o| o.bbox)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default()
    }
}

impl FromIterator<PageObject> for ObjectList {
    fn from_iter<I: IntoIterator<Item = PageObject>>(iter: I) -> Self {
        Self { objects: iter.into_iter().collect(), transparency: Transparency::default() }
    }
}

impl PageObjectHolder for ObjectList {
    fn objects(&self) -> &[PageObject] {
        &self.objects
    }

    fn parse_state(&self) -> ParseState {
        ParseState::Parsed
    }

    fn continue_parse(&mut self, _pause: Option<&dyn PauseIndicator>) {}

    fn transparency(&self) -> Transparency {
        self.transparency
    }
}
