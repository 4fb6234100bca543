//! Render Configuration

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::object::PageObject;
use crate::Color;

/// Default bound on cached decoded-image bytes per page (100 MiB)
pub const DEFAULT_CACHE_SIZE_LIMIT: usize = 100 * 1024 * 1024;

/// How object colors map to device colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorScheme {
    /// Colors pass through unchanged
    #[default]
    Normal,
    /// Colors collapse to their luminance
    Gray,
    /// Only coverage matters; colors become black
    Alpha,
    /// Fills and strokes use fixed colors (high-contrast modes)
    ForcedColor { fill: Color, stroke: Color },
}

/// Render options, fixed for the lifetime of one render request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Color mapping
    pub color_scheme: ColorScheme,

    /// Sub-pixel text rendering
    pub clear_type: bool,

    /// Sub-pixel order is BGR (only with `clear_type`)
    pub bgr_stripe: bool,

    /// Disable text anti-aliasing
    pub no_text_smooth: bool,

    /// Disable path anti-aliasing
    pub no_path_smooth: bool,

    /// Disable image smoothing (nearest-neighbour sampling)
    pub no_image_smooth: bool,

    /// Anti-alias axis-aligned rectangles even when path smoothing is off
    pub rect_aa: bool,

    /// Suspend around image masks on print-class devices
    pub break_for_masks: bool,

    /// Run cache optimization after every drawn image
    pub limited_image_cache: bool,

    /// Print text as graphics
    pub print_graphic_text: bool,

    /// Print text as images
    pub print_image_text: bool,

    /// Never use device-native text output
    pub no_native_text: bool,

    /// Upper bound for cached image bytes when `limited_image_cache` is set
    pub cache_size_limit: usize,

    /// Optional-content groups whose objects are not rendered
    pub hidden_content_groups: BTreeSet<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            color_scheme: ColorScheme::Normal,
            clear_type: false,
            bgr_stripe: false,
            no_text_smooth: false,
            no_path_smooth: false,
            no_image_smooth: false,
            rect_aa: false,
            break_for_masks: false,
            limited_image_cache: false,
            print_graphic_text: false,
            print_image_text: false,
            no_native_text: false,
            cache_size_limit: DEFAULT_CACHE_SIZE_LIMIT,
            hidden_content_groups: BTreeSet::new(),
        }
    }
}

impl RenderOptions {
    pub fn with_color_scheme(mut self, scheme: ColorScheme) -> Self {
        self.color_scheme = scheme;
        self
    }

    /// Enable limited-image-cache mode with the given byte limit
    pub fn with_limited_image_cache(mut self, limit: usize) -> Self {
        self.limited_image_cache = true;
        self.cache_size_limit = limit;
        self
    }

    pub fn with_break_for_masks(mut self, enabled: bool) -> Self {
        self.break_for_masks = enabled;
        self
    }

    /// Hide every object tagged with `group`
    pub fn hide_content_group(mut self, group: impl Into<String>) -> Self {
        self.hidden_content_groups.insert(group.into());
        self
    }

    /// Optional-content visibility check
    pub fn is_object_visible(&self, object: &PageObject) -> bool {
        match &object.content_group {
            Some(group) => !self.hidden_content_groups.contains(group),
            None => true,
        }
    }

    /// Map an object color through the color scheme
    pub fn translate_color(&self, color: Color, is_stroke: bool) -> Color {
        match self.color_scheme {
            ColorScheme::Normal => color,
            ColorScheme::Gray => {
                let v = color.luminance();
                Color::rgba(v, v, v, color.a)
            }
            ColorScheme::Alpha => Color::rgba(0, 0, 0, color.a),
            ColorScheme::ForcedColor { fill, stroke } => {
                let forced = if is_stroke { stroke } else { fill };
                Color { a: color.a, ..forced }
            }
        }
    }

    /// Path anti-aliasing for a path, honouring the rectangle exception
    pub fn anti_alias_path(&self, is_rect: bool) -> bool {
        !self.no_path_smooth || (is_rect && self.rect_aa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::object::{ObjectKind, PathObject};
    use crate::path::Path;

    #[test]
    fn test_default_cache_limit() {
        let options = RenderOptions::default();
        assert_eq!(options.cache_size_limit, 104_857_600);
        assert!(!options.limited_image_cache);
    }

    #[test]
    fn test_hidden_content_group() {
        let options = RenderOptions::default().hide_content_group("watermark");
        let path = Path::rect(&Rect::new(0.0, 0.0, 1.0, 1.0));
        let mut object = PageObject::new(ObjectKind::Path(PathObject::filled(path)));
        assert!(options.is_object_visible(&object));

        object.content_group = Some("watermark".to_string());
        assert!(!options.is_object_visible(&object));
    }

    #[test]
    fn test_gray_scheme() {
        let options = RenderOptions::default().with_color_scheme(ColorScheme::Gray);
        let c = options.translate_color(Color::rgba(255, 0, 0, 128), false);
        assert_eq!(c, Color::rgba(76, 76, 76, 128));
    }

    #[test]
    fn test_forced_colors() {
        let scheme = ColorScheme::ForcedColor { fill: Color::WHITE, stroke: Color::BLACK };
        let options = RenderOptions::default().with_color_scheme(scheme);
        assert_eq!(options.translate_color(Color::rgb(1, 2, 3), false), Color::WHITE);
        assert_eq!(options.translate_color(Color::rgb(1, 2, 3), true), Color::BLACK);
    }

    #[test]
    fn test_rect_aa_exception() {
        let options = RenderOptions { no_path_smooth: true, rect_aa: true, ..Default::default() };
        assert!(options.anti_alias_path(true));
        assert!(!options.anti_alias_path(false));
    }
}
