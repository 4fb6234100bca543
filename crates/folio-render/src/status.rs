//! Render Status
//!
//! One render session over an object list: the active matrix, the clip memo,
//! transparency nesting and the in-flight image of a suspended object.
//! Nested forms and transparency groups render through child statuses.

use crate::bitmap::Dib;
use crate::context::RenderContext;
use crate::device::{PathPaint, PixmapDevice, RenderDevice};
use crate::geometry::{IntRect, Matrix};
use crate::image::{ImageDecoder, LoadState};
use crate::object::{
    BlendMode, FormObject, GraphicsState, ImageObject, ObjectKind, PageObject, PageObjectHolder,
    PathObject, ShadingObject, TextObject, TextRenderMode, Transparency,
};
use crate::options::RenderOptions;
use crate::path::ClipPath;
use crate::pause::PauseIndicator;
use crate::text::TextRenderer;
use crate::Color;

/// Deepest form nesting rendered
pub const MAX_RECURSION_DEPTH: usize = 64;

/// Image load suspended between `continue_single_object` calls
enum ImageLoad {
    /// Pending lookup in the context's page cache
    Cached,
    /// Uncached decode
    Direct(Box<dyn ImageDecoder>),
}

/// Render session over one object list
pub struct RenderStatus<'r, 'a> {
    context: &'r RenderContext<'a>,
    options: &'r RenderOptions,
    /// Object space to device space
    matrix: Matrix,
    level: usize,
    transparency: Transparency,
    /// Inside an isolated group; backdrops are never fetched
    in_group: bool,
    stop_object: Option<&'r PageObject>,
    stopped: bool,
    last_clip: Option<ClipPath>,
    image_load: Option<ImageLoad>,
}

impl<'r, 'a> RenderStatus<'r, 'a> {
    pub fn new(context: &'r RenderContext<'a>, options: &'r RenderOptions, matrix: Matrix) -> Self {
        Self {
            context,
            options,
            matrix,
            level: 0,
            transparency: Transparency::default(),
            in_group: false,
            stop_object: None,
            stopped: false,
            last_clip: None,
            image_load: None,
        }
    }

    /// Group attributes of the rendered content
    pub fn with_transparency(mut self, transparency: Transparency) -> Self {
        self.in_group = self.in_group || (transparency.group && transparency.isolated);
        self.transparency = transparency;
        self
    }

    /// Stop before `object` is reached
    pub fn with_stop_object(mut self, object: Option<&'r PageObject>) -> Self {
        self.stop_object = object;
        self
    }

    fn child(&self, matrix: Matrix) -> RenderStatus<'r, 'a> {
        RenderStatus {
            context: self.context,
            options: self.options,
            matrix,
            level: self.level + 1,
            transparency: Transparency::default(),
            in_group: self.in_group,
            stop_object: self.stop_object,
            stopped: false,
            last_clip: None,
            image_load: None,
        }
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn options(&self) -> &RenderOptions {
        self.options
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn transparency(&self) -> Transparency {
        self.transparency
    }

    /// The stop object was reached
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn is_stop_object(&self, object: &PageObject) -> bool {
        self.stop_object.is_some_and(|stop| std::ptr::eq(stop, object))
    }

    /// Render a whole object list without pausing
    pub fn render_object_list(&mut self, device: &mut dyn RenderDevice, objects: &[PageObject]) {
        if self.level > MAX_RECURSION_DEPTH {
            tracing::warn!(level = self.level, "render recursion too deep");
            return;
        }
        let clip_rect = self.matrix.inverse().map(|inv| inv.transform_rect(&device.clip_box()));
        for object in objects {
            if self.is_stop_object(object) {
                self.stopped = true;
                return;
            }
            if clip_rect.is_some_and(|clip| !object.bbox.intersects(&clip)) {
                continue;
            }
            self.render_single_object(device, object);
            if self.stopped {
                return;
            }
        }
    }

    /// Render one object to completion
    pub fn render_single_object(&mut self, device: &mut dyn RenderDevice, object: &PageObject) {
        if self.is_stop_object(object) {
            self.stopped = true;
            return;
        }
        if !self.options.is_object_visible(object) {
            return;
        }
        self.process_clip_path(device, object.clip.as_ref());
        if self.process_transparency(device, object) {
            return;
        }
        self.process_object_no_clip(device, object);
    }

    /// Resumable single-object draw.
    ///
    /// Returns `true` while the object is still being worked on (an image
    /// decode was suspended); call again with the same object to resume.
    pub fn continue_single_object(
        &mut self,
        device: &mut dyn RenderDevice,
        object: &PageObject,
        pause: Option<&dyn PauseIndicator>,
    ) -> bool {
        if self.image_load.is_some() {
            let ObjectKind::Image(image) = &object.kind else {
                self.image_load = None;
                return false;
            };
            let state = match self.image_load.as_mut() {
                Some(ImageLoad::Cached) => match self.context.page_cache() {
                    Some(cache) => cache.borrow_mut().continue_get_cached_bitmap(pause),
                    None => LoadState::Fail,
                },
                Some(ImageLoad::Direct(decoder)) => decoder.continue_decode(pause),
                None => LoadState::Fail,
            };
            if state == LoadState::Continue {
                return true;
            }
            if let Some(load) = self.image_load.take() {
                self.finish_image(device, object, image, load, state);
            }
            return false;
        }

        if !self.options.is_object_visible(object) {
            return false;
        }
        self.process_clip_path(device, object.clip.as_ref());
        if self.process_transparency(device, object) {
            return false;
        }
        if let ObjectKind::Image(image) = &object.kind {
            let (load, state) = self.start_image(image);
            if state == LoadState::Continue {
                self.image_load = Some(load);
                return true;
            }
            self.finish_image(device, object, image, load, state);
            return false;
        }
        self.process_object_no_clip(device, object);
        false
    }

    /// Apply an object's clip, skipping the device when it repeats the last one
    pub fn process_clip_path(&mut self, device: &mut dyn RenderDevice, clip: Option<&ClipPath>) {
        let Some(clip) = clip else {
            if self.last_clip.take().is_some() {
                device.restore_state(true);
            }
            return;
        };
        if self.last_clip.as_ref().is_some_and(|last| last.is_same(clip)) {
            return;
        }
        self.last_clip = Some(clip.clone());
        device.restore_state(true);
        for (path, fill_rule) in clip.paths() {
            device.set_clip_path(path, &self.matrix, *fill_rule);
        }
    }

    /// Draw an object ignoring its clip; `false` when the device failed
    pub fn process_object_no_clip(
        &mut self,
        device: &mut dyn RenderDevice,
        object: &PageObject,
    ) -> bool {
        let ok = match &object.kind {
            ObjectKind::Path(path) => self.process_path(device, object, path),
            ObjectKind::Image(image) => {
                let (mut load, mut state) = self.start_image(image);
                if state == LoadState::Continue {
                    state = self.drain_image(&mut load);
                }
                self.finish_image(device, object, image, load, state)
            }
            ObjectKind::Text(text) => self.process_text(device, object, text),
            ObjectKind::Shading(shading) => self.process_shading(device, object, shading),
            ObjectKind::Form(form) => self.process_form(device, form),
        };
        if !ok {
            tracing::trace!(level = self.level, "device declined object");
        }
        ok
    }

    /// Offscreen rendering for groups and blend modes; `true` when handled
    fn process_transparency(&mut self, device: &mut dyn RenderDevice, object: &PageObject) -> bool {
        let blend = object.state.blend;
        let (group, alpha) = match &object.kind {
            ObjectKind::Form(form) => (form.group, object.state.fill_alpha),
            _ => (None, 1.0),
        };
        let group_needs_buffer = group.is_some_and(|g| g.isolated || g.knockout);
        if blend == BlendMode::Normal && alpha >= 1.0 && !group_needs_buffer {
            return false;
        }
        let group = group.unwrap_or_default();

        let bounds = IntRect::new(0, 0, device.width() as i32, device.height() as i32);
        let rect = self
            .matrix
            .transform_rect(&object.bbox)
            .intersect(&device.clip_box())
            .round_out()
            .intersect(&bounds);
        if rect.is_empty() {
            return true;
        }

        let mut offscreen = match PixmapDevice::new(rect.width() as u32, rect.height() as u32) {
            Ok(offscreen) => offscreen,
            Err(e) => {
                tracing::warn!(error = %e, "transparency buffer unavailable");
                return true;
            }
        };
        let offset = Matrix::translate(-rect.left as f32, -rect.top as f32);
        if !group.isolated && !self.in_group {
            self.context.get_background(&mut offscreen, object, self.options, &offset);
        }

        let mut sub = self.child(self.matrix.then(offset));
        sub.level = self.level;
        sub.in_group = self.in_group || group.isolated;
        sub.process_object_no_clip(&mut offscreen, object);
        self.stopped |= sub.stopped;

        device.composite_bitmap(&offscreen.to_dib(), rect.left, rect.top, alpha, blend)
    }

    fn process_path(
        &self,
        device: &mut dyn RenderDevice,
        object: &PageObject,
        path: &PathObject,
    ) -> bool {
        let state = &object.state;
        let paint = PathPaint {
            fill: path.fill.map(|rule| (rule, self.fill_color(state))),
            stroke: path.stroke.then(|| (state.line_width, self.stroke_color(state))),
            anti_alias: self.options.anti_alias_path(path.is_rect),
            blend: BlendMode::Normal,
        };
        if paint.fill.is_none() && paint.stroke.is_none() {
            return true;
        }
        device.draw_path(&path.path, &path.matrix.then(self.matrix), &paint)
    }

    fn fill_color(&self, state: &GraphicsState) -> Color {
        self.options.translate_color(state.fill_color, false).with_alpha(state.fill_alpha)
    }

    fn stroke_color(&self, state: &GraphicsState) -> Color {
        self.options.translate_color(state.stroke_color, true).with_alpha(state.stroke_alpha)
    }

    fn process_shading(
        &self,
        device: &mut dyn RenderDevice,
        object: &PageObject,
        shading: &ShadingObject,
    ) -> bool {
        device.draw_shading(
            &shading.shading,
            &shading.area,
            &shading.matrix.then(self.matrix),
            object.state.fill_alpha,
        )
    }

    fn process_text(
        &self,
        device: &mut dyn RenderDevice,
        object: &PageObject,
        text: &TextObject,
    ) -> bool {
        let state = &object.state;
        let matrix = text.matrix.then(self.matrix);
        let fill = self.fill_color(state);
        let stroke = (state.line_width, self.stroke_color(state));
        match text.mode {
            TextRenderMode::Invisible | TextRenderMode::Clip => true,
            TextRenderMode::Fill => {
                TextRenderer::draw_normal_text(device, text, &matrix, fill, self.options)
            }
            TextRenderMode::Stroke => TextRenderer::draw_text_path(
                device,
                text,
                &matrix,
                None,
                Some(stroke),
                self.options,
            ),
            TextRenderMode::FillStroke => TextRenderer::draw_text_path(
                device,
                text,
                &matrix,
                Some(fill),
                Some(stroke),
                self.options,
            ),
        }
    }

    fn process_form(&mut self, device: &mut dyn RenderDevice, form: &FormObject) -> bool {
        if self.level >= MAX_RECURSION_DEPTH {
            tracing::warn!(level = self.level, "form nesting too deep, skipping");
            return false;
        }
        device.save_state();
        let mut child = self.child(form.matrix.then(self.matrix));
        if let Some(group) = form.group {
            child = child.with_transparency(group);
        }
        child.render_object_list(device, form.objects.objects());
        self.stopped |= child.stopped;
        device.restore_state(false);
        true
    }

    fn start_image(&self, image: &ImageObject) -> (ImageLoad, LoadState) {
        match self.context.page_cache() {
            Some(cache) => {
                let state = cache.borrow_mut().start_get_cached_bitmap(&image.image);
                (ImageLoad::Cached, state)
            }
            None => {
                let mut decoder = image.image.create_decoder();
                let state = decoder.start();
                (ImageLoad::Direct(decoder), state)
            }
        }
    }

    /// Finish a suspended load without pausing
    fn drain_image(&self, load: &mut ImageLoad) -> LoadState {
        loop {
            let state = match load {
                ImageLoad::Cached => match self.context.page_cache() {
                    Some(cache) => cache.borrow_mut().continue_get_cached_bitmap(None),
                    None => LoadState::Fail,
                },
                ImageLoad::Direct(decoder) => decoder.continue_decode(None),
            };
            if state != LoadState::Continue {
                return state;
            }
        }
    }

    fn finish_image(
        &self,
        device: &mut dyn RenderDevice,
        object: &PageObject,
        image: &ImageObject,
        load: ImageLoad,
        state: LoadState,
    ) -> bool {
        if state != LoadState::Success {
            tracing::debug!(image = ?image.image.id(), "image not drawn");
            return false;
        }
        match load {
            ImageLoad::Cached => {
                let Some(cache) = self.context.page_cache() else {
                    return false;
                };
                let cache = cache.borrow();
                let Some(bitmap) = cache.current_bitmap() else {
                    return false;
                };
                let (mask, matte) = (cache.current_mask(), cache.current_matte());
                self.draw_image(device, object, image, bitmap, mask, matte)
            }
            ImageLoad::Direct(mut decoder) => {
                let Some(bitmap) = decoder.take_bitmap() else {
                    return false;
                };
                let mask = decoder.take_mask();
                let matte = decoder.matte_color();
                self.draw_image(device, object, image, &bitmap, mask.as_ref(), matte)
            }
        }
    }

    fn draw_image(
        &self,
        device: &mut dyn RenderDevice,
        object: &PageObject,
        image: &ImageObject,
        bitmap: &Dib,
        mask: Option<&Dib>,
        matte: Option<Color>,
    ) -> bool {
        let matrix = image.matrix.then(self.matrix);
        let smooth = !self.options.no_image_smooth;
        let alpha = object.state.fill_alpha;
        if image.image.is_mask() {
            let color = self.options.translate_color(object.state.fill_color, false);
            let stencil = Dib::stencil(bitmap, color);
            return device.draw_bitmap(&stencil, &matrix, alpha, BlendMode::Normal, smooth);
        }
        match mask {
            Some(mask) => {
                let masked = bitmap.with_mask(mask, matte);
                device.draw_bitmap(&masked, &matrix, alpha, BlendMode::Normal, smooth)
            }
            None => device.draw_bitmap(bitmap, &matrix, alpha, BlendMode::Normal, smooth),
        }
    }
}
