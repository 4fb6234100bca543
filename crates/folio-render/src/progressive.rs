//! Progressive Rendering
//!
//! Renders a context layer by layer and object by object, handing control
//! back to the caller whenever the pause indicator asks for it:
//! - every [`STEP_LIMIT`] objects, or right after a form or shading
//! - at layer boundaries
//! - while an image decode or incremental parse is unfinished
//! - around image masks on print devices
//!
//! The caller resumes with [`ProgressiveRenderer::continue_render`] until the
//! state is [`RenderState::Done`]. Abandoning a render is simply dropping the
//! renderer.

use crate::context::RenderContext;
use crate::device::{DeviceClass, RenderDevice};
use crate::geometry::Rect;
use crate::object::{PageObject, ParseState};
use crate::options::RenderOptions;
use crate::pause::PauseIndicator;
use crate::status::RenderStatus;

/// Objects rendered between pause checks
pub const STEP_LIMIT: usize = 100;

/// Renderer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderState {
    #[default]
    Ready,
    ToBeContinued,
    Done,
    Failed,
}

/// The layer currently being rendered
struct OpenLayer<'r, 'a> {
    status: RenderStatus<'r, 'a>,
    /// Device clip box in layer space, `None` when the matrix is singular
    clip_rect: Option<Rect>,
    /// Index of the last object processed
    cursor: Option<usize>,
}

/// Where the object loop left off
enum Progress {
    /// Return to the caller
    Suspend,
    /// Every available object was processed
    Exhausted { is_mask: bool },
}

/// Resumable renderer over a [`RenderContext`]
pub struct ProgressiveRenderer<'r, 'a> {
    context: Option<&'r RenderContext<'a>>,
    device: Option<&'r mut dyn RenderDevice>,
    options: &'r RenderOptions,
    state: RenderState,
    layer_index: usize,
    current: Option<OpenLayer<'r, 'a>>,
}

impl<'r, 'a> ProgressiveRenderer<'r, 'a> {
    pub fn new(
        context: Option<&'r RenderContext<'a>>,
        device: Option<&'r mut dyn RenderDevice>,
        options: &'r RenderOptions,
    ) -> Self {
        Self {
            context,
            device,
            options,
            state: RenderState::Ready,
            layer_index: 0,
            current: None,
        }
    }

    pub fn status(&self) -> RenderState {
        self.state
    }

    /// Index of the layer being (or next to be) rendered
    pub fn layer_index(&self) -> usize {
        self.layer_index
    }

    /// Begin rendering; fails without a context or device
    pub fn start(&mut self, pause: Option<&dyn PauseIndicator>) {
        if self.state != RenderState::Ready {
            tracing::debug!(state = ?self.state, "render already started");
            return;
        }
        if self.context.is_none() || self.device.is_none() {
            tracing::warn!("progressive render started without context or device");
            self.state = RenderState::Failed;
            return;
        }
        self.state = RenderState::ToBeContinued;
        self.continue_render(pause);
    }

    /// Resume rendering; a no-op unless the state is `ToBeContinued`
    pub fn continue_render(&mut self, pause: Option<&dyn PauseIndicator>) {
        let Self { context, device, options, state, layer_index, current } = self;
        let (Some(context), Some(device)) = (*context, device.as_deref_mut()) else {
            return;
        };
        let options: &'r RenderOptions = *options;

        while *state == RenderState::ToBeContinued {
            if current.is_none() {
                let Some(layer) = context.layers().get(*layer_index) else {
                    *state = RenderState::Done;
                    tracing::debug!(layers = context.layer_count(), "progressive render done");
                    return;
                };
                let status = RenderStatus::new(context, options, layer.matrix)
                    .with_transparency(layer.holder.borrow().transparency());
                device.save_state();
                let clip_rect =
                    layer.matrix.inverse().map(|inv| inv.transform_rect(&device.clip_box()));
                *current = Some(OpenLayer { status, clip_rect, cursor: None });
                tracing::trace!(layer = *layer_index, "layer opened");
            }
            let Some(open) = current.as_mut() else {
                return;
            };
            let layer = &context.layers()[*layer_index];

            let progress = {
                let holder = layer.holder.borrow();
                render_objects(open, device, holder.objects(), context, options, pause)
            };
            let Progress::Exhausted { is_mask } = progress else {
                return;
            };

            if layer.holder.borrow().parse_state() == ParseState::Parsed {
                *current = None;
                device.restore_state(false);
                tracing::trace!(layer = *layer_index, "layer closed");
                *layer_index += 1;
                if is_mask || need_to_pause(pause) {
                    return;
                }
            } else if is_mask {
                return;
            } else {
                layer.holder.borrow_mut().continue_parse(pause);
                if layer.holder.borrow().parse_state() != ParseState::Parsed {
                    tracing::trace!(layer = *layer_index, "waiting for more content");
                    return;
                }
            }
        }
    }
}

fn need_to_pause(pause: Option<&dyn PauseIndicator>) -> bool {
    pause.is_some_and(|p| p.need_to_pause_now())
}

/// Walk objects after the cursor in batches of [`STEP_LIMIT`]
fn render_objects(
    open: &mut OpenLayer<'_, '_>,
    device: &mut dyn RenderDevice,
    objects: &[PageObject],
    context: &RenderContext<'_>,
    options: &RenderOptions,
    pause: Option<&dyn PauseIndicator>,
) -> Progress {
    let mut is_mask = false;
    let mut objs_to_go = STEP_LIMIT;
    let start = open.cursor.map_or(0, |cursor| cursor + 1);

    for index in start..objects.len() {
        let object = &objects[index];
        let visible = open.clip_rect.is_none_or(|clip| object.bbox.intersects(&clip));
        if visible {
            if options.break_for_masks && object.is_image_mask() {
                if device.device_class() == DeviceClass::Printer {
                    open.cursor = Some(index);
                    open.status.process_clip_path(device, object.clip.as_ref());
                    tracing::trace!(index, "suspending at image mask");
                    return Progress::Suspend;
                }
                is_mask = true;
            }
            if open.status.continue_single_object(device, object, pause) {
                return Progress::Suspend;
            }
            if object.is_image() && options.limited_image_cache {
                if let Some(cache) = context.page_cache() {
                    cache.borrow_mut().cache_optimization(options.cache_size_limit);
                }
            }
            if object.is_expensive() {
                objs_to_go = 0;
            } else {
                objs_to_go -= 1;
            }
        }
        open.cursor = Some(index);
        if objs_to_go == 0 {
            if need_to_pause(pause) {
                tracing::trace!(index, "pausing");
                return Progress::Suspend;
            }
            objs_to_go = STEP_LIMIT;
        }
        if is_mask && index + 1 < objects.len() {
            return Progress::Suspend;
        }
    }
    Progress::Exhausted { is_mask }
}
