//! Render Context
//!
//! Ordered layers of page content, each an object holder plus the matrix
//! mapping it to device space, and the page cache their images go through.

use std::cell::RefCell;

use crate::device::RenderDevice;
use crate::geometry::{IntRect, Matrix};
use crate::image::PageRenderCache;
use crate::object::{PageObject, PageObjectHolder};
use crate::options::RenderOptions;
use crate::status::RenderStatus;
use crate::Color;

/// Object holder rendered with a matrix
pub struct Layer<'a> {
    pub holder: &'a RefCell<dyn PageObjectHolder + 'a>,
    /// Holder space to device space
    pub matrix: Matrix,
}

/// Layers of one render request
#[derive(Default)]
pub struct RenderContext<'a> {
    layers: Vec<Layer<'a>>,
    page_cache: Option<&'a RefCell<PageRenderCache>>,
}

impl<'a> RenderContext<'a> {
    /// Context without an image cache; images are decoded on every use
    pub fn new() -> Self {
        Self { layers: Vec::new(), page_cache: None }
    }

    /// Context resolving images through `cache`
    pub fn with_page_cache(cache: &'a RefCell<PageRenderCache>) -> Self {
        Self { layers: Vec::new(), page_cache: Some(cache) }
    }

    pub fn append_layer(&mut self, holder: &'a RefCell<dyn PageObjectHolder + 'a>, matrix: Matrix) {
        self.layers.push(Layer { holder, matrix });
    }

    pub fn layers(&self) -> &[Layer<'a>] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn page_cache(&self) -> Option<&'a RefCell<PageRenderCache>> {
        self.page_cache
    }

    /// Render every layer in one go.
    ///
    /// Rendering ends before `stop_object` when it is found in any layer.
    /// `last_matrix` is applied after each layer's own matrix.
    pub fn render(
        &self,
        device: &mut dyn RenderDevice,
        stop_object: Option<&PageObject>,
        options: &RenderOptions,
        last_matrix: Option<&Matrix>,
    ) {
        for (index, layer) in self.layers.iter().enumerate() {
            device.save_state();
            let matrix = match last_matrix {
                Some(last) => layer.matrix.then(*last),
                None => layer.matrix,
            };
            let holder = layer.holder.borrow();
            let mut status = RenderStatus::new(self, options, matrix)
                .with_transparency(holder.transparency())
                .with_stop_object(stop_object);
            status.render_object_list(device, holder.objects());
            device.restore_state(false);
            if status.is_stopped() {
                tracing::trace!(layer = index, "render stopped at stop object");
                break;
            }
        }
    }

    /// Paint everything below `object` onto a white `device`.
    ///
    /// `matrix` maps this context's device space to `device`.
    pub fn get_background(
        &self,
        device: &mut dyn RenderDevice,
        object: &PageObject,
        options: &RenderOptions,
        matrix: &Matrix,
    ) {
        let full = IntRect::new(0, 0, device.width() as i32, device.height() as i32);
        device.fill_rect(&full, Color::WHITE);
        self.render(device, Some(object), options, Some(matrix));
    }
}
