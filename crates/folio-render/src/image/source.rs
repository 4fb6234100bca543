//! Image resources and their decoders

use crate::bitmap::Dib;
use crate::pause::PauseIndicator;
use crate::Color;

/// Identity of an image resource within a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u64);

/// Result of one resumable decode step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Fail,
    Success,
    /// More work remains; call the continuation again
    Continue,
}

/// An image as stored in the document
pub trait ImageResource {
    /// Stable identity; two objects referencing the same resource share it
    fn id(&self) -> ImageId;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Stencil mask painted with the fill color
    fn is_mask(&self) -> bool {
        false
    }

    /// Fresh decoder over the resource data
    fn create_decoder(&self) -> Box<dyn ImageDecoder>;
}

/// Resumable decoder
///
/// `start` begins decoding and may finish immediately. While it reports
/// [`LoadState::Continue`], the owner keeps calling `continue_decode`.
pub trait ImageDecoder {
    fn start(&mut self) -> LoadState;

    fn continue_decode(&mut self, pause: Option<&dyn PauseIndicator>) -> LoadState;

    /// Working bitmap allocated so far
    fn bitmap(&self) -> Option<&Dib>;

    /// Working soft mask allocated so far
    fn mask(&self) -> Option<&Dib>;

    fn take_bitmap(&mut self) -> Option<Dib>;

    fn take_mask(&mut self) -> Option<Dib>;

    /// Color the image was pre-blended against, if any
    fn matte_color(&self) -> Option<Color> {
        None
    }
}
