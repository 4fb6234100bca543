//! Image handling module
//!
//! Image resources, resumable decoders and the per-page bitmap cache.

mod cache;
mod decoder;
mod entry;
mod source;

pub use cache::{PageRenderCache, MIN_RESIDENT_ENTRIES};
pub use decoder::{EncodedFormat, EncodedImage, RawImage};
pub use entry::{ImageCacheEntry, HUGE_IMAGE_SIZE};
pub use source::{ImageDecoder, ImageId, ImageResource, LoadState};
