//! Decode lifecycle of one cached image

use std::rc::Rc;

use super::source::{ImageDecoder, ImageId, ImageResource, LoadState};
use crate::bitmap::Dib;
use crate::pause::PauseIndicator;
use crate::Color;

/// Working bitmaps at or above this many bytes are kept as-is instead of
/// being copied into a compact settled bitmap.
pub const HUGE_IMAGE_SIZE: usize = 60_000_000;

/// Cached decode result of one image resource
///
/// Holds the settled bitmap and mask once a decode succeeds, plus the
/// in-flight decoder while a decode is suspended.
pub struct ImageCacheEntry {
    image: Rc<dyn ImageResource>,
    decoder: Option<Box<dyn ImageDecoder>>,
    bitmap: Option<Dib>,
    mask: Option<Dib>,
    matte: Option<Color>,
    /// Logical time of the last use
    last_used: u32,
    /// Bytes charged to the cache
    cache_size: usize,
}

impl ImageCacheEntry {
    pub fn new(image: Rc<dyn ImageResource>) -> Self {
        Self {
            image,
            decoder: None,
            bitmap: None,
            mask: None,
            matte: None,
            last_used: 0,
            cache_size: 0,
        }
    }

    pub fn id(&self) -> ImageId {
        self.image.id()
    }

    pub fn image(&self) -> &Rc<dyn ImageResource> {
        &self.image
    }

    /// Settled bitmap
    pub fn bitmap(&self) -> Option<&Dib> {
        self.bitmap.as_ref()
    }

    /// Settled soft mask
    pub fn mask(&self) -> Option<&Dib> {
        self.mask.as_ref()
    }

    pub fn matte(&self) -> Option<Color> {
        self.matte
    }

    pub fn last_used(&self) -> u32 {
        self.last_used
    }

    pub(crate) fn set_last_used(&mut self, time: u32) {
        self.last_used = time;
    }

    /// Bytes charged to the cache for this entry
    pub fn estimated_size(&self) -> usize {
        self.cache_size
    }

    /// A decode is suspended
    pub fn is_decoding(&self) -> bool {
        self.decoder.is_some()
    }

    /// Expose the settled bitmap, or begin decoding it.
    ///
    /// `time_count` is the cache's current logical time; it becomes the
    /// entry's last-used stamp when the lookup settles.
    pub fn start_get_cached_bitmap(&mut self, time_count: u32) -> LoadState {
        if self.bitmap.is_some() {
            self.last_used = time_count;
            return LoadState::Success;
        }

        let mut decoder = self.image.create_decoder();
        let state = decoder.start();
        self.decoder = Some(decoder);
        match state {
            LoadState::Continue => LoadState::Continue,
            settled => self.settle(settled, time_count),
        }
    }

    /// Resume a suspended decode
    pub fn continue_decode(
        &mut self,
        pause: Option<&dyn PauseIndicator>,
        time_count: u32,
    ) -> LoadState {
        let Some(decoder) = self.decoder.as_mut() else {
            return if self.bitmap.is_some() { LoadState::Success } else { LoadState::Fail };
        };
        match decoder.continue_decode(pause) {
            LoadState::Continue => LoadState::Continue,
            settled => self.settle(settled, time_count),
        }
    }

    fn settle(&mut self, state: LoadState, time_count: u32) -> LoadState {
        let Some(mut decoder) = self.decoder.take() else {
            return LoadState::Fail;
        };

        let bitmap = match state {
            LoadState::Success => decoder.take_bitmap(),
            _ => None,
        };
        let Some(bitmap) = bitmap else {
            // The attempt's allocation is charged even though nothing is kept.
            let attempted = decoder.bitmap().map_or(0, Dib::estimated_size)
                + decoder.mask().map_or(0, Dib::estimated_size);
            drop(decoder);
            tracing::debug!(image = ?self.id(), attempted, "image decode failed");
            self.cache_size = self.settled_size() + attempted;
            return LoadState::Fail;
        };

        self.matte = decoder.matte_color();
        let mask = decoder.take_mask();
        drop(decoder);

        self.bitmap = Some(if bitmap.stride() * (bitmap.height() as usize) < HUGE_IMAGE_SIZE {
            bitmap.realize()
        } else {
            bitmap
        });
        if let Some(mask) = mask {
            self.mask = Some(mask.realize());
        }
        self.last_used = time_count;
        self.cache_size = self.settled_size();
        LoadState::Success
    }

    fn settled_size(&self) -> usize {
        self.bitmap.as_ref().map_or(0, Dib::estimated_size)
            + self.mask.as_ref().map_or(0, Dib::estimated_size)
    }

    /// Forget a suspended decode, keeping whatever was settled before it
    pub(crate) fn abandon_decode(&mut self) {
        self.decoder = None;
    }

    /// Drop the settled bitmap, keeping the mask; returns the new size
    pub(crate) fn reset(&mut self) -> usize {
        self.bitmap = None;
        self.decoder = None;
        self.cache_size = self.settled_size();
        self.cache_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::DibFormat;
    use crate::image::RawImage;

    /// Hands over a padded working bitmap as soon as it starts
    struct WorkingImage {
        width: u32,
        height: u32,
    }

    struct WorkingDecoder {
        bitmap: Option<Dib>,
    }

    impl ImageResource for WorkingImage {
        fn id(&self) -> ImageId {
            ImageId(9)
        }

        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }

        fn create_decoder(&self) -> Box<dyn ImageDecoder> {
            let bitmap = Dib::new_working(self.width, self.height, DibFormat::Gray8);
            Box::new(WorkingDecoder { bitmap: Some(bitmap) })
        }
    }

    impl ImageDecoder for WorkingDecoder {
        fn start(&mut self) -> LoadState {
            LoadState::Success
        }

        fn continue_decode(&mut self, _pause: Option<&dyn PauseIndicator>) -> LoadState {
            LoadState::Success
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

    fn settle_working(width: u32, height: u32) -> ImageCacheEntry {
        let mut entry = ImageCacheEntry::new(Rc::new(WorkingImage { width, height }));
        assert_eq!(entry.start_get_cached_bitmap(0), LoadState::Success);
        entry
    }

    #[test]
    fn test_success_realizes_bitmap() {
        let image: Rc<dyn ImageResource> =
            Rc::new(RawImage::new(ImageId(1), Dib::filled(10, 4, Color::WHITE)));
        let mut entry = ImageCacheEntry::new(image);
        assert_eq!(entry.start_get_cached_bitmap(5), LoadState::Success);

        let bitmap = entry.bitmap().unwrap();
        assert!(bitmap.is_compact());
        assert_eq!(entry.estimated_size(), 10 * 4 * 4);
        assert_eq!(entry.last_used(), 5);
        assert!(!entry.is_decoding());
    }

    #[test]
    fn test_huge_working_bitmap_is_kept() {
        // Gray8 rows of 200 pixels are padded to 256 bytes: 256 * 234_375 == 60_000_000
        let entry = settle_working(200, 234_375);
        let bitmap = entry.bitmap().unwrap();
        assert!(!bitmap.is_compact());
        assert_eq!(bitmap.stride(), 256);
        assert_eq!(entry.estimated_size(), HUGE_IMAGE_SIZE);
    }

    #[test]
    fn test_bitmap_below_huge_size_is_compacted() {
        let entry = settle_working(200, 234_374);
        let bitmap = entry.bitmap().unwrap();
        assert!(bitmap.is_compact());
        assert_eq!(entry.estimated_size(), 200 * 234_374);
    }

    #[test]
    fn test_fast_path_refreshes_stamp() {
        let raw = Rc::new(RawImage::new(ImageId(1), Dib::new(2, 2, DibFormat::Gray8)));
        let image: Rc<dyn ImageResource> = raw.clone();
        let mut entry = ImageCacheEntry::new(image);
        entry.start_get_cached_bitmap(1);
        assert_eq!(entry.start_get_cached_bitmap(9), LoadState::Success);
        assert_eq!(entry.last_used(), 9);
        assert_eq!(raw.decode_count(), 1);
    }

    #[test]
    fn test_mask_counts_toward_size() {
        let mask = Dib::from_gray(4, 4, vec![255; 16]).unwrap();
        let raw = RawImage::new(ImageId(2), Dib::filled(4, 4, Color::BLACK));
        let image: Rc<dyn ImageResource> = Rc::new(raw.with_soft_mask(mask));
        let mut entry = ImageCacheEntry::new(image);
        entry.start_get_cached_bitmap(0);
        assert_eq!(entry.estimated_size(), 4 * 4 * 4 + 16);

        assert_eq!(entry.reset(), 16);
        assert!(entry.bitmap().is_none());
        assert!(entry.mask().is_some());
    }
}
