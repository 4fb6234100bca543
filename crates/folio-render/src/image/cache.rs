//! Per-page cache of decoded image bitmaps
//!
//! Entries are keyed by image identity and stamped with a logical time on
//! every use. Eviction removes the oldest entries first but always keeps a
//! floor of recently used ones resident.

use std::collections::HashMap;
use std::rc::Rc;

use super::entry::ImageCacheEntry;
use super::source::{ImageId, ImageResource, LoadState};
use crate::bitmap::Dib;
use crate::pause::PauseIndicator;
use crate::Color;

/// Entries never evicted by [`PageRenderCache::cache_optimization`]
pub const MIN_RESIDENT_ENTRIES: usize = 15;

/// Lookup in flight; its entry stays out of the map until it settles
enum Pending {
    /// Newly allocated entry
    Fresh(ImageCacheEntry),
    /// Resident entry taken out of the map to be decoded again
    Resident(ImageCacheEntry),
}

impl Pending {
    fn entry_mut(&mut self) -> &mut ImageCacheEntry {
        match self {
            Pending::Fresh(entry) | Pending::Resident(entry) => entry,
        }
    }
}

/// Decoded-image cache for one page
#[derive(Default)]
pub struct PageRenderCache {
    entries: HashMap<ImageId, ImageCacheEntry>,
    pending: Option<Pending>,
    /// Image of the last settled lookup
    current: Option<ImageId>,
    time_count: u32,
    total_size: usize,
    /// Statistics
    pub hits: u64,
    pub misses: u64,
}

impl PageRenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of the estimated sizes of all resident entries
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn time_count(&self) -> u32 {
        self.time_count
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn entry(&self, id: ImageId) -> Option<&ImageCacheEntry> {
        self.entries.get(&id)
    }

    /// A lookup is waiting for `continue_get_cached_bitmap`
    pub fn is_decoding(&self) -> bool {
        self.pending.is_some()
    }

    /// Bitmap of the last settled lookup
    pub fn current_bitmap(&self) -> Option<&Dib> {
        self.current_entry()?.bitmap()
    }

    pub fn current_mask(&self) -> Option<&Dib> {
        self.current_entry()?.mask()
    }

    pub fn current_matte(&self) -> Option<Color> {
        self.current_entry()?.matte()
    }

    fn current_entry(&self) -> Option<&ImageCacheEntry> {
        self.entries.get(&self.current?)
    }

    /// Look up `image`, starting a decode on a miss.
    ///
    /// On [`LoadState::Continue`] the caller drives the decode with
    /// [`continue_get_cached_bitmap`](Self::continue_get_cached_bitmap).
    pub fn start_get_cached_bitmap(&mut self, image: &Rc<dyn ImageResource>) -> LoadState {
        let id = image.id();
        self.abandon_pending(id);
        self.current = None;

        let pending = match self.entries.remove(&id) {
            Some(entry) => {
                self.hits += 1;
                tracing::trace!(image = ?id, "image cache hit");
                self.total_size -= entry.estimated_size();
                Pending::Resident(entry)
            }
            None => {
                self.misses += 1;
                tracing::trace!(image = ?id, "image cache miss");
                Pending::Fresh(ImageCacheEntry::new(Rc::clone(image)))
            }
        };
        let time_count = self.time_count;
        let pending = self.pending.insert(pending);
        let state = pending.entry_mut().start_get_cached_bitmap(time_count);

        match state {
            LoadState::Continue => LoadState::Continue,
            settled => self.settle(settled),
        }
    }

    /// Resume the pending lookup
    pub fn continue_get_cached_bitmap(&mut self, pause: Option<&dyn PauseIndicator>) -> LoadState {
        let time_count = self.time_count;
        let Some(pending) = self.pending.as_mut() else {
            return LoadState::Fail;
        };
        let state = pending.entry_mut().continue_decode(pause, time_count);
        match state {
            LoadState::Continue => LoadState::Continue,
            settled => self.settle(settled),
        }
    }

    fn settle(&mut self, state: LoadState) -> LoadState {
        let Some(pending) = self.pending.take() else {
            return state;
        };

        let (Pending::Fresh(entry) | Pending::Resident(entry)) = pending;
        let id = entry.id();
        self.total_size += entry.estimated_size();
        self.entries.insert(id, entry);

        if self.time_count == u32::MAX {
            self.rebase_time_stamps();
        }
        self.time_count += 1;

        tracing::trace!(image = ?id, ?state, total = self.total_size, "image lookup settled");
        self.current = Some(id);
        state
    }

    /// Drop an unfinished lookup; a resident entry goes back as it was
    fn abandon_pending(&mut self, next: ImageId) {
        match self.pending.take() {
            None => {}
            Some(Pending::Fresh(entry)) => {
                tracing::debug!(image = ?entry.id(), ?next, "abandoning unfinished image lookup");
            }
            Some(Pending::Resident(mut entry)) => {
                tracing::debug!(image = ?entry.id(), ?next, "abandoning unfinished image lookup");
                entry.abandon_decode();
                self.total_size += entry.estimated_size();
                self.entries.insert(entry.id(), entry);
            }
        }
    }

    /// Resident entries ordered oldest first
    fn entries_by_age(&self) -> Vec<(u32, ImageId)> {
        let mut by_age: Vec<(u32, ImageId)> =
            self.entries.iter().map(|(id, entry)| (entry.last_used(), *id)).collect();
        by_age.sort_unstable();
        by_age
    }

    /// Re-stamp every entry with its recency rank
    fn rebase_time_stamps(&mut self) {
        let by_age = self.entries_by_age();
        self.rebase_to_ranks(&by_age);
    }

    fn rebase_to_ranks(&mut self, by_age: &[(u32, ImageId)]) {
        for (rank, (_, id)) in by_age.iter().enumerate() {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.set_last_used(rank as u32);
            }
        }
        self.time_count = by_age.len() as u32;
        tracing::debug!(entries = by_age.len(), "image cache time stamps rebased");
    }

    /// Evict oldest entries once the cache holds more than `limit` bytes.
    ///
    /// The [`MIN_RESIDENT_ENTRIES`] most recently used entries always stay.
    pub fn cache_optimization(&mut self, limit: usize) {
        if self.total_size <= limit {
            return;
        }

        let by_age = self.entries_by_age();
        if self.time_count.checked_add(1).is_none() {
            self.rebase_to_ranks(&by_age);
        }

        let before = self.total_size;
        let evictable = by_age.len().saturating_sub(MIN_RESIDENT_ENTRIES);
        for (_, id) in &by_age[..evictable] {
            self.evict(*id);
        }
        tracing::debug!(
            evicted = evictable,
            freed = before - self.total_size,
            total = self.total_size,
            limit,
            "image cache optimized"
        );
    }

    fn evict(&mut self, id: ImageId) {
        if let Some(entry) = self.entries.remove(&id) {
            self.total_size -= entry.estimated_size();
        }
        if self.current == Some(id) {
            self.current = None;
        }
    }

    /// Drop the settled bitmap of `id`, keeping its slot and mask
    pub fn reset_bitmap(&mut self, id: ImageId) {
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        let old_size = entry.estimated_size();
        let new_size = entry.reset();
        self.total_size = self.total_size - old_size + new_size;
        tracing::debug!(image = ?id, freed = old_size - new_size, "image bitmap reset");
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending = None;
        self.current = None;
        self.total_size = 0;
    }
}
