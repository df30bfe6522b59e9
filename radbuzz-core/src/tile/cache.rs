//! Shared tile slots
//!
//! The renderer calls [`TileCache::get_tile`] from its own thread. It only
//! ever reads slots and bumps use-counters; installing new content is left
//! to the [`TileFetcher`](super::TileFetcher), which owns the cache's
//! background side.
//!
//! Slot images are `Arc<TileImage>`: a renderer holding a tile keeps it
//! alive and unchanged, the fetcher reuses the buffer only once nobody else
//! holds it.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::mem;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use portable_atomic::{AtomicU32, Ordering};

use super::geo::{Tile, INVALID_TILE, TILE_SIZE};
use crate::state::Wakeup;

/// Pixels in one tile
pub const TILE_PIXELS: usize = (TILE_SIZE * TILE_SIZE) as usize;

/// Depth of the renderer → fetcher request queue
pub const REQUEST_QUEUE_DEPTH: usize = 64;

/// Colour of the placeholder returned for tiles not yet loaded
pub const PLACEHOLDER_COLOR: u16 = 0x0000;

/// A decoded 256×256 RGB565 map tile
#[derive(Clone, PartialEq, Eq)]
pub struct TileImage {
    pixels: Vec<u16>,
}

impl TileImage {
    pub const WIDTH: u32 = TILE_SIZE as u32;
    pub const HEIGHT: u32 = TILE_SIZE as u32;

    /// A tile filled with the placeholder colour
    pub fn new() -> Self {
        Self::filled(PLACEHOLDER_COLOR)
    }

    pub fn filled(color: u16) -> Self {
        Self {
            pixels: vec![color; TILE_PIXELS],
        }
    }

    /// Row-major RGB565 pixels
    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u16] {
        &mut self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u16> {
        if x >= Self::WIDTH || y >= Self::HEIGHT {
            return None;
        }
        self.pixels.get((y * Self::WIDTH + x) as usize).copied()
    }

    pub fn fill(&mut self, color: u16) {
        self.pixels.fill(color);
    }
}

impl Default for TileImage {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for TileImage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TileImage")
            .field("width", &Self::WIDTH)
            .field("height", &Self::HEIGHT)
            .finish()
    }
}

struct Slots {
    tiles: Vec<Tile>,
    images: Vec<Arc<TileImage>>,
}

/// Fixed-capacity set of decoded map tiles
pub struct TileCache {
    slots: Mutex<CriticalSectionRawMutex, RefCell<Slots>>,
    use_counts: Vec<AtomicU32>,
    requests: Channel<CriticalSectionRawMutex, Tile, REQUEST_QUEUE_DEPTH>,
    wakeup: Arc<Wakeup>,
    placeholder: Arc<TileImage>,
}

impl TileCache {
    /// Create an empty cache with `capacity` slots (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let placeholder = Arc::new(TileImage::new());

        Self {
            slots: Mutex::new(RefCell::new(Slots {
                tiles: vec![INVALID_TILE; capacity],
                images: vec![placeholder.clone(); capacity],
            })),
            use_counts: (0..capacity).map(|_| AtomicU32::new(0)).collect(),
            requests: Channel::new(),
            wakeup: Arc::new(Wakeup::new()),
            placeholder,
        }
    }

    pub fn capacity(&self) -> usize {
        self.use_counts.len()
    }

    /// Wakeup of the background side, signalled on every miss
    pub fn wakeup(&self) -> Arc<Wakeup> {
        self.wakeup.clone()
    }

    /// Get a tile for rendering
    ///
    /// A resident tile has its use-count bumped and is returned directly.
    /// Otherwise the tile is requested from the background side and the
    /// placeholder is returned. Never blocks.
    pub fn get_tile(&self, at: Tile) -> Arc<TileImage> {
        // Empty slots hold the invalid tile
        if !at.is_valid() {
            return self.placeholder.clone();
        }

        let resident = self.slots.lock(|slots| {
            let slots = slots.borrow();
            let index = slots.tiles.iter().position(|t| *t == at)?;
            self.use_counts[index].fetch_add(1, Ordering::Relaxed);
            Some(slots.images[index].clone())
        });

        if let Some(image) = resident {
            return image;
        }

        if self.requests.try_send(at).is_err() {
            trace!("tile request queue full, dropping {},{}", at.x, at.y);
        }
        self.wakeup.signal(());

        self.placeholder.clone()
    }

    pub fn is_resident(&self, at: Tile) -> bool {
        self.slots
            .lock(|slots| slots.borrow().tiles.contains(&at))
    }

    /// Number of slots holding a tile
    pub fn resident_count(&self) -> usize {
        self.slots
            .lock(|slots| slots.borrow().tiles.iter().filter(|t| t.is_valid()).count())
    }

    pub fn use_count(&self, index: usize) -> Option<u32> {
        self.use_counts
            .get(index)
            .map(|count| count.load(Ordering::Relaxed))
    }

    /// Choose the slot to replace
    ///
    /// Picks the lowest use-count, first index on ties, and raises it to one
    /// above the current maximum so it is not chosen again before its new
    /// content has been used. Use-count wrap-around only costs extra loads.
    pub fn evict_tile(&self) -> usize {
        let mut lowest = u32::MAX;
        let mut highest = 0;
        let mut selected = 0;

        for (index, count) in self.use_counts.iter().enumerate() {
            let count = count.load(Ordering::Relaxed);
            if count < lowest {
                lowest = count;
                selected = index;
            }
            highest = highest.max(count);
        }

        self.use_counts[selected].store(highest.wrapping_add(1), Ordering::Relaxed);
        selected
    }

    pub(crate) fn take_request(&self) -> Option<Tile> {
        self.requests.try_receive().ok()
    }

    /// Empty a slot and hand back its image for reuse
    pub(crate) fn take_slot(&self, index: usize) -> Arc<TileImage> {
        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            slots.tiles[index] = INVALID_TILE;
            mem::replace(&mut slots.images[index], self.placeholder.clone())
        })
    }

    pub(crate) fn install(&self, index: usize, tile: Tile, image: TileImage) {
        let image = Arc::new(image);
        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            slots.images[index] = image;
            slots.tiles[index] = tile;
        });
    }

    /// Leave a slot empty, keeping `image` as its buffer
    pub(crate) fn clear_slot(&self, index: usize, image: TileImage) {
        let image = Arc::new(image);
        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            slots.images[index] = image;
            slots.tiles[index] = INVALID_TILE;
        });
        self.use_counts[index].store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn filled(cache: &TileCache, tiles: &[Tile]) {
        for (index, tile) in tiles.iter().enumerate() {
            let image = TileImage::filled(index as u16 + 1);
            cache.install(index, *tile, image);
        }
    }

    #[test]
    fn test_miss_returns_placeholder_and_requests() {
        let cache = TileCache::new(4);
        let tile = Tile::new(1, 2);

        let image = cache.get_tile(tile);
        assert_eq!(image.pixel(0, 0), Some(PLACEHOLDER_COLOR));
        assert!(cache.wakeup().try_take().is_some());
        assert_eq!(cache.take_request(), Some(tile));
        assert_eq!(cache.take_request(), None);
    }

    #[test]
    fn test_hit_bumps_use_count() {
        let cache = TileCache::new(4);
        filled(&cache, &[Tile::new(1, 1), Tile::new(2, 2)]);

        let image = cache.get_tile(Tile::new(2, 2));
        assert_eq!(image.pixel(10, 10), Some(2));
        cache.get_tile(Tile::new(2, 2));

        assert_eq!(cache.use_count(0), Some(0));
        assert_eq!(cache.use_count(1), Some(2));
        assert!(cache.take_request().is_none());
    }

    #[test]
    fn test_invalid_tile_touches_no_slot() {
        let cache = TileCache::new(2);
        filled(&cache, &[Tile::new(0, 0)]);
        cache.get_tile(Tile::new(0, 0));

        for _ in 0..3 {
            let image = cache.get_tile(crate::tile::geo::INVALID_TILE);
            assert_eq!(image.pixel(0, 0), Some(PLACEHOLDER_COLOR));
        }
        assert_eq!(cache.use_count(1), Some(0));
        assert!(cache.take_request().is_none());
        assert!(cache.wakeup().try_take().is_none());

        // The empty slot is still the one replaced first
        assert_eq!(cache.evict_tile(), 1);
    }

    #[test]
    fn test_full_request_queue_does_not_block() {
        let cache = TileCache::new(1);
        for i in 0..(REQUEST_QUEUE_DEPTH as i32 + 10) {
            cache.get_tile(Tile::new(i, 0));
        }

        let mut drained = 0;
        while cache.take_request().is_some() {
            drained += 1;
        }
        assert_eq!(drained, REQUEST_QUEUE_DEPTH);
    }

    #[test]
    fn test_evict_picks_lowest_first_index() {
        let cache = TileCache::new(3);
        filled(&cache, &[Tile::new(0, 0), Tile::new(1, 0), Tile::new(2, 0)]);
        cache.get_tile(Tile::new(0, 0));

        // Slots 1 and 2 tie at zero
        assert_eq!(cache.evict_tile(), 1);
        assert_eq!(cache.use_count(1), Some(2));
        assert_eq!(cache.evict_tile(), 2);
        assert_eq!(cache.use_count(2), Some(3));
        assert_eq!(cache.evict_tile(), 0);
    }

    #[test]
    fn test_held_tile_survives_replacement() {
        let cache = TileCache::new(1);
        filled(&cache, &[Tile::new(5, 5)]);

        let held = cache.get_tile(Tile::new(5, 5));
        let old = cache.take_slot(0);
        assert!(Arc::try_unwrap(old).is_err());

        cache.install(0, Tile::new(6, 6), TileImage::filled(0xffff));
        assert_eq!(held.pixel(0, 0), Some(1));
        assert_eq!(cache.get_tile(Tile::new(6, 6)).pixel(0, 0), Some(0xffff));
        assert!(!cache.is_resident(Tile::new(5, 5)));
    }

    #[test]
    fn test_clear_slot_resets_use_count() {
        let cache = TileCache::new(2);
        filled(&cache, &[Tile::new(0, 0), Tile::new(1, 0)]);
        let index = cache.evict_tile();
        let image = cache.take_slot(index);
        cache.clear_slot(index, (*image).clone());

        assert_eq!(cache.use_count(index), Some(0));
        assert_eq!(cache.resident_count(), 1);
    }

    proptest! {
        #[test]
        fn prop_eviction_exceeds_all_counts(hits in proptest::collection::vec(0usize..8, 0..64)) {
            let cache = TileCache::new(8);
            let tiles: Vec<Tile> = (0..8).map(|i| Tile::new(i, 0)).collect();
            filled(&cache, &tiles);
            for hit in hits {
                cache.get_tile(tiles[hit]);
            }

            let before: Vec<u32> = (0..8).filter_map(|i| cache.use_count(i)).collect();
            let index = cache.evict_tile();
            let after = cache.use_count(index).unwrap();

            prop_assert!(before.iter().all(|&count| after > count));
            prop_assert_eq!(before[index], *before.iter().min().unwrap());
        }

        #[test]
        fn prop_residency_bounded(requests in proptest::collection::vec((0i32..20, 0i32..20), 0..100)) {
            let cache = TileCache::new(4);
            for (x, y) in requests {
                let tile = Tile::new(x, y);
                let image = cache.get_tile(tile);
                prop_assert_eq!(image.pixels().len(), TILE_PIXELS);
                if !cache.is_resident(tile) {
                    let index = cache.evict_tile();
                    let _ = cache.take_slot(index);
                    cache.install(index, tile, TileImage::new());
                }
                prop_assert!(cache.resident_count() <= cache.capacity());
            }
        }
    }
}
