//! Cache of navigation icons
//!
//! Icons are 1-bit-per-pixel bitmaps keyed by a content hash, so a key is
//! never overwritten and entries are never evicted. Lookups hand out an
//! `Arc`, so a reader never waits on a writer for longer than the map lookup.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::FnvIndexMap;

use crate::state::{ListenerHandle, Listeners, ParamSet, Wakeup};

/// Maximum number of cached icons
pub const MAX_CACHED_IMAGES: usize = 32;

/// Two-entry palette: index 0 black, index 1 white
pub const BLACK_WHITE_PALETTE: [u8; 8] = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff];

type IconMap = FnvIndexMap<u32, Arc<CachedImage>, MAX_CACHED_IMAGES>;

/// A cached 1-bpp image with its palette
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    width: u16,
    height: u16,
    /// Palette followed by the row-major bitmap
    bits: Vec<u8>,
}

impl CachedImage {
    fn new(width: u16, height: u16, data: &[u8]) -> Self {
        let mut bits = Vec::with_capacity(BLACK_WHITE_PALETTE.len() + data.len());
        bits.extend_from_slice(&BLACK_WHITE_PALETTE);
        bits.extend_from_slice(data);

        Self {
            width,
            height,
            bits,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Bytes per bitmap row
    pub fn stride(&self) -> usize {
        usize::from(self.width).div_ceil(8)
    }

    /// Size of palette plus bitmap
    pub fn data_size(&self) -> usize {
        self.bits.len()
    }

    /// Palette followed by the bitmap
    pub fn data(&self) -> &[u8] {
        &self.bits
    }

    pub fn bitmap(&self) -> &[u8] {
        &self.bits[BLACK_WHITE_PALETTE.len()..]
    }

    /// Palette index of the pixel at (`x`, `y`), MSB first
    pub fn pixel(&self, x: u16, y: u16) -> Option<bool> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let byte = self.bitmap().get(usize::from(y) * self.stride() + usize::from(x) / 8)?;
        Some(byte & (0x80 >> (x % 8)) != 0)
    }
}

/// Result of [`ImageCache::insert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InsertOutcome {
    /// New entry stored
    Inserted,
    /// Key already present, nothing changed
    Duplicate,
    /// Cache is full
    Full,
    /// Data length does not match `width * height / 8`
    InvalidSize,
}

/// Fixed-capacity icon store with change notification
pub struct ImageCache {
    images: Mutex<CriticalSectionRawMutex, RefCell<IconMap>>,
    listeners: Listeners,
}

impl ImageCache {
    pub fn new() -> Self {
        Self {
            images: Mutex::new(RefCell::new(FnvIndexMap::new())),
            listeners: Listeners::new(),
        }
    }

    /// Store an icon unless `key` is already present
    ///
    /// Every listener is signalled when a new entry is stored.
    pub fn insert(&self, key: u32, width: u16, height: u16, data: &[u8]) -> InsertOutcome {
        let expected = usize::from(width) * usize::from(height) / 8;
        if data.len() != expected {
            return InsertOutcome::InvalidSize;
        }

        // Copy the bitmap before taking the lock, lookups must not wait on it
        let image = Arc::new(CachedImage::new(width, height, data));

        let outcome = self.images.lock(|images| {
            let mut images = images.borrow_mut();
            if images.contains_key(&key) {
                return InsertOutcome::Duplicate;
            }

            match images.insert(key, image) {
                Ok(_) => InsertOutcome::Inserted,
                Err(_) => InsertOutcome::Full,
            }
        });

        match outcome {
            InsertOutcome::Inserted => {
                debug!("image cache: stored {}", key);
                self.listeners.notify(ParamSet::ALL);
            }
            InsertOutcome::Full => warn!("image cache: full, dropping {}", key),
            _ => {}
        }

        outcome
    }

    pub fn lookup(&self, key: u32) -> Option<Arc<CachedImage>> {
        self.images
            .lock(|images| images.borrow().get(&key).cloned())
    }

    pub fn len(&self) -> usize {
        self.images.lock(|images| images.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signal `wakeup` on every new entry
    ///
    /// Returns `None` if no listener slot is free.
    pub fn listen_to_changes(&self, wakeup: Arc<Wakeup>) -> Option<ListenerHandle<'_>> {
        self.listeners.attach(ParamSet::ALL, wakeup)
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radbuzz_protocol::{ICON_BYTE_SIZE, ICON_HEIGHT, ICON_WIDTH};

    fn icon(fill: u8) -> Vec<u8> {
        alloc::vec![fill; ICON_BYTE_SIZE]
    }

    #[test]
    fn test_insert_is_idempotent() {
        let cache = ImageCache::new();
        let w = u16::from(ICON_WIDTH);
        let h = u16::from(ICON_HEIGHT);

        assert_eq!(cache.insert(0xa7f7f833, w, h, &icon(0x55)), InsertOutcome::Inserted);
        assert_eq!(cache.insert(0xa7f7f833, w, h, &icon(0x55)), InsertOutcome::Duplicate);
        assert_eq!(cache.len(), 1);

        let image = cache.lookup(0xa7f7f833).unwrap();
        assert_eq!(image.data_size(), ICON_BYTE_SIZE + BLACK_WHITE_PALETTE.len());
        assert_eq!(&image.data()[..8], &BLACK_WHITE_PALETTE);
    }

    #[test]
    fn test_duplicate_key_keeps_first_content() {
        let cache = ImageCache::new();
        cache.insert(1, 8, 2, &[0xff, 0x00]);
        cache.insert(1, 8, 2, &[0x00, 0xff]);

        let image = cache.lookup(1).unwrap();
        assert_eq!(image.bitmap(), &[0xff, 0x00]);
        assert_eq!(image.pixel(0, 0), Some(true));
        assert_eq!(image.pixel(0, 1), Some(false));
        assert_eq!(image.pixel(8, 0), None);
    }

    #[test]
    fn test_duplicate_insert_keeps_handed_out_entry() {
        let cache = ImageCache::new();
        cache.insert(7, 8, 1, &[0x0f]);
        let held = cache.lookup(7).unwrap();

        assert_eq!(cache.insert(7, 8, 1, &[0xf0]), InsertOutcome::Duplicate);
        assert!(Arc::ptr_eq(&held, &cache.lookup(7).unwrap()));
        assert_eq!(held.bitmap(), &[0x0f]);
    }

    #[test]
    fn test_lookup_missing() {
        let cache = ImageCache::new();
        assert!(cache.lookup(42).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_wrong_size_is_rejected() {
        let cache = ImageCache::new();
        assert_eq!(cache.insert(1, 8, 2, &[0xff]), InsertOutcome::InvalidSize);
        assert!(cache.lookup(1).is_none());
    }

    #[test]
    fn test_capacity() {
        let cache = ImageCache::new();
        for key in 0..MAX_CACHED_IMAGES as u32 {
            assert_eq!(cache.insert(key, 8, 1, &[0]), InsertOutcome::Inserted);
        }
        assert_eq!(cache.insert(1000, 8, 1, &[0]), InsertOutcome::Full);
        assert_eq!(cache.len(), MAX_CACHED_IMAGES);
    }

    #[test]
    fn test_listeners_woken_on_new_entries_only() {
        let cache = ImageCache::new();
        let wakeup = Arc::new(Wakeup::new());
        let handle = cache.listen_to_changes(wakeup.clone()).unwrap();

        cache.insert(7, 8, 1, &[1]);
        assert!(wakeup.try_take().is_some());

        cache.insert(7, 8, 1, &[1]);
        assert!(wakeup.try_take().is_none());

        drop(handle);
        cache.insert(8, 8, 1, &[1]);
        assert!(wakeup.try_take().is_none());
    }
}
