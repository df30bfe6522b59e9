//! Background side of the tile cache
//!
//! Each activation:
//!
//! 1. Starts a city prefetch if the rider entered a new city tile. A city
//!    is persisted as prefetched only once every tile of its neighbourhood
//!    is on disk; a failed download leaves it to the next visit.
//! 2. Drains the cold-store queue: tiles requested by the renderer are read
//!    from `tiles/{zoom}/{x}/{y}.png` and decoded into an evicted slot.
//!    Missing files are queued for the tile server.
//! 3. Fetches at most one tile from the server and writes it to disk.
//!    Offline, direct requests are dropped; the renderer asks again.
//!    Queued prefetches and forced reloads are kept until back online.
//! 4. Drains the cold-store queue again, picking up what step 3 wrote.
//!
//! Tiles always go network → disk → decode, so a slot never holds a tile
//! that has not been stored.

use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::time::Duration;

use super::cache::{TileCache, TileImage};
use super::geo::{Tile, INVALID_TILE};
use crate::config::TileCacheConfig;
use crate::state::{
    ApplicationState, GpsPositionValid, ListenerHandle, Position, WifiConnected,
};
use crate::traits::{Filesystem, HttpClient, TileDecoder, Worker};

/// Persisted set of already prefetched city tiles
pub const PENDING_CITY_TILES_PATH: &str = "tiles/pending_city_tiles.bin";

/// Re-activation delay while downloads are pending
const ACTIVE_INTERVAL: Duration = Duration::from_millis(75);

/// Background owner of a [`TileCache`]
pub struct TileFetcher<'a, F, H, D> {
    cache: &'a TileCache,
    state: &'a ApplicationState,
    config: TileCacheConfig,
    filesystem: F,
    http: H,
    decoder: D,
    _listener: Option<ListenerHandle<'a>>,

    cold_store: VecDeque<Tile>,
    from_server: VecDeque<Tile>,
    from_server_background: VecDeque<Tile>,
    reload_from_server: VecDeque<Tile>,

    current_city_tile: Tile,
    pending_city_tiles: BTreeSet<Tile>,
    /// Cities being prefetched, with the number of tiles not yet on disk
    prefetching: BTreeMap<Tile, usize>,
}

impl<'a, F, H, D> TileFetcher<'a, F, H, D>
where
    F: Filesystem,
    H: HttpClient,
    D: TileDecoder,
{
    pub fn new(
        cache: &'a TileCache,
        state: &'a ApplicationState,
        config: TileCacheConfig,
        filesystem: F,
        http: H,
        decoder: D,
    ) -> Self {
        let listener = state
            .attach_listener::<(GpsPositionValid, WifiConnected, Position)>(cache.wakeup());
        if listener.is_none() {
            warn!("tile fetcher: no listener slot, prefetch only on demand");
        }

        Self {
            cache,
            state,
            config,
            filesystem,
            http,
            decoder,
            _listener: listener,
            cold_store: VecDeque::new(),
            from_server: VecDeque::new(),
            from_server_background: VecDeque::new(),
            reload_from_server: VecDeque::new(),
            current_city_tile: INVALID_TILE,
            pending_city_tiles: BTreeSet::new(),
            prefetching: BTreeMap::new(),
        }
    }

    /// Run one activation cycle
    ///
    /// Returns the delay until the next cycle while downloads are pending.
    pub fn activate(&mut self) -> Option<Duration> {
        self.refresh_city_tiles();

        self.fill_from_cold_store();
        self.fill_from_server();
        // Again, in case the server step has written tiles to disk
        self.fill_from_cold_store();

        let online = self.state.checkout_readonly().get::<WifiConnected>();
        let pending = !self.from_server.is_empty()
            || !self.from_server_background.is_empty()
            || !self.reload_from_server.is_empty();

        (online && pending).then_some(ACTIVE_INTERVAL)
    }

    /// Restore the prefetched city tiles from disk
    ///
    /// A file whose size is not a multiple of 8 bytes is ignored.
    pub fn load_pending_city_tiles(&mut self) {
        let Some(data) = self.filesystem.read_file(PENDING_CITY_TILES_PATH) else {
            return;
        };

        if data.len() % 8 != 0 {
            warn!(
                "tile fetcher: ignoring {} with odd size {}",
                PENDING_CITY_TILES_PATH,
                data.len()
            );
            return;
        }

        for chunk in data.chunks_exact(8) {
            let x = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let y = i32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
            self.pending_city_tiles.insert(Tile::new(x, y));
        }

        info!(
            "tile fetcher: {} city tiles already prefetched",
            self.pending_city_tiles.len()
        );
    }

    fn save_pending_city_tiles(&self) {
        let mut data = Vec::with_capacity(self.pending_city_tiles.len() * 8);
        for tile in &self.pending_city_tiles {
            data.extend_from_slice(&tile.x.to_le_bytes());
            data.extend_from_slice(&tile.y.to_le_bytes());
        }

        if !self.filesystem.write_file(PENDING_CITY_TILES_PATH, &data) {
            warn!("tile fetcher: failed to persist city tiles");
        }
    }

    fn refresh_city_tiles(&mut self) {
        let state = self.state.checkout_readonly();
        if !state.get::<GpsPositionValid>() {
            return;
        }

        let factor = i32::from(self.config.city_tile_factor);
        let city_tile = state.get::<Position>().pixel_position.to_tile().to_city_tile(factor);
        if city_tile == self.current_city_tile {
            return;
        }
        self.current_city_tile = city_tile;

        if self.pending_city_tiles.contains(&city_tile)
            || self.prefetching.contains_key(&city_tile)
        {
            return;
        }

        let center = city_tile.city_center(factor);
        let mut missing = 0;
        for dx in -factor..=factor {
            for dy in -factor..=factor {
                let tile = Tile::new(center.x + dx, center.y + dy);
                if self.filesystem.file_exists(&self.config.tile_path(tile)) {
                    continue;
                }
                // Still queued from an earlier, abandoned visit
                if !self.from_server_background.contains(&tile) {
                    self.from_server_background.push_back(tile);
                }
                missing += 1;
            }
        }

        info!(
            "tile fetcher: entered city tile {},{}, prefetching {} tiles",
            city_tile.x, city_tile.y, missing
        );

        if missing == 0 {
            self.mark_city_prefetched(city_tile);
        } else {
            self.prefetching.insert(city_tile, missing);
        }
    }

    /// Account for a prefetched tile leaving the background queue
    fn finish_background(&mut self, tile: Tile, stored: bool) {
        let city = tile.to_city_tile(i32::from(self.config.city_tile_factor));

        if !stored {
            if self.prefetching.remove(&city).is_some() {
                warn!(
                    "tile fetcher: prefetch of city tile {},{} incomplete",
                    city.x, city.y
                );
            }
            return;
        }

        let Some(missing) = self.prefetching.get_mut(&city) else {
            return;
        };
        *missing = missing.saturating_sub(1);
        if *missing == 0 {
            self.prefetching.remove(&city);
            self.mark_city_prefetched(city);
        }
    }

    fn mark_city_prefetched(&mut self, city: Tile) {
        debug!("tile fetcher: city tile {},{} prefetched", city.x, city.y);
        self.pending_city_tiles.insert(city);
        self.save_pending_city_tiles();
    }

    fn fill_from_cold_store(&mut self) {
        while let Some(tile) = self.cache.take_request() {
            if !self.cold_store.contains(&tile) {
                self.cold_store.push_back(tile);
            }
        }

        while let Some(tile) = self.cold_store.pop_front() {
            if !tile.is_valid() || self.cache.is_resident(tile) {
                continue;
            }

            match self.filesystem.read_file(&self.config.tile_path(tile)) {
                Some(data) => self.load_tile(tile, &data),
                None => {
                    self.from_server.retain(|t| *t != tile);
                    self.from_server.push_front(tile);
                }
            }
        }
    }

    fn load_tile(&mut self, tile: Tile, data: &[u8]) {
        let index = self.cache.evict_tile();
        let previous = self.cache.take_slot(index);
        // Reuse the slot's buffer unless a renderer still holds it
        let mut image = Arc::try_unwrap(previous).unwrap_or_else(|_| TileImage::new());

        match self.decoder.decode(data, &mut image) {
            Ok(()) => {
                debug!("tile fetcher: loaded {},{} into slot {}", tile.x, tile.y, index);
                self.cache.install(index, tile, image);
            }
            Err(e) => {
                warn!("tile fetcher: corrupt tile {},{}: {:?}", tile.x, tile.y, e);
                self.cache.clear_slot(index, image);

                if self.state.checkout_readonly().get::<WifiConnected>()
                    && !self.reload_from_server.contains(&tile)
                {
                    self.reload_from_server.push_back(tile);
                }
            }
        }
    }

    fn fill_from_server(&mut self) {
        if !self.state.checkout_readonly().get::<WifiConnected>() {
            if !self.from_server.is_empty() {
                debug!(
                    "tile fetcher: offline, dropping {} requests",
                    self.from_server.len()
                );
                self.from_server.clear();
            }
            return;
        }

        loop {
            let (tile, forced, foreground) = if let Some(tile) = self.reload_from_server.pop_front()
            {
                (tile, true, false)
            } else if let Some(tile) = self.from_server.pop_front() {
                (tile, false, true)
            } else if let Some(tile) = self.from_server_background.pop_front() {
                (tile, false, false)
            } else {
                return;
            };

            let path = self.config.tile_path(tile);
            let background = !forced && !foreground;
            if !forced && self.filesystem.file_exists(&path) {
                // Already on disk, probably fetched for another request
                if foreground {
                    self.cold_store.push_back(tile);
                } else {
                    self.finish_background(tile, true);
                }
                continue;
            }

            info!("tile fetcher: fetching {},{} from server", tile.x, tile.y);
            let stored = match self.http.get(&self.config.tile_url(tile)) {
                Some(data) => {
                    let stored = self.filesystem.write_file(&path, &data);
                    if !stored {
                        warn!("tile fetcher: failed to store {},{}", tile.x, tile.y);
                    } else if foreground {
                        self.cold_store.push_back(tile);
                    }
                    stored
                }
                None => {
                    warn!("tile fetcher: fetch of {},{} failed", tile.x, tile.y);
                    false
                }
            };
            if background {
                self.finish_background(tile, stored);
            }

            // One download per cycle
            return;
        }
    }
}

impl<F, H, D> Worker for TileFetcher<'_, F, H, D>
where
    F: Filesystem,
    H: HttpClient,
    D: TileDecoder,
{
    fn on_startup(&mut self) {
        self.load_pending_city_tiles();
    }

    fn on_activation(&mut self) -> Option<Duration> {
        self.activate()
    }
}
