//! Text dashboard
//!
//! Stands in for the display: requests the map tiles around the rider like
//! the renderer would and logs what the screen would show.

use std::sync::Arc;
use std::time::Duration;

use radbuzz_core::image_cache::ImageCache;
use radbuzz_core::state::{
    ApplicationState, BatteryMillivolts, CurrentIconHash, DistanceToNext, Eta, GpsPositionValid,
    ListenerHandle, NextStreet, Position, Speed, Wakeup,
};
use radbuzz_core::tile::{Tile, TileCache};
use radbuzz_core::traits::Worker;

/// Screen refresh interval
const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Tiles visible around the rider in each direction
const VIEW_RADIUS: i32 = 1;

pub struct Dashboard<'a> {
    state: &'a ApplicationState,
    tiles: &'a TileCache,
    images: &'a ImageCache,
    wakeup: Arc<Wakeup>,
    _state_listener: Option<ListenerHandle<'a>>,
    _image_listener: Option<ListenerHandle<'a>>,
}

impl<'a> Dashboard<'a> {
    pub fn new(state: &'a ApplicationState, tiles: &'a TileCache, images: &'a ImageCache) -> Self {
        let wakeup = Arc::new(Wakeup::new());
        let state_listener =
            state.attach_listener::<(NextStreet, CurrentIconHash)>(wakeup.clone());
        let image_listener = images.listen_to_changes(wakeup.clone());

        Self {
            state,
            tiles,
            images,
            wakeup,
            _state_listener: state_listener,
            _image_listener: image_listener,
        }
    }

    pub fn wakeup(&self) -> Arc<Wakeup> {
        self.wakeup.clone()
    }

    /// Request the visible tiles, returns how many are loaded
    fn draw_map(&self, center: Tile) -> usize {
        let mut loaded = 0;
        for dx in -VIEW_RADIUS..=VIEW_RADIUS {
            for dy in -VIEW_RADIUS..=VIEW_RADIUS {
                let tile = Tile::new(center.x + dx, center.y + dy);
                let _image = self.tiles.get_tile(tile);
                if self.tiles.is_resident(tile) {
                    loaded += 1;
                }
            }
        }
        loaded
    }
}

impl Worker for Dashboard<'_> {
    fn on_activation(&mut self) -> Option<Duration> {
        let ro = self.state.checkout_readonly();

        let tiles_loaded = if ro.get::<GpsPositionValid>() {
            let center = ro.get::<Position>().pixel_position.to_tile();
            self.draw_map(center)
        } else {
            0
        };

        let icon_key = ro.get::<CurrentIconHash>();
        let icon_cached = icon_key != 0 && self.images.lookup(icon_key).is_some();

        tracing::info!(
            speed = ro.get::<Speed>(),
            battery_mv = ro.get::<BatteryMillivolts>(),
            street = %ro.get::<NextStreet>(),
            distance_to_next = ro.get::<DistanceToNext>(),
            eta = %ro.get::<Eta>(),
            icon_cached,
            tiles_loaded,
            "dashboard"
        );

        Some(REFRESH_INTERVAL)
    }
}
