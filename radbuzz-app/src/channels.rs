//! Process-wide shared objects
//!
//! State, caches and message ports live for the whole run and are shared
//! by reference between worker threads.

use static_cell::StaticCell;

use radbuzz_core::handlers::{BlePort, GpsPort, TelemetryPort};
use radbuzz_core::image_cache::ImageCache;
use radbuzz_core::state::ApplicationState;
use radbuzz_core::tile::TileCache;

/// Everything shared between the workers and the simulator
pub struct Shared {
    pub state: ApplicationState,
    pub tiles: TileCache,
    pub images: ImageCache,
    /// GPS receiver → GPS reader
    pub gps: GpsPort,
    /// Radio → BLE handler
    pub ble: BlePort,
    /// CAN bus → telemetry handler
    pub telemetry: TelemetryPort,
}

impl Shared {
    pub fn new(tile_slots: usize) -> Self {
        Self {
            state: ApplicationState::new(),
            tiles: TileCache::new(tile_slots),
            images: ImageCache::new(),
            gps: GpsPort::new(),
            ble: BlePort::new(),
            telemetry: TelemetryPort::new(),
        }
    }
}

static SHARED: StaticCell<Shared> = StaticCell::new();

/// Create the shared objects, once per process
pub fn init_shared(tile_slots: usize) -> &'static Shared {
    SHARED.init(Shared::new(tile_slots))
}
