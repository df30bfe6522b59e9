//! Map tiles
//!
//! - [`geo`]: WGS84 to Web-Mercator conversion, tile and city tile math
//! - [`cache`]: the shared, fixed-capacity set of decoded tiles
//! - [`fetcher`]: the background owner that fills the cache from the cold
//!   store and the tile server

pub mod cache;
pub mod fetcher;
pub mod geo;

pub use cache::{TileCache, TileImage, REQUEST_QUEUE_DEPTH};
pub use fetcher::{TileFetcher, PENDING_CITY_TILES_PATH};
pub use geo::{osm_point_to_wgs84, wgs84_to_osm_point, Point, Tile, INVALID_TILE, TILE_SIZE};
