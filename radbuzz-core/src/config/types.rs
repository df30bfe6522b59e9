//! Configuration type definitions

use alloc::format;
use alloc::string::{String as AllocString, ToString};
use heapless::String;

use crate::tile::{Tile, TILE_SIZE};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum tile URL template length
pub const MAX_URL_TEMPLATE_LEN: usize = 128;

/// Maximum API key length
pub const MAX_API_KEY_LEN: usize = 64;

/// Thunderforest OpenCycleMap tiles
pub const DEFAULT_TILE_URL_TEMPLATE: &str =
    "https://tile.thunderforest.com/cycle/{z}/{x}/{y}.png?apikey={key}";

/// Bytes of one decoded RGB565 tile
pub const TILE_BYTE_SIZE: usize = (TILE_SIZE * TILE_SIZE) as usize * 2;

/// Highest zoom level served by the tile servers
pub const MAX_ZOOM: u8 = 20;

/// Largest supported city tile factor
pub const MAX_CITY_TILE_FACTOR: u8 = 8;

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Zoom level above `MAX_ZOOM`
    InvalidZoom(u8),
    /// Tile budget too small to hold a single tile
    CacheTooSmall,
    /// City tile factor of zero or above `MAX_CITY_TILE_FACTOR`
    InvalidCityTileFactor(u8),
    /// URL template lacks an `{x}` or `{y}` placeholder
    InvalidUrlTemplate,
    /// Speedometer range of zero
    InvalidSpeedometerRange,
}

/// Map tile cache configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TileCacheConfig {
    /// Map zoom level
    pub zoom: u8,
    /// Memory budget for decoded tiles in MiB
    pub cache_mib: u16,
    /// A city tile spans `2 * factor + 1` map tiles per side
    pub city_tile_factor: u8,
    /// Origin URL with `{z}`, `{x}`, `{y}` and `{key}` placeholders
    pub url_template: String<MAX_URL_TEMPLATE_LEN>,
    /// API key substituted for `{key}`
    pub api_key: String<MAX_API_KEY_LEN>,
}

impl TileCacheConfig {
    /// Number of tile slots that fit in the memory budget
    pub fn capacity(&self) -> usize {
        usize::from(self.cache_mib) * 1024 * 1024 / TILE_BYTE_SIZE
    }

    /// Cold-store path of a tile
    pub fn tile_path(&self, tile: Tile) -> AllocString {
        format!("tiles/{}/{}/{}.png", self.zoom, tile.x, tile.y)
    }

    /// Origin URL of a tile
    pub fn tile_url(&self, tile: Tile) -> AllocString {
        self.url_template
            .replace("{z}", &self.zoom.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
            .replace("{key}", &self.api_key)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zoom > MAX_ZOOM {
            return Err(ConfigError::InvalidZoom(self.zoom));
        }
        if self.capacity() == 0 {
            return Err(ConfigError::CacheTooSmall);
        }
        if self.city_tile_factor == 0 || self.city_tile_factor > MAX_CITY_TILE_FACTOR {
            return Err(ConfigError::InvalidCityTileFactor(self.city_tile_factor));
        }
        if !self.url_template.contains("{x}") || !self.url_template.contains("{y}") {
            return Err(ConfigError::InvalidUrlTemplate);
        }
        Ok(())
    }
}

impl Default for TileCacheConfig {
    fn default() -> Self {
        let mut url_template = String::new();
        // Fits: the constant is shorter than MAX_URL_TEMPLATE_LEN
        let _ = url_template.push_str(DEFAULT_TILE_URL_TEMPLATE);

        Self {
            zoom: 15,
            cache_mib: 4,
            city_tile_factor: 4,
            url_template,
            api_key: String::new(),
        }
    }
}

/// Speedometer needle configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpeedometerConfig {
    /// Speed at full needle deflection (km/h)
    pub max_speed_kmh: u8,
    /// Steps from zero to full deflection
    pub zero_to_max_steps: u32,
}

impl SpeedometerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_speed_kmh == 0 || self.zero_to_max_steps == 0 {
            return Err(ConfigError::InvalidSpeedometerRange);
        }
        Ok(())
    }
}

impl Default for SpeedometerConfig {
    fn default() -> Self {
        Self {
            max_speed_kmh: 60,
            zero_to_max_steps: 6000,
        }
    }
}

/// Turn alert configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BuzzerConfig {
    /// Announce a turn once it is this close (m)
    pub alert_distance_m: u32,
    /// Number of buzzer pulses per announcement
    pub pulses: u8,
    /// Length of each on and off phase (ms)
    pub pulse_ms: u16,
}

impl Default for BuzzerConfig {
    fn default() -> Self {
        Self {
            alert_distance_m: 100,
            pulses: 2,
            pulse_ms: 250,
        }
    }
}
