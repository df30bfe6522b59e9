//! Host configuration
//!
//! Loaded from TOML: a file given on the command line, `./radbuzz.toml`, or
//! the copy compiled into the binary.

pub mod loader;

use std::path::PathBuf;

use serde::Deserialize;

use radbuzz_core::config::{BuzzerConfig, SpeedometerConfig, TileCacheConfig};

pub use loader::{load_config, ConfigError, API_KEY_ENV};

/// Ride simulator settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Length of the simulated ride in seconds
    pub duration_s: u32,
    /// Interval between GPS fixes in milliseconds
    pub tick_ms: u32,
    /// Report network connectivity
    pub online: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            duration_s: 120,
            tick_ms: 1000,
            online: true,
        }
    }
}

/// Complete host configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the tile cold store
    pub data_dir: PathBuf,
    pub tiles: TileCacheConfig,
    pub speedometer: SpeedometerConfig,
    pub buzzer: BuzzerConfig,
    pub simulator: SimulatorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./app_data"),
            tiles: TileCacheConfig::default(),
            speedometer: SpeedometerConfig::default(),
            buzzer: BuzzerConfig::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}
