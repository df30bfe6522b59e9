//! Value types stored in the application state

use crate::tile::Point;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// WGS84 position in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GpsPosition {
    pub latitude: f32,
    pub longitude: f32,
}

impl GpsPosition {
    pub const fn new(latitude: f32, longitude: f32) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A complete GPS fix
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GpsData {
    /// Position in degrees
    pub position: GpsPosition,
    /// Position in map pixel coordinates at the map zoom level
    pub pixel_position: Point,
    /// Ground speed in km/h
    pub speed: f32,
    /// Heading in degrees, clockwise from north
    pub heading: f32,
}
