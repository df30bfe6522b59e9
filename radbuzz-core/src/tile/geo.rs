//! Map coordinates
//!
//! Web-Mercator pixel coordinates with 256 px tiles, as used by the OSM
//! tile servers. A "city tile" groups `(2k+1)²` map tiles and is the unit
//! of prefetch tracking.

use core::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::state::GpsPosition;

/// Width and height of a map tile in pixels
pub const TILE_SIZE: i32 = 256;

/// Largest latitude representable in Web-Mercator
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Map tile coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

/// Marks an empty cache slot
pub const INVALID_TILE: Tile = Tile {
    x: i32::MIN,
    y: i32::MIN,
};

impl Tile {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Pixel coordinate of the tile's top-left corner
    pub const fn to_point(self) -> Point {
        Point {
            x: self.x * TILE_SIZE,
            y: self.y * TILE_SIZE,
        }
    }

    /// City tile containing this tile
    pub const fn to_city_tile(self, factor: i32) -> Tile {
        let side = 2 * factor + 1;
        Tile {
            x: self.x.div_euclid(side),
            y: self.y.div_euclid(side),
        }
    }

    /// Centre map tile of a city tile
    pub const fn city_center(self, factor: i32) -> Tile {
        let side = 2 * factor + 1;
        Tile {
            x: self.x * side + factor,
            y: self.y * side + factor,
        }
    }

    pub fn is_valid(&self) -> bool {
        *self != INVALID_TILE
    }
}

impl Default for Tile {
    fn default() -> Self {
        INVALID_TILE
    }
}

/// Pixel coordinate at a given zoom level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Map tile containing this pixel
    pub const fn to_tile(self) -> Tile {
        Tile {
            x: self.x.div_euclid(TILE_SIZE),
            y: self.y.div_euclid(TILE_SIZE),
        }
    }
}

/// Convert a WGS84 position to pixel coordinates at `zoom`
///
/// Returns `None` for positions outside the Web-Mercator range.
pub fn wgs84_to_osm_point(position: GpsPosition, zoom: u8) -> Option<Point> {
    let latitude = f64::from(position.latitude);
    let longitude = f64::from(position.longitude);

    if !latitude.is_finite()
        || !longitude.is_finite()
        || libm::fabs(latitude) > MAX_LATITUDE
        || libm::fabs(longitude) > 180.0
    {
        return None;
    }

    let n = libm::exp2(f64::from(zoom));
    let lat_rad = latitude.to_radians();

    let x = (longitude + 180.0) / 360.0 * n;
    let y = (1.0 - libm::asinh(libm::tan(lat_rad)) / PI) / 2.0 * n;

    Some(Point {
        x: libm::floor(x * f64::from(TILE_SIZE)) as i32,
        y: libm::floor(y * f64::from(TILE_SIZE)) as i32,
    })
}

/// Convert pixel coordinates at `zoom` back to a WGS84 position
pub fn osm_point_to_wgs84(point: Point, zoom: u8) -> GpsPosition {
    let n = libm::exp2(f64::from(zoom));

    let x = f64::from(point.x) / f64::from(TILE_SIZE);
    let y = f64::from(point.y) / f64::from(TILE_SIZE);

    let longitude = x / n * 360.0 - 180.0;
    let lat_rad = libm::atan(libm::sinh(PI * (1.0 - 2.0 * y / n)));

    GpsPosition {
        latitude: lat_rad.to_degrees() as f32,
        longitude: longitude as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Malmö central station
    const MALMO: GpsPosition = GpsPosition::new(55.609_1, 13.000_8);

    #[test]
    fn test_known_tile() {
        let point = wgs84_to_osm_point(MALMO, 15).unwrap();
        assert_eq!(point.to_tile(), Tile::new(17567, 10267));
    }

    #[test]
    fn test_origin() {
        let point = wgs84_to_osm_point(GpsPosition::new(0.0, 0.0), 1).unwrap();
        assert_eq!(point, Point::new(256, 256));
    }

    #[test]
    fn test_out_of_range() {
        assert!(wgs84_to_osm_point(GpsPosition::new(89.0, 0.0), 15).is_none());
        assert!(wgs84_to_osm_point(GpsPosition::new(0.0, 181.0), 15).is_none());
        assert!(wgs84_to_osm_point(GpsPosition::new(f32::NAN, 0.0), 15).is_none());
    }

    #[test]
    fn test_round_trip_is_close() {
        let point = wgs84_to_osm_point(MALMO, 15).unwrap();
        let back = osm_point_to_wgs84(point, 15);
        assert!((back.latitude - MALMO.latitude).abs() < 1e-4);
        assert!((back.longitude - MALMO.longitude).abs() < 1e-4);
    }

    #[test]
    fn test_city_tiles() {
        let tile = Tile::new(17567, 10267);
        let city = tile.to_city_tile(4);
        assert_eq!(city, Tile::new(1951, 1140));
        assert_eq!(city.city_center(4), Tile::new(17563, 10264));

        // Every tile of the region maps back to the same city tile
        let center = city.city_center(4);
        for dx in -4..=4 {
            for dy in -4..=4 {
                let t = Tile::new(center.x + dx, center.y + dy);
                assert_eq!(t.to_city_tile(4), city);
            }
        }
    }

    #[test]
    fn test_tile_point_conversion() {
        let tile = Tile::new(3, 7);
        assert_eq!(tile.to_point(), Point::new(768, 1792));
        assert_eq!(Point::new(768 + 255, 1792 + 1).to_tile(), tile);
        assert!(!INVALID_TILE.is_valid());
    }
}
