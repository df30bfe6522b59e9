//! Turn-by-turn navigation text from the phone app
//!
//! The phone writes newline-separated `key=value` lines to the navigation
//! characteristic:
//!
//! ```text
//! nextRd=Braxvägen
//! nextRdDesc=
//! distToNext=120 m
//! totalDist=1.2 km
//! eta=15:51
//! ete=2 min
//! iconHash=a7f7f83332
//! ```
//!
//! Unknown keys and lines without `=` are ignored. Empty values are treated
//! as absent.

use core::str;

/// Errors that can occur while parsing navigation text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NavError {
    /// Text is not valid UTF-8
    InvalidUtf8,
}

/// Parsed navigation update, borrowing from the received text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NavigationInfo<'a> {
    /// Name of the next road (`nextRd`)
    pub next_road: Option<&'a str>,
    /// Description of the next road (`nextRdDesc`)
    pub next_road_desc: Option<&'a str>,
    /// Distance to the next turn in meters (`distToNext`)
    pub distance_to_next_m: Option<u32>,
    /// Remaining route distance in meters (`totalDist`)
    pub total_distance_m: Option<u32>,
    /// Estimated time of arrival, as displayed (`eta`)
    pub eta: Option<&'a str>,
    /// Estimated time enroute, as displayed (`ete`)
    pub ete: Option<&'a str>,
    /// Icon key of the next maneuver (`iconHash`)
    pub icon_hash: Option<u32>,
}

impl<'a> NavigationInfo<'a> {
    /// Parse a navigation text block
    pub fn parse(data: &'a [u8]) -> Result<Self, NavError> {
        let text = str::from_utf8(data).map_err(|_| NavError::InvalidUtf8)?;
        let mut info = NavigationInfo::default();

        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key.trim() {
                "nextRd" => info.next_road = Some(value),
                "nextRdDesc" => info.next_road_desc = Some(value),
                "distToNext" => info.distance_to_next_m = parse_distance_m(value),
                "totalDist" => info.total_distance_m = parse_distance_m(value),
                "eta" => info.eta = Some(value),
                "ete" => info.ete = Some(value),
                "iconHash" => info.icon_hash = parse_icon_key(value.as_bytes()),
                _ => {}
            }
        }

        Ok(info)
    }
}

/// Parse the icon key: the first 8 hex characters of the icon hash
pub fn parse_icon_key(hash: &[u8]) -> Option<u32> {
    let digits = hash.get(..8)?;
    let digits = str::from_utf8(digits).ok()?;
    u32::from_str_radix(digits, 16).ok()
}

/// Parse a displayed distance such as `120 m` or `1.2 km` into meters
pub fn parse_distance_m(value: &str) -> Option<u32> {
    let value = value.trim();
    let (number, scale) = if let Some(km) = value.strip_suffix("km") {
        (km.trim(), 1000)
    } else if let Some(m) = value.strip_suffix('m') {
        (m.trim(), 1)
    } else {
        (value, 1)
    };

    let (whole, fraction) = match number.split_once(['.', ',']) {
        Some((whole, fraction)) => (whole, fraction),
        None => (number, ""),
    };

    let whole: u32 = whole.parse().ok()?;
    let mut meters = whole.checked_mul(scale)?;

    // Decimals only carry meaning for km
    let mut unit = scale / 10;
    for c in fraction.chars() {
        let digit = c.to_digit(10)?;
        meters = meters.checked_add(digit * unit)?;
        unit /= 10;
    }

    Some(meters)
}
