//! GPS fix accumulation
//!
//! Receivers report position, speed and heading in separate sentences. The
//! reader collects the latest of each and publishes a complete fix once all
//! three have arrived.

use core::time::Duration;

use super::MessagePort;
use crate::state::{ApplicationState, GpsData, GpsPosition, GpsPositionValid, Position};
use crate::tile::{wgs84_to_osm_point, Point};
use crate::traits::Worker;

/// Depth of the receiver → reader queue
pub const GPS_QUEUE_DEPTH: usize = 8;

/// Partial fix as reported by the receiver
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawGpsData {
    pub position: Option<GpsPosition>,
    /// Ground speed in km/h
    pub speed: Option<f32>,
    /// Heading in degrees
    pub heading: Option<f32>,
}

impl RawGpsData {
    /// Overlay the fields present in `newer`
    fn merge(&mut self, newer: RawGpsData) {
        self.position = newer.position.or(self.position);
        self.speed = newer.speed.or(self.speed);
        self.heading = newer.heading.or(self.heading);
    }

    fn complete(&self) -> Option<(GpsPosition, f32, f32)> {
        Some((self.position?, self.speed?, self.heading?))
    }
}

pub type GpsPort = MessagePort<RawGpsData, GPS_QUEUE_DEPTH>;

/// Publishes complete fixes to the `position` parameter
pub struct GpsReader<'a> {
    state: &'a ApplicationState,
    port: &'a GpsPort,
    zoom: u8,
    pending: RawGpsData,
}

impl<'a> GpsReader<'a> {
    /// `zoom` is the map zoom level used for pixel positions
    pub fn new(state: &'a ApplicationState, port: &'a GpsPort, zoom: u8) -> Self {
        Self {
            state,
            port,
            zoom,
            pending: RawGpsData::default(),
        }
    }

    /// Fold in one partial fix, publishing when complete
    pub fn handle(&mut self, data: RawGpsData) {
        self.pending.merge(data);

        let Some((position, speed, heading)) = self.pending.complete() else {
            return;
        };
        self.pending = RawGpsData::default();

        let pixel_position = wgs84_to_osm_point(position, self.zoom).unwrap_or_else(|| {
            warn!(
                "gps: position {},{} outside the map",
                position.latitude, position.longitude
            );
            Point::new(0, 0)
        });

        let mut snapshot = self
            .state
            .checkout_partial_snapshot::<(Position, GpsPositionValid)>();
        snapshot.set::<Position>(GpsData {
            position,
            pixel_position,
            speed,
            heading,
        });
        snapshot.set::<GpsPositionValid>(true);
    }
}

impl Worker for GpsReader<'_> {
    fn on_activation(&mut self) -> Option<Duration> {
        while let Some(data) = self.port.receive() {
            self.handle(data);
        }
        None
    }
}
