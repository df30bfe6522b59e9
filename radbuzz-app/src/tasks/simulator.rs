//! Ride simulator
//!
//! Plays the part of the GPS receiver, the phone and the motor controller:
//! rides a fixed route through Malmö and feeds fixes, navigation writes and
//! telemetry into the message ports at the configured tick.

use std::f64::consts::PI;
use std::thread;
use std::time::Duration;

use radbuzz_core::handlers::{BleWrite, Characteristic, RawGpsData, VescStatus};
use radbuzz_core::state::{BluetoothConnected, GpsPosition, WifiConnected};
use radbuzz_protocol::ICON_BYTE_SIZE;

use crate::channels::Shared;
use crate::config::SimulatorConfig;

/// Cruising speed (km/h)
const RIDE_SPEED_KMH: f32 = 22.0;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A turn on the route
#[derive(Debug, Clone, Copy)]
pub struct Waypoint {
    pub position: GpsPosition,
    /// Street taken after the turn
    pub street: &'static str,
}

const fn waypoint(latitude: f32, longitude: f32, street: &'static str) -> Waypoint {
    Waypoint {
        position: GpsPosition::new(latitude, longitude),
        street,
    }
}

/// Malmö C to Möllevångstorget
pub const ROUTE: [Waypoint; 5] = [
    waypoint(55.6090, 13.0004, "Norra Vallgatan"),
    waypoint(55.6055, 12.9990, "Stortorget"),
    waypoint(55.6010, 13.0020, "Södra Förstadsgatan"),
    waypoint(55.5935, 13.0060, "Bergsgatan"),
    waypoint(55.5915, 13.0105, "Möllevångstorget"),
];

/// Rider state at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RideSample {
    pub position: GpsPosition,
    /// Degrees clockwise from north
    pub heading: f32,
    pub speed_kmh: f32,
    /// Index of the upcoming waypoint
    pub next: usize,
    pub distance_to_next_m: u32,
    pub total_distance_m: u32,
}

/// Constant-speed ride along a list of waypoints
pub struct Ride<'r> {
    route: &'r [Waypoint],
    speed_kmh: f32,
    /// Leg currently ridden, from `route[leg]` to `route[leg + 1]`
    leg: usize,
    /// Meters covered on the current leg
    covered_m: f64,
}

impl<'r> Ride<'r> {
    pub fn new(route: &'r [Waypoint], speed_kmh: f32) -> Self {
        Self {
            route,
            speed_kmh,
            leg: 0,
            covered_m: 0.0,
        }
    }

    /// Ride for `dt`, `None` once the last waypoint is reached
    pub fn advance(&mut self, dt: Duration) -> Option<RideSample> {
        self.covered_m += f64::from(self.speed_kmh) / 3.6 * dt.as_secs_f64();

        loop {
            let (from, to) = (self.route.get(self.leg)?, self.route.get(self.leg + 1)?);
            let length = distance_m(from.position, to.position);
            if self.covered_m < length {
                return Some(self.sample(from, to, length));
            }
            self.covered_m -= length;
            self.leg += 1;
        }
    }

    fn sample(&self, from: &Waypoint, to: &Waypoint, length: f64) -> RideSample {
        let t = self.covered_m / length;
        let lerp = |a: f32, b: f32| (f64::from(a) + (f64::from(b) - f64::from(a)) * t) as f32;
        let position = GpsPosition::new(
            lerp(from.position.latitude, to.position.latitude),
            lerp(from.position.longitude, to.position.longitude),
        );

        let to_next = length - self.covered_m;
        let remaining: f64 = self.route[self.leg + 1..]
            .windows(2)
            .map(|pair| distance_m(pair[0].position, pair[1].position))
            .sum();

        RideSample {
            position,
            heading: bearing_deg(from.position, to.position),
            speed_kmh: self.speed_kmh,
            next: self.leg + 1,
            distance_to_next_m: to_next as u32,
            total_distance_m: (to_next + remaining) as u32,
        }
    }
}

/// Great-circle distance
pub fn distance_m(a: GpsPosition, b: GpsPosition) -> f64 {
    let (lat1, lat2) = (radians(a.latitude), radians(b.latitude));
    let dlat = lat2 - lat1;
    let dlon = radians(b.longitude) - radians(a.longitude);

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Initial bearing from `a` to `b`
pub fn bearing_deg(a: GpsPosition, b: GpsPosition) -> f32 {
    let (lat1, lat2) = (radians(a.latitude), radians(b.latitude));
    let dlon = radians(b.longitude) - radians(a.longitude);

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    (y.atan2(x).to_degrees().rem_euclid(360.0)) as f32
}

fn radians(degrees: f32) -> f64 {
    f64::from(degrees) * PI / 180.0
}

/// Icon hash as sent by the phone, the key is its first 8 characters
fn icon_hash(waypoint: usize) -> String {
    format!("{:08x}{:02x}", 0xa7f7_f800_u32 + waypoint as u32, waypoint)
}

/// Icon write: `<hash>;` followed by a bitmap
fn icon_write(waypoint: usize) -> BleWrite {
    let mut data = format!("{};", icon_hash(waypoint)).into_bytes();
    data.extend((0..ICON_BYTE_SIZE).map(|i| if (i / 8 + waypoint) % 2 == 0 { 0xff } else { 0x00 }));
    BleWrite::new(Characteristic::TurnIcon, &data)
}

fn navigation_write(sample: &RideSample, route: &[Waypoint]) -> BleWrite {
    let street = route.get(sample.next).map_or("", |w| w.street);
    let ete_min = (f64::from(sample.total_distance_m) / (f64::from(sample.speed_kmh) / 0.06)).ceil();
    let text = format!(
        "nextRd={}\nnextRdDesc=\ndistToNext={} m\ntotalDist={} m\neta=--:--\nete={} min\niconHash={}",
        street,
        sample.distance_to_next_m,
        sample.total_distance_m,
        ete_min,
        icon_hash(sample.next)
    );
    BleWrite::new(Characteristic::Navigation, text.as_bytes())
}

/// Ride the route, blocking until done or `config.duration_s` has passed
pub fn run_ride(shared: &Shared, config: &SimulatorConfig) {
    let rw = shared.state.checkout_read_write();
    rw.set::<WifiConnected>(config.online);
    rw.set::<BluetoothConnected>(true);

    let tick = Duration::from_millis(u64::from(config.tick_ms.max(1)));
    let duration = Duration::from_secs(u64::from(config.duration_s));
    let mut ride = Ride::new(&ROUTE, RIDE_SPEED_KMH);
    let mut elapsed = Duration::ZERO;
    let mut announced = None;
    let mut battery_v = 42.0_f32;

    tracing::info!(duration_s = config.duration_s, online = config.online, "ride started");

    while elapsed < duration {
        let Some(sample) = ride.advance(tick) else {
            tracing::info!("destination reached");
            break;
        };

        // Receivers report position and motion in separate sentences
        shared.gps.send(RawGpsData {
            position: Some(sample.position),
            ..RawGpsData::default()
        });
        shared.gps.send(RawGpsData {
            position: None,
            speed: Some(sample.speed_kmh),
            heading: Some(sample.heading),
        });

        battery_v -= 0.002;
        shared.telemetry.send(VescStatus::Status1 {
            rpm: sample.speed_kmh as i32,
        });
        shared.telemetry.send(VescStatus::Status4 {
            temp_fet: 38.0,
            temp_motor: 45.0,
        });
        shared.telemetry.send(VescStatus::Status5 {
            input_voltage: battery_v,
        });

        if announced != Some(sample.next) {
            shared.ble.send(icon_write(sample.next));
            announced = Some(sample.next);
        }
        shared.ble.send(navigation_write(&sample, &ROUTE));

        thread::sleep(tick);
        elapsed += tick;
    }

    tracing::info!(elapsed_s = elapsed.as_secs(), "ride finished");
}
