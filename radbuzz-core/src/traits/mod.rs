//! Capability traits
//!
//! These traits define the interface between the application logic and
//! the platform: storage, network, radio, image decoding, actuators and the
//! worker runtime that drives everything.

pub mod ble;
pub mod decoder;
pub mod fs;
pub mod http;
pub mod stepper;
pub mod worker;

pub use ble::BleServer;
pub use decoder::{DecodeError, TileDecoder};
pub use fs::Filesystem;
pub use http::HttpClient;
pub use stepper::{Direction, StepperDriver};
pub use worker::Worker;
