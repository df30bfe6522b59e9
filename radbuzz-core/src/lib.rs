//! Board-agnostic core logic for the Radbuzz dashboard
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Shared application state with change notification
//! - Map tile cache and its background fetcher
//! - Navigation icon cache
//! - Handlers for GPS, BLE, motor telemetry, speedometer and buzzers
//! - Capability traits implemented by the platform
//! - Configuration type definitions
//!
//! Logging goes through `defmt` or `log`, selected by the feature of the
//! same name.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

#[macro_use]
mod fmt;

pub mod config;
pub mod handlers;
pub mod image_cache;
pub mod state;
pub mod tile;
pub mod traits;

#[cfg(test)]
mod mock;
