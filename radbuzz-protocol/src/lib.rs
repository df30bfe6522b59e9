//! Radbuzz wire protocols
//!
//! This crate defines the byte-level contracts between the dashboard and the
//! outside world:
//!
//! - The framed serial link to the vehicle controller:
//! ```text
//! ┌──────┬──────┬─────────┬────────┬─────────────┬──────────┬──────┬──────┐
//! │ 0x3A │ 0x16 │ COMMAND │ LENGTH │ PAYLOAD     │ CHECKSUM │ 0x0D │ 0x0A │
//! │ 1B   │ 1B   │ 1B      │ 1B     │ 0–255B      │ 2B (LE)  │ 1B   │ 1B   │
//! └──────┴──────┴─────────┴────────┴─────────────┴──────────┴──────┴──────┘
//! ```
//! - Navigation text written by the phone app over BLE (`key=value` lines)
//! - Turn-by-turn icon bitmaps written by the phone app over BLE
//!
//! Everything here is `no_std` and allocation free.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod icon;
pub mod nav;
pub mod packet;

pub use icon::{IconError, IconPayload, ICON_BYTE_SIZE, ICON_HEIGHT, ICON_WIDTH};
pub use nav::{NavError, NavigationInfo};
pub use packet::{
    build_tx_packet, FrameError, Packet, PacketFramer, ParseState, Payload, MAX_PAYLOAD_SIZE,
};
