//! Configuration types
//!
//! Board-agnostic configuration structures. The application fills them from
//! its configuration file; every struct has defaults matching the stock
//! dashboard.

pub mod types;

pub use types::*;
