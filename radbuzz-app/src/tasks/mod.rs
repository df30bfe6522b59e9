//! Host tasks
//!
//! Workers run on their own threads through [`runtime`]; the ride
//! simulator runs on the main thread and feeds them.

pub mod dashboard;
pub mod runtime;
pub mod simulator;

pub use dashboard::Dashboard;
pub use runtime::{spawn_worker, wait_for_activation};
pub use simulator::run_ride;
