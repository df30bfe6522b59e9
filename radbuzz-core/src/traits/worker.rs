//! Independently scheduled activity

use core::time::Duration;

/// A unit of work driven by the runtime
///
/// The runtime calls `on_startup` once, then `on_activation` every time the
/// worker's wakeup is signalled or the timeout it returned last expires.
pub trait Worker {
    /// Called once before the first activation
    fn on_startup(&mut self) {}

    /// Handle an activation
    ///
    /// Returns the delay until the next timed activation, or `None` to
    /// sleep until woken.
    fn on_activation(&mut self) -> Option<Duration>;
}
