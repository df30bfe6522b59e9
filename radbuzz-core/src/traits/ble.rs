//! GATT server capability

/// A BLE peripheral exposing one primary service of write characteristics
///
/// Writes received from the central are delivered to the application as
/// [`BleWrite`](crate::handlers::BleWrite) messages.
pub trait BleServer {
    /// Set the UUID of the primary service
    fn set_service_uuid(&mut self, uuid: u128);

    /// Expose a writable characteristic
    fn add_write_characteristic(&mut self, uuid: u128);

    /// Start advertising
    fn start(&mut self);
}
