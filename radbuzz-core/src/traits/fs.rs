//! Named blob storage

use alloc::vec::Vec;

/// Filesystem capability
///
/// Paths are `/`-separated and relative to the storage root. Failures are
/// reported as absence; callers treat an unreadable file as a cache miss.
pub trait Filesystem {
    /// Read a whole file, `None` if missing or unreadable
    fn read_file(&self, path: &str) -> Option<Vec<u8>>;

    /// Write a whole file, creating parent directories as needed
    ///
    /// Returns `false` if the file could not be written.
    fn write_file(&self, path: &str, data: &[u8]) -> bool;

    /// Check whether a file exists
    fn file_exists(&self, path: &str) -> bool;
}

impl<T: Filesystem + ?Sized> Filesystem for &T {
    fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        (**self).read_file(path)
    }

    fn write_file(&self, path: &str, data: &[u8]) -> bool {
        (**self).write_file(path, data)
    }

    fn file_exists(&self, path: &str) -> bool {
        (**self).file_exists(path)
    }
}
