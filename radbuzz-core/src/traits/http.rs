//! Origin fetch over HTTP

use alloc::vec::Vec;

/// HTTP client capability
pub trait HttpClient {
    /// Fetch `url`, returning the body of a successful response
    ///
    /// Any transport error or non-success status yields `None`.
    fn get(&self, url: &str) -> Option<Vec<u8>>;
}

impl<T: HttpClient + ?Sized> HttpClient for &T {
    fn get(&self, url: &str) -> Option<Vec<u8>> {
        (**self).get(url)
    }
}
