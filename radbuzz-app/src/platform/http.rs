//! Tile downloads over HTTPS

use std::time::Duration;

use radbuzz_core::traits::HttpClient;

/// Blocking [`HttpClient`] backed by `reqwest`
pub struct ReqwestHttpClient {
    client: reqwest::blocking::Client,
}

impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("radbuzz/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestHttpClient {
    fn get(&self, url: &str) -> Option<Vec<u8>> {
        let result = self
            .client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.bytes());

        match result {
            Ok(body) => Some(body.to_vec()),
            Err(e) => {
                let status = e.status();
                // The URL carries the API key
                tracing::warn!(error = %e.without_url(), ?status, "tile download failed");
                None
            }
        }
    }
}
