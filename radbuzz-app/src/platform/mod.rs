//! Host implementations of the core capability traits

pub mod decoder;
pub mod devices;
pub mod fs;
pub mod http;

pub use decoder::PngTileDecoder;
pub use devices::{LoggingBleServer, LoggingPin, LoggingStepper};
pub use fs::DirFilesystem;
pub use http::ReqwestHttpClient;
