//! Tile image decoding

use crate::tile::TileImage;

/// Errors that can occur while decoding a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Data is not a valid image
    Malformed,
    /// Image dimensions do not match the tile
    SizeMismatch { width: u32, height: u32 },
    /// Pixel format the decoder cannot convert
    Unsupported,
}

/// Decodes compressed tile data into an RGB565 tile
///
/// Implementations must check the image size against [`TileImage`] before
/// writing any pixel, and report [`DecodeError::SizeMismatch`] otherwise.
pub trait TileDecoder {
    fn decode(&self, data: &[u8], out: &mut TileImage) -> Result<(), DecodeError>;
}
