//! PNG tile decoding

use image::{ImageError, ImageFormat};

use radbuzz_core::tile::TileImage;
use radbuzz_core::traits::{DecodeError, TileDecoder};

/// Decodes 256×256 PNG tiles into RGB565
#[derive(Debug, Clone, Copy, Default)]
pub struct PngTileDecoder;

/// Pack 8-bit RGB into RGB565
pub fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    (u16::from(r & 0xf8) << 8) | (u16::from(g & 0xfc) << 3) | u16::from(b >> 3)
}

impl TileDecoder for PngTileDecoder {
    fn decode(&self, data: &[u8], out: &mut TileImage) -> Result<(), DecodeError> {
        let decoded =
            image::load_from_memory_with_format(data, ImageFormat::Png).map_err(|e| match e {
                ImageError::Unsupported(_) => DecodeError::Unsupported,
                _ => DecodeError::Malformed,
            })?;

        if decoded.width() != TileImage::WIDTH || decoded.height() != TileImage::HEIGHT {
            return Err(DecodeError::SizeMismatch {
                width: decoded.width(),
                height: decoded.height(),
            });
        }

        let rgb = decoded.to_rgb8();
        for (dst, pixel) in out.pixels_mut().iter_mut().zip(rgb.pixels()) {
            let [r, g, b] = pixel.0;
            *dst = rgb565(r, g, b);
        }
        Ok(())
    }
}
