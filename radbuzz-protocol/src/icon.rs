//! Turn-by-turn icon bitmaps from the phone app
//!
//! Icons are written to the icon characteristic as:
//!
//! ```text
//!            1
//!  01234567890
//!  -----------
//!  a7f7f83332;<raw 1-bpp bitmap bytes>
//! ```
//!
//! The key is the first 8 hex characters of the hash. The bitmap is
//! `ICON_WIDTH * ICON_HEIGHT / 8` bytes, row-major, MSB first.

use crate::nav::parse_icon_key;

/// Icon width in pixels
pub const ICON_WIDTH: u8 = 64;

/// Icon height in pixels
pub const ICON_HEIGHT: u8 = 62;

/// Size of the raw 1-bpp icon bitmap
pub const ICON_BYTE_SIZE: usize = (ICON_WIDTH as usize * ICON_HEIGHT as usize) / 8;

/// Hash characters plus the `;` separator
pub const ICON_HEADER_SIZE: usize = 11;

/// Size of a complete icon write
pub const ICON_MESSAGE_SIZE: usize = ICON_HEADER_SIZE + ICON_BYTE_SIZE;

/// Errors that can occur while parsing an icon write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IconError {
    /// Write is not exactly `ICON_MESSAGE_SIZE` bytes
    InvalidLength,
    /// Missing `;` after the hash
    MissingSeparator,
    /// Hash is not hexadecimal
    InvalidKey,
}

/// A parsed icon write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconPayload<'a> {
    /// Cache key derived from the hash
    pub key: u32,
    /// Raw 1-bpp bitmap
    pub bitmap: &'a [u8],
}

impl<'a> IconPayload<'a> {
    /// Parse an icon write
    pub fn parse(data: &'a [u8]) -> Result<Self, IconError> {
        if data.len() != ICON_MESSAGE_SIZE {
            return Err(IconError::InvalidLength);
        }
        if data[ICON_HEADER_SIZE - 1] != b';' {
            return Err(IconError::MissingSeparator);
        }

        let key = parse_icon_key(data).ok_or(IconError::InvalidKey)?;

        Ok(Self {
            key,
            bitmap: &data[ICON_HEADER_SIZE..],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    fn icon_message(header: &[u8]) -> Vec<u8, ICON_MESSAGE_SIZE> {
        let mut msg = Vec::new();
        msg.extend_from_slice(header).unwrap();
        while msg.len() < ICON_MESSAGE_SIZE {
            msg.push(0x7f).unwrap();
        }
        msg
    }

    #[test]
    fn test_parse_icon() {
        let msg = icon_message(b"a7f7f83332;");
        let icon = IconPayload::parse(&msg).unwrap();
        assert_eq!(icon.key, 0xa7f7f833);
        assert_eq!(icon.bitmap.len(), ICON_BYTE_SIZE);
        assert!(icon.bitmap.iter().all(|&b| b == 0x7f));
    }

    #[test]
    fn test_short_icon_is_rejected() {
        assert_eq!(
            IconPayload::parse(b"a7f7f83332;"),
            Err(IconError::InvalidLength)
        );
    }

    #[test]
    fn test_missing_separator() {
        let msg = icon_message(b"a7f7f833320");
        assert_eq!(IconPayload::parse(&msg), Err(IconError::MissingSeparator));
    }

    #[test]
    fn test_invalid_key() {
        let msg = icon_message(b"nothexxx00;");
        assert_eq!(IconPayload::parse(&msg), Err(IconError::InvalidKey));
    }
}
