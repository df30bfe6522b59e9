//! Packet framing for the serial vehicle-control link.
//!
//! Frame format:
//! - HEADER (2 bytes): 0x3A 0x16
//! - COMMAND (1 byte)
//! - LENGTH (1 byte): payload length (0-255)
//! - PAYLOAD (0-255 bytes)
//! - CHECKSUM (2 bytes): little-endian 16-bit sum of the second header byte,
//!   COMMAND, LENGTH and all PAYLOAD bytes
//! - FOOTER (2 bytes): 0x0D 0x0A
//!
//! The receive side is a state machine over an accumulating buffer. Bytes
//! are pushed in arbitrary chunks and the machine runs until it stops making
//! progress. A corrupt frame (bad header, footer or checksum) drops every
//! buffered byte; there is no resynchronisation inside a corrupt buffer.

use heapless::Vec;

/// Frame start magic
pub const HEADER_MAGIC: [u8; 2] = [0x3A, 0x16];

/// Frame end magic
pub const FOOTER_MAGIC: [u8; 2] = [0x0D, 0x0A];

/// HEADER + COMMAND + LENGTH
pub const HEADER_SIZE: usize = 4;

/// CHECKSUM + FOOTER
pub const FOOTER_SIZE: usize = 4;

/// Maximum payload size in bytes (limited by the 1-byte length field)
pub const MAX_PAYLOAD_SIZE: usize = u8::MAX as usize;

/// Maximum complete frame size
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE + FOOTER_SIZE;

/// Maximum decoded size (COMMAND + LENGTH + PAYLOAD)
pub const MAX_DECODED_SIZE: usize = 2 + MAX_PAYLOAD_SIZE;

/// Receive buffer capacity, room for two back-to-back maximum frames
pub const RX_BUFFER_SIZE: usize = 2 * MAX_FRAME_SIZE;

/// Errors that can occur while building a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload does not fit the 1-byte length field
    PayloadTooLarge,
}

/// An encoded frame ready for transmission
pub type Packet = Vec<u8, MAX_FRAME_SIZE>;

/// Receive state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseState {
    /// Nothing buffered
    Idle,
    /// Waiting for the 4 header bytes
    WaitForHeader,
    /// Header accepted, waiting for the payload
    WaitForData,
    /// Payload received, waiting for checksum and footer
    WaitForFooter,
    /// Complete frame buffered, checksum not yet verified
    VerifyData,
    /// Checksum verified, frame ready to be emitted
    ValidData,
}

/// A validated, decoded frame: COMMAND, LENGTH and PAYLOAD bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    bytes: Vec<u8, MAX_DECODED_SIZE>,
}

impl Payload {
    /// Command byte
    pub fn command(&self) -> u8 {
        self.bytes[0]
    }

    /// Declared payload length
    pub fn len(&self) -> usize {
        self.bytes[1] as usize
    }

    /// True if the frame carried no payload bytes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payload bytes, without command and length
    pub fn data(&self) -> &[u8] {
        &self.bytes[2..]
    }

    /// Command, length and payload bytes as received
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Calculate the checksum of `data` as it is placed on the wire
pub fn checksum(data: &[u8]) -> [u8; 2] {
    let sum = data
        .iter()
        .fold(0u16, |acc, &byte| acc.wrapping_add(byte as u16));
    sum.to_le_bytes()
}

/// Build a complete frame for `command` carrying `payload`
pub fn build_tx_packet(command: u8, payload: &[u8]) -> Result<Packet, FrameError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge);
    }

    let mut packet = Packet::new();
    // Capacity is MAX_FRAME_SIZE and the payload length is checked above
    let _ = packet.extend_from_slice(&HEADER_MAGIC);
    let _ = packet.push(command);
    let _ = packet.push(payload.len() as u8);
    let _ = packet.extend_from_slice(payload);
    let sum = checksum(&packet[1..]);
    let _ = packet.extend_from_slice(&sum);
    let _ = packet.extend_from_slice(&FOOTER_MAGIC);

    Ok(packet)
}

/// Receive-side packet state machine
///
/// One instance is owned by one transport thread.
#[derive(Debug, Clone)]
pub struct PacketFramer {
    state: ParseState,
    rx: Vec<u8, RX_BUFFER_SIZE>,
    length: u8,
}

impl Default for PacketFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketFramer {
    /// Create a new framer in the `Idle` state
    pub fn new() -> Self {
        Self {
            state: ParseState::Idle,
            rx: Vec::new(),
            length: 0,
        }
    }

    /// Current state of the receive machine
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Number of bytes waiting in the receive buffer
    pub fn buffered(&self) -> usize {
        self.rx.len()
    }

    /// Drop all buffered bytes and return to `Idle`
    pub fn reset(&mut self) {
        self.rx.clear();
        self.length = 0;
        self.state = ParseState::Idle;
    }

    /// Push received bytes
    ///
    /// Returns the first complete, valid frame if one is available. Bytes
    /// following that frame stay buffered; call [`Self::poll`] to decode
    /// further frames that arrived in the same chunk.
    pub fn push_data(&mut self, data: &[u8]) -> Option<Payload> {
        if self.rx.len() + data.len() > RX_BUFFER_SIZE {
            // Nothing valid can be this long
            self.reset();
            if data.len() > RX_BUFFER_SIZE {
                return None;
            }
        }
        // Fits, checked above
        let _ = self.rx.extend_from_slice(data);

        self.run_state_machine()
    }

    /// Decode the next frame already held in the receive buffer
    pub fn poll(&mut self) -> Option<Payload> {
        self.run_state_machine()
    }

    fn frame_len(&self) -> usize {
        HEADER_SIZE + self.length as usize + FOOTER_SIZE
    }

    fn run_state_machine(&mut self) -> Option<Payload> {
        let mut out = None;

        loop {
            let before = self.state;

            match self.state {
                ParseState::Idle => {
                    if !self.rx.is_empty() {
                        self.state = ParseState::WaitForHeader;
                    }
                }
                ParseState::WaitForHeader => {
                    let seen = self.rx.len().min(HEADER_MAGIC.len());
                    if self.rx[..seen] != HEADER_MAGIC[..seen] {
                        self.reset();
                    } else if self.rx.len() >= HEADER_SIZE {
                        self.length = self.rx[3];
                        self.state = ParseState::WaitForData;
                    }
                }
                ParseState::WaitForData => {
                    if self.rx.len() >= HEADER_SIZE + self.length as usize {
                        self.state = ParseState::WaitForFooter;
                    }
                }
                ParseState::WaitForFooter => {
                    let frame_len = self.frame_len();
                    if self.rx.len() >= frame_len {
                        if self.rx[frame_len - FOOTER_MAGIC.len()..frame_len] == FOOTER_MAGIC {
                            self.state = ParseState::VerifyData;
                        } else {
                            self.reset();
                        }
                    }
                }
                ParseState::VerifyData => {
                    let end = HEADER_SIZE + self.length as usize;
                    if self.rx[end..end + 2] == checksum(&self.rx[1..end]) {
                        self.state = ParseState::ValidData;
                    } else {
                        self.reset();
                    }
                }
                ParseState::ValidData => {
                    let end = HEADER_SIZE + self.length as usize;
                    let mut bytes = Vec::new();
                    // At most MAX_DECODED_SIZE bytes
                    let _ = bytes.extend_from_slice(&self.rx[2..end]);
                    out = Some(Payload { bytes });

                    self.consume_frame();
                    self.state = ParseState::Idle;
                }
            }

            // One frame per call, the rest waits for `poll`
            if before == self.state || out.is_some() {
                break;
            }
        }

        out
    }

    fn consume_frame(&mut self) {
        let frame_len = self.frame_len();
        let remaining = self.rx.len() - frame_len;

        self.rx.copy_within(frame_len.., 0);
        self.rx.truncate(remaining);
        self.length = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const VALID: [u8; 9] = [0x3A, 0x16, 0x19, 0x01, 0x00, 0x30, 0x00, 0x0D, 0x0A];

    #[test]
    fn test_invalid_header_magic_is_dropped() {
        let mut p = PacketFramer::new();
        assert_eq!(
            p.push_data(&[0x3A, 0x17, 0x19, 0x01, 0x00, 0x30, 0x00, 0x0D, 0x0A]),
            None
        );
        assert_eq!(p.buffered(), 0);
        assert_eq!(p.state(), ParseState::Idle);
    }

    #[test]
    fn test_invalid_footer_magic_is_dropped() {
        let mut p = PacketFramer::new();
        assert_eq!(
            p.push_data(&[0x3A, 0x16, 0x19, 0x01, 0x00, 0x30, 0x00, 0x0D, 0x0B]),
            None
        );
        assert_eq!(p.buffered(), 0);
    }

    #[test]
    fn test_invalid_checksum_is_dropped() {
        let mut p = PacketFramer::new();
        // Checksum should be 0x30
        assert_eq!(
            p.push_data(&[0x3A, 0x16, 0x19, 0x01, 0x00, 0x31, 0x00, 0x0D, 0x0A]),
            None
        );
        assert_eq!(p.buffered(), 0);
        assert_eq!(p.state(), ParseState::Idle);
    }

    #[test]
    fn test_short_packet_awaits_more_data() {
        let mut p = PacketFramer::new();
        assert_eq!(p.push_data(&VALID[..8]), None);
        assert_eq!(p.state(), ParseState::WaitForFooter);
        assert_eq!(p.buffered(), 8);
    }

    #[test]
    fn test_valid_packet_is_accepted() {
        let mut p = PacketFramer::new();
        let d = p.push_data(&VALID).unwrap();
        assert_eq!(d.as_bytes(), &[0x19, 0x01, 0x00]);
        assert_eq!(d.command(), 0x19);
        assert_eq!(d.data(), &[0x00]);
        assert_eq!(p.buffered(), 0);
    }

    #[test]
    fn test_partial_packet_completes_on_second_push() {
        let mut p = PacketFramer::new();
        assert_eq!(p.push_data(&[0x3A, 0x16, 0x19, 0x01, 0x00]), None);
        let d = p.push_data(&[0x30, 0x00, 0x0D, 0x0A]).unwrap();
        assert_eq!(d.as_bytes(), &[0x19, 0x01, 0x00]);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut p = PacketFramer::new();
        for &b in &VALID[..VALID.len() - 1] {
            assert_eq!(p.push_data(&[b]), None);
        }
        let d = p.push_data(&VALID[VALID.len() - 1..]).unwrap();
        assert_eq!(d.as_bytes(), &[0x19, 0x01, 0x00]);
    }

    #[test]
    fn test_double_packets_in_separate_pushes() {
        let mut p = PacketFramer::new();
        let d = p.push_data(&VALID).unwrap();
        assert_eq!(d.as_bytes(), &[0x19, 0x01, 0x00]);

        let d = p
            .push_data(&[0x3A, 0x16, 0x19, 0x01, 0x01, 0x31, 0x00, 0x0D, 0x0A])
            .unwrap();
        assert_eq!(d.as_bytes(), &[0x19, 0x01, 0x01]);
    }

    #[test]
    fn test_consecutive_packets_in_one_push() {
        let mut p = PacketFramer::new();
        let mut data = Vec::<u8, 18>::new();
        data.extend_from_slice(&VALID).unwrap();
        data.extend_from_slice(&[0x3A, 0x16, 0x19, 0x01, 0x01, 0x31, 0x00, 0x0D, 0x0A])
            .unwrap();

        let d = p.push_data(&data).unwrap();
        assert_eq!(d.as_bytes(), &[0x19, 0x01, 0x00]);
        assert_eq!(p.buffered(), 9);

        let d = p.poll().unwrap();
        assert_eq!(d.as_bytes(), &[0x19, 0x01, 0x01]);
        assert_eq!(p.poll(), None);
        assert_eq!(p.buffered(), 0);
    }

    #[test]
    fn test_second_frame_split_across_pushes() {
        let mut p = PacketFramer::new();
        let mut data = Vec::<u8, 12>::new();
        data.extend_from_slice(&VALID).unwrap();
        data.extend_from_slice(&[0x3A, 0x16, 0x19]).unwrap();

        assert!(p.push_data(&data).is_some());
        assert_eq!(p.poll(), None);

        let d = p.push_data(&[0x01, 0x01, 0x31, 0x00, 0x0D, 0x0A]).unwrap();
        assert_eq!(d.as_bytes(), &[0x19, 0x01, 0x01]);
    }

    #[test]
    fn test_recovers_after_corrupt_frame() {
        let mut p = PacketFramer::new();
        assert_eq!(p.push_data(&[0x00, 0xFF]), None);
        assert_eq!(p.buffered(), 0);
        assert!(p.push_data(&VALID).is_some());
    }

    #[test]
    fn test_build_tx_packet() {
        let packet = build_tx_packet(0x19, &[0x00]).unwrap();
        assert_eq!(&packet[..], &VALID);
    }

    #[test]
    fn test_build_empty_payload() {
        let packet = build_tx_packet(0x20, &[]).unwrap();
        assert_eq!(packet.len(), HEADER_SIZE + FOOTER_SIZE);
        assert_eq!(&packet[4..6], &checksum(&[0x16, 0x20, 0x00]));

        let mut p = PacketFramer::new();
        let d = p.push_data(&packet).unwrap();
        assert_eq!(d.as_bytes(), &[0x20, 0x00]);
        assert!(d.is_empty());
    }

    #[test]
    fn test_payload_too_large() {
        let large = [0u8; MAX_PAYLOAD_SIZE + 1];
        assert_eq!(build_tx_packet(0x01, &large), Err(FrameError::PayloadTooLarge));
    }

    #[test]
    fn test_checksum_wraps() {
        let data = [0xFF; 300];
        let expected = (300u32 * 0xFF) as u16;
        assert_eq!(checksum(&data), expected.to_le_bytes());
    }

    proptest! {
        #[test]
        fn prop_framing_roundtrip(
            command in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE),
        ) {
            let packet = build_tx_packet(command, &payload).unwrap();
            let mut p = PacketFramer::new();
            let d = p.push_data(&packet).unwrap();

            prop_assert_eq!(d.command(), command);
            prop_assert_eq!(d.len(), payload.len());
            prop_assert_eq!(d.data(), &payload[..]);
            prop_assert_eq!(p.buffered(), 0);
        }

        #[test]
        fn prop_corrupted_magic_or_checksum_is_rejected(
            command in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 0..64),
            which in 0usize..6,
            flip in 1u8..=255,
        ) {
            let mut packet = build_tx_packet(command, &payload).unwrap();
            let n = packet.len();
            // header magic, checksum, footer magic
            let index = [0, 1, n - 4, n - 3, n - 2, n - 1][which];
            packet[index] ^= flip;

            let mut p = PacketFramer::new();
            prop_assert_eq!(p.push_data(&packet), None);
            prop_assert_eq!(p.buffered(), 0);
            prop_assert_eq!(p.state(), ParseState::Idle);
        }
    }
}
