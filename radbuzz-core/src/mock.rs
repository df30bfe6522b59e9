//! In-memory capability doubles for unit tests

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::string::{String, ToString};
use std::vec::Vec;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::tile::TileImage;
use crate::traits::{
    BleServer, DecodeError, Direction, Filesystem, HttpClient, StepperDriver, TileDecoder,
};

/// Filesystem backed by a map of paths to contents
#[derive(Default)]
pub struct MockFilesystem {
    files: RefCell<BTreeMap<String, Vec<u8>>>,
    fail_writes: bool,
}

impl MockFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// A filesystem where every write fails
    pub fn read_only() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, path: &str, data: &[u8]) {
        self.files
            .borrow_mut()
            .insert(path.to_string(), data.to_vec());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.borrow().contains_key(path)
    }
}

impl Filesystem for MockFilesystem {
    fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(path).cloned()
    }

    fn write_file(&self, path: &str, data: &[u8]) -> bool {
        if self.fail_writes {
            return false;
        }
        self.insert(path, data);
        true
    }

    fn file_exists(&self, path: &str) -> bool {
        self.contains(path)
    }
}

/// HTTP client serving canned responses and recording requests
#[derive(Default)]
pub struct MockHttp {
    responses: RefCell<BTreeMap<String, Vec<u8>>>,
    requests: RefCell<Vec<String>>,
}

impl MockHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: &str, body: &[u8]) {
        self.responses
            .borrow_mut()
            .insert(url.to_string(), body.to_vec());
    }

    pub fn remove(&self, url: &str) {
        self.responses.borrow_mut().remove(url);
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl HttpClient for MockHttp {
    fn get(&self, url: &str) -> Option<Vec<u8>> {
        self.requests.borrow_mut().push(url.to_string());
        self.responses.borrow().get(url).cloned()
    }
}

/// Decoder for `TILE<color:u16 LE>` blobs, filling the tile with `color`
pub struct MockDecoder;

impl MockDecoder {
    const MAGIC: &'static [u8] = b"TILE";

    pub fn encode(color: u16) -> Vec<u8> {
        let mut data = Self::MAGIC.to_vec();
        data.extend_from_slice(&color.to_le_bytes());
        data
    }
}

impl TileDecoder for MockDecoder {
    fn decode(&self, data: &[u8], out: &mut TileImage) -> Result<(), DecodeError> {
        match data {
            [b'T', b'I', b'L', b'E', lo, hi] => {
                out.fill(u16::from_le_bytes([*lo, *hi]));
                Ok(())
            }
            _ => Err(DecodeError::Malformed),
        }
    }
}

/// Stepper recording every signed move
#[derive(Default)]
pub struct MockStepper {
    pub moves: Vec<i32>,
}

impl MockStepper {
    /// Net position after all moves
    pub fn position(&self) -> i32 {
        self.moves.iter().sum()
    }
}

impl StepperDriver for MockStepper {
    fn step(&mut self, direction: Direction, steps: u32) {
        let steps = steps as i32;
        self.moves.push(match direction {
            Direction::Clockwise => steps,
            Direction::CounterClockwise => -steps,
        });
    }
}

/// Output pin recording its level history
#[derive(Default)]
pub struct MockPin {
    pub high: bool,
    pub rising_edges: u32,
}

impl ErrorType for MockPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if !self.high {
            self.rising_edges += 1;
        }
        self.high = true;
        Ok(())
    }
}

/// GATT server recording its registrations
#[derive(Default)]
pub struct MockBleServer {
    pub service: Option<u128>,
    pub characteristics: Vec<u128>,
    pub started: bool,
}

impl BleServer for MockBleServer {
    fn set_service_uuid(&mut self, uuid: u128) {
        self.service = Some(uuid);
    }

    fn add_write_characteristic(&mut self, uuid: u128) {
        self.characteristics.push(uuid);
    }

    fn start(&mut self) {
        self.started = true;
    }
}
