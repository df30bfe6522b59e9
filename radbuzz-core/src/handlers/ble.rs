//! Phone link over BLE
//!
//! The phone app writes turn-by-turn navigation text and maneuver icons to
//! characteristics of one primary service. The radio stack queues each
//! write on a [`BlePort`]; the handler parses it on its own thread.

use alloc::string::String;
use alloc::vec::Vec;
use core::time::Duration;

use radbuzz_protocol::{IconPayload, NavigationInfo, ICON_HEIGHT, ICON_WIDTH};

use super::MessagePort;
use crate::image_cache::{ImageCache, InsertOutcome};
use crate::state::{
    ApplicationState, CurrentIconHash, DistanceToNext, Eta, NextStreet, TotalDistance,
};
use crate::traits::{BleServer, Worker};

/// Primary service
pub const SERVICE_UUID: u128 = 0xec91d7ab_e87c_48d5_adfa_cc4b2951298a;

/// Depth of the radio → handler queue
pub const BLE_QUEUE_DEPTH: usize = 8;

const CHARACTERISTIC_COUNT: usize = 5;

/// Writable characteristics of the primary service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Characteristic {
    Settings,
    /// Navigation text block
    Navigation,
    /// Maneuver icon, hash followed by the bitmap
    TurnIcon,
    TurnIconDescription,
    GpsSpeed,
}

impl Characteristic {
    pub const ALL: [Characteristic; CHARACTERISTIC_COUNT] = [
        Characteristic::Settings,
        Characteristic::Navigation,
        Characteristic::TurnIcon,
        Characteristic::TurnIconDescription,
        Characteristic::GpsSpeed,
    ];

    pub const fn uuid(self) -> u128 {
        match self {
            Characteristic::Settings => 0x9d37a346_63d3_4df6_8eee_f0242949f59f,
            Characteristic::Navigation => 0x0b11deef_1563_447f_aece_d3dfeb1c1f20,
            Characteristic::TurnIcon => 0xd4d8fcca_16b2_4b8e_8ed5_90137c44a8ad,
            Characteristic::TurnIconDescription => 0xd63a466e_5271_4a5d_a942_a34ccdb013d9,
            Characteristic::GpsSpeed => 0x98b6073a_5cf3_4e73_b6d3_f8e05fa018a9,
        }
    }

    pub fn from_uuid(uuid: u128) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.uuid() == uuid)
    }
}

/// One write from the central
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BleWrite {
    /// Characteristic UUID
    pub characteristic: u128,
    pub data: Vec<u8>,
}

impl BleWrite {
    pub fn new(characteristic: Characteristic, data: &[u8]) -> Self {
        Self {
            characteristic: characteristic.uuid(),
            data: data.to_vec(),
        }
    }
}

pub type BlePort = MessagePort<BleWrite, BLE_QUEUE_DEPTH>;

/// Applies phone writes to the state and the icon cache
pub struct BleHandler<'a, S> {
    server: S,
    state: &'a ApplicationState,
    images: &'a ImageCache,
    port: &'a BlePort,
    registered: heapless::Vec<u128, CHARACTERISTIC_COUNT>,
}

impl<'a, S: BleServer> BleHandler<'a, S> {
    pub fn new(
        server: S,
        state: &'a ApplicationState,
        images: &'a ImageCache,
        port: &'a BlePort,
    ) -> Self {
        Self {
            server,
            state,
            images,
            port,
            registered: heapless::Vec::new(),
        }
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    fn register(&mut self, characteristic: Characteristic) {
        let uuid = characteristic.uuid();
        debug_assert!(
            !self.registered.contains(&uuid),
            "characteristic registered twice"
        );
        if self.registered.push(uuid).is_ok() {
            self.server.add_write_characteristic(uuid);
        }
    }

    /// Dispatch one write
    pub fn handle(&mut self, write: &BleWrite) {
        match Characteristic::from_uuid(write.characteristic) {
            Some(Characteristic::Navigation) => self.on_navigation(&write.data),
            Some(Characteristic::TurnIcon) => self.on_icon(&write.data),
            Some(other) => debug!("ble: {} bytes to {:?}", write.data.len(), other),
            None => warn!("ble: write to unknown characteristic"),
        }
    }

    fn on_navigation(&mut self, data: &[u8]) {
        let info = match NavigationInfo::parse(data) {
            Ok(info) => info,
            Err(e) => {
                warn!("ble: bad navigation text: {:?}", e);
                return;
            }
        };

        let mut snapshot = self.state.checkout_partial_snapshot::<(
            NextStreet,
            DistanceToNext,
            TotalDistance,
            Eta,
            CurrentIconHash,
        )>();
        if let Some(road) = info.next_road {
            snapshot.set::<NextStreet>(String::from(road));
        }
        if let Some(distance) = info.distance_to_next_m {
            snapshot.set::<DistanceToNext>(distance);
        }
        if let Some(distance) = info.total_distance_m {
            snapshot.set::<TotalDistance>(distance);
        }
        if let Some(eta) = info.eta {
            snapshot.set::<Eta>(String::from(eta));
        }
        if let Some(hash) = info.icon_hash {
            snapshot.set::<CurrentIconHash>(hash);
        }
    }

    fn on_icon(&mut self, data: &[u8]) {
        let icon = match IconPayload::parse(data) {
            Ok(icon) => icon,
            Err(e) => {
                debug!("ble: dropping icon: {:?}", e);
                return;
            }
        };

        let outcome = self.images.insert(
            icon.key,
            u16::from(ICON_WIDTH),
            u16::from(ICON_HEIGHT),
            icon.bitmap,
        );
        if outcome == InsertOutcome::Inserted {
            trace!("ble: icon {} cached", icon.key);
        }
    }
}

impl<S: BleServer> Worker for BleHandler<'_, S> {
    fn on_startup(&mut self) {
        self.server.set_service_uuid(SERVICE_UUID);
        for characteristic in Characteristic::ALL {
            self.register(characteristic);
        }
        self.server.start();
        info!("ble: advertising");
    }

    fn on_activation(&mut self) -> Option<Duration> {
        while let Some(write) = self.port.receive() {
            self.handle(&write);
        }
        None
    }
}
