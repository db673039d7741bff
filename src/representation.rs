use crate::proto::p4runtime::Uint128;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The 128-bit election id a controller presents during arbitration.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ElectionId {
    pub high: u64,
    pub low: u64,
}

impl Default for ElectionId {
    fn default() -> Self {
        ElectionId { high: 1, low: 0 }
    }
}

impl From<ElectionId> for Uint128 {
    fn from(id: ElectionId) -> Self {
        Uint128 {
            high: id.high,
            low: id.low,
        }
    }
}

impl From<Uint128> for ElectionId {
    fn from(id: Uint128) -> Self {
        ElectionId {
            high: id.high,
            low: id.low,
        }
    }
}

/// Who this client is to the device. Fixed for the lifetime of a client.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct DeviceIdentity {
    pub device_id: u64,
    pub election_id: ElectionId,
}

impl DeviceIdentity {
    pub fn new(device_id: u64, election_id: ElectionId) -> Self {
        DeviceIdentity {
            device_id,
            election_id,
        }
    }
}

impl Display for DeviceIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "device {} (election {}:{})",
            self.device_id, self.election_id.high, self.election_id.low
        )
    }
}
