use crate::error::{ConfigError, Result};
use crate::representation::{DeviceIdentity, ElectionId};
use serde::Deserialize;
use std::time::Duration;

/// Options for a [crate::p4rt::client::Client].
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// `host:port` of the P4Runtime server.
    pub address: String,
    /// the device id used in p4runtime
    pub device_id: u64,
    /// the p4runtime election id
    pub election_id: ElectionId,
    /// capacity of the outbound stream channel
    pub stream_buffer: usize,
    /// also deliver packet-in messages on the notification queue
    pub queue_packets: bool,
    pub election_timeout_secs: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            address: "localhost:9559".to_owned(),
            device_id: 0,
            election_id: ElectionId::default(),
            stream_buffer: 4096,
            queue_packets: false,
            election_timeout_secs: 5,
        }
    }
}

impl ClientOptions {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s).map_err(ConfigError::from)?)
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(self.device_id, self.election_id)
    }

    pub fn election_timeout(&self) -> Duration {
        Duration::from_secs(self.election_timeout_secs)
    }

    pub(crate) fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            buffer: self.stream_buffer.max(1),
            queue_packets: self.queue_packets,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct StreamOptions {
    pub buffer: usize,
    pub queue_packets: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        ClientOptions::default().stream_options()
    }
}
