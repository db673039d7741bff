use crate::entity::{ProtoEntity, ToEntity};
use crate::proto::p4runtime::{digest_entry, entity};
use serde::Deserialize;

pub type DigestEntry = crate::proto::p4runtime::DigestEntry;

/// Batching behaviour the device applies to a digest.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub max_timeout_ns: i64,
    pub max_list_size: i32,
    pub ack_timeout_ns: i64,
}

impl Default for DigestConfig {
    fn default() -> Self {
        DigestConfig {
            max_timeout_ns: 0,
            max_list_size: 1,
            ack_timeout_ns: 1_000_000_000,
        }
    }
}

impl From<DigestConfig> for digest_entry::Config {
    fn from(c: DigestConfig) -> Self {
        digest_entry::Config {
            max_timeout_ns: c.max_timeout_ns,
            max_list_size: c.max_list_size,
            ack_timeout_ns: c.ack_timeout_ns,
        }
    }
}

impl ToEntity for DigestEntry {
    fn to_proto_entity(&self) -> ProtoEntity {
        ProtoEntity {
            entity: Some(entity::Entity::DigestEntry(self.clone())),
        }
    }
}
