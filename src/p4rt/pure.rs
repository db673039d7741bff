//! Request builders. Nothing in here talks to a device.

use bytes::Bytes;
use log::trace;

use crate::entity::digest::{DigestConfig, DigestEntry};
use crate::entity::multicast_group::{MulticastGroup, Replica};
use crate::entity::{ProtoEntity, UpdateType};
use crate::error::Result;
use crate::p4rt::index::PipelineIndex;
use crate::proto::p4config::P4Info;
use crate::proto::p4runtime::{
    action, forwarding_pipeline_config, set_forwarding_pipeline_config_request,
    stream_message_request, table_action, update, write_request, Action, DigestListAck,
    FieldMatch, ForwardingPipelineConfig, MasterArbitrationUpdate, PacketMetadata, PacketOut,
    SetForwardingPipelineConfigRequest, StreamMessageRequest, TableAction, TableEntry, Update,
    WriteRequest,
};
use crate::representation::DeviceIdentity;
use crate::util::value::MatchValue;

/// Builds a table entry against `index`.
///
/// The table and action are resolved before anything else, so a bad name
/// fails without building a partial entry. Action params are numbered from 1
/// in the order given. An entry without field matches is the table's default
/// action.
pub fn build_table_entry(
    index: &PipelineIndex,
    table_name: &str,
    field_matches: &[(&str, MatchValue)],
    action_name: &str,
    params: &[Bytes],
    priority: i32,
    idle_timeout_ns: i64,
) -> Result<TableEntry> {
    let table_id = index.table_id(table_name)?;
    let action_id = index.action_id(action_name)?;

    let mut r#match = Vec::with_capacity(field_matches.len());
    for (field_name, value) in field_matches {
        let field = index.match_field(table_name, field_name)?;
        r#match.push(FieldMatch {
            field_id: field.id,
            field_match_type: Some(value.clone().into_field_match_type()),
        });
    }

    let params = params
        .iter()
        .enumerate()
        .map(|(i, value)| action::Param {
            param_id: i as u32 + 1,
            value: value.clone(),
        })
        .collect();

    let entry = TableEntry {
        table_id,
        is_default_action: r#match.is_empty(),
        r#match,
        action: Some(TableAction {
            r#type: Some(table_action::Type::Action(Action { action_id, params })),
        }),
        priority,
        idle_timeout_ns,
        ..Default::default()
    };
    trace!(target: "pure", "table entry {} -> {:?}", table_name, entry);
    Ok(entry)
}

pub fn build_multicast_group_entry(multicast_group_id: u32, ports: &[u32]) -> MulticastGroup {
    MulticastGroup {
        multicast_group_id,
        replicas: ports
            .iter()
            .enumerate()
            .map(|(instance, port)| Replica {
                egress_port: *port,
                instance: instance as u32,
            })
            .collect(),
    }
}

pub fn build_digest_entry(digest_id: u32, config: DigestConfig) -> DigestEntry {
    DigestEntry {
        digest_id,
        config: Some(config.into()),
    }
}

pub fn build_digest_entry_by_name(
    index: &PipelineIndex,
    digest_name: &str,
    config: DigestConfig,
) -> Result<DigestEntry> {
    Ok(build_digest_entry(index.digest_id(digest_name)?, config))
}

pub fn new_update(update_type: UpdateType, entity: ProtoEntity) -> Update {
    Update {
        r#type: update::Type::from(update_type) as i32,
        entity: Some(entity),
    }
}

pub fn new_write_request(
    identity: &DeviceIdentity,
    updates: Vec<Update>,
    atomicity: write_request::Atomicity,
) -> WriteRequest {
    WriteRequest {
        device_id: identity.device_id,
        election_id: Some(identity.election_id.into()),
        updates,
        atomicity: atomicity as i32,
        ..Default::default()
    }
}

pub fn new_master_update_request(identity: &DeviceIdentity) -> StreamMessageRequest {
    StreamMessageRequest {
        update: Some(stream_message_request::Update::Arbitration(
            MasterArbitrationUpdate {
                device_id: identity.device_id,
                election_id: Some(identity.election_id.into()),
                ..Default::default()
            },
        )),
    }
}

pub fn new_digest_ack_request(digest_id: u32, list_id: u64) -> StreamMessageRequest {
    StreamMessageRequest {
        update: Some(stream_message_request::Update::DigestAck(DigestListAck {
            digest_id,
            list_id,
        })),
    }
}

pub fn new_packet_out_request(payload: Bytes, metadata: Vec<PacketMetadata>) -> StreamMessageRequest {
    StreamMessageRequest {
        update: Some(stream_message_request::Update::Packet(PacketOut {
            payload,
            metadata,
        })),
    }
}

pub fn new_forwarding_pipeline_config(
    p4info: P4Info,
    p4_device_config: Bytes,
    cookie: Option<u64>,
) -> ForwardingPipelineConfig {
    ForwardingPipelineConfig {
        p4info: Some(p4info),
        p4_device_config,
        cookie: cookie.map(|cookie| forwarding_pipeline_config::Cookie { cookie }),
    }
}

pub fn new_set_forwarding_pipeline_config_request(
    identity: &DeviceIdentity,
    action: set_forwarding_pipeline_config_request::Action,
    config: ForwardingPipelineConfig,
) -> SetForwardingPipelineConfigRequest {
    SetForwardingPipelineConfigRequest {
        device_id: identity.device_id,
        election_id: Some(identity.election_id.into()),
        action: action as i32,
        config: Some(config),
        ..Default::default()
    }
}
