use crate::entity::{ProtoEntity, ToEntity};
use crate::proto::p4runtime::{entity, packet_replication_engine_entry, PacketReplicationEngineEntry};

pub type MulticastGroup = crate::proto::p4runtime::MulticastGroupEntry;
pub type Replica = crate::proto::p4runtime::Replica;

impl ToEntity for MulticastGroup {
    fn to_proto_entity(&self) -> ProtoEntity {
        ProtoEntity {
            entity: Some(entity::Entity::PacketReplicationEngineEntry(
                PacketReplicationEngineEntry {
                    r#type: Some(packet_replication_engine_entry::Type::MulticastGroupEntry(
                        self.clone(),
                    )),
                },
            )),
        }
    }
}
