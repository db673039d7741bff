use crate::proto::p4runtime::{entity, update, TableEntry, Update};

pub mod digest;
pub mod multicast_group;

pub type ProtoEntity = crate::proto::p4runtime::Entity;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UpdateType {
    Insert,
    Modify,
    Delete,
}

impl From<UpdateType> for update::Type {
    fn from(t: UpdateType) -> Self {
        match t {
            UpdateType::Insert => update::Type::Insert,
            UpdateType::Modify => update::Type::Modify,
            UpdateType::Delete => update::Type::Delete,
        }
    }
}

/// Anything that can be written to a device as a P4Runtime entity.
pub trait ToEntity {
    fn to_proto_entity(&self) -> ProtoEntity;

    fn to_update(&self, update_type: UpdateType) -> Update {
        crate::p4rt::pure::new_update(update_type, self.to_proto_entity())
    }
}

impl ToEntity for ProtoEntity {
    fn to_proto_entity(&self) -> ProtoEntity {
        self.clone()
    }
}

impl ToEntity for TableEntry {
    fn to_proto_entity(&self) -> ProtoEntity {
        ProtoEntity {
            entity: Some(entity::Entity::TableEntry(self.clone())),
        }
    }
}

impl<T: ToEntity + ?Sized> ToEntity for &T {
    fn to_proto_entity(&self) -> ProtoEntity {
        (**self).to_proto_entity()
    }
}
