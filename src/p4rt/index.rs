use crate::error::{ObjectKind, PipelineError, Result};
use crate::proto::p4config::{
    Action, ActionProfile, ControllerPacketMetadata, Counter, Digest, DirectCounter, DirectMeter,
    ExternInstance, MatchField, Meter, P4Info, Preamble, Register, Table, ValueSet,
};
use std::collections::HashMap;

/// Which preamble attribute the index is keyed by.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PreambleKey {
    Name,
    Alias,
}

impl PreambleKey {
    fn of<'a>(&self, preamble: &'a Preamble) -> &'a str {
        match self {
            PreambleKey::Name => &preamble.name,
            PreambleKey::Alias => &preamble.alias,
        }
    }
}

trait HasPreamble {
    fn preamble(&self) -> Option<&Preamble>;
}

macro_rules! has_preamble {
    ($($t:ty),*) => {
        $(impl HasPreamble for $t {
            fn preamble(&self) -> Option<&Preamble> {
                self.preamble.as_ref()
            }
        })*
    };
}

has_preamble!(
    Table,
    Action,
    ActionProfile,
    Counter,
    DirectCounter,
    Meter,
    DirectMeter,
    ControllerPacketMetadata,
    ValueSet,
    Register,
    Digest,
    ExternInstance
);

/// Positions of objects in the descriptor, by key, plus the order they were declared in.
#[derive(Debug, Default, Clone)]
struct Positions {
    by_key: HashMap<String, usize>,
    order: Vec<String>,
}

impl Positions {
    fn build<T: HasPreamble>(items: &[T], key: PreambleKey) -> Positions {
        let mut positions = Positions::default();
        for (i, item) in items.iter().enumerate() {
            if let Some(preamble) = item.preamble() {
                let k = key.of(preamble).to_owned();
                if positions.by_key.insert(k.clone(), i).is_none() {
                    positions.order.push(k);
                }
            }
        }
        positions
    }

    fn get<'a, T>(&self, items: &'a [T], kind: ObjectKind, name: &str) -> Result<&'a T> {
        self.by_key
            .get(name)
            .and_then(|i| items.get(*i))
            .ok_or_else(|| {
                PipelineError::ObjectNotFound {
                    kind,
                    name: name.to_owned(),
                }
                .into()
            })
    }
}

/// Lookup tables over a [P4Info], keyed by qualified name (or alias).
///
/// The index owns the descriptor it was built from and never changes after
/// construction; a new descriptor means a new index. For a table that
/// declares the same match field name twice, the later declaration wins.
#[derive(Debug, Clone)]
pub struct PipelineIndex {
    p4info: P4Info,
    key: PreambleKey,
    tables: Positions,
    actions: Positions,
    action_profiles: Positions,
    counters: Positions,
    direct_counters: Positions,
    meters: Positions,
    direct_meters: Positions,
    controller_packet_metadata: Positions,
    value_sets: Positions,
    registers: Positions,
    digests: Positions,
    extern_instances: HashMap<String, (usize, usize)>,
    table_match_fields: HashMap<(String, String), (usize, usize)>,
}

impl PipelineIndex {
    pub fn new(p4info: P4Info) -> PipelineIndex {
        Self::with_key(p4info, PreambleKey::Name)
    }

    pub fn with_key(p4info: P4Info, key: PreambleKey) -> PipelineIndex {
        let tables = Positions::build(&p4info.tables, key);

        let mut table_match_fields = HashMap::new();
        for (table_key, table_pos) in tables.by_key.iter() {
            let table = &p4info.tables[*table_pos];
            for (field_pos, field) in table.match_fields.iter().enumerate() {
                table_match_fields.insert(
                    (table_key.clone(), field.name.clone()),
                    (*table_pos, field_pos),
                );
            }
        }

        let mut extern_instances = HashMap::new();
        for (e, ext) in p4info.externs.iter().enumerate() {
            for (i, instance) in ext.instances.iter().enumerate() {
                if let Some(preamble) = instance.preamble() {
                    extern_instances.insert(key.of(preamble).to_owned(), (e, i));
                }
            }
        }

        PipelineIndex {
            key,
            actions: Positions::build(&p4info.actions, key),
            action_profiles: Positions::build(&p4info.action_profiles, key),
            counters: Positions::build(&p4info.counters, key),
            direct_counters: Positions::build(&p4info.direct_counters, key),
            meters: Positions::build(&p4info.meters, key),
            direct_meters: Positions::build(&p4info.direct_meters, key),
            controller_packet_metadata: Positions::build(&p4info.controller_packet_metadata, key),
            value_sets: Positions::build(&p4info.value_sets, key),
            registers: Positions::build(&p4info.registers, key),
            digests: Positions::build(&p4info.digests, key),
            tables,
            extern_instances,
            table_match_fields,
            p4info,
        }
    }

    pub fn p4info(&self) -> &P4Info {
        &self.p4info
    }

    pub fn key(&self) -> PreambleKey {
        self.key
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(&self.p4info.tables, ObjectKind::Table, name)
    }

    pub fn action(&self, name: &str) -> Result<&Action> {
        self.actions
            .get(&self.p4info.actions, ObjectKind::Action, name)
    }

    pub fn action_profile(&self, name: &str) -> Result<&ActionProfile> {
        self.action_profiles
            .get(&self.p4info.action_profiles, ObjectKind::ActionProfile, name)
    }

    pub fn counter(&self, name: &str) -> Result<&Counter> {
        self.counters
            .get(&self.p4info.counters, ObjectKind::Counter, name)
    }

    pub fn direct_counter(&self, name: &str) -> Result<&DirectCounter> {
        self.direct_counters
            .get(&self.p4info.direct_counters, ObjectKind::DirectCounter, name)
    }

    pub fn meter(&self, name: &str) -> Result<&Meter> {
        self.meters.get(&self.p4info.meters, ObjectKind::Meter, name)
    }

    pub fn direct_meter(&self, name: &str) -> Result<&DirectMeter> {
        self.direct_meters
            .get(&self.p4info.direct_meters, ObjectKind::DirectMeter, name)
    }

    pub fn controller_packet_metadata(&self, name: &str) -> Result<&ControllerPacketMetadata> {
        self.controller_packet_metadata.get(
            &self.p4info.controller_packet_metadata,
            ObjectKind::ControllerPacketMetadata,
            name,
        )
    }

    pub fn value_set(&self, name: &str) -> Result<&ValueSet> {
        self.value_sets
            .get(&self.p4info.value_sets, ObjectKind::ValueSet, name)
    }

    pub fn register(&self, name: &str) -> Result<&Register> {
        self.registers
            .get(&self.p4info.registers, ObjectKind::Register, name)
    }

    pub fn digest(&self, name: &str) -> Result<&Digest> {
        self.digests
            .get(&self.p4info.digests, ObjectKind::Digest, name)
    }

    pub fn extern_instance(&self, name: &str) -> Result<&ExternInstance> {
        self.extern_instances
            .get(name)
            .and_then(|(e, i)| self.p4info.externs.get(*e)?.instances.get(*i))
            .ok_or_else(|| {
                PipelineError::ObjectNotFound {
                    kind: ObjectKind::ExternInstance,
                    name: name.to_owned(),
                }
                .into()
            })
    }

    pub fn match_field(&self, table: &str, field: &str) -> Result<&MatchField> {
        self.table_match_fields
            .get(&(table.to_owned(), field.to_owned()))
            .and_then(|(t, f)| self.p4info.tables.get(*t)?.match_fields.get(*f))
            .ok_or_else(|| {
                PipelineError::MatchFieldNotFound {
                    table: table.to_owned(),
                    field: field.to_owned(),
                }
                .into()
            })
    }

    /// Preamble id of a table.
    pub fn table_id(&self, name: &str) -> Result<u32> {
        Ok(preamble_id(self.table(name)?))
    }

    /// Preamble id of an action.
    pub fn action_id(&self, name: &str) -> Result<u32> {
        Ok(preamble_id(self.action(name)?))
    }

    /// Preamble id of a digest.
    pub fn digest_id(&self, name: &str) -> Result<u32> {
        Ok(preamble_id(self.digest(name)?))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.order.iter().map(String::as_str)
    }

    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.order.iter().map(String::as_str)
    }

    pub fn counter_names(&self) -> impl Iterator<Item = &str> {
        self.counters.order.iter().map(String::as_str)
    }

    pub fn digest_names(&self) -> impl Iterator<Item = &str> {
        self.digests.order.iter().map(String::as_str)
    }

    pub fn register_names(&self) -> impl Iterator<Item = &str> {
        self.registers.order.iter().map(String::as_str)
    }
}

fn preamble_id<T: HasPreamble>(item: &T) -> u32 {
    item.preamble().map(|p| p.id).unwrap_or_default()
}
