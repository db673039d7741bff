//! P4Runtime v1 messages and the client of the `p4.v1.P4Runtime` service,
//! generated from the `.proto` files under `proto/`.

use prost_reflect::DescriptorPool;

use crate::error::{InternalError, Result};

#[allow(clippy::all)]
pub mod p4 {
    pub mod v1 {
        tonic::include_proto!("p4.v1");
    }

    pub mod config {
        pub mod v1 {
            tonic::include_proto!("p4.config.v1");
        }
    }
}

#[allow(clippy::all)]
pub mod google {
    pub mod rpc {
        tonic::include_proto!("google.rpc");
    }
}

pub use google::rpc;
pub use p4::config::v1 as p4config;
pub use p4::v1 as p4runtime;

/// Encoded `FileDescriptorSet` of every message above.
pub const FILE_DESCRIPTOR_SET: &[u8] =
    include_bytes!(concat!(env!("OUT_DIR"), "/p4runtime_descriptor.bin"));

/// Descriptors of the generated messages, for the text format.
pub fn descriptor_pool() -> Result<DescriptorPool> {
    DescriptorPool::decode(FILE_DESCRIPTOR_SET)
        .map_err(|e| InternalError::DescriptorPool(e.to_string()).into())
}

impl p4runtime::P4Data {
    /// The raw bitstring, if this value is one.
    pub fn bitstring(&self) -> Option<&bytes::Bytes> {
        match &self.data {
            Some(p4runtime::p4_data::Data::Bitstring(bits)) => Some(bits),
            _ => None,
        }
    }

    /// Members of a struct or tuple value.
    pub fn members(&self) -> &[p4runtime::P4Data] {
        match &self.data {
            Some(p4runtime::p4_data::Data::Struct(s)) | Some(p4runtime::p4_data::Data::Tuple(s)) => {
                &s.members
            }
            _ => &[],
        }
    }
}
