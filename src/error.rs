use std::fmt::{Display, Formatter};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Device {} gRPC Error {:?}", device, error)]
    DeviceGrpcError { device: u64, error: tonic::Status },
    #[error("Device {} gRPC transport Error {:?}", device, error)]
    DeviceGrpcTransportError {
        device: u64,
        error: tonic::transport::Error,
    },
    #[error("Device {} did not confirm mastership within {:?}", device, timeout)]
    ElectionTimeout { device: u64, timeout: Duration },
    #[error("Device {}: master not acquired, {}", device, reason)]
    NotMaster { device: u64, reason: String },
    #[error("Device {} has no open stream channel", device)]
    NotStreaming { device: u64 },
    #[error("Device {} closed the stream channel", device)]
    StreamClosed { device: u64 },
    #[error("Device config file {} error: {:?}", path, error)]
    DeviceConfigFileError { path: String, error: std::io::Error },
}

/// Kinds of objects a pipeline descriptor declares.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ObjectKind {
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
    ExternInstance,
}

impl Display for ObjectKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ObjectKind::Table => "tables",
            ObjectKind::Action => "actions",
            ObjectKind::ActionProfile => "action_profiles",
            ObjectKind::Counter => "counters",
            ObjectKind::DirectCounter => "direct_counters",
            ObjectKind::Meter => "meters",
            ObjectKind::DirectMeter => "direct_meters",
            ObjectKind::ControllerPacketMetadata => "controller_packet_metadata",
            ObjectKind::ValueSet => "value_sets",
            ObjectKind::Register => "registers",
            ObjectKind::Digest => "digests",
            ObjectKind::ExternInstance => "externs",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{} not found on {}", name, kind)]
    ObjectNotFound { kind: ObjectKind, name: String },
    #[error("MatchField {} not found in table {}", field, table)]
    MatchFieldNotFound { table: String, field: String },
    #[error("Forwarding pipeline is not set")]
    PipelineNotSet,
    #[error("Forwarding pipeline config returned by the device carries no P4Info")]
    MissingP4Info,
    #[error("P4Info file {} decode error: {}", path, error)]
    P4InfoDecode {
        path: String,
        error: prost::DecodeError,
    },
    #[error("P4Info file {} parse error: {}", path, error)]
    P4InfoParse {
        path: String,
        error: prost_reflect::text_format::ParseError,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid client options: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum InternalError {
    #[error("Stream reader task failed: {0}")]
    ReaderFailed(String),
    #[error("Descriptor pool error: {0}")]
    DescriptorPool(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("This is a internal error, if you see this, please report to developer: {0:#?}")]
    Internal(#[from] InternalError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::Pipeline(PipelineError::ObjectNotFound { .. })
                | Error::Pipeline(PipelineError::MatchFieldNotFound { .. })
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Device(DeviceError::ElectionTimeout { .. }))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
