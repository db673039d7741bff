use std::path::Path;

use bytes::Bytes;
use log::debug;
use prost::Message;
use prost_reflect::DynamicMessage;

use crate::error::{DeviceError, InternalError, PipelineError, Result};
use crate::p4rt::index::PipelineIndex;
use crate::p4rt::pure::new_forwarding_pipeline_config;
use crate::proto::descriptor_pool;
use crate::proto::p4config::P4Info;
use crate::proto::p4runtime::ForwardingPipelineConfig;

const P4INFO_MESSAGE: &str = "p4.config.v1.P4Info";

/// The pipeline a device is running, as the device reported it, and its index.
///
/// Both halves are built together and replaced together.
#[derive(Debug, Clone)]
pub struct Pipeline {
    cookie: Option<u64>,
    index: PipelineIndex,
}

impl Pipeline {
    /// Builds a pipeline from a config returned by the device.
    pub fn from_config(config: ForwardingPipelineConfig) -> Result<Pipeline> {
        let p4info = config.p4info.ok_or(PipelineError::MissingP4Info)?;
        Ok(Pipeline {
            cookie: config.cookie.map(|c| c.cookie),
            index: PipelineIndex::new(p4info),
        })
    }

    pub fn p4info(&self) -> &P4Info {
        self.index.p4info()
    }

    pub fn index(&self) -> &PipelineIndex {
        &self.index
    }

    pub fn cookie(&self) -> Option<u64> {
        self.cookie
    }
}

/// Reads a P4Info file.
///
/// Files ending in `.txt` are read as protobuf text format, the way p4c emits
/// them. Anything else is read as binary.
pub async fn load_p4info<P: AsRef<Path>>(path: P) -> Result<P4Info> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("txt") => load_p4info_text(path).await,
        _ => load_p4info_binary(path).await,
    }
}

pub async fn load_p4info_binary<P: AsRef<Path>>(path: P) -> Result<P4Info> {
    let path = path.as_ref();
    let buf = read_file(path).await?;
    let p4info = P4Info::decode(buf).map_err(|error| PipelineError::P4InfoDecode {
        path: path.display().to_string(),
        error,
    })?;
    debug!(target: "pipeconf", "loaded p4info {} with {} tables", path.display(), p4info.tables.len());
    Ok(p4info)
}

pub async fn load_p4info_text<P: AsRef<Path>>(path: P) -> Result<P4Info> {
    let path = path.as_ref();
    let buf = read_file(path).await?;
    let text = String::from_utf8_lossy(&buf);
    let p4info = parse_p4info_text(&text, &path.display().to_string())?;
    debug!(target: "pipeconf", "loaded p4info {} with {} tables", path.display(), p4info.tables.len());
    Ok(p4info)
}

/// Parses a text format P4Info. `origin` names the source in errors.
pub fn parse_p4info_text(text: &str, origin: &str) -> Result<P4Info> {
    let pool = descriptor_pool()?;
    let descriptor = pool
        .get_message_by_name(P4INFO_MESSAGE)
        .ok_or_else(|| InternalError::DescriptorPool(format!("{} is not registered", P4INFO_MESSAGE)))?;
    let message = DynamicMessage::parse_text_format(descriptor, text).map_err(|error| {
        PipelineError::P4InfoParse {
            path: origin.to_owned(),
            error,
        }
    })?;
    let p4info = message
        .transcode_to::<P4Info>()
        .map_err(|error| PipelineError::P4InfoDecode {
            path: origin.to_owned(),
            error,
        })?;
    Ok(p4info)
}

/// Reads a target specific device config blob, e.g. a bmv2 json.
pub async fn load_device_config<P: AsRef<Path>>(path: P) -> Result<Bytes> {
    read_file(path.as_ref()).await
}

pub async fn load_forwarding_pipeline_config<P, Q>(
    p4info_path: P,
    device_config_path: Q,
    cookie: Option<u64>,
) -> Result<ForwardingPipelineConfig>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (p4info, device_config) = tokio::try_join!(
        load_p4info(p4info_path),
        load_device_config(device_config_path)
    )?;
    Ok(new_forwarding_pipeline_config(p4info, device_config, cookie))
}

async fn read_file(path: &Path) -> Result<Bytes> {
    let buf = tokio::fs::read(path)
        .await
        .map_err(|error| DeviceError::DeviceConfigFileError {
            path: path.display().to_string(),
            error,
        })?;
    Ok(Bytes::from(buf))
}
