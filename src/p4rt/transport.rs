use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use log::debug;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;

use crate::error::{DeviceError, Result};
use crate::proto::p4runtime::p4_runtime_client::P4RuntimeClient;
use crate::proto::p4runtime::{
    CapabilitiesRequest, CapabilitiesResponse, GetForwardingPipelineConfigRequest,
    GetForwardingPipelineConfigResponse, SetForwardingPipelineConfigRequest,
    SetForwardingPipelineConfigResponse, StreamMessageRequest, StreamMessageResponse,
    WriteRequest, WriteResponse,
};

/// Inbound half of the stream channel.
pub type ResponseStream = BoxStream<'static, std::result::Result<StreamMessageResponse, tonic::Status>>;

/// The P4Runtime RPCs a client needs from the wire.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn capabilities(
        &self,
        request: CapabilitiesRequest,
    ) -> std::result::Result<CapabilitiesResponse, tonic::Status>;

    async fn get_forwarding_pipeline_config(
        &self,
        request: GetForwardingPipelineConfigRequest,
    ) -> std::result::Result<GetForwardingPipelineConfigResponse, tonic::Status>;

    async fn set_forwarding_pipeline_config(
        &self,
        request: SetForwardingPipelineConfigRequest,
    ) -> std::result::Result<SetForwardingPipelineConfigResponse, tonic::Status>;

    async fn write(&self, request: WriteRequest)
        -> std::result::Result<WriteResponse, tonic::Status>;

    /// Opens the bidirectional stream. Requests are pulled from `outbound`
    /// until its sender side is dropped.
    async fn stream_channel(
        &self,
        outbound: ReceiverStream<StreamMessageRequest>,
    ) -> std::result::Result<ResponseStream, tonic::Status>;
}

/// [Transport] over a tonic channel.
#[derive(Clone, Debug)]
pub struct GrpcTransport {
    client: P4RuntimeClient<Channel>,
}

impl GrpcTransport {
    pub fn new(client: P4RuntimeClient<Channel>) -> Self {
        GrpcTransport { client }
    }

    /// Connects to `address` (`host:port`, scheme optional).
    pub async fn connect(address: &str, device_id: u64) -> Result<Self> {
        let dst = if address.contains("://") {
            address.to_owned()
        } else {
            format!("http://{}", address)
        };
        debug!(target: "transport", "connecting to {}", dst);
        let client = P4RuntimeClient::connect(dst)
            .await
            .map_err(|error| DeviceError::DeviceGrpcTransportError {
                device: device_id,
                error,
            })?;
        Ok(GrpcTransport { client })
    }
}

#[async_trait]
impl Transport for GrpcTransport {
    async fn capabilities(
        &self,
        request: CapabilitiesRequest,
    ) -> std::result::Result<CapabilitiesResponse, tonic::Status> {
        let mut client = self.client.clone();
        Ok(client
            .capabilities(tonic::Request::new(request))
            .await?
            .into_inner())
    }

    async fn get_forwarding_pipeline_config(
        &self,
        request: GetForwardingPipelineConfigRequest,
    ) -> std::result::Result<GetForwardingPipelineConfigResponse, tonic::Status> {
        let mut client = self.client.clone();
        Ok(client
            .get_forwarding_pipeline_config(tonic::Request::new(request))
            .await?
            .into_inner())
    }

    async fn set_forwarding_pipeline_config(
        &self,
        request: SetForwardingPipelineConfigRequest,
    ) -> std::result::Result<SetForwardingPipelineConfigResponse, tonic::Status> {
        let mut client = self.client.clone();
        Ok(client
            .set_forwarding_pipeline_config(tonic::Request::new(request))
            .await?
            .into_inner())
    }

    async fn write(
        &self,
        request: WriteRequest,
    ) -> std::result::Result<WriteResponse, tonic::Status> {
        let mut client = self.client.clone();
        Ok(client.write(tonic::Request::new(request)).await?.into_inner())
    }

    async fn stream_channel(
        &self,
        outbound: ReceiverStream<StreamMessageRequest>,
    ) -> std::result::Result<ResponseStream, tonic::Status> {
        let mut client = self.client.clone();
        let inbound = client.stream_channel(outbound).await?.into_inner();
        Ok(inbound.boxed())
    }
}
