use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use log::{debug, info};
use parking_lot::{Mutex, RwLock};

use crate::config::ClientOptions;
use crate::entity::digest::{DigestConfig, DigestEntry};
use crate::entity::{ToEntity, UpdateType};
use crate::error::{DeviceError, PipelineError, Result};
use crate::p4rt::pipeconf::{load_forwarding_pipeline_config, Pipeline};
use crate::p4rt::pure;
use crate::p4rt::stream::{MastershipState, NotificationReceiver, StreamController};
use crate::p4rt::transport::{GrpcTransport, Transport};
use crate::proto::p4runtime::{
    get_forwarding_pipeline_config_request, set_forwarding_pipeline_config_request,
    write_request, CapabilitiesRequest, CapabilitiesResponse, DigestList,
    ForwardingPipelineConfig, GetForwardingPipelineConfigRequest, PacketMetadata, TableEntry,
    Update,
};
use crate::representation::DeviceIdentity;
use crate::util::value::MatchValue;

/// A P4Runtime client for one device.
///
/// To program a device:
/// - create the client with [Client::connect] (or [Client::new] over any [Transport]).
/// - become primary with [Client::become_primary]. This opens the stream channel.
/// - take the notification queue with [Client::take_notifications] and consume digests from it.
/// - set the pipeline with [Client::set_fwd_pipeline] or [Client::set_fwd_pipeline_from_file].
/// - write entities, resolved by name against the pipeline the device reported.
///
/// Setting the pipeline and writing need the client to be primary. While an
/// election runs, including a re-election on an already open stream,
/// mastership is [MastershipState::Electing] and those calls fail with
/// `NotMaster` until the device echoes the update.
///
/// Cloning is cheap; all clones share the same stream and pipeline.
#[derive(Clone)]
pub struct Client {
    identity: DeviceIdentity,
    options: Arc<ClientOptions>,
    transport: Arc<dyn Transport>,
    stream: Arc<StreamController>,
    pipeline: Arc<RwLock<Option<Arc<Pipeline>>>>,
    notifications: Arc<Mutex<Option<NotificationReceiver>>>,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>, options: ClientOptions) -> Client {
        let identity = options.identity();
        let (stream, receiver) =
            StreamController::new(identity, transport.clone(), options.stream_options());
        Client {
            identity,
            options: Arc::new(options),
            transport,
            stream: Arc::new(stream),
            pipeline: Arc::new(RwLock::new(None)),
            notifications: Arc::new(Mutex::new(Some(receiver))),
        }
    }

    /// Connects over gRPC to `options.address`.
    pub async fn connect(options: ClientOptions) -> Result<Client> {
        let transport = GrpcTransport::connect(&options.address, options.device_id).await?;
        info!(target: "client", "connected to {} at {}", options.identity(), options.address);
        Ok(Client::new(Arc::new(transport), options))
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    fn device(&self) -> u64 {
        self.identity.device_id
    }

    pub fn mastership(&self) -> MastershipState {
        self.stream.mastership()
    }

    pub fn is_primary(&self) -> bool {
        self.stream.is_primary()
    }

    /// Fails unless mastership is `Primary`; `Electing` counts as not primary.
    fn check_primary(&self) -> Result<()> {
        match self.stream.mastership() {
            MastershipState::Primary => Ok(()),
            state => Err(DeviceError::NotMaster {
                device: self.device(),
                reason: format!("mastership is {:?}", state),
            }
            .into()),
        }
    }

    /// Arbitrates with the device, waiting at most `timeout` for the result.
    pub async fn become_primary_or_raise(&self, timeout: Duration) -> Result<()> {
        self.stream.arbitrate(timeout).await
    }

    /// [Client::become_primary_or_raise] with the configured election timeout.
    pub async fn become_primary(&self) -> Result<()> {
        self.become_primary_or_raise(self.options.election_timeout())
            .await
    }

    /// The queue of digests and stream errors (and packet-ins, when enabled).
    /// Only the first call gets it.
    pub fn take_notifications(&self) -> Option<NotificationReceiver> {
        self.notifications.lock().take()
    }

    pub async fn get_capabilities(&self) -> Result<CapabilitiesResponse> {
        self.transport
            .capabilities(CapabilitiesRequest {})
            .await
            .map_err(|error| self.grpc_error(error))
    }

    pub async fn get_fwd_pipeline(&self) -> Result<ForwardingPipelineConfig> {
        let request = GetForwardingPipelineConfigRequest {
            device_id: self.device(),
            response_type: get_forwarding_pipeline_config_request::ResponseType::All as i32,
        };
        let response = self
            .transport
            .get_forwarding_pipeline_config(request)
            .await
            .map_err(|error| self.grpc_error(error))?;
        Ok(response.config.unwrap_or_default())
    }

    /// Sets the pipeline, then reads it back and indexes what the device reports.
    ///
    /// The held pipeline is only replaced once both calls succeed.
    pub async fn set_fwd_pipeline(
        &self,
        config: ForwardingPipelineConfig,
        action: set_forwarding_pipeline_config_request::Action,
    ) -> Result<Arc<Pipeline>> {
        self.check_primary()?;
        let request = pure::new_set_forwarding_pipeline_config_request(&self.identity, action, config);
        self.transport
            .set_forwarding_pipeline_config(request)
            .await
            .map_err(|error| self.grpc_error(error))?;

        let pipeline = Arc::new(Pipeline::from_config(self.get_fwd_pipeline().await?)?);
        *self.pipeline.write() = Some(pipeline.clone());
        info!(target: "client", "{} pipeline set ({:?})", self.identity, action);
        Ok(pipeline)
    }

    pub async fn set_fwd_pipeline_from_file<P, Q>(
        &self,
        p4info_path: P,
        device_config_path: Q,
        cookie: Option<u64>,
    ) -> Result<Arc<Pipeline>>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let config =
            load_forwarding_pipeline_config(p4info_path, device_config_path, cookie).await?;
        self.set_fwd_pipeline(
            config,
            set_forwarding_pipeline_config_request::Action::VerifyAndCommit,
        )
        .await
    }

    /// The pipeline last set through this client.
    pub fn pipeline(&self) -> Result<Arc<Pipeline>> {
        self.pipeline
            .read()
            .clone()
            .ok_or_else(|| PipelineError::PipelineNotSet.into())
    }

    pub fn new_table_entry(
        &self,
        table: &str,
        field_matches: &[(&str, MatchValue)],
        action: &str,
        params: &[Bytes],
    ) -> Result<TableEntry> {
        self.new_table_entry_with(table, field_matches, action, params, 0, 0)
    }

    pub fn new_table_entry_with(
        &self,
        table: &str,
        field_matches: &[(&str, MatchValue)],
        action: &str,
        params: &[Bytes],
        priority: i32,
        idle_timeout_ns: i64,
    ) -> Result<TableEntry> {
        let pipeline = self.pipeline()?;
        pure::build_table_entry(
            pipeline.index(),
            table,
            field_matches,
            action,
            params,
            priority,
            idle_timeout_ns,
        )
    }

    pub async fn insert_entity<I, T>(&self, entities: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: ToEntity,
    {
        self.write_entities(UpdateType::Insert, entities).await
    }

    pub async fn modify_entity<I, T>(&self, entities: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: ToEntity,
    {
        self.write_entities(UpdateType::Modify, entities).await
    }

    pub async fn delete_entity<I, T>(&self, entities: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: ToEntity,
    {
        self.write_entities(UpdateType::Delete, entities).await
    }

    async fn write_entities<I, T>(&self, update_type: UpdateType, entities: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: ToEntity,
    {
        let updates = entities
            .into_iter()
            .map(|e| e.to_update(update_type))
            .collect();
        self.write_updates(updates, write_request::Atomicity::ContinueOnError)
            .await
    }

    /// Writes `updates` in one request.
    pub async fn write_updates(
        &self,
        updates: Vec<Update>,
        atomicity: write_request::Atomicity,
    ) -> Result<()> {
        self.check_primary()?;
        debug!(target: "client", "{} write {} updates ({:?})", self.identity, updates.len(), atomicity);
        let request = pure::new_write_request(&self.identity, updates, atomicity);
        self.transport
            .write(request)
            .await
            .map_err(|error| self.grpc_error(error))?;
        Ok(())
    }

    pub async fn insert_multicast_group(&self, multicast_group_id: u32, ports: &[u32]) -> Result<()> {
        let group = pure::build_multicast_group_entry(multicast_group_id, ports);
        self.insert_entity([group]).await
    }

    pub async fn enable_digest(&self, digest_id: u32) -> Result<()> {
        self.enable_digest_with(digest_id, DigestConfig::default())
            .await
    }

    pub async fn enable_digest_with(&self, digest_id: u32, config: DigestConfig) -> Result<()> {
        self.insert_digest(pure::build_digest_entry(digest_id, config))
            .await
    }

    pub async fn enable_digest_by_name(&self, digest: &str, config: DigestConfig) -> Result<()> {
        let pipeline = self.pipeline()?;
        let entry = pure::build_digest_entry_by_name(pipeline.index(), digest, config)?;
        self.insert_digest(entry).await
    }

    async fn insert_digest(&self, entry: DigestEntry) -> Result<()> {
        debug!(target: "client", "{} enable digest {}", self.identity, entry.digest_id);
        self.insert_entity([entry]).await
    }

    pub async fn ack_digest_list(&self, digest_list: &DigestList) -> Result<()> {
        self.ack_digest(digest_list.digest_id, digest_list.list_id)
            .await
    }

    pub async fn ack_digest(&self, digest_id: u32, list_id: u64) -> Result<()> {
        self.stream.ack_digest(digest_id, list_id).await
    }

    pub async fn packet_out(&self, payload: Bytes, metadata: Vec<PacketMetadata>) -> Result<()> {
        self.stream.packet_out(payload, metadata).await
    }

    fn grpc_error(&self, error: tonic::Status) -> crate::error::Error {
        DeviceError::DeviceGrpcError {
            device: self.device(),
            error,
        }
        .into()
    }
}
