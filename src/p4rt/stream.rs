use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use log::{debug, error, trace, warn};
use parking_lot::RwLock;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_stream::wrappers::ReceiverStream;

use crate::config::StreamOptions;
use crate::error::{DeviceError, Error, InternalError, Result};
use crate::event::StreamMessage;
use crate::p4rt::pure::{new_digest_ack_request, new_master_update_request, new_packet_out_request};
use crate::p4rt::transport::{ResponseStream, Transport};
use crate::proto::p4runtime::{PacketMetadata, StreamMessageRequest, StreamMessageResponse};
use crate::proto::rpc;
use crate::representation::DeviceIdentity;

pub type NotificationReceiver = mpsc::UnboundedReceiver<StreamMessage>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MastershipState {
    Unknown,
    Electing,
    Primary,
}

enum StreamStatus {
    Closed,
    Streaming { reader: JoinHandle<Result<()>> },
}

/// Owns the stream channel of one device: arbitration, the read loop, and
/// the outbound side.
///
/// At most one read loop exists per controller. Its handle lives in
/// [StreamStatus], which only [StreamController::arbitrate] touches and only
/// while holding the election lock.
pub struct StreamController {
    identity: DeviceIdentity,
    transport: Arc<dyn Transport>,
    options: StreamOptions,
    status: Mutex<StreamStatus>,
    outbound: RwLock<Option<mpsc::Sender<StreamMessageRequest>>>,
    state: Arc<watch::Sender<MastershipState>>,
    notifications: mpsc::UnboundedSender<StreamMessage>,
}

impl StreamController {
    pub fn new(
        identity: DeviceIdentity,
        transport: Arc<dyn Transport>,
        options: StreamOptions,
    ) -> (StreamController, NotificationReceiver) {
        let (notifications, receiver) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(MastershipState::Unknown);
        let controller = StreamController {
            identity,
            transport,
            options,
            status: Mutex::new(StreamStatus::Closed),
            outbound: RwLock::new(None),
            state: Arc::new(state),
            notifications,
        };
        (controller, receiver)
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn mastership(&self) -> MastershipState {
        *self.state.borrow()
    }

    pub fn is_primary(&self) -> bool {
        self.mastership() == MastershipState::Primary
    }

    /// Watches mastership changes.
    pub fn subscribe_mastership(&self) -> watch::Receiver<MastershipState> {
        self.state.subscribe()
    }

    /// Sends an arbitration update and waits up to `timeout` for the device to
    /// echo it.
    ///
    /// Opens the stream if none is open. Opening counts against `timeout`. If
    /// the read loop ends before the echo, its error is returned at once. On
    /// timeout the stream is torn down, so the next call opens a fresh one.
    pub async fn arbitrate(&self, timeout: Duration) -> Result<()> {
        let device = self.identity.device_id;
        let deadline = Instant::now() + timeout;
        let mut status = match time::timeout_at(deadline, self.status.lock()).await {
            Ok(status) => status,
            Err(_) => return Err(DeviceError::ElectionTimeout { device, timeout }.into()),
        };

        if let StreamStatus::Streaming { reader } = &*status {
            if reader.is_finished() {
                debug!(target: "stream", "device {} read loop has ended, reopening", device);
                *status = StreamStatus::Closed;
                self.outbound.write().take();
            }
        }

        let mut state_rx = self.state.subscribe();
        self.state.send_replace(MastershipState::Electing);
        let request = new_master_update_request(&self.identity);

        if let StreamStatus::Closed = &*status {
            let (sender, receiver) = mpsc::channel(self.options.buffer);
            if sender.send(request).await.is_err() {
                self.state.send_replace(MastershipState::Unknown);
                return Err(DeviceError::NotStreaming { device }.into());
            }
            let opened = time::timeout_at(
                deadline,
                self.transport.stream_channel(ReceiverStream::new(receiver)),
            )
            .await;
            let inbound = match opened {
                Ok(Ok(inbound)) => inbound,
                Ok(Err(error)) => {
                    self.state.send_replace(MastershipState::Unknown);
                    return Err(DeviceError::DeviceGrpcError { device, error }.into());
                }
                Err(_) => {
                    warn!(target: "stream", "device {} did not open the stream within {:?}", device, timeout);
                    self.state.send_replace(MastershipState::Unknown);
                    return Err(DeviceError::ElectionTimeout { device, timeout }.into());
                }
            };
            debug!(target: "stream", "device {} stream opened", device);
            *self.outbound.write() = Some(sender);
            let reader = StreamReader {
                device,
                queue_packets: self.options.queue_packets,
                state: self.state.clone(),
                notifications: self.notifications.clone(),
            };
            *status = StreamStatus::Streaming {
                reader: tokio::spawn(reader.run(inbound)),
            };
        } else if let Err(e) = self.send_stream_request(request).await {
            self.state.send_replace(MastershipState::Unknown);
            return Err(e);
        }

        let reader = match &mut *status {
            StreamStatus::Streaming { reader } => reader,
            StreamStatus::Closed => return Err(DeviceError::NotStreaming { device }.into()),
        };

        let outcome = time::timeout_at(deadline, async {
            let elected: Result<()> = tokio::select! {
                biased;
                primary = state_rx.wait_for(|s| *s == MastershipState::Primary) => match primary {
                    Ok(_) => Ok(()),
                    Err(_) => Err(Error::from(DeviceError::StreamClosed { device })),
                },
                joined = reader => match joined {
                    Ok(Ok(())) => Err(Error::from(DeviceError::StreamClosed { device })),
                    Ok(Err(e)) => Err(e),
                    Err(e) => Err(Error::from(InternalError::ReaderFailed(e.to_string()))),
                },
            };
            elected
        })
        .await;

        match outcome {
            Ok(Ok(())) => {
                debug!(target: "stream", "device {} is primary", device);
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(target: "stream", "device {} arbitration failed: {}", device, e);
                self.shutdown(&mut status).await;
                Err(e)
            }
            Err(_) => {
                warn!(target: "stream", "device {} arbitration timed out after {:?}", device, timeout);
                self.shutdown(&mut status).await;
                Err(DeviceError::ElectionTimeout { device, timeout }.into())
            }
        }
    }

    /// Stops the read loop and forgets the stream.
    ///
    /// The reader is awaited before mastership is reset, so an echo it was
    /// dispatching cannot mark the controller primary afterwards.
    async fn shutdown(&self, status: &mut StreamStatus) {
        if let StreamStatus::Streaming { reader } = std::mem::replace(status, StreamStatus::Closed) {
            // a reader polled to completion must not be polled again
            if !reader.is_finished() {
                reader.abort();
                let _ = reader.await;
            }
        }
        self.outbound.write().take();
        self.state.send_replace(MastershipState::Unknown);
    }

    /// Queues a request on the open stream.
    pub async fn send_stream_request(&self, request: StreamMessageRequest) -> Result<()> {
        let device = self.identity.device_id;
        let sender = self
            .outbound
            .read()
            .clone()
            .ok_or(DeviceError::NotStreaming { device })?;
        sender
            .send(request)
            .await
            .map_err(|_| DeviceError::StreamClosed { device })?;
        Ok(())
    }

    /// Acknowledges one digest list. Every call sends one ack.
    pub async fn ack_digest(&self, digest_id: u32, list_id: u64) -> Result<()> {
        trace!(target: "stream", "ack digest {} list {}", digest_id, list_id);
        self.send_stream_request(new_digest_ack_request(digest_id, list_id))
            .await
    }

    pub async fn packet_out(&self, payload: Bytes, metadata: Vec<PacketMetadata>) -> Result<()> {
        self.send_stream_request(new_packet_out_request(payload, metadata))
            .await
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        if let StreamStatus::Streaming { reader } = self.status.get_mut() {
            reader.abort();
        }
    }
}

/// The read loop of one stream.
struct StreamReader {
    device: u64,
    queue_packets: bool,
    state: Arc<watch::Sender<MastershipState>>,
    notifications: mpsc::UnboundedSender<StreamMessage>,
}

impl StreamReader {
    async fn run(self, mut inbound: ResponseStream) -> Result<()> {
        let result = loop {
            match inbound.next().await {
                Some(Ok(response)) => self.dispatch(response),
                Some(Err(error)) => {
                    error!(target: "stream", "device {} stream error: {}", self.device, error);
                    break Err(DeviceError::DeviceGrpcError {
                        device: self.device,
                        error,
                    }
                    .into());
                }
                None => {
                    debug!(target: "stream", "device {} stream ended", self.device);
                    break Ok(());
                }
            }
        };
        self.state.send_replace(MastershipState::Unknown);
        result
    }

    fn dispatch(&self, response: StreamMessageResponse) {
        let message = match StreamMessage::from_response(response) {
            Some(message) => message,
            None => {
                warn!(target: "stream", "device {} sent an unsupported stream response", self.device);
                return;
            }
        };
        match message {
            StreamMessage::Arbitration(update) => {
                if let Some(status) = update.status.as_ref() {
                    if status.code != rpc::Code::Ok as i32 {
                        warn!(target: "stream", "device {} arbitration status {}: {}", self.device, status.code, status.message);
                    }
                }
                debug!(target: "stream", "device {} arbitration update {:?}", self.device, update.election_id);
                self.state.send_replace(MastershipState::Primary);
            }
            StreamMessage::Digest(digest) => {
                trace!(target: "stream", "device {} digest {} list {}", self.device, digest.digest_id, digest.list_id);
                self.enqueue(StreamMessage::Digest(digest));
            }
            StreamMessage::Error(stream_error) => {
                error!(target: "stream", "device {} reported error {}: {}", self.device, stream_error.canonical_code, stream_error.message);
                self.enqueue(StreamMessage::Error(stream_error));
            }
            StreamMessage::Packet(packet) if self.queue_packets => {
                self.enqueue(StreamMessage::Packet(packet));
            }
            other => {
                debug!(target: "stream", "device {} dropping {} message", self.device, other.kind());
            }
        }
    }

    fn enqueue(&self, message: StreamMessage) {
        if self.notifications.send(message).is_err() {
            trace!(target: "stream", "device {} notification receiver is gone", self.device);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::p4runtime::{
        stream_message_response, DigestList, IdleTimeoutNotification, MasterArbitrationUpdate,
        PacketIn, StreamError,
    };

    fn new_reader(queue_packets: bool) -> (StreamReader, NotificationReceiver, watch::Receiver<MastershipState>) {
        let (notifications, receiver) = mpsc::unbounded_channel();
        let (state, state_rx) = watch::channel(MastershipState::Electing);
        let reader = StreamReader {
            device: 1,
            queue_packets,
            state: Arc::new(state),
            notifications,
        };
        (reader, receiver, state_rx)
    }

    fn response(update: stream_message_response::Update) -> StreamMessageResponse {
        StreamMessageResponse {
            update: Some(update),
        }
    }

    fn digest(list_id: u64) -> StreamMessageResponse {
        response(stream_message_response::Update::Digest(DigestList {
            digest_id: 1,
            list_id,
            ..Default::default()
        }))
    }

    #[test]
    fn test_classification() {
        let (reader, mut queue, state_rx) = new_reader(false);
        reader.dispatch(digest(1));
        reader.dispatch(response(stream_message_response::Update::Arbitration(
            MasterArbitrationUpdate::default(),
        )));
        reader.dispatch(response(stream_message_response::Update::Error(StreamError {
            canonical_code: 3,
            message: "bad".to_owned(),
            ..Default::default()
        })));
        reader.dispatch(response(stream_message_response::Update::IdleTimeoutNotification(
            IdleTimeoutNotification::default(),
        )));
        reader.dispatch(response(stream_message_response::Update::Packet(PacketIn::default())));
        reader.dispatch(response(stream_message_response::Update::Other(
            prost_types::Any::default(),
        )));
        reader.dispatch(StreamMessageResponse { update: None });
        reader.dispatch(digest(2));

        assert_eq!(*state_rx.borrow(), MastershipState::Primary);
        let kinds: Vec<(&str, Option<u64>)> = std::iter::from_fn(|| queue.try_recv().ok())
            .map(|m| {
                let list = match &m {
                    StreamMessage::Digest(d) => Some(d.list_id),
                    _ => None,
                };
                (m.kind(), list)
            })
            .collect();
        assert_eq!(
            kinds,
            vec![("digest", Some(1)), ("error", None), ("digest", Some(2))]
        );
    }

    #[test]
    fn test_packets_are_opt_in() {
        let (reader, mut queue, _state_rx) = new_reader(true);
        reader.dispatch(response(stream_message_response::Update::Packet(PacketIn {
            payload: Bytes::from_static(b"\x01\x02"),
            metadata: vec![],
        })));
        match queue.try_recv() {
            Ok(StreamMessage::Packet(packet)) => assert_eq!(packet.payload.as_ref(), b"\x01\x02"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_loop_resets_state() {
        let (reader, _queue, state_rx) = new_reader(false);
        let inbound = futures::stream::iter(vec![Ok(response(
            stream_message_response::Update::Arbitration(MasterArbitrationUpdate::default()),
        ))])
        .boxed();
        reader.run(inbound).await.unwrap();
        assert_eq!(*state_rx.borrow(), MastershipState::Unknown);

        let (reader, _queue, _state_rx) = new_reader(false);
        let inbound = futures::stream::iter(vec![Err(tonic::Status::unavailable("gone"))]).boxed();
        let err = reader.run(inbound).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Device(DeviceError::DeviceGrpcError { device: 1, .. })
        ));
    }
}
