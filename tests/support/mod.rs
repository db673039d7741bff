#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, UnboundedReceiverStream};

use rusty_p4_client::p4rt::transport::{ResponseStream, Transport};
use rusty_p4_client::proto::p4config::{
    action, match_field, Action, Digest, MatchField, P4Info, Preamble, Table,
};
use rusty_p4_client::proto::p4runtime::{
    stream_message_request, stream_message_response, CapabilitiesRequest, CapabilitiesResponse,
    ForwardingPipelineConfig, GetForwardingPipelineConfigRequest,
    GetForwardingPipelineConfigResponse, SetForwardingPipelineConfigRequest,
    SetForwardingPipelineConfigResponse, StreamMessageRequest, StreamMessageResponse,
    WriteRequest, WriteResponse,
};

/// How the mock device answers an arbitration update.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ArbitrationReply {
    Echo,
    /// Echo after the given delay.
    EchoAfter(Duration),
    Ignore,
    /// End the stream with a transport error.
    Fail,
}

type Inbound = mpsc::UnboundedSender<Result<StreamMessageResponse, tonic::Status>>;

/// A scripted P4Runtime device.
///
/// Arbitration updates are answered per [ArbitrationReply]. Every other
/// outbound stream request is forwarded to the receiver returned by
/// [MockTransport::new].
pub struct MockTransport {
    pub reply: Arc<Mutex<ArbitrationReply>>,
    pub fail_stream: AtomicBool,
    /// Never answer a stream open.
    pub hang_open: AtomicBool,
    pub fail_set: AtomicBool,
    pub stream_opens: AtomicUsize,
    pub capabilities_calls: AtomicUsize,
    pub get_pipeline_calls: AtomicUsize,
    pub writes: Mutex<Vec<WriteRequest>>,
    pub set_requests: Mutex<Vec<SetForwardingPipelineConfigRequest>>,
    /// What the device reports on get-pipeline.
    pub pipeline: Mutex<Option<ForwardingPipelineConfig>>,
    inbound: Mutex<Option<Inbound>>,
    sent: mpsc::UnboundedSender<StreamMessageRequest>,
}

impl MockTransport {
    pub fn new() -> (Arc<MockTransport>, mpsc::UnboundedReceiver<StreamMessageRequest>) {
        let (sent, sent_rx) = mpsc::unbounded_channel();
        let mock = MockTransport {
            reply: Arc::new(Mutex::new(ArbitrationReply::Echo)),
            fail_stream: AtomicBool::new(false),
            hang_open: AtomicBool::new(false),
            fail_set: AtomicBool::new(false),
            stream_opens: AtomicUsize::new(0),
            capabilities_calls: AtomicUsize::new(0),
            get_pipeline_calls: AtomicUsize::new(0),
            writes: Mutex::new(vec![]),
            set_requests: Mutex::new(vec![]),
            pipeline: Mutex::new(None),
            inbound: Mutex::new(None),
            sent,
        };
        (Arc::new(mock), sent_rx)
    }

    pub fn set_reply(&self, reply: ArbitrationReply) {
        *self.reply.lock() = reply;
    }

    pub fn opens(&self) -> usize {
        self.stream_opens.load(Ordering::SeqCst)
    }

    /// Pushes a message down the most recently opened stream.
    pub fn inject(&self, update: stream_message_response::Update) {
        if let Some(inbound) = self.inbound.lock().as_ref() {
            let _ = inbound.send(Ok(StreamMessageResponse {
                update: Some(update),
            }));
        }
    }

    pub fn inject_raw(&self, response: StreamMessageResponse) {
        if let Some(inbound) = self.inbound.lock().as_ref() {
            let _ = inbound.send(Ok(response));
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn capabilities(
        &self,
        _request: CapabilitiesRequest,
    ) -> Result<CapabilitiesResponse, tonic::Status> {
        self.capabilities_calls.fetch_add(1, Ordering::SeqCst);
        Ok(CapabilitiesResponse {
            p4runtime_api_version: "1.3.0".to_owned(),
        })
    }

    async fn get_forwarding_pipeline_config(
        &self,
        _request: GetForwardingPipelineConfigRequest,
    ) -> Result<GetForwardingPipelineConfigResponse, tonic::Status> {
        self.get_pipeline_calls.fetch_add(1, Ordering::SeqCst);
        Ok(GetForwardingPipelineConfigResponse {
            config: self.pipeline.lock().clone(),
        })
    }

    async fn set_forwarding_pipeline_config(
        &self,
        request: SetForwardingPipelineConfigRequest,
    ) -> Result<SetForwardingPipelineConfigResponse, tonic::Status> {
        self.set_requests.lock().push(request.clone());
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(tonic::Status::invalid_argument("pipeline rejected"));
        }
        *self.pipeline.lock() = request.config;
        Ok(SetForwardingPipelineConfigResponse {})
    }

    async fn write(&self, request: WriteRequest) -> Result<WriteResponse, tonic::Status> {
        self.writes.lock().push(request);
        Ok(WriteResponse {})
    }

    async fn stream_channel(
        &self,
        mut outbound: ReceiverStream<StreamMessageRequest>,
    ) -> Result<ResponseStream, tonic::Status> {
        self.stream_opens.fetch_add(1, Ordering::SeqCst);
        if self.hang_open.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
        if self.fail_stream.load(Ordering::SeqCst) {
            return Err(tonic::Status::unavailable("device unreachable"));
        }
        let (inbound, inbound_rx) = mpsc::unbounded_channel();
        *self.inbound.lock() = Some(inbound.clone());

        let reply = self.reply.clone();
        let sent = self.sent.clone();
        tokio::spawn(async move {
            while let Some(request) = outbound.next().await {
                let arbitration = match &request.update {
                    Some(stream_message_request::Update::Arbitration(a)) => a.clone(),
                    _ => {
                        let _ = sent.send(request);
                        continue;
                    }
                };
                let reply = *reply.lock();
                match reply {
                    ArbitrationReply::Echo => {
                        let _ = inbound.send(Ok(StreamMessageResponse {
                            update: Some(stream_message_response::Update::Arbitration(
                                arbitration,
                            )),
                        }));
                    }
                    ArbitrationReply::EchoAfter(delay) => {
                        tokio::time::sleep(delay).await;
                        let _ = inbound.send(Ok(StreamMessageResponse {
                            update: Some(stream_message_response::Update::Arbitration(
                                arbitration,
                            )),
                        }));
                    }
                    ArbitrationReply::Ignore => {}
                    ArbitrationReply::Fail => {
                        let _ = inbound.send(Err(tonic::Status::internal("stream broken")));
                    }
                }
            }
        });

        Ok(UnboundedReceiverStream::new(inbound_rx).boxed())
    }
}

fn preamble(id: u32, name: &str) -> Option<Preamble> {
    Some(Preamble {
        id,
        name: name.to_owned(),
        alias: name.rsplit('.').next().unwrap_or(name).to_owned(),
        ..Default::default()
    })
}

fn exact(id: u32, name: &str, bitwidth: i32) -> MatchField {
    MatchField {
        id,
        name: name.to_owned(),
        bitwidth,
        r#match: Some(match_field::Match::MatchType(
            match_field::MatchType::Exact as i32,
        )),
        ..Default::default()
    }
}

fn param(id: u32, name: &str, bitwidth: i32) -> action::Param {
    action::Param {
        id,
        name: name.to_owned(),
        bitwidth,
        ..Default::default()
    }
}

pub const SMAC_ID: u32 = 37375156;
pub const DMAC_ID: u32 = 45595255;
pub const FWD_ID: u32 = 29683729;
pub const BROADCAST_ID: u32 = 31420196;
pub const DIGEST_ID: u32 = 401827287;

/// The l2 learning switch pipeline.
pub fn l2_p4info() -> P4Info {
    P4Info {
        tables: vec![
            Table {
                preamble: preamble(SMAC_ID, "IngressImpl.smac"),
                match_fields: vec![exact(1, "hdr.ethernet.srcAddr", 48)],
                ..Default::default()
            },
            Table {
                preamble: preamble(DMAC_ID, "IngressImpl.dmac"),
                match_fields: vec![exact(1, "hdr.ethernet.dstAddr", 48)],
                ..Default::default()
            },
        ],
        actions: vec![
            Action {
                preamble: preamble(21257015, "NoAction"),
                params: vec![],
            },
            Action {
                preamble: preamble(20481859, "IngressImpl.learn_mac"),
                params: vec![],
            },
            Action {
                preamble: preamble(FWD_ID, "IngressImpl.fwd"),
                params: vec![param(1, "eg_port", 9)],
            },
            Action {
                preamble: preamble(BROADCAST_ID, "IngressImpl.broadcast"),
                params: vec![param(1, "mgrp", 16)],
            },
        ],
        digests: vec![Digest {
            preamble: preamble(DIGEST_ID, "digest_t"),
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// A pipeline with a single table, distinguishable from [l2_p4info].
pub fn other_p4info() -> P4Info {
    P4Info {
        tables: vec![Table {
            preamble: preamble(1, "Other.t"),
            ..Default::default()
        }],
        ..Default::default()
    }
}
