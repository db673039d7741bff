use crate::proto::p4runtime::{
    stream_message_response, DigestList, IdleTimeoutNotification, MasterArbitrationUpdate,
    PacketIn, StreamError, StreamMessageResponse,
};

/// An inbound message on the stream channel, by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    Arbitration(MasterArbitrationUpdate),
    Digest(DigestList),
    Packet(PacketIn),
    IdleTimeout(IdleTimeoutNotification),
    Error(StreamError),
    Other(prost_types::Any),
}

impl StreamMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            StreamMessage::Arbitration(_) => "arbitration",
            StreamMessage::Digest(_) => "digest",
            StreamMessage::Packet(_) => "packet",
            StreamMessage::IdleTimeout(_) => "idle_timeout_notification",
            StreamMessage::Error(_) => "error",
            StreamMessage::Other(_) => "other",
        }
    }
}

impl From<stream_message_response::Update> for StreamMessage {
    fn from(update: stream_message_response::Update) -> Self {
        match update {
            stream_message_response::Update::Arbitration(u) => StreamMessage::Arbitration(u),
            stream_message_response::Update::Packet(p) => StreamMessage::Packet(p),
            stream_message_response::Update::Digest(d) => StreamMessage::Digest(d),
            stream_message_response::Update::IdleTimeoutNotification(n) => {
                StreamMessage::IdleTimeout(n)
            }
            stream_message_response::Update::Other(any) => StreamMessage::Other(any),
            stream_message_response::Update::Error(e) => StreamMessage::Error(e),
        }
    }
}

impl StreamMessage {
    /// `None` when the response carries no update the client understands.
    pub fn from_response(response: StreamMessageResponse) -> Option<Self> {
        response.update.map(StreamMessage::from)
    }
}
