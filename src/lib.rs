//! A P4Runtime control-plane client.
//!
//! [Client] holds mastership of one device over the stream channel, sets the
//! forwarding pipeline, and writes entities resolved by name against the
//! pipeline the device reports. Digests and stream errors arrive on a
//! notification queue, see [Client::take_notifications].

pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod p4rt;
pub mod proto;
pub mod representation;
pub mod util;

pub use config::ClientOptions;
pub use error::{Error, Result};
pub use event::StreamMessage;
pub use p4rt::client::Client;
pub use p4rt::stream::MastershipState;
pub use util::value::MatchValue;
