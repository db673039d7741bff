//! A learning switch for the l2 pipeline.
//!
//! ```text
//! P4INFO_FILE=build/l2.p4info.txt P4CONFIG_JSON=build/l2.json cargo run -p example --bin l2_switch
//! ```
//!
//! `CLIENT_OPTIONS` may hold client options as JSON, e.g. `{"address": "127.0.0.1:9559"}`.

use anyhow::Context;
use bytes::Bytes;
use log::{info, warn};
use rusty_p4_client::entity::digest::DigestConfig;
use rusty_p4_client::proto::p4runtime::DigestList;
use rusty_p4_client::util::value::{Encode, MAC};
use rusty_p4_client::{Client, ClientOptions, MatchValue, StreamMessage};

const MULTICAST_GROUP: u16 = 0xAB;
const PORTS: std::ops::Range<u32> = 0..8;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _logger = flexi_logger::Logger::try_with_env_or_str("info")?.start()?;

    let p4info = std::env::var("P4INFO_FILE").context("P4INFO_FILE is not set")?;
    let device_config = std::env::var("P4CONFIG_JSON").context("P4CONFIG_JSON is not set")?;
    let options = match std::env::var("CLIENT_OPTIONS") {
        Ok(json) => ClientOptions::from_json_str(&json)?,
        Err(_) => ClientOptions::default(),
    };

    let client = Client::connect(options).await?;
    let mut notifications = client
        .take_notifications()
        .context("notification queue already taken")?;
    client.become_primary().await?;
    info!("primary for {}", client.identity());

    client
        .set_fwd_pipeline_from_file(&p4info, &device_config, None)
        .await?;
    client
        .enable_digest_by_name("digest_t", DigestConfig::default())
        .await?;

    let ports: Vec<u32> = PORTS.collect();
    client
        .insert_multicast_group(MULTICAST_GROUP as u32, &ports)
        .await?;
    let broadcast = client.new_table_entry(
        "IngressImpl.dmac",
        &[],
        "IngressImpl.broadcast",
        &[MULTICAST_GROUP.encode()],
    )?;
    client.modify_entity([&broadcast]).await?;

    while let Some(message) = notifications.recv().await {
        match message {
            StreamMessage::Digest(digest) => {
                if let Err(e) = learn(&client, &digest).await {
                    warn!("learning from digest list {} failed: {}", digest.list_id, e);
                }
                client.ack_digest_list(&digest).await?;
            }
            StreamMessage::Error(error) => {
                warn!("device error {}: {}", error.canonical_code, error.message);
            }
            other => info!("ignoring {} message", other.kind()),
        }
    }
    Ok(())
}

/// Installs `smac` and `dmac` entries for every (mac, port) pair in the list.
async fn learn(client: &Client, digest: &DigestList) -> anyhow::Result<()> {
    let mut entries = vec![];
    for data in &digest.data {
        let (mac, port) = match data.members() {
            [mac, port] => (mac.bitstring(), port.bitstring()),
            _ => (None, None),
        };
        let (mac, port): (Bytes, Bytes) = match (mac, port) {
            (Some(mac), Some(port)) => (mac.clone(), port.clone()),
            _ => {
                warn!("unexpected digest member layout {:?}", data);
                continue;
            }
        };
        if let Some(m) = MAC::from_slice(&mac) {
            info!("learned {} on port {}", m, hex::encode(&port));
        }
        entries.push(client.new_table_entry(
            "IngressImpl.smac",
            &[("hdr.ethernet.srcAddr", MatchValue::Exact(mac.clone()))],
            "NoAction",
            &[],
        )?);
        entries.push(client.new_table_entry(
            "IngressImpl.dmac",
            &[("hdr.ethernet.dstAddr", MatchValue::Exact(mac))],
            "IngressImpl.fwd",
            &[port],
        )?);
    }
    client.insert_entity(&entries).await?;
    Ok(())
}
