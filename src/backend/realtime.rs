/// Supabase Realtime change stream
///
/// Realtime speaks the Phoenix channel protocol over a websocket. The board
/// joins a single channel scoped to its table, asks for `postgres_changes`
/// on every event kind, keeps the socket alive with heartbeats and forwards
/// decoded row changes to a `ChangeFeed`.
///
/// There is no reconnection: when the socket closes the feed ends.
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as Frame;

use super::rest::project_url;
use super::{BackendError, ChangeEvent, ChangeFeed};
use crate::config::Settings;
use crate::state::data::{RecordId, TestCase};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
const PROTOCOL_VERSION: &str = "1.0.0";

/// Outgoing Phoenix message
#[derive(Debug, Serialize)]
struct Outgoing<'a> {
    topic: &'a str,
    event: &'a str,
    payload: Value,
    #[serde(rename = "ref")]
    msg_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    join_ref: Option<String>,
}

/// Incoming Phoenix message; only the fields the board reads
#[derive(Debug, Deserialize)]
struct Incoming {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Deserialize)]
struct ChangePayload {
    data: ChangeData,
}

#[derive(Debug, Deserialize)]
struct ChangeData {
    #[serde(rename = "type")]
    kind: ChangeKind,
    #[serde(default)]
    record: Option<Value>,
    #[serde(default)]
    old_record: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// What a single frame meant to the board
#[derive(Debug, PartialEq)]
pub enum Decoded {
    Change(ChangeEvent),
    Joined,
    /// The server refused or closed the channel
    Closed(String),
    Ignored,
}

/// Channel topic, e.g. `realtime:public:test_cases`
pub fn topic(settings: &Settings) -> String {
    format!("realtime:{}:{}", settings.schema, settings.table)
}

/// Websocket endpoint, with the scheme switched to ws/wss
pub fn socket_url(settings: &Settings) -> Result<String, BackendError> {
    let mut url = project_url(settings, "realtime/v1/websocket")?;
    let scheme = if url.scheme() == "http" { "ws" } else { "wss" };
    url.set_scheme(scheme).map_err(|_| {
        BackendError::Url(format!("cannot derive websocket URL from {}", settings.url))
    })?;
    url.query_pairs_mut()
        .append_pair("apikey", &settings.anon_key)
        .append_pair("eventsPerSecond", &settings.events_per_second.to_string())
        .append_pair("vsn", PROTOCOL_VERSION);
    Ok(url.to_string())
}

/// `phx_join` asking for every change on the table
pub fn join_message(settings: &Settings, join_ref: &str) -> String {
    let topic = topic(settings);
    let message = Outgoing {
        topic: &topic,
        event: "phx_join",
        payload: json!({
            "config": {
                "broadcast": { "ack": false, "self": false },
                "presence": { "key": "" },
                "postgres_changes": [
                    { "event": "*", "schema": settings.schema, "table": settings.table }
                ]
            },
            "access_token": settings.anon_key
        }),
        msg_ref: join_ref.to_string(),
        join_ref: Some(join_ref.to_string()),
    };
    serde_json::to_string(&message).unwrap_or_default()
}

pub fn heartbeat_message(msg_ref: u64) -> String {
    let message = Outgoing {
        topic: "phoenix",
        event: "heartbeat",
        payload: json!({}),
        msg_ref: msg_ref.to_string(),
        join_ref: None,
    };
    serde_json::to_string(&message).unwrap_or_default()
}

/// Interpret one text frame received on `topic`
pub fn decode_frame(topic: &str, text: &str) -> Result<Decoded, BackendError> {
    let incoming: Incoming = serde_json::from_str(text)?;
    if incoming.topic != topic {
        return Ok(Decoded::Ignored);
    }

    match incoming.event.as_str() {
        "postgres_changes" => {
            let payload: ChangePayload = serde_json::from_value(incoming.payload)?;
            decode_change(payload.data).map(Decoded::Change)
        }
        "phx_reply" => {
            let status = incoming.payload.get("status").and_then(Value::as_str);
            match status {
                Some("ok") => Ok(Decoded::Joined),
                _ => Ok(Decoded::Closed(incoming.payload.to_string())),
            }
        }
        "phx_error" | "phx_close" => Ok(Decoded::Closed(incoming.event)),
        // Postgres change setup failures arrive here, after a successful join
        "system" => {
            let status = incoming.payload.get("status").and_then(Value::as_str);
            if status != Some("error") {
                return Ok(Decoded::Ignored);
            }
            let reason = match incoming.payload.get("message").and_then(Value::as_str) {
                Some(message) => message.to_string(),
                None => incoming.payload.to_string(),
            };
            Ok(Decoded::Closed(reason))
        }
        _ => Ok(Decoded::Ignored),
    }
}

fn decode_change(data: ChangeData) -> Result<ChangeEvent, BackendError> {
    let row = |value: Option<Value>| value.unwrap_or(Value::Null);
    match data.kind {
        ChangeKind::Insert => {
            let record: TestCase = serde_json::from_value(row(data.record))?;
            Ok(ChangeEvent::Insert(record))
        }
        ChangeKind::Update => {
            let record: TestCase = serde_json::from_value(row(data.record))?;
            Ok(ChangeEvent::Update(record))
        }
        ChangeKind::Delete => {
            let old = row(data.old_record);
            let id = old.get("id").cloned().unwrap_or(Value::Null);
            Ok(ChangeEvent::Delete(serde_json::from_value::<RecordId>(id)?))
        }
    }
}

/// Open the socket, join the table channel and start forwarding changes.
///
/// Returns once the server has acknowledged the join; a refused join is
/// reported as `BackendError::Rejected`.
pub async fn connect(settings: &Settings) -> Result<ChangeFeed, BackendError> {
    let url = socket_url(settings)?;
    let (socket, _) = connect_async(url.as_str()).await?;
    let (mut sink, mut stream) = socket.split();

    let topic = topic(settings);
    sink.send(Frame::Text(join_message(settings, "1"))).await?;

    let (tx, rx) = mpsc::unbounded_channel();
    loop {
        let text = match stream.next().await {
            Some(Ok(Frame::Text(text))) => text,
            Some(Ok(Frame::Close(reason))) => {
                return Err(BackendError::Rejected(format!(
                    "socket closed before the join reply: {:?}",
                    reason
                )));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
            None => {
                return Err(BackendError::Rejected(
                    "socket closed before the join reply".to_string(),
                ));
            }
        };

        match decode_frame(&topic, &text) {
            Ok(Decoded::Joined) => break,
            Ok(Decoded::Closed(reason)) => return Err(BackendError::Rejected(reason)),
            Ok(Decoded::Change(event)) => {
                let _ = tx.send(event);
            }
            Ok(Decoded::Ignored) => {}
            Err(e) => warn!("Skipping undecodable realtime frame: {}", e),
        }
    }
    info!("📡 Subscribed to {}", topic);

    let worker = tokio::spawn(async move {
        let start = Instant::now() + HEARTBEAT_INTERVAL;
        let mut heartbeat = interval_at(start, HEARTBEAT_INTERVAL);
        let mut next_ref: u64 = 2;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let beat = Frame::Text(heartbeat_message(next_ref));
                    if let Err(e) = sink.send(beat).await {
                        error!("Realtime heartbeat failed: {}", e);
                        break;
                    }
                    next_ref += 1;
                }
                frame = stream.next() => {
                    let text = match frame {
                        Some(Ok(Frame::Text(text))) => text,
                        Some(Ok(Frame::Close(reason))) => {
                            warn!("Realtime socket closed: {:?}", reason);
                            break;
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            error!("Realtime socket error: {}", e);
                            break;
                        }
                        None => break,
                    };

                    match decode_frame(&topic, &text) {
                        Ok(Decoded::Change(event)) => {
                            if tx.send(event).is_err() {
                                // Feed dropped
                                break;
                            }
                        }
                        Ok(Decoded::Joined) => debug!("reply on {}", topic),
                        Ok(Decoded::Closed(reason)) => {
                            error!("Realtime channel {} closed: {}", topic, reason);
                            break;
                        }
                        Ok(Decoded::Ignored) => {}
                        Err(e) => warn!("Skipping undecodable realtime frame: {}", e),
                    }
                }
            }
        }
        info!("📴 Realtime stream for {} ended", topic);
    });

    Ok(ChangeFeed::new(rx, worker))
}
