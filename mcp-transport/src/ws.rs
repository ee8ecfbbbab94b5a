//! `GET /ws?client_id=<id>`: bidirectional JSON channel. Server-pushed
//! events are `WsEvent` envelopes, not JSON-RPC responses; client
//! commands are `subscribe`, `unsubscribe`, `ping` (spec §4.I, §6).

use crate::http::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use mcp_core::{Channel, ConnId, TransportKind};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamMap;
use tokio_stream::StreamExt;
use tracing::{debug, info};

const IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub client_id: Option<String>,
}

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>, Query(query): Query<WsQuery>) -> Response {
    let conn_id = query.client_id.map(ConnId::from).unwrap_or_else(ConnId::generate);
    ws.on_upgrade(move |socket| handle_socket(socket, state, conn_id))
}

#[derive(Debug, Deserialize)]
struct ClientCommand {
    #[serde(rename = "type")]
    command_type: String,
    #[serde(default)]
    data: Value,
}

async fn handle_socket(mut socket: WebSocket, state: AppState, conn_id: ConnId) {
    state.stats.connection_opened();
    state.connections.register(conn_id.clone(), TransportKind::WebSocket, None, None);
    info!(conn_id = %conn_id, "websocket connection opened");

    let mut subscriptions: StreamMap<Channel, ReceiverStream<mcp_core::WsEvent>> = StreamMap::new();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // first tick fires immediately; discard it

    loop {
        tokio::select! {
            biased;

            client_message = tokio::time::timeout(IDLE_TIMEOUT, socket.recv()) => {
                match client_message {
                    Ok(Some(Ok(Message::Text(text)))) => {
                        state.connections.touch(&conn_id);
                        handle_command(&state, &conn_id, &text, &mut subscriptions, &mut socket).await;
                    }
                    Ok(Some(Ok(Message::Close(_)))) | Ok(None) => break,
                    Ok(Some(Ok(_))) => {
                        state.connections.touch(&conn_id);
                    }
                    Ok(Some(Err(_))) => break,
                    Err(_elapsed) => {
                        debug!(conn_id = %conn_id, "websocket idle timeout");
                        break;
                    }
                }
            }

            _ = heartbeat.tick() => {
                if socket.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }

            Some((_channel, event)) = subscriptions.next() => {
                let Ok(text) = serde_json::to_string(&event) else { continue };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.bus.disconnect(&conn_id);
    state.connections.unregister(&conn_id);
    state.stats.connection_closed();
    info!(conn_id = %conn_id, "websocket connection closed");
}

async fn handle_command(
    state: &AppState,
    conn_id: &ConnId,
    text: &str,
    subscriptions: &mut StreamMap<Channel, ReceiverStream<mcp_core::WsEvent>>,
    socket: &mut WebSocket,
) {
    let Ok(command) = serde_json::from_str::<ClientCommand>(text) else {
        let _ = socket
            .send(Message::Text(json!({"type": "error", "message": "invalid command"}).to_string().into()))
            .await;
        return;
    };

    let requested_channels = || -> Vec<String> {
        command
            .data
            .get("channels")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    };

    match command.command_type.as_str() {
        "subscribe" => {
            for name in requested_channels() {
                match state.bus.subscribe_by_name(conn_id.clone(), &name) {
                    Ok(rx) => {
                        let channel: Channel = name.parse().expect("just validated by subscribe_by_name");
                        subscriptions.insert(channel, ReceiverStream::new(rx));
                    }
                    Err(err) => {
                        let _ = socket
                            .send(Message::Text(
                                json!({
                                    "type": "error",
                                    "message": err.to_string(),
                                    "data": {"available_channels": err.1},
                                })
                                .to_string()
                                .into(),
                            ))
                            .await;
                    }
                }
            }
        }
        "unsubscribe" => {
            for name in requested_channels() {
                if let Ok(channel) = name.parse::<Channel>() {
                    state.bus.unsubscribe(conn_id, channel);
                    subscriptions.remove(&channel);
                }
            }
        }
        "ping" => {
            let _ = socket
                .send(Message::Text(json!({"type": "pong", "channel": "", "data": {}}).to_string().into()))
                .await;
        }
        _ => {
            let _ = socket
                .send(Message::Text(json!({"type": "error", "message": "unknown command"}).to_string().into()))
                .await;
        }
    }
}
