//! WebSocket transport: accepts connections, assigns session ids, pumps
//! messages between the socket and the owning room, and enforces the
//! keepalive policy. All game logic lives behind the room's event channel.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::stream::SplitSink;
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::RoomRegistry;
use crate::room::RoomEvent;

const MAX_WS_MESSAGE_BYTES: usize = 64 * 1024;
const PING_INTERVAL: Duration = Duration::from_secs(10);
const MAX_MISSED_PINGS: u32 = 6;

/// Helper to serialize and send a message over WebSocket.
/// Returns Err only when the socket itself refused the send.
async fn send_json<T: Serialize>(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &T,
) -> Result<(), ()> {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.map_err(|_| ()),
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            Ok(())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub nickname: String,
    /// Join code for an existing room; matched case-insensitively
    pub code: Option<String>,
    /// Create a fresh room instead of joining one
    #[serde(default)]
    pub create: bool,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(registry): State<RoomRegistry>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, params, registry))
}

/// Handle one client connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, params: WsQuery, registry: RoomRegistry) {
    let (mut sender, mut receiver) = socket.split();

    let room = if params.create {
        Some(registry.create_room().await)
    } else {
        match params.code.as_deref() {
            Some(code) => registry.find(code).await,
            None => None,
        }
    };
    let Some(room) = room else {
        let _ = send_json(
            &mut sender,
            &ServerMessage::Error {
                message: "Room not found".to_string(),
            },
        )
        .await;
        let _ = sender.send(Message::Close(None)).await;
        return;
    };

    let session_id = ulid::Ulid::new().to_string();
    tracing::info!(code = %room.code, session = %session_id, "WebSocket connected");

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerMessage>();
    room.send(RoomEvent::Join {
        session_id: session_id.clone(),
        nickname: params.nickname.clone(),
        sender: outbound_tx,
    });

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await; // the first tick completes immediately
    let mut missed_pings: u32 = 0;
    // an explicit close frame is a consented leave; anything else gets the
    // reconnection grace window
    let mut consented = false;

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(msg) => {
                        if send_json(&mut sender, &msg).await.is_err() {
                            break;
                        }
                    }
                    // room rejected the join or disposed; nothing left to pump
                    None => break,
                }
            }

            _ = ping_interval.tick() => {
                if missed_pings >= MAX_MISSED_PINGS {
                    tracing::info!(session = %session_id, "Keepalive expired, dropping connection");
                    break;
                }
                missed_pings += 1;
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > MAX_WS_MESSAGE_BYTES {
                            let _ = send_json(&mut sender, &ServerMessage::Error {
                                message: "Message too large".to_string(),
                            }).await;
                            continue;
                        }
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(msg) => room.send(RoomEvent::Message {
                                session_id: session_id.clone(),
                                msg,
                            }),
                            Err(e) => {
                                tracing::debug!(session = %session_id, "Unparseable client message: {}", e);
                                let _ = send_json(&mut sender, &ServerMessage::Error {
                                    message: format!("Invalid message: {}", e),
                                }).await;
                            }
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        missed_pings = 0;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        consented = true;
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(session = %session_id, "WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    room.send(RoomEvent::Leave {
        session_id: session_id.clone(),
        consented,
    });
    tracing::info!(session = %session_id, consented, "WebSocket closed");
}
