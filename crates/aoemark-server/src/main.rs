//! aoemark WebSocket Relay Server
//!
//! Relays measurement publish/remove messages between clients in the same
//! room and keeps the latest record per id for late joiners.
//!
//! ## Protocol
//!
//! Messages are JSON with the following format:
//! ```json
//! { "type": "join", "room": "room-id" }
//! { "type": "publish", "measurement": { "id": "...", "type": "circle", ... } }
//! { "type": "remove", "id": "..." }
//! ```
//!
//! ## Environment
//!
//! - `AOEMARK_ADDR`: bind address (default `0.0.0.0:3030`)
//! - `AOEMARK_CONFIG`: optional path to a measurement config JSON file

mod rooms;

use aoemark_core::{ClientMessage, MeasureConfig, ServerMessage, now_ms};
use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use rooms::{AppState, RoomMessage};
use std::{error::Error, net::SocketAddr, sync::Arc};
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

const DEFAULT_ADDR: &str = "0.0.0.0:3030";

/// Server configuration from the environment.
struct ServerConfig {
    addr: SocketAddr,
    measure: MeasureConfig,
}

impl ServerConfig {
    fn from_env() -> Result<Self, Box<dyn Error>> {
        let addr = std::env::var("AOEMARK_ADDR")
            .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
            .parse()?;
        let measure = match std::env::var("AOEMARK_CONFIG") {
            Ok(path) => {
                info!("Loading measurement config from {}", path);
                MeasureConfig::from_path(&path)?
            }
            Err(_) => MeasureConfig::default(),
        };
        measure.validate()?;
        Ok(Self { addr, measure })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aoemark_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let state = Arc::new(AppState::new(config.measure));

    let app = Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("aoemark relay server listening on {}", config.addr);
    info!("WebSocket endpoint: ws://{}/ws", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Index page
async fn index() -> &'static str {
    "aoemark Relay Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn encode(msg: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            error!("Failed to encode server message: {}", e);
            None
        }
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = Uuid::new_v4().to_string();
    info!("New connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let mut current_room: Option<String> = None;
    let mut room_rx: Option<broadcast::Receiver<RoomMessage>> = None;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                };

                let reply = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join { room }) if current_room.as_deref() == Some(room.as_str()) => {
                        let (peer_count, measurements) = state.snapshot(&room, now_ms()).unwrap_or_default();
                        Some(ServerMessage::Joined { room, peer_count, measurements })
                    }
                    Ok(ClientMessage::Join { room }) => {
                        if let Some(old_room) = current_room.take() {
                            state.leave_room(&old_room, &peer_id, now_ms());
                            state.broadcast(&old_room, &peer_id, ServerMessage::PeerLeft { peer_id: peer_id.clone() });
                        }

                        let joined = state.join_room(&room, &peer_id, now_ms());
                        room_rx = Some(joined.rx);
                        current_room = Some(room.clone());
                        state.broadcast(&room, &peer_id, ServerMessage::PeerJoined { peer_id: peer_id.clone() });
                        info!("Peer {} joined room {} ({} measurements)", peer_id, room, joined.measurements.len());

                        Some(ServerMessage::Joined {
                            room,
                            peer_count: joined.peer_count,
                            measurements: joined.measurements,
                        })
                    }
                    Ok(ClientMessage::Leave) => {
                        if let Some(room) = current_room.take() {
                            state.leave_room(&room, &peer_id, now_ms());
                            state.broadcast(&room, &peer_id, ServerMessage::PeerLeft { peer_id: peer_id.clone() });
                            info!("Peer {} left room {}", peer_id, room);
                        }
                        room_rx = None;
                        None
                    }
                    Ok(ClientMessage::Publish { measurement }) => match &current_room {
                        Some(room) => state
                            .publish(room, &peer_id, measurement, now_ms())
                            .err()
                            .map(|message| ServerMessage::Error { message }),
                        None => Some(ServerMessage::Error { message: "Join a room before publishing".into() }),
                    },
                    Ok(ClientMessage::Remove { id }) => {
                        if let Some(room) = &current_room {
                            state.remove(room, &peer_id, id);
                        }
                        None
                    }
                    Err(e) => {
                        warn!("Invalid message from {}: {}", peer_id, e);
                        Some(ServerMessage::Error { message: format!("Invalid message: {}", e) })
                    }
                };

                if let Some(out) = reply.as_ref().and_then(encode) {
                    if sender.send(out).await.is_err() {
                        break;
                    }
                }
            }

            msg = async {
                match &mut room_rx {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                match msg {
                    // Don't echo back to sender
                    Ok((from, _)) if from == peer_id => {}
                    Ok((_, server_msg)) => {
                        if let Some(out) = encode(&server_msg) {
                            if sender.send(out).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Peer {} lagged, skipped {} messages", peer_id, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        room_rx = None;
                    }
                }
            }
        }
    }

    // Cleanup on disconnect
    if let Some(room) = current_room {
        state.leave_room(&room, &peer_id, now_ms());
        state.broadcast(&room, &peer_id, ServerMessage::PeerLeft { peer_id: peer_id.clone() });
    }
    info!("Connection closed: {}", peer_id);
}
