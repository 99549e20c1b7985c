//! Wire protocol and WebSocket client for the measurement relay.
//!
//! Messages are JSON, internally tagged by `type`:
//! ```json
//! { "type": "join", "room": "room-id" }
//! { "type": "publish", "measurement": { "id": "...", "type": "cone", ... } }
//! { "type": "remove", "id": "..." }
//! ```

use crate::measurement::{MeasurementId, SharedMeasurement};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sync errors.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Not connected")]
    NotConnected,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Messages sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a room.
    Join { room: String },
    /// Leave the current room.
    Leave,
    /// Share a new or replacement measurement.
    Publish { measurement: SharedMeasurement },
    /// Withdraw a measurement.
    Remove { id: MeasurementId },
}

/// Messages received from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirm room join with the room's current measurements.
    Joined {
        room: String,
        peer_count: usize,
        #[serde(default)]
        measurements: Vec<SharedMeasurement>,
    },
    /// Peer joined the room.
    PeerJoined { peer_id: String },
    /// Peer left the room.
    PeerLeft { peer_id: String },
    /// A peer shared a measurement.
    Published {
        from: String,
        measurement: SharedMeasurement,
    },
    /// A peer withdrew a measurement.
    Removed { from: String, id: MeasurementId },
    /// Error message.
    Error { message: String },
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events from the WebSocket client.
#[derive(Debug, Clone, PartialEq)]
pub enum WsEvent {
    Connected,
    Disconnected,
    Message(ServerMessage),
    Error { message: String },
}

/// What an incoming server message did to the local live set.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Joined a room; `received` records were loaded from its snapshot.
    JoinedRoom {
        room: String,
        peer_count: usize,
        received: usize,
    },
    PeerJoined { peer_id: String },
    PeerLeft { peer_id: String },
    /// A record was inserted or replaced.
    MeasurementUpdated { from: String, id: MeasurementId },
    /// A record was withdrawn.
    MeasurementRemoved { from: String, id: MeasurementId },
    Error { message: String },
}

/// At most `max_chars` characters of an outgoing message, for logging.
#[cfg(not(target_arch = "wasm32"))]
fn log_preview(msg: &str, max_chars: usize) -> &str {
    msg.char_indices().nth(max_chars).map_or(msg, |(i, _)| &msg[..i])
}

// ============================================================================
// Native WebSocket Client
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
mod native_client {
    use super::*;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::{Message, connect};
    use url::Url;

    enum WsCommand {
        Send(String),
        Close,
    }

    /// WebSocket client for native platforms.
    ///
    /// Uses a background thread; events are collected and drained with
    /// [`NativeWebSocket::poll_events`] once per frame.
    pub struct NativeWebSocket {
        state: ConnectionState,
        events: Vec<WsEvent>,
        cmd_tx: Option<Sender<WsCommand>>,
        event_rx: Option<Receiver<WsEvent>>,
        _thread: Option<JoinHandle<()>>,
    }

    impl NativeWebSocket {
        /// Create a new disconnected client.
        pub fn new() -> Self {
            Self {
                state: ConnectionState::Disconnected,
                events: Vec::new(),
                cmd_tx: None,
                event_rx: None,
                _thread: None,
            }
        }

        /// Connect to the relay server.
        pub fn connect(&mut self, url: &str) -> Result<(), SyncError> {
            if self.cmd_tx.is_some() {
                return Err(SyncError::AlreadyConnected);
            }

            let parsed = Url::parse(url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
            if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
                return Err(SyncError::InvalidUrl(format!(
                    "unsupported scheme {}",
                    parsed.scheme()
                )));
            }

            self.state = ConnectionState::Connecting;

            let (cmd_tx, cmd_rx) = channel::<WsCommand>();
            let (event_tx, event_rx) = channel::<WsEvent>();
            let url = url.to_string();

            let handle = thread::spawn(move || {
                log::info!("WebSocket thread: connecting to {}", url);

                let (mut socket, response) = match connect(&url) {
                    Ok(pair) => pair,
                    Err(e) => {
                        log::error!("WebSocket connection failed: {}", e);
                        let _ = event_tx.send(WsEvent::Error {
                            message: format!("Connection failed: {}", e),
                        });
                        return;
                    }
                };
                log::info!("WebSocket connected, status: {}", response.status());
                let _ = event_tx.send(WsEvent::Connected);

                if let tungstenite::stream::MaybeTlsStream::Plain(tcp) = socket.get_mut() {
                    let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
                    let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
                }

                loop {
                    match cmd_rx.try_recv() {
                        Ok(WsCommand::Send(msg)) => {
                            log::debug!("WebSocket sending: {}", log_preview(&msg, 100));
                            if let Err(e) = socket.send(Message::Text(msg)) {
                                log::error!("WebSocket send error: {}", e);
                                break;
                            }
                        }
                        Ok(WsCommand::Close) => {
                            log::info!("WebSocket close requested");
                            let _ = socket.close(None);
                            break;
                        }
                        Err(TryRecvError::Disconnected) => break,
                        Err(TryRecvError::Empty) => {}
                    }

                    match socket.read() {
                        Ok(Message::Text(txt)) => match serde_json::from_str::<ServerMessage>(&txt) {
                            Ok(msg) => {
                                let _ = event_tx.send(WsEvent::Message(msg));
                            }
                            Err(e) => log::warn!("Failed to parse server message: {}", e),
                        },
                        Ok(Message::Ping(data)) => {
                            let _ = socket.send(Message::Pong(data));
                        }
                        Ok(Message::Close(_)) => {
                            log::info!("WebSocket received close frame");
                            break;
                        }
                        Ok(_) => {}
                        Err(tungstenite::Error::Io(ref e))
                            if e.kind() == std::io::ErrorKind::WouldBlock
                                || e.kind() == std::io::ErrorKind::TimedOut => {}
                        Err(e) => {
                            log::error!("WebSocket read error: {}", e);
                            break;
                        }
                    }
                }

                log::info!("WebSocket thread exiting");
                let _ = event_tx.send(WsEvent::Disconnected);
            });

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);
            Ok(())
        }

        /// Disconnect from the server.
        pub fn disconnect(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(WsCommand::Close);
            }
            self.event_rx = None;
            self._thread = None;
            self.state = ConnectionState::Disconnected;
        }

        /// Send a text message.
        pub fn send(&self, msg: &str) -> Result<(), SyncError> {
            let tx = self.cmd_tx.as_ref().ok_or(SyncError::NotConnected)?;
            tx.send(WsCommand::Send(msg.to_string()))
                .map_err(|_| SyncError::NotConnected)
        }

        /// Drain pending events (non-blocking).
        pub fn poll_events(&mut self) -> Vec<WsEvent> {
            if let Some(ref rx) = self.event_rx {
                while let Ok(event) = rx.try_recv() {
                    match &event {
                        WsEvent::Connected => self.state = ConnectionState::Connected,
                        WsEvent::Disconnected => self.state = ConnectionState::Disconnected,
                        WsEvent::Error { .. } => self.state = ConnectionState::Error,
                        WsEvent::Message(_) => {}
                    }
                    self.events.push(event);
                }
            }
            std::mem::take(&mut self.events)
        }

        pub fn state(&self) -> ConnectionState {
            self.state
        }

        pub fn is_connected(&self) -> bool {
            self.state == ConnectionState::Connected
        }
    }

    impl Default for NativeWebSocket {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for NativeWebSocket {
        fn drop(&mut self) {
            self.disconnect();
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native_client::NativeWebSocket;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::ShapeKind;
    use kurbo::Point;

    #[test]
    fn test_client_message_serialize() {
        let msg = ClientMessage::Join {
            room: "test-room".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"join","room":"test-room"}"#);
    }

    #[test]
    fn test_publish_carries_measurement() {
        let m = SharedMeasurement::new(ShapeKind::Cube, Point::ZERO, Point::new(5.0, 5.0), "p");
        let json = serde_json::to_value(ClientMessage::Publish { measurement: m.clone() }).unwrap();
        assert_eq!(json["type"], "publish");
        assert_eq!(json["measurement"]["type"], "cube");
        let back: ClientMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, ClientMessage::Publish { measurement: m });
    }

    #[test]
    fn test_server_message_deserialize() {
        let json = r#"{"type":"joined","room":"test","peer_count":2}"#;
        match serde_json::from_str::<ServerMessage>(json).unwrap() {
            ServerMessage::Joined {
                room,
                peer_count,
                measurements,
            } => {
                assert_eq!(room, "test");
                assert_eq!(peer_count, 2);
                assert!(measurements.is_empty());
            }
            other => panic!("Wrong message type: {other:?}"),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_log_preview_cuts_on_char_boundary() {
        let room = "é".repeat(120);
        let json = serde_json::to_string(&ClientMessage::Join { room }).unwrap();
        let preview = log_preview(&json, 100);
        assert_eq!(preview.chars().count(), 100);
        assert!(json.starts_with(preview));
        assert_eq!(log_preview("short", 100), "short");
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_native_rejects_bad_urls() {
        let mut ws = NativeWebSocket::new();
        assert!(matches!(ws.connect("not a url"), Err(SyncError::InvalidUrl(_))));
        assert!(matches!(ws.connect("http://localhost:3030"), Err(SyncError::InvalidUrl(_))));
        assert!(matches!(ws.send("{}"), Err(SyncError::NotConnected)));
        assert_eq!(ws.state(), ConnectionState::Disconnected);
    }
}
