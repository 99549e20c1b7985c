//! Client side of a shared measurement room.
//!
//! Bridges local gestures and the relay: outgoing messages are queued as JSON
//! for whatever transport the host drives, and incoming messages are applied
//! to a [`MeasurementStore`].

use crate::measurement::{MeasurementId, SharedMeasurement};
use crate::store::{MeasurementStore, UpsertOutcome};
use crate::sync::{ClientMessage, ServerMessage, SyncEvent};

/// Room membership plus the outgoing message queue.
#[derive(Debug, Default)]
pub struct MeasurementSync {
    /// Room confirmed by the server.
    current_room: Option<String>,
    /// Pending outgoing messages (JSON strings).
    outgoing: Vec<String>,
}

impl MeasurementSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_room(&self) -> Option<&str> {
        self.current_room.as_deref()
    }

    pub fn is_in_room(&self) -> bool {
        self.current_room.is_some()
    }

    /// Request to join a room. The room becomes current once the server confirms.
    pub fn join_room(&mut self, room: &str) {
        self.queue(&ClientMessage::Join {
            room: room.to_string(),
        });
    }

    /// Leave the current room, if any.
    pub fn leave_room(&mut self) {
        if self.current_room.take().is_some() {
            self.queue(&ClientMessage::Leave);
        }
    }

    /// Share a new or replacement record. Degenerate records are not sent.
    pub fn publish(&mut self, measurement: &SharedMeasurement) -> bool {
        if measurement.is_degenerate() {
            log::debug!("Not publishing zero-length measurement {}", measurement.id());
            return false;
        }
        self.queue(&ClientMessage::Publish {
            measurement: measurement.clone(),
        });
        true
    }

    pub fn remove(&mut self, id: MeasurementId) {
        self.queue(&ClientMessage::Remove { id });
    }

    /// Take pending outgoing messages (drains the queue).
    pub fn take_outgoing(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    fn queue(&mut self, msg: &ClientMessage) {
        match serde_json::to_string(msg) {
            Ok(json) => self.outgoing.push(json),
            Err(e) => log::error!("Failed to encode client message: {}", e),
        }
    }

    /// Handle a raw incoming server message.
    pub fn handle_message(&mut self, json: &str, store: &mut MeasurementStore) -> Option<SyncEvent> {
        match serde_json::from_str::<ServerMessage>(json) {
            Ok(msg) => self.apply(msg, store),
            Err(e) => {
                log::warn!("Ignoring malformed server message: {}", e);
                None
            }
        }
    }

    /// Apply a decoded server message to the live set.
    pub fn apply(&mut self, msg: ServerMessage, store: &mut MeasurementStore) -> Option<SyncEvent> {
        match msg {
            ServerMessage::Joined {
                room,
                peer_count,
                measurements,
            } => {
                let received = measurements.len();
                for measurement in measurements {
                    store.upsert(measurement);
                }
                log::info!("Joined room {} with {} peer(s), {} measurement(s)", room, peer_count, received);
                self.current_room = Some(room.clone());
                Some(SyncEvent::JoinedRoom {
                    room,
                    peer_count,
                    received,
                })
            }
            ServerMessage::PeerJoined { peer_id } => Some(SyncEvent::PeerJoined { peer_id }),
            ServerMessage::PeerLeft { peer_id } => Some(SyncEvent::PeerLeft { peer_id }),
            ServerMessage::Published { from, measurement } => {
                let id = measurement.id();
                match store.upsert(measurement) {
                    UpsertOutcome::KindMismatch => None,
                    _ => Some(SyncEvent::MeasurementUpdated { from, id }),
                }
            }
            ServerMessage::Removed { from, id } => store
                .remove(id)
                .map(|_| SyncEvent::MeasurementRemoved { from, id }),
            ServerMessage::Error { message } => {
                log::warn!("Server error: {}", message);
                Some(SyncEvent::Error { message })
            }
        }
    }
}
