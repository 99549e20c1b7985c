//! Room state shared by all connections.

use aoemark_core::{
    MeasureConfig, MeasurementId, MeasurementStore, ServerMessage, SharedMeasurement, UpsertOutcome,
};
use dashmap::DashMap;
use std::collections::HashSet;
use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 256;

/// Messages fanned out to a room, tagged with the sending peer.
pub type RoomMessage = (String, ServerMessage);

/// Room state
struct Room {
    /// Broadcast channel for this room
    tx: broadcast::Sender<RoomMessage>,
    /// Connected peer IDs
    peers: HashSet<String>,
    /// Latest record per id, handed to late joiners
    measurements: MeasurementStore,
}

impl Room {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            peers: HashSet::new(),
            measurements: MeasurementStore::new(),
        }
    }
}

/// What a peer receives on joining.
pub struct Joined {
    pub rx: broadcast::Receiver<RoomMessage>,
    pub peer_count: usize,
    pub measurements: Vec<SharedMeasurement>,
}

/// Shared application state
pub struct AppState {
    rooms: DashMap<String, Room>,
    config: MeasureConfig,
}

impl AppState {
    pub fn new(config: MeasureConfig) -> Self {
        Self {
            rooms: DashMap::new(),
            config,
        }
    }

    /// Add peer to room, returning the room's live records.
    pub fn join_room(&self, room_id: &str, peer_id: &str, now: u64) -> Joined {
        let mut room = self.rooms.entry(room_id.to_string()).or_insert_with(Room::new);
        room.peers.insert(peer_id.to_string());
        room.measurements.prune(now, &self.config);
        Joined {
            rx: room.tx.subscribe(),
            peer_count: room.peers.len(),
            measurements: room.measurements.iter().cloned().collect(),
        }
    }

    /// Peer count and live records of a room, for a peer already in it.
    pub fn snapshot(&self, room_id: &str, now: u64) -> Option<(usize, Vec<SharedMeasurement>)> {
        let mut room = self.rooms.get_mut(room_id)?;
        room.measurements.prune(now, &self.config);
        Some((room.peers.len(), room.measurements.iter().cloned().collect()))
    }

    /// Remove peer from room. A room without peers is dropped once it holds
    /// no live records; permanent records keep it open.
    pub fn leave_room(&self, room_id: &str, peer_id: &str, now: u64) {
        let Some(mut room) = self.rooms.get_mut(room_id) else {
            return;
        };
        room.peers.remove(peer_id);
        if !room.peers.is_empty() {
            return;
        }
        room.measurements.prune(now, &self.config);
        let kept = room.measurements.len();
        drop(room);
        if self
            .rooms
            .remove_if(room_id, |_, room| room.peers.is_empty() && room.measurements.is_empty())
            .is_some()
        {
            debug!("Room {} closed", room_id);
        } else if kept > 0 {
            debug!("Room {} idle, keeping {} measurement(s)", room_id, kept);
        }
    }

    /// Store a record and fan it out. Rejects records that change an id's kind.
    pub fn publish(
        &self,
        room_id: &str,
        peer_id: &str,
        measurement: SharedMeasurement,
        now: u64,
    ) -> Result<(), String> {
        let Some(mut room) = self.rooms.get_mut(room_id) else {
            return Err(format!("Not in room {room_id}"));
        };
        room.measurements.prune(now, &self.config);
        if measurement.is_expired(now, self.config.ttl_ms) {
            debug!("Dropping already expired measurement {}", measurement.id());
            return Ok(());
        }
        let id = measurement.id();
        if room.measurements.upsert(measurement.clone()) == UpsertOutcome::KindMismatch {
            return Err(format!("Measurement {id} cannot change its type"));
        }
        let _ = room.tx.send((
            peer_id.to_string(),
            ServerMessage::Published {
                from: peer_id.to_string(),
                measurement,
            },
        ));
        Ok(())
    }

    /// Withdraw a record and fan out the removal.
    pub fn remove(&self, room_id: &str, peer_id: &str, id: MeasurementId) {
        if let Some(mut room) = self.rooms.get_mut(room_id) {
            room.measurements.remove(id);
            let _ = room.tx.send((
                peer_id.to_string(),
                ServerMessage::Removed {
                    from: peer_id.to_string(),
                    id,
                },
            ));
        }
    }

    /// Broadcast message to room
    pub fn broadcast(&self, room_id: &str, from: &str, msg: ServerMessage) {
        if let Some(room) = self.rooms.get(room_id) {
            let _ = room.tx.send((from.to_string(), msg));
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn measurement_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, |room| room.measurements.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aoemark_core::ShapeKind;
    use kurbo::Point;

    fn circle(timestamp: u64) -> SharedMeasurement {
        SharedMeasurement::new(ShapeKind::Circle, Point::ZERO, Point::new(20.0, 0.0), "a").with_timestamp(timestamp)
    }

    #[test]
    fn test_late_joiner_gets_snapshot() {
        let state = AppState::new(MeasureConfig::default());
        let _a = state.join_room("r", "a", 1_000);
        let m = circle(1_000);
        state.publish("r", "a", m.clone(), 1_000).unwrap();
        let mut replaced = m.clone();
        replaced.end = Point::new(40.0, 0.0);
        state.publish("r", "a", replaced.clone(), 1_500).unwrap();

        let joined = state.join_room("r", "b", 2_000);
        assert_eq!(joined.peer_count, 2);
        assert_eq!(joined.measurements, vec![replaced]);
    }

    #[test]
    fn test_expired_records_pruned_on_join() {
        let state = AppState::new(MeasureConfig::default());
        let _a = state.join_room("r", "a", 0);
        state.publish("r", "a", circle(0), 0).unwrap();
        state.publish("r", "a", circle(0).with_permanent(true), 0).unwrap();

        let joined = state.join_room("r", "b", 10_000);
        assert_eq!(joined.measurements.len(), 1);
        assert!(joined.measurements[0].permanent);
    }

    #[test]
    fn test_publish_fans_out() {
        let state = AppState::new(MeasureConfig::default());
        let mut a = state.join_room("r", "a", 0);
        let m = circle(0);
        state.publish("r", "b", m.clone(), 0).unwrap();
        let (from, msg) = a.rx.try_recv().unwrap();
        assert_eq!(from, "b");
        assert_eq!(
            msg,
            ServerMessage::Published {
                from: "b".into(),
                measurement: m
            }
        );
    }

    #[test]
    fn test_kind_change_rejected() {
        let state = AppState::new(MeasureConfig::default());
        let _a = state.join_room("r", "a", 0);
        let m = circle(0);
        state.publish("r", "a", m.clone(), 0).unwrap();
        let json = serde_json::to_string(&m).unwrap().replace("\"circle\"", "\"cube\"");
        let cube: SharedMeasurement = serde_json::from_str(&json).unwrap();
        assert!(state.publish("r", "a", cube, 0).is_err());
        assert!(state.publish("elsewhere", "a", circle(0), 0).is_err());
    }

    #[test]
    fn test_remove_and_room_cleanup() {
        let state = AppState::new(MeasureConfig::default());
        let _a = state.join_room("r", "a", 0);
        let m = circle(0);
        state.publish("r", "a", m.clone(), 0).unwrap();
        assert_eq!(state.measurement_count("r"), 1);
        state.remove("r", "a", m.id());
        assert_eq!(state.measurement_count("r"), 0);

        state.leave_room("r", "a", 0);
        assert_eq!(state.room_count(), 0);
    }

    #[test]
    fn test_permanent_records_outlive_empty_room() {
        let state = AppState::new(MeasureConfig::default());
        let _a = state.join_room("r", "a", 0);
        state.publish("r", "a", circle(0), 0).unwrap();
        let pinned = circle(0).with_permanent(true);
        state.publish("r", "a", pinned.clone(), 0).unwrap();

        state.leave_room("r", "a", 1_000);
        assert_eq!(state.room_count(), 1);

        let joined = state.join_room("r", "b", 60_000);
        assert_eq!(joined.peer_count, 1);
        assert_eq!(joined.measurements, vec![pinned]);
    }

    #[test]
    fn test_idle_room_closed_once_records_expire() {
        let state = AppState::new(MeasureConfig::default());
        let _a = state.join_room("r", "a", 0);
        state.publish("r", "a", circle(0), 0).unwrap();

        state.leave_room("r", "a", 1_000);
        assert_eq!(state.measurement_count("r"), 1);
        let _b = state.join_room("r", "b", 2_000);
        state.leave_room("r", "b", 60_000);
        assert_eq!(state.room_count(), 0);
    }

    #[test]
    fn test_snapshot_of_current_room() {
        let state = AppState::new(MeasureConfig::default());
        let _a = state.join_room("r", "a", 0);
        let m = circle(0).with_permanent(true);
        state.publish("r", "a", m.clone(), 0).unwrap();

        let (peer_count, measurements) = state.snapshot("r", 1_000).unwrap();
        assert_eq!(peer_count, 1);
        assert_eq!(measurements, vec![m]);
        assert_eq!(state.measurement_count("r"), 1);
        assert!(state.snapshot("elsewhere", 1_000).is_none());
    }
}
