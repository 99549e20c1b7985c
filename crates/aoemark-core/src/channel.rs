//! Publish/subscribe seam for sharing measurements within a room.
//!
//! The engine only needs at-least-once delivery of the latest record per id.
//! [`LocalBroadcast`] is an in-process implementation used for same-process
//! observers and tests; the relay server provides the networked one.

use crate::measurement::{MeasurementId, SharedMeasurement};
use crate::store::MeasurementStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A change observed in a room.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomChange {
    Published(SharedMeasurement),
    Removed(MeasurementId),
}

impl RoomChange {
    /// Apply this change to an observer's live set.
    pub fn apply(&self, store: &mut MeasurementStore) {
        match self {
            RoomChange::Published(measurement) => {
                store.upsert(measurement.clone());
            }
            RoomChange::Removed(id) => {
                store.remove(*id);
            }
        }
    }
}

/// Callback invoked for every change in a subscribed room.
pub type ChangeCallback = Arc<dyn Fn(&RoomChange) + Send + Sync>;

/// Handle returned by [`BroadcastChannel::subscribe`].
///
/// Dropping it or calling [`Subscription::unsubscribe`] stops delivery.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Transport-agnostic broadcast of measurements, scoped by room.
pub trait BroadcastChannel {
    /// Share a new or replacement record with the room.
    fn publish(&self, room: &str, measurement: SharedMeasurement);

    /// Receive every later change in the room.
    fn subscribe(&self, room: &str, on_change: ChangeCallback) -> Subscription;

    /// Withdraw a record from the room.
    fn remove(&self, room: &str, id: MeasurementId);
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    rooms: HashMap<String, Vec<(u64, ChangeCallback)>>,
}

/// In-process broadcast channel.
#[derive(Clone, Default)]
pub struct LocalBroadcast {
    inner: Arc<Mutex<Subscribers>>,
}

impl LocalBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active subscriptions in a room.
    pub fn subscriber_count(&self, room: &str) -> usize {
        lock(&self.inner).rooms.get(room).map_or(0, Vec::len)
    }

    fn dispatch(&self, room: &str, change: RoomChange) {
        // Callbacks run outside the lock so they may publish in turn.
        let callbacks: Vec<ChangeCallback> = lock(&self.inner)
            .rooms
            .get(room)
            .map(|subs| subs.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();
        log::debug!("Dispatching {:?} to {} subscriber(s) in {room}", change_name(&change), callbacks.len());
        for callback in callbacks {
            callback(&change);
        }
    }
}

fn change_name(change: &RoomChange) -> &'static str {
    match change {
        RoomChange::Published(_) => "publish",
        RoomChange::Removed(_) => "remove",
    }
}

fn lock(inner: &Mutex<Subscribers>) -> MutexGuard<'_, Subscribers> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BroadcastChannel for LocalBroadcast {
    fn publish(&self, room: &str, measurement: SharedMeasurement) {
        self.dispatch(room, RoomChange::Published(measurement));
    }

    fn subscribe(&self, room: &str, on_change: ChangeCallback) -> Subscription {
        let id = {
            let mut subs = lock(&self.inner);
            let id = subs.next_id;
            subs.next_id += 1;
            subs.rooms.entry(room.to_string()).or_default().push((id, on_change));
            id
        };

        let inner = Arc::clone(&self.inner);
        let room = room.to_string();
        Subscription::new(move || {
            let mut subs = lock(&inner);
            if let Some(list) = subs.rooms.get_mut(&room) {
                list.retain(|(other, _)| *other != id);
                if list.is_empty() {
                    subs.rooms.remove(&room);
                }
            }
        })
    }

    fn remove(&self, room: &str, id: MeasurementId) {
        self.dispatch(room, RoomChange::Removed(id));
    }
}
