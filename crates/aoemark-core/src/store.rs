//! Per-observer live set of shared measurements.

use crate::config::MeasureConfig;
use crate::hit;
use crate::measurement::{MeasurementId, SharedMeasurement};
use crate::scale::ScaleContext;
use kurbo::Point;
use std::collections::HashMap;

/// Result of writing a record into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First record for this id.
    Inserted,
    /// An existing record with this id was replaced.
    Replaced,
    /// Rejected: a record with this id already has a different shape kind.
    KindMismatch,
}

/// The measurements one observer currently knows about.
///
/// Last write for an id wins. Records are kept in draw order, most recently
/// written on top.
#[derive(Debug, Clone, Default)]
pub struct MeasurementStore {
    records: HashMap<MeasurementId, SharedMeasurement>,
    /// Ids in draw order (last = topmost).
    z_order: Vec<MeasurementId>,
}

impl MeasurementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: MeasurementId) -> Option<&SharedMeasurement> {
        self.records.get(&id)
    }

    /// Every record in draw order, expired or not.
    pub fn iter(&self) -> impl Iterator<Item = &SharedMeasurement> {
        self.z_order.iter().filter_map(|id| self.records.get(id))
    }

    /// Insert or replace a record.
    pub fn upsert(&mut self, measurement: SharedMeasurement) -> UpsertOutcome {
        let id = measurement.id();
        let outcome = match self.records.get(&id) {
            Some(existing) if existing.kind() != measurement.kind() => {
                log::warn!(
                    "Ignoring update for measurement {}: kind {} cannot become {}",
                    id,
                    existing.kind(),
                    measurement.kind()
                );
                return UpsertOutcome::KindMismatch;
            }
            Some(_) => {
                self.z_order.retain(|other| *other != id);
                UpsertOutcome::Replaced
            }
            None => UpsertOutcome::Inserted,
        };
        self.records.insert(id, measurement);
        self.z_order.push(id);
        outcome
    }

    pub fn remove(&mut self, id: MeasurementId) -> Option<SharedMeasurement> {
        let removed = self.records.remove(&id);
        if removed.is_some() {
            self.z_order.retain(|other| *other != id);
        }
        removed
    }

    /// Replace a record with a copy whose `permanent` flag is flipped.
    ///
    /// Returns the replacement so the caller can publish it.
    pub fn toggle_permanent(&mut self, id: MeasurementId, now: u64) -> Option<SharedMeasurement> {
        let next = self.records.get(&id)?.toggled_permanent(now);
        self.upsert(next.clone());
        Some(next)
    }

    /// Drop every expired record, returning their ids.
    pub fn prune(&mut self, now: u64, config: &MeasureConfig) -> Vec<MeasurementId> {
        let expired: Vec<MeasurementId> = self
            .z_order
            .iter()
            .filter(|id| {
                self.records
                    .get(*id)
                    .is_some_and(|m| m.is_expired(now, config.ttl_ms))
            })
            .copied()
            .collect();
        for id in &expired {
            self.remove(*id);
        }
        if !expired.is_empty() {
            log::debug!("Pruned {} expired measurement(s)", expired.len());
        }
        expired
    }

    /// Active records of a map scope in draw order.
    pub fn live<'a>(
        &'a self,
        now: u64,
        city_id: Option<&'a str>,
        config: &'a MeasureConfig,
    ) -> impl Iterator<Item = &'a SharedMeasurement> + 'a {
        self.z_order
            .iter()
            .filter_map(move |id| self.records.get(id))
            .filter(move |m| m.in_scope(city_id) && !m.is_expired(now, config.ttl_ms))
    }

    /// Topmost live record under `point` (map-local pixels).
    pub fn hit_test(
        &self,
        point: Point,
        scale: &ScaleContext,
        now: u64,
        city_id: Option<&str>,
        config: &MeasureConfig,
    ) -> Option<MeasurementId> {
        let live: Vec<&SharedMeasurement> = self.live(now, city_id, config).collect();
        live.into_iter()
            .rev()
            .find(|m| hit::contains(point, m, scale, config))
            .map(SharedMeasurement::id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::ShapeKind;

    fn config() -> MeasureConfig {
        MeasureConfig::default()
    }

    fn circle(radius: f64, timestamp: u64) -> SharedMeasurement {
        SharedMeasurement::new(ShapeKind::Circle, Point::ZERO, Point::new(radius, 0.0), "p")
            .with_timestamp(timestamp)
    }

    #[test]
    fn test_last_write_wins() {
        let mut store = MeasurementStore::new();
        let first = circle(10.0, 0);
        let id = first.id();
        assert_eq!(store.upsert(first.clone()), UpsertOutcome::Inserted);

        let mut second = first.clone();
        second.end = Point::new(20.0, 0.0);
        assert_eq!(store.upsert(second), UpsertOutcome::Replaced);
        assert_eq!(store.len(), 1);
        assert!((store.get(id).unwrap().end.x - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_kind_cannot_change() {
        let mut store = MeasurementStore::new();
        let original = circle(10.0, 0);
        store.upsert(original.clone());
        let mut other = original.clone();
        other.kind = ShapeKind::Cube;
        assert_eq!(store.upsert(other), UpsertOutcome::KindMismatch);
        assert_eq!(store.get(original.id()).unwrap().kind(), ShapeKind::Circle);
    }

    #[test]
    fn test_prune_removes_only_expired() {
        let cfg = config();
        let now = 100_000;
        let mut store = MeasurementStore::new();
        let stale = circle(10.0, now - 7_000);
        let fresh = circle(10.0, now - 1_000);
        let pinned = circle(10.0, now - 60_000).with_permanent(true);
        let stale_id = stale.id();
        store.upsert(stale);
        store.upsert(fresh);
        store.upsert(pinned);

        assert_eq!(store.live(now, None, &cfg).count(), 2);
        let pruned = store.prune(now, &cfg);
        assert_eq!(pruned, vec![stale_id]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_live_respects_scope() {
        let cfg = config();
        let mut store = MeasurementStore::new();
        store.upsert(circle(10.0, 1_000).with_city(Some("north".into())));
        store.upsert(circle(10.0, 1_000));
        assert_eq!(store.live(2_000, Some("north"), &cfg).count(), 1);
        assert_eq!(store.live(2_000, None, &cfg).count(), 1);
        assert_eq!(store.live(2_000, Some("south"), &cfg).count(), 0);
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let cfg = config();
        let scale = ScaleContext::local(50.0, &cfg);
        let mut store = MeasurementStore::new();
        let below = circle(30.0, 1_000);
        let above = circle(10.0, 1_000);
        let below_id = below.id();
        let above_id = above.id();
        store.upsert(below);
        store.upsert(above);

        assert_eq!(store.hit_test(Point::new(5.0, 0.0), &scale, 2_000, None, &cfg), Some(above_id));
        assert_eq!(store.hit_test(Point::new(20.0, 0.0), &scale, 2_000, None, &cfg), Some(below_id));
        assert_eq!(store.hit_test(Point::new(50.0, 0.0), &scale, 2_000, None, &cfg), None);
        // Expired records are not hit.
        assert_eq!(store.hit_test(Point::new(5.0, 0.0), &scale, 60_000, None, &cfg), None);
    }

    #[test]
    fn test_replace_moves_to_top() {
        let cfg = config();
        let scale = ScaleContext::local(50.0, &cfg);
        let mut store = MeasurementStore::new();
        let a = circle(10.0, 1_000);
        let b = circle(10.0, 1_000);
        let a_id = a.id();
        store.upsert(a.clone());
        store.upsert(b);
        store.upsert(a);
        assert_eq!(store.hit_test(Point::ZERO, &scale, 2_000, None, &cfg), Some(a_id));
    }

    #[test]
    fn test_toggle_permanent_resets_timestamp() {
        let cfg = config();
        let mut store = MeasurementStore::new();
        let m = circle(10.0, 0);
        let id = m.id();
        store.upsert(m);
        let toggled = store.toggle_permanent(id, 5_000).unwrap();
        assert!(toggled.permanent);
        assert!(store.prune(100_000, &cfg).is_empty());
        let back = store.toggle_permanent(id, 100_000).unwrap();
        assert!(!back.permanent);
        assert_eq!(store.live(101_000, None, &cfg).count(), 1);
        assert!(store.toggle_permanent(MeasurementId::nil(), 0).is_none());
    }
}
