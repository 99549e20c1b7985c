//! Expiry of shared measurements.
//!
//! Every observer evaluates expiry from the record's shared creation
//! timestamp, so clients that joined late or whose clocks drift still agree
//! on roughly the same removal moment. No timers are kept per shape.

use crate::measurement::SharedMeasurement;
use web_time::{SystemTime, UNIX_EPOCH};

/// Lifecycle state of a shared measurement at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationState {
    /// Still rendered and hit-testable.
    Active,
    /// Past its time-to-live; drop it from the live set.
    Expired,
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Milliseconds left before expiry, clamped at zero.
///
/// A timestamp ahead of `now` (clock skew) counts as no time elapsed.
pub fn remaining_life(now: u64, timestamp: u64, ttl_ms: u64) -> u64 {
    ttl_ms.saturating_sub(now.saturating_sub(timestamp))
}

/// Lifecycle state from `(now, timestamp, ttl, permanent)`.
pub fn annotation_state(now: u64, timestamp: u64, ttl_ms: u64, permanent: bool) -> AnnotationState {
    if permanent || remaining_life(now, timestamp, ttl_ms) > 0 {
        AnnotationState::Active
    } else {
        AnnotationState::Expired
    }
}

impl SharedMeasurement {
    /// Lifecycle state of this record at `now`.
    pub fn state(&self, now: u64, ttl_ms: u64) -> AnnotationState {
        annotation_state(now, self.timestamp, ttl_ms, self.permanent)
    }

    pub fn is_expired(&self, now: u64, ttl_ms: u64) -> bool {
        self.state(now, ttl_ms) == AnnotationState::Expired
    }

    /// Milliseconds before automatic removal; `None` for permanent records.
    pub fn remaining_life(&self, now: u64, ttl_ms: u64) -> Option<u64> {
        (!self.permanent).then(|| remaining_life(now, self.timestamp, ttl_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::ShapeKind;
    use kurbo::Point;

    const TTL: u64 = 6_000;

    fn record(timestamp: u64) -> SharedMeasurement {
        SharedMeasurement::new(ShapeKind::Circle, Point::ZERO, Point::new(10.0, 0.0), "p")
            .with_timestamp(timestamp)
    }

    #[test]
    fn test_expired_after_ttl() {
        let now = 100_000;
        let old = record(now - 7_000);
        assert_eq!(old.state(now, TTL), AnnotationState::Expired);
        assert!(old.is_expired(now, TTL));
    }

    #[test]
    fn test_permanent_never_expires() {
        let now = 100_000;
        let old = record(now - 7_000).with_permanent(true);
        assert_eq!(old.state(now, TTL), AnnotationState::Active);
        let ancient = record(0).with_permanent(true);
        assert_eq!(ancient.state(u64::MAX, TTL), AnnotationState::Active);
        assert_eq!(ancient.remaining_life(now, TTL), None);
    }

    #[test]
    fn test_remaining_life() {
        assert_eq!(remaining_life(10_000, 8_000, TTL), 4_000);
        assert_eq!(remaining_life(20_000, 8_000, TTL), 0);
        // Timestamp from a clock running ahead of ours.
        assert_eq!(remaining_life(10_000, 12_000, TTL), TTL);
    }

    #[test]
    fn test_boundary_is_expired() {
        assert_eq!(annotation_state(6_000, 0, TTL, false), AnnotationState::Expired);
        assert_eq!(annotation_state(5_999, 0, TTL, false), AnnotationState::Active);
    }

    #[test]
    fn test_now_is_recent() {
        // 2020-01-01 in milliseconds.
        assert!(now_ms() > 1_577_836_800_000);
    }
}
