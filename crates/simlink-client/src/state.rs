//! Latest-snapshot cache
//!
//! The single source of truth consumers read from. Each accepted frame
//! replaces the cached snapshot with a single assignment; consumers receive
//! shared immutable values, so a reference held across turns of the event
//! loop can never observe a torn or mutated snapshot.

use crate::lock;
use simlink_protocol::{SimulationSnapshot, UpstreamError};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub(crate) struct StateCache {
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    snapshot: Option<Arc<SimulationSnapshot>>,
    last_error: Option<UpstreamError>,
}

impl StateCache {
    /// Replace the cached snapshot, returning the shared value for fan-out.
    pub fn apply_snapshot(&self, snapshot: SimulationSnapshot) -> Arc<SimulationSnapshot> {
        let shared = Arc::new(snapshot);
        lock(&self.inner).snapshot = Some(Arc::clone(&shared));
        shared
    }

    /// Record a backend error without clearing the last good snapshot.
    pub fn record_error(&self, error: UpstreamError) {
        lock(&self.inner).last_error = Some(error);
    }

    /// The latest snapshot, or `None` if no frame has arrived yet.
    pub fn current(&self) -> Option<Arc<SimulationSnapshot>> {
        lock(&self.inner).snapshot.clone()
    }

    /// The most recent backend-reported error, if any.
    pub fn last_error(&self) -> Option<UpstreamError> {
        lock(&self.inner).last_error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simlink_protocol::{AirQuality, TrafficFlow};

    fn snapshot(queue: u32) -> SimulationSnapshot {
        SimulationSnapshot {
            vehicles: vec![],
            traffic_lights: vec![],
            traffic_flow: TrafficFlow {
                queues: vec![queue],
                phase: 0,
                timestamp: 1.0,
            },
            air_quality: AirQuality {
                pm25: 10.0,
                timestamp: 1.0,
            },
            reward: None,
        }
    }

    #[test]
    fn last_write_wins() {
        let cache = StateCache::default();
        assert!(cache.current().is_none());

        cache.apply_snapshot(snapshot(3));
        cache.apply_snapshot(snapshot(7));

        let current = cache.current().unwrap();
        assert_eq!(current.traffic_flow.queues, vec![7]);
    }

    #[test]
    fn error_does_not_clear_snapshot() {
        let cache = StateCache::default();
        cache.apply_snapshot(snapshot(3));
        cache.record_error(UpstreamError {
            message: "sim stalled".to_string(),
            code: None,
        });

        assert!(cache.current().is_some());
        assert_eq!(cache.last_error().unwrap().message, "sim stalled");
    }

    #[test]
    fn apply_returns_the_cached_value() {
        let cache = StateCache::default();
        let shared = cache.apply_snapshot(snapshot(1));
        assert!(Arc::ptr_eq(&shared, &cache.current().unwrap()));
    }
}
