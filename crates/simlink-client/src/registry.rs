//! Subscriber registry
//!
//! Fan-out of accepted snapshots to UI consumers. Subscribers own no
//! transport resources; their lifetime is controlled by the caller through
//! an explicit, idempotent unregister capability.

use crate::lock;
use simlink_protocol::SimulationSnapshot;
use std::sync::{Arc, Mutex, Weak};

/// Callback invoked once per accepted snapshot.
pub type SnapshotCallback = dyn Fn(&Arc<SimulationSnapshot>) + Send + Sync;

#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    subscribers: Vec<(u64, Arc<SnapshotCallback>)>,
}

impl SubscriberRegistry {
    pub fn register(&self, callback: Arc<SnapshotCallback>) -> u64 {
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, callback));
        id
    }

    pub fn unregister(&self, id: u64) {
        lock(&self.inner)
            .subscribers
            .retain(|(existing, _)| *existing != id);
    }

    /// Deliver one snapshot to every registered subscriber, in registration
    /// order.
    pub fn notify(&self, snapshot: &Arc<SimulationSnapshot>) {
        // Copy the list before iterating: a callback may unregister itself or
        // register a new subscriber while the fan-out is in progress, and the
        // lock must not be held across user code.
        let current = lock(&self.inner).subscribers.clone();
        for (_, callback) in &current {
            callback(snapshot);
        }
    }

    pub fn clear(&self) {
        lock(&self.inner).subscribers.clear();
    }
}

/// Capability to remove a registered subscriber.
///
/// Unregistering is explicit and idempotent; dropping the handle leaves the
/// subscriber registered.
pub struct Subscription {
    id: u64,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    pub(crate) fn new(id: u64, registry: Weak<SubscriberRegistry>) -> Self {
        Self { id, registry }
    }

    /// Remove the subscriber from the fan-out set.
    ///
    /// Safe to call more than once, and safe to call from within the
    /// subscriber's own callback invocation.
    pub fn unregister(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simlink_protocol::{AirQuality, TrafficFlow};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot() -> Arc<SimulationSnapshot> {
        Arc::new(SimulationSnapshot {
            vehicles: vec![],
            traffic_lights: vec![],
            traffic_flow: TrafficFlow {
                queues: vec![1, 2],
                phase: 0,
                timestamp: 0.0,
            },
            air_quality: AirQuality {
                pm25: 5.0,
                timestamp: 0.0,
            },
            reward: None,
        })
    }

    #[test]
    fn delivers_in_registration_order() {
        let registry = SubscriberRegistry::default();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["a", "b", "c"] {
            let order = Arc::clone(&order);
            registry.register(Arc::new(move |_| order.lock().unwrap().push(label)));
        }

        registry.notify(&snapshot());
        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = Arc::new(SubscriberRegistry::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let counted = Arc::clone(&calls);
        let id = registry.register(Arc::new(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
        }));
        let subscription = Subscription::new(id, Arc::downgrade(&registry));

        subscription.unregister();
        subscription.unregister();

        registry.notify(&snapshot());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn self_unregister_during_fanout_does_not_disrupt_iteration() {
        let registry = Arc::new(SubscriberRegistry::default());
        let first_calls = Arc::new(AtomicUsize::new(0));
        let second_calls = Arc::new(AtomicUsize::new(0));

        // First subscriber unregisters itself from inside its own callback.
        let own_id: Arc<Mutex<Option<u64>>> = Arc::new(Mutex::new(None));
        let id_cell = Arc::clone(&own_id);
        let registry_handle = Arc::clone(&registry);
        let counted = Arc::clone(&first_calls);
        let id = registry.register(Arc::new(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *id_cell.lock().unwrap() {
                registry_handle.unregister(id);
            }
        }));
        *own_id.lock().unwrap() = Some(id);

        let counted = Arc::clone(&second_calls);
        registry.register(Arc::new(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
        }));

        registry.notify(&snapshot());
        registry.notify(&snapshot());

        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn clear_removes_everyone() {
        let registry = SubscriberRegistry::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let counted = Arc::clone(&calls);
        registry.register(Arc::new(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
        }));

        registry.clear();
        registry.notify(&snapshot());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
