//! Publish-subscribe fabric for push events.
//!
//! Each subscriber gets its own bounded sink. Publish never waits: a full
//! sink drops the event for that subscriber only and bumps its drop
//! counter, and a subscriber that stays full past the grace window is
//! disconnected. Events delivered to one subscriber arrive in publication
//! order; nothing is guaranteed across subscribers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::mpsc;

use skywatch_core::models::PushEvent;

pub struct EventBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    subscribers: DashMap<u64, Subscriber>,
    next_id: AtomicU64,
    capacity: usize,
    grace: Duration,
}

struct Subscriber {
    tx: mpsc::Sender<PushEvent>,
    dropped: AtomicU64,
    full_since: Mutex<Option<Instant>>,
}

/// A live subscription: the id is the cancellation handle, the receiver
/// is the delivery sink. Dropping it unsubscribes.
pub struct Subscription {
    pub id: u64,
    pub rx: mpsc::Receiver<PushEvent>,
    registry: Arc<BusInner>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.subscribers.remove(&self.id);
    }
}

impl EventBus {
    pub fn new(capacity: usize, grace: Duration) -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: DashMap::new(),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
                grace,
            }),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        self.inner.subscribers.insert(
            id,
            Subscriber {
                tx,
                dropped: AtomicU64::new(0),
                full_since: Mutex::new(None),
            },
        );
        Subscription {
            id,
            rx,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Explicit cancellation; dropping the `Subscription` does the same.
    pub fn unsubscribe(&self, id: u64) {
        self.inner.subscribers.remove(&id);
    }

    /// Fan an event out to every subscriber without blocking.
    pub fn publish(&self, event: &PushEvent) {
        let mut disconnect = Vec::new();

        for entry in self.inner.subscribers.iter() {
            match entry.value().tx.try_send(event.clone()) {
                Ok(()) => {
                    *entry.value().full_since.lock().expect("bus lock poisoned") = None;
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    let sub = entry.value();
                    sub.dropped.fetch_add(1, Ordering::Relaxed);
                    let mut full_since =
                        sub.full_since.lock().expect("bus lock poisoned");
                    match *full_since {
                        Some(since) if since.elapsed() > self.inner.grace => {
                            disconnect.push(*entry.key());
                        }
                        Some(_) => {}
                        None => *full_since = Some(Instant::now()),
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    disconnect.push(*entry.key());
                }
            }
        }

        for id in disconnect {
            if self.inner.subscribers.remove(&id).is_some() {
                tracing::warn!("Disconnected unresponsive subscriber {}", id);
            }
        }
    }

    /// Events dropped for a subscriber so far, or None if disconnected.
    pub fn dropped_count(&self, id: u64) -> Option<u64> {
        self.inner
            .subscribers
            .get(&id)
            .map(|s| s.dropped.load(Ordering::Relaxed))
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}
