//! Subscriber registry with per-subscriber failure isolation.
//!
//! Each subscriber owns a bounded queue. Publishing serializes the envelope
//! once and offers the shared frame to every queue without blocking; a queue
//! that is closed or full gets its subscriber dropped, and nobody else
//! notices.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::envelope::BroadcastEnvelope;

/// Errors returned to the publisher.
///
/// Delivery failures to individual subscribers are never reported here.
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("Failed to serialize {kind} envelope: {source}")]
    Serialization {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Opaque subscriber identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscriber-{}", self.0)
    }
}

/// Receiving end handed to a new subscriber.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub frames: mpsc::Receiver<Arc<str>>,
}

/// Outcome of one publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Registry of open subscribers.
pub struct BroadcastHub {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<Arc<str>>>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastHub")
            .field("subscribers", &self.subscriber_count())
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}

impl BroadcastHub {
    /// Creates a hub whose subscribers may fall `queue_capacity` frames behind.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Registers a new subscriber.
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, frames) = mpsc::channel(self.queue_capacity);
        self.subscribers.lock().insert(id, sender);
        tracing::debug!(%id, "Subscriber registered");
        Subscription { id, frames }
    }

    /// Removes a subscriber. Unknown or already removed ids are ignored.
    pub fn unsubscribe(&self, id: SubscriberId) {
        if self.subscribers.lock().remove(&id).is_some() {
            tracing::debug!(%id, "Subscriber removed");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Drops every subscriber, ending their streams. Returns how many were open.
    pub fn close_all(&self) -> usize {
        let closed = self.subscribers.lock().drain().count();
        if closed > 0 {
            tracing::debug!(closed, "Closed all subscribers");
        }
        closed
    }

    /// Serializes `envelope` once and offers it to every subscriber.
    ///
    /// # Errors
    ///
    /// - `BroadcastError::Serialization` - Envelope could not be encoded
    pub fn publish(&self, envelope: &BroadcastEnvelope) -> Result<PublishReport, BroadcastError> {
        let frame: Arc<str> = envelope
            .to_json()
            .map_err(|source| BroadcastError::Serialization {
                kind: envelope.kind(),
                source,
            })?
            .into();

        Ok(self.publish_frame(frame))
    }

    /// Offers an already encoded frame to every subscriber.
    pub fn publish_frame(&self, frame: Arc<str>) -> PublishReport {
        let targets: Vec<(SubscriberId, mpsc::Sender<Arc<str>>)> = self
            .subscribers
            .lock()
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();

        let mut report = PublishReport::default();
        let mut failed = Vec::new();

        for (id, sender) in targets {
            match sender.try_send(Arc::clone(&frame)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(%id, "Subscriber closed, dropping");
                    failed.push(id);
                }
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        %id,
                        capacity = self.queue_capacity,
                        "Subscriber stalled, dropping"
                    );
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            let mut subscribers = self.subscribers.lock();
            for id in &failed {
                subscribers.remove(id);
            }
            report.dropped = failed.len();
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeSeriesPoint;

    fn point_envelope(ts: u64) -> BroadcastEnvelope {
        BroadcastEnvelope::TimeSeriesPoint(TimeSeriesPoint::new(ts, 42.0))
    }

    #[tokio::test]
    async fn test_fan_out_reaches_every_subscriber() {
        let hub = BroadcastHub::new(8);
        let mut subscriptions: Vec<Subscription> = (0..3).map(|_| hub.subscribe()).collect();

        let report = hub.publish(&point_envelope(1)).unwrap();
        assert_eq!(report, PublishReport { delivered: 3, dropped: 0 });

        for subscription in &mut subscriptions {
            let frame = subscription.frames.recv().await.unwrap();
            assert_eq!(BroadcastEnvelope::from_json(&frame).unwrap(), point_envelope(1));
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent_and_stops_delivery() {
        let hub = BroadcastHub::new(8);
        let first = hub.subscribe();
        let mut second = hub.subscribe();

        hub.unsubscribe(first.id);
        hub.unsubscribe(first.id);

        let report = hub.publish(&point_envelope(2)).unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(hub.subscriber_count(), 1);
        assert!(second.frames.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_closed_subscriber_is_dropped_without_affecting_others() {
        let hub = BroadcastHub::new(8);
        let gone = hub.subscribe();
        let mut alive = hub.subscribe();
        drop(gone);

        let report = hub.publish(&point_envelope(3)).unwrap();

        assert_eq!(report, PublishReport { delivered: 1, dropped: 1 });
        assert_eq!(hub.subscriber_count(), 1);
        assert!(alive.frames.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_stalled_subscriber_is_dropped() {
        let hub = BroadcastHub::new(2);
        let _stalled = hub.subscribe();
        let mut draining = hub.subscribe();

        for ts in 0..3 {
            hub.publish(&point_envelope(ts)).unwrap();
            draining.frames.recv().await.unwrap();
        }

        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_close_all_ends_streams() {
        let hub = BroadcastHub::new(4);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        assert_eq!(hub.close_all(), 2);

        assert!(first.frames.recv().await.is_none());
        assert!(second.frames.recv().await.is_none());
        assert_eq!(hub.publish(&point_envelope(9)).unwrap(), PublishReport::default());
    }

    #[test]
    fn test_subscriber_ids_are_unique() {
        let hub = BroadcastHub::new(1);
        let a = hub.subscribe();
        let b = hub.subscribe();
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.to_string(), "subscriber-1");
    }
}
