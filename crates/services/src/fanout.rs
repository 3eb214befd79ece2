use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use livefeed_models::{MatchRecord, PingMessage};
use serde::Serialize;

use crate::metrics::HubMetrics;
use crate::registry::SubscriberRegistry;
use crate::subscriber::{OutboundFrame, Subscriber, SubscriberId};

/// Result of one fanout pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub pruned: usize,
}

/// Write-or-prune delivery to every registered subscriber.
///
/// Batches and pings go through the same primitive: encode once, write to
/// each member of a registry snapshot with a bounded timeout, then remove
/// whoever failed. A failing subscriber never stops delivery to the others.
#[derive(Debug, Clone)]
pub struct Fanout {
    registry: Arc<SubscriberRegistry>,
    metrics: Arc<HubMetrics>,
    write_timeout: Duration,
}

impl Fanout {
    pub fn new(registry: Arc<SubscriberRegistry>, metrics: Arc<HubMetrics>, write_timeout: Duration) -> Self {
        Self {
            registry,
            metrics,
            write_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<HubMetrics> {
        &self.metrics
    }

    pub fn register(&self, subscriber: Subscriber) {
        self.registry.add(subscriber);
        self.metrics.record_registration();
    }

    pub fn unregister(&self, id: SubscriberId) -> bool {
        self.registry.remove(id)
    }

    /// Sends one batch as a single JSON array message.
    pub async fn broadcast(&self, batch: &[MatchRecord]) -> Delivery {
        let delivery = self.deliver(batch).await;
        self.metrics.record_batch(batch.len());
        tracing::info!(
            records = batch.len(),
            delivered = delivery.delivered,
            pruned = delivery.pruned,
            "📡 Broadcast {} matches",
            batch.len()
        );
        delivery
    }

    /// Sends a liveness ping stamped with the current local time.
    pub async fn ping(&self) -> Delivery {
        self.ping_with(&PingMessage::now()).await
    }

    pub async fn ping_with(&self, ping: &PingMessage) -> Delivery {
        let delivery = self.deliver(ping).await;
        self.metrics.record_ping();
        tracing::debug!(
            ts = %ping.ts,
            delivered = delivery.delivered,
            pruned = delivery.pruned,
            "💓 Ping sent"
        );
        delivery
    }

    /// Encodes `message` once and fans the frame out.
    pub async fn deliver<T: Serialize + ?Sized>(&self, message: &T) -> Delivery {
        match serde_json::to_string(message) {
            Ok(text) => self.deliver_frame(OutboundFrame::from(text)).await,
            Err(e) => {
                tracing::error!("❌ Failed to encode outbound message: {}", e);
                Delivery::default()
            }
        }
    }

    /// Writes to every member concurrently, so stalled subscribers cost one
    /// `write_timeout` in total rather than one each.
    pub async fn deliver_frame(&self, frame: OutboundFrame) -> Delivery {
        let snapshot = self.registry.snapshot();
        let writes = snapshot
            .iter()
            .map(|subscriber| subscriber.write(frame.clone(), self.write_timeout));
        let results = join_all(writes).await;

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (subscriber, result) in snapshot.iter().zip(results) {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        id = %subscriber.id(),
                        remote = ?subscriber.remote(),
                        "❌ Failed to deliver to subscriber: {}",
                        e
                    );
                    failed.push(subscriber.id());
                }
            }
        }

        let pruned = self.registry.remove_all(&failed);
        self.metrics.record_delivery(delivered, pruned);

        Delivery { delivered, pruned }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn fanout() -> Fanout {
        Fanout::new(
            Arc::new(SubscriberRegistry::new()),
            Arc::new(HubMetrics::new()),
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn test_dead_subscriber_is_pruned_and_live_one_still_served() {
        let fanout = fanout();
        let (alive, mut alive_rx) = Subscriber::channel(None, 4);
        let (dead, dead_rx) = Subscriber::channel(None, 4);
        drop(dead_rx);
        fanout.register(alive.clone());
        fanout.register(dead.clone());
        assert_eq!(fanout.registry().len(), 2);

        let delivery = fanout.broadcast(&[]).await;

        assert_eq!(delivery, Delivery { delivered: 1, pruned: 1 });
        assert_eq!(fanout.registry().len(), 1);
        assert!(fanout.registry().contains(alive.id()));
        assert_eq!(alive_rx.recv().await.as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_ping_uses_same_pruning() {
        let fanout = fanout();
        let (alive, mut alive_rx) = Subscriber::channel(None, 4);
        let (closed, _closed_rx) = Subscriber::channel(None, 4);
        fanout.register(alive);
        fanout.register(closed.clone());
        closed.close();

        let ping = PingMessage::at(NaiveTime::from_hms_opt(12, 0, 1).unwrap());
        let delivery = fanout.ping_with(&ping).await;

        assert_eq!(delivery, Delivery { delivered: 1, pruned: 1 });
        assert_eq!(alive_rx.recv().await.as_deref(), Some(r#"{"type":"ping","ts":"12:00:01"}"#));

        let snapshot = fanout.metrics().snapshot();
        assert_eq!(snapshot.pings_sent, 1);
        assert_eq!(snapshot.subscribers_pruned, 1);
    }

    #[tokio::test]
    async fn test_slow_subscriber_is_bounded_and_pruned() {
        let fanout = fanout();
        let (slow, _slow_rx) = Subscriber::channel(None, 1);
        let (fast, mut fast_rx) = Subscriber::channel(None, 4);
        fanout.register(slow.clone());
        fanout.register(fast);

        fanout.deliver_frame(OutboundFrame::from("one")).await;
        let delivery = fanout.deliver_frame(OutboundFrame::from("two")).await;

        assert_eq!(delivery, Delivery { delivered: 1, pruned: 1 });
        assert!(slow.is_closed());
        assert_eq!(fast_rx.recv().await.as_deref(), Some("one"));
        assert_eq!(fast_rx.recv().await.as_deref(), Some("two"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_subscribers_cost_one_timeout_in_total() {
        let timeout = Duration::from_millis(200);
        let fanout = Fanout::new(
            Arc::new(SubscriberRegistry::new()),
            Arc::new(HubMetrics::new()),
            timeout,
        );
        let mut stalled = Vec::new();
        for _ in 0..3 {
            let (subscriber, rx) = Subscriber::channel(None, 1);
            subscriber.write(OutboundFrame::from("filler"), timeout).await.unwrap();
            fanout.register(subscriber);
            stalled.push(rx);
        }
        let (fast, mut fast_rx) = Subscriber::channel(None, 4);
        fanout.register(fast);

        let started = tokio::time::Instant::now();
        let delivery = fanout.deliver_frame(OutboundFrame::from("batch")).await;
        let elapsed = started.elapsed();

        assert_eq!(delivery, Delivery { delivered: 1, pruned: 3 });
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout * 2, "took {elapsed:?}");
        assert_eq!(fast_rx.recv().await.as_deref(), Some("batch"));
        assert_eq!(fanout.registry().len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers() {
        let fanout = fanout();
        assert_eq!(fanout.broadcast(&[]).await, Delivery::default());
        assert_eq!(fanout.metrics().snapshot().batches_broadcast, 1);
    }
}
