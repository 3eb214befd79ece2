use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HubMetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub polls_succeeded: u64,
    pub polls_failed: u64,
    pub batches_broadcast: u64,
    pub last_batch_size: u64,
    pub pings_sent: u64,
    pub messages_delivered: u64,
    pub subscribers_registered: u64,
    pub subscribers_pruned: u64,
}

/// Lock-free counters shared by the poll loop, the ping loop and the
/// connection handlers.
#[derive(Debug)]
pub struct HubMetrics {
    start_time: Instant,
    polls_succeeded: AtomicU64,
    polls_failed: AtomicU64,
    batches_broadcast: AtomicU64,
    last_batch_size: AtomicU64,
    pings_sent: AtomicU64,
    messages_delivered: AtomicU64,
    subscribers_registered: AtomicU64,
    subscribers_pruned: AtomicU64,
}

impl HubMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            polls_succeeded: AtomicU64::new(0),
            polls_failed: AtomicU64::new(0),
            batches_broadcast: AtomicU64::new(0),
            last_batch_size: AtomicU64::new(0),
            pings_sent: AtomicU64::new(0),
            messages_delivered: AtomicU64::new(0),
            subscribers_registered: AtomicU64::new(0),
            subscribers_pruned: AtomicU64::new(0),
        }
    }

    pub fn record_poll_success(&self) {
        self.polls_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll_failure(&self) {
        self.polls_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch(&self, records: usize) {
        self.batches_broadcast.fetch_add(1, Ordering::Relaxed);
        self.last_batch_size.store(records as u64, Ordering::Relaxed);
    }

    pub fn record_ping(&self) {
        self.pings_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery(&self, delivered: usize, pruned: usize) {
        self.messages_delivered.fetch_add(delivered as u64, Ordering::Relaxed);
        self.subscribers_pruned.fetch_add(pruned as u64, Ordering::Relaxed);
    }

    pub fn record_registration(&self) {
        self.subscribers_registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            timestamp: Utc::now(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            polls_succeeded: self.polls_succeeded.load(Ordering::Relaxed),
            polls_failed: self.polls_failed.load(Ordering::Relaxed),
            batches_broadcast: self.batches_broadcast.load(Ordering::Relaxed),
            last_batch_size: self.last_batch_size.load(Ordering::Relaxed),
            pings_sent: self.pings_sent.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            subscribers_registered: self.subscribers_registered.load(Ordering::Relaxed),
            subscribers_pruned: self.subscribers_pruned.load(Ordering::Relaxed),
        }
    }

    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        info!("📈 Feed Summary:");
        info!("   Polls: {} ok, {} failed", snapshot.polls_succeeded, snapshot.polls_failed);
        info!("   Batches broadcast: {} (last: {} records)", snapshot.batches_broadcast, snapshot.last_batch_size);
        info!("   Pings sent: {}", snapshot.pings_sent);
        info!("   Messages delivered: {}", snapshot.messages_delivered);
        info!(
            "   Subscribers: {} registered, {} pruned",
            snapshot.subscribers_registered, snapshot.subscribers_pruned
        );
        info!("   Uptime: {} seconds", snapshot.uptime_seconds);
    }
}

impl Default for HubMetrics {
    fn default() -> Self {
        Self::new()
    }
}
