use std::time::Duration;

use chrono::Local;
use livefeed_models::{decode_batch, EnvelopeError, MatchRecord};
use thiserror::Error;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::fanout::{Delivery, Fanout};

#[derive(Error, Debug)]
pub enum PollError {
    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Upstream responded with HTTP {0}")]
    Status(u16),

    #[error("Upstream envelope rejected: {0}")]
    Envelope(#[from] EnvelopeError),
}

/// What one poll cycle did.
#[derive(Debug)]
pub enum CycleOutcome {
    Broadcast { records: usize, delivery: Delivery },
    Abstained(PollError),
}

/// Fetches the upstream snapshot and turns it into a batch.
#[derive(Debug, Clone)]
pub struct FeedPoller {
    client: reqwest::Client,
    url: String,
    source: String,
}

impl FeedPoller {
    /// Builds a poller whose requests give up after `request_timeout`.
    pub fn new(url: impl Into<String>, source: impl Into<String>, request_timeout: Duration) -> Result<Self, PollError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self::with_client(client, url, source))
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            source: source.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One GET + decode. Any failure means this cycle has nothing to emit.
    pub async fn fetch(&self) -> Result<Vec<MatchRecord>, PollError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let batch = decode_batch(&body, &self.source, Local::now().naive_local())?;

        for record in &batch {
            tracing::debug!("✅ Accepted match: {} [{}]", record.name, record.id);
        }

        Ok(batch)
    }

    /// Polls once and broadcasts the batch, or abstains.
    pub async fn cycle(&self, fanout: &Fanout) -> CycleOutcome {
        match self.fetch().await {
            Ok(batch) => {
                fanout.metrics().record_poll_success();
                let delivery = fanout.broadcast(&batch).await;
                CycleOutcome::Broadcast {
                    records: batch.len(),
                    delivery,
                }
            }
            Err(e) => {
                fanout.metrics().record_poll_failure();
                tracing::warn!(url = %self.url, "⚠️ Poll cycle abstained: {}", e);
                CycleOutcome::Abstained(e)
            }
        }
    }

    /// Polls on a fixed interval until `shutdown` fires.
    ///
    /// One request is in flight at a time; a slow response pushes the next
    /// tick back instead of overlapping it.
    pub async fn run(self, fanout: Fanout, every: Duration, shutdown: CancellationToken) {
        tracing::info!("🎯 Starting feed poller");
        tracing::info!("⚙️  Upstream: {}", self.url);
        tracing::info!("⚙️  Poll interval: {:?}", every);

        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = self.cycle(&fanout) => {}
            }
        }

        tracing::info!("🛑 Feed poller stopped");
    }
}
