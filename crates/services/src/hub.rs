use std::sync::Arc;
use std::time::Duration;

use livefeed_models::DEFAULT_SOURCE;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::fanout::Fanout;
use crate::keepalive::run_keepalive;
use crate::metrics::HubMetrics;
use crate::poller::{FeedPoller, PollError};
use crate::registry::SubscriberRegistry;

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub upstream_url: String,
    pub source: String,
    pub poll_interval: Duration,
    pub ping_interval: Duration,
    /// Upper bound on one upstream request; keep it below `poll_interval`.
    pub request_timeout: Duration,
    /// Upper bound on queueing one frame to one subscriber.
    pub write_timeout: Duration,
    pub subscriber_buffer: usize,
}

impl HubConfig {
    pub fn new(upstream_url: impl Into<String>) -> Self {
        Self {
            upstream_url: upstream_url.into(),
            source: DEFAULT_SOURCE.to_string(),
            poll_interval: Duration::from_secs(5),
            ping_interval: Duration::from_secs(15),
            request_timeout: Duration::from_secs(4),
            write_timeout: Duration::from_secs(1),
            subscriber_buffer: 32,
        }
    }
}

/// Owns the registry and both periodic loops.
pub struct LiveFeedHub {
    config: HubConfig,
    fanout: Fanout,
    poller: FeedPoller,
}

impl LiveFeedHub {
    pub fn new(config: HubConfig) -> Result<Self, PollError> {
        let poller = FeedPoller::new(&config.upstream_url, &config.source, config.request_timeout)?;
        Ok(Self::with_poller(config, poller))
    }

    /// Uses a caller-built HTTP client; `request_timeout` is then the client's concern.
    pub fn with_client(config: HubConfig, client: reqwest::Client) -> Self {
        let poller = FeedPoller::with_client(client, &config.upstream_url, &config.source);
        Self::with_poller(config, poller)
    }

    fn with_poller(config: HubConfig, poller: FeedPoller) -> Self {
        let fanout = Fanout::new(
            Arc::new(SubscriberRegistry::new()),
            Arc::new(HubMetrics::new()),
            config.write_timeout,
        );

        Self { config, fanout, poller }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn fanout(&self) -> &Fanout {
        &self.fanout
    }

    /// Starts the poll loop and the ping loop.
    pub fn spawn(&self) -> HubHandle {
        let shutdown = CancellationToken::new();

        let poll = tokio::spawn(self.poller.clone().run(
            self.fanout.clone(),
            self.config.poll_interval,
            shutdown.clone(),
        ));
        let ping = tokio::spawn(run_keepalive(
            self.fanout.clone(),
            self.config.ping_interval,
            shutdown.clone(),
        ));

        HubHandle {
            shutdown,
            poll,
            ping,
            fanout: self.fanout.clone(),
        }
    }
}

pub struct HubHandle {
    shutdown: CancellationToken,
    poll: JoinHandle<()>,
    ping: JoinHandle<()>,
    fanout: Fanout,
}

impl HubHandle {
    /// Token cancelled when the hub starts shutting down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Halts both loops, then closes every subscriber channel.
    ///
    /// Returns the number of subscribers that were still connected.
    pub async fn shutdown(self) -> usize {
        self.shutdown.cancel();

        for (name, task) in [("poller", self.poll), ("keepalive", self.ping)] {
            if let Err(e) = task.await {
                tracing::error!("❌ {} task ended abnormally: {}", name, e);
            }
        }

        let closed = self.fanout.registry().close_all();
        tracing::info!(closed, "👋 Hub stopped");
        closed
    }
}
