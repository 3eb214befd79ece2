use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::fanout::Fanout;

/// Pings every subscriber on a fixed interval until `shutdown` fires.
///
/// The first ping goes out one full interval after start.
pub async fn run_keepalive(fanout: Fanout, every: Duration, shutdown: CancellationToken) {
    tracing::info!("💓 Keepalive every {:?}", every);

    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                fanout.ping().await;
            }
        }
    }

    tracing::info!("🛑 Keepalive stopped");
}
