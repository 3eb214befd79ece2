use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One encoded outbound frame, shared by every subscriber of a fanout.
pub type OutboundFrame = Arc<str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("subscriber channel is closed")]
    Closed,

    #[error("subscriber did not accept the frame within {0:?}")]
    Timeout(Duration),
}

/// Hub-side handle of one push channel.
///
/// The handle is cheap to clone; all clones share the same close signal, so
/// once any holder calls [`Subscriber::close`] every further write fails.
#[derive(Debug, Clone)]
pub struct Subscriber {
    id: SubscriberId,
    remote: Option<SocketAddr>,
    sender: mpsc::Sender<OutboundFrame>,
    closed: CancellationToken,
}

impl Subscriber {
    pub fn new(remote: Option<SocketAddr>, sender: mpsc::Sender<OutboundFrame>) -> Self {
        Self {
            id: SubscriberId::new(),
            remote,
            sender,
            closed: CancellationToken::new(),
        }
    }

    /// Creates a subscriber together with the receiving end of its channel.
    pub fn channel(remote: Option<SocketAddr>, buffer: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self::new(remote, sender), receiver)
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn remote(&self) -> Option<SocketAddr> {
        self.remote
    }

    /// Resolves once the subscriber has been closed by the hub.
    pub fn closed_signal(&self) -> CancellationToken {
        self.closed.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.sender.is_closed()
    }

    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Queues one frame, waiting at most `timeout` for buffer space.
    pub async fn write(&self, frame: OutboundFrame, timeout: Duration) -> Result<(), DeliveryError> {
        if self.closed.is_cancelled() {
            return Err(DeliveryError::Closed);
        }

        match self.sender.send_timeout(frame, timeout).await {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendTimeoutError::Closed(_)) => Err(DeliveryError::Closed),
            Err(mpsc::error::SendTimeoutError::Timeout(_)) => Err(DeliveryError::Timeout(timeout)),
        }
    }
}
