use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

pub const PING_TYPE: &str = "ping";

/// Liveness message pushed to every subscriber on the keepalive interval.
///
/// Wire form: `{"type":"ping","ts":"HH:MM:SS"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PingMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub ts: String,
}

impl PingMessage {
    pub fn at(time: NaiveTime) -> Self {
        Self {
            kind: PING_TYPE.to_string(),
            ts: time.format("%H:%M:%S").to_string(),
        }
    }

    pub fn now() -> Self {
        Self::at(chrono::Local::now().time())
    }
}
