use config::{Config, ConfigError, Environment, File};
use livefeed_models::DEFAULT_SOURCE;
use livefeed_services::HubConfig;
use serde::{Deserialize, Deserializer, Serialize};
use std::env;
use std::fmt::Display;
use std::time::Duration;
use tracing::warn;

const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 4;
const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 5;
const DEFAULT_PING_INTERVAL_SECONDS: u64 = 15;
const DEFAULT_WRITE_TIMEOUT_MS: u64 = 1000;
const DEFAULT_SUBSCRIBER_BUFFER: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub upstream: UpstreamConfig,
    pub feed: FeedConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub url: String,
    #[serde(deserialize_with = "lenient_number")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(deserialize_with = "lenient_number")]
    pub poll_interval_seconds: u64,
    #[serde(deserialize_with = "lenient_number")]
    pub ping_interval_seconds: u64,
    pub source: String,
    #[serde(deserialize_with = "lenient_number")]
    pub write_timeout_ms: u64,
    #[serde(deserialize_with = "lenient_number")]
    pub subscriber_buffer: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Self::defaults()?
            // Add in settings from configuration file
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from environment variables
            .add_source(Environment::with_prefix("LIVEFEED").separator("__"))
            .set_override_option("upstream.url", env::var("BOOKIES_API_URL").ok())?
            .set_override_option(
                "feed.poll_interval_seconds",
                legacy_interval(env::var("POLL_INTERVAL_SECONDS").ok()),
            )?;

        Self::from_config(builder.build()?)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("upstream.request_timeout_seconds", DEFAULT_REQUEST_TIMEOUT_SECONDS)?
            .set_default("feed.poll_interval_seconds", DEFAULT_POLL_INTERVAL_SECONDS)?
            .set_default("feed.ping_interval_seconds", DEFAULT_PING_INTERVAL_SECONDS)?
            .set_default("feed.source", DEFAULT_SOURCE)?
            .set_default("feed.write_timeout_ms", DEFAULT_WRITE_TIMEOUT_MS)?
            .set_default("feed.subscriber_buffer", DEFAULT_SUBSCRIBER_BUFFER as u64)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8083)
    }

    /// Only a missing upstream URL is fatal; unusable tunables fall back to
    /// their defaults with a warning.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let mut config: Self = config.try_deserialize()?;
        config.validate()?;
        config.apply_fallbacks();
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.url.trim().is_empty() {
            return Err(ConfigError::Message(
                "upstream URL is not set (BOOKIES_API_URL or LIVEFEED__UPSTREAM__URL)".into(),
            ));
        }
        Ok(())
    }

    fn apply_fallbacks(&mut self) {
        fallback(
            "upstream.request_timeout_seconds",
            &mut self.upstream.request_timeout_seconds,
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
        );
        fallback(
            "feed.poll_interval_seconds",
            &mut self.feed.poll_interval_seconds,
            DEFAULT_POLL_INTERVAL_SECONDS,
        );
        fallback(
            "feed.ping_interval_seconds",
            &mut self.feed.ping_interval_seconds,
            DEFAULT_PING_INTERVAL_SECONDS,
        );
        fallback("feed.write_timeout_ms", &mut self.feed.write_timeout_ms, DEFAULT_WRITE_TIMEOUT_MS);
        fallback("feed.subscriber_buffer", &mut self.feed.subscriber_buffer, DEFAULT_SUBSCRIBER_BUFFER);
    }

    /// Core config; the request timeout is capped below the poll interval so
    /// a stalled upstream can never overlap the next cycle.
    pub fn hub_config(&self) -> HubConfig {
        let poll_interval = Duration::from_secs(self.feed.poll_interval_seconds);
        let request_timeout =
            Duration::from_secs(self.upstream.request_timeout_seconds).min(poll_interval.mul_f64(0.8));

        HubConfig {
            upstream_url: self.upstream.url.clone(),
            source: self.feed.source.clone(),
            poll_interval,
            ping_interval: Duration::from_secs(self.feed.ping_interval_seconds),
            request_timeout,
            write_timeout: Duration::from_millis(self.feed.write_timeout_ms),
            subscriber_buffer: self.feed.subscriber_buffer,
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// `POLL_INTERVAL_SECONDS`: a positive integer, otherwise ignored.
fn legacy_interval(raw: Option<String>) -> Option<u64> {
    let raw = raw?;
    match raw.trim().parse::<u64>() {
        Ok(seconds) if seconds > 0 => Some(seconds),
        _ => {
            warn!("⚠️ POLL_INTERVAL_SECONDS={:?} is not a positive integer, ignoring it", raw);
            None
        }
    }
}

fn fallback<T: Copy + Default + PartialEq + Display>(key: &str, value: &mut T, default: T) {
    if *value == T::default() {
        warn!("⚠️ {} is zero or not a number, using {}", key, default);
        *value = default;
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(u64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

/// Reads an integer or a numeric string; anything else becomes zero, which
/// `apply_fallbacks` replaces with the default.
fn lenient_number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64> + Default,
{
    let value = match RawNumber::deserialize(deserializer)? {
        RawNumber::Number(n) => n,
        RawNumber::Text(text) => text.trim().parse().unwrap_or(0),
        RawNumber::Other(_) => 0,
    };
    Ok(T::try_from(value).unwrap_or_default())
}
