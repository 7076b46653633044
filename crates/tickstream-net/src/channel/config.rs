//! Configuration types for channel clients.

use std::time::Duration;

use super::endpoint::{ChannelEndpoint, Origin};

/// Configuration for one logical channel.
#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// Path of the channel on the server, e.g. `/ws/prices`.
    pub endpoint: ChannelEndpoint,
    /// Host and transport security the endpoint is resolved against.
    pub origin: Origin,
    /// Automatic reconnection policy.
    pub reconnect: ReconnectConfig,
    /// Keepalive probe policy.
    pub heartbeat: HeartbeatConfig,
}

impl ChannelConfig {
    /// Create a configuration for `endpoint` with default settings and a
    /// `localhost` origin.
    pub fn new(endpoint: ChannelEndpoint) -> Self {
        Self {
            endpoint,
            origin: Origin::default(),
            reconnect: ReconnectConfig::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }

    /// Set the origin the endpoint is resolved against.
    pub fn origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Set the reconnection policy.
    pub fn reconnect(mut self, config: ReconnectConfig) -> Self {
        self.reconnect = config;
        self
    }

    /// Set the heartbeat policy.
    pub fn heartbeat(mut self, config: HeartbeatConfig) -> Self {
        self.heartbeat = config;
        self
    }
}

/// Configuration for automatic reconnection.
///
/// The delay before retry `n` (0-indexed) is
/// `min(initial_delay * backoff_multiplier^n, max_delay)`, which with the
/// defaults gives 1s, 2s, 4s, 8s, 16s, 30s, 30s, ...
#[derive(Clone, Debug, PartialEq)]
pub struct ReconnectConfig {
    /// Maximum number of scheduled retries between successful opens.
    /// `None` means retry forever.
    pub max_attempts: Option<u32>,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: Some(10),
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Create a new reconnect configuration with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of reconnection attempts.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Retry forever.
    pub fn unlimited_attempts(mut self) -> Self {
        self.max_attempts = None;
        self
    }

    /// Set the initial delay between reconnection attempts.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between reconnection attempts.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff multiplier for exponential backoff.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Whether another retry may be scheduled after `attempts` retries.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_delay.as_millis() as f64;
        let cap_ms = self.max_delay.as_millis() as f64;
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let delay_ms = (base_ms * self.backoff_multiplier.powi(exponent)).min(cap_ms);
        Duration::from_millis(delay_ms.max(0.0) as u64)
    }
}

/// Configuration for the keepalive heartbeat.
///
/// While a connection is open the client sends `probe` as a text frame every
/// `interval`. Inbound text frames equal to `reply` are discarded before
/// envelope parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Time between probes. The first probe goes out one interval after open.
    pub interval: Duration,
    /// Outbound sentinel text.
    pub probe: String,
    /// Inbound sentinel text.
    pub reply: String,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            probe: "ping".to_string(),
            reply: "pong".to_string(),
        }
    }
}

impl HeartbeatConfig {
    /// Create a heartbeat configuration with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the probe interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the outbound probe text.
    pub fn probe(mut self, probe: impl Into<String>) -> Self {
        self.probe = probe.into();
        self
    }

    /// Set the inbound reply text.
    pub fn reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = reply.into();
        self
    }
}
