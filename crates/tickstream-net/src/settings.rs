//! File-based settings for the application's channels.
//!
//! Settings are read from TOML. Every field has a default, so an empty file
//! (or no file at all) yields a working configuration for a local server:
//!
//! ```toml
//! origin = "https://markets.example.com"
//!
//! [reconnect]
//! max_attempts = 10        # omit for the default; 0 disables retries
//! initial_delay_ms = 1000
//! max_delay_ms = 30000
//! backoff_multiplier = 2.0
//!
//! [heartbeat]
//! interval_ms = 30000
//! probe = "ping"
//! reply = "pong"
//!
//! [channels]
//! prices = "/ws/prices"
//! trades = "/ws/trades"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tickstream_core::logging::targets;

use crate::channel::{ChannelConfig, ChannelEndpoint, HeartbeatConfig, Origin, ReconnectConfig};
use crate::error::{NetworkError, Result};

/// Top-level settings document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Origin the channel paths are resolved against.
    pub origin: String,
    pub reconnect: ReconnectSettings,
    pub heartbeat: HeartbeatSettings,
    pub channels: ChannelPaths,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8000".to_string(),
            reconnect: ReconnectSettings::default(),
            heartbeat: HeartbeatSettings::default(),
            channels: ChannelPaths::default(),
        }
    }
}

/// `[reconnect]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// `[heartbeat]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatSettings {
    pub interval_ms: u64,
    pub probe: String,
    pub reply: String,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            probe: "ping".to_string(),
            reply: "pong".to_string(),
        }
    }
}

/// `[channels]` table: server-relative paths of the two market channels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelPaths {
    pub prices: String,
    pub trades: String,
}

impl Default for ChannelPaths {
    fn default() -> Self {
        Self {
            prices: "/ws/prices".to_string(),
            trades: "/ws/trades".to_string(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read and parse a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(target: targets::SETTINGS, path = %path.display(), "loading settings");
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.heartbeat.interval_ms == 0 {
            return Err(NetworkError::Config(
                "heartbeat.interval_ms must be greater than zero".to_string(),
            ));
        }
        let multiplier = self.reconnect.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(NetworkError::Config(format!(
                "reconnect.backoff_multiplier must be at least 1.0, got {multiplier}"
            )));
        }
        if self.reconnect.initial_delay_ms > self.reconnect.max_delay_ms {
            return Err(NetworkError::Config(
                "reconnect.initial_delay_ms exceeds reconnect.max_delay_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// The parsed origin.
    pub fn origin(&self) -> Result<Origin> {
        Origin::parse(&self.origin)
    }

    /// Reconnect policy described by the `[reconnect]` table.
    pub fn reconnect_config(&self) -> ReconnectConfig {
        let r = &self.reconnect;
        ReconnectConfig::new()
            .max_attempts(r.max_attempts)
            .initial_delay(Duration::from_millis(r.initial_delay_ms))
            .max_delay(Duration::from_millis(r.max_delay_ms))
            .backoff_multiplier(r.backoff_multiplier)
    }

    /// Heartbeat policy described by the `[heartbeat]` table.
    pub fn heartbeat_config(&self) -> HeartbeatConfig {
        let h = &self.heartbeat;
        HeartbeatConfig::new()
            .interval(Duration::from_millis(h.interval_ms))
            .probe(h.probe.clone())
            .reply(h.reply.clone())
    }

    /// Full configuration for the channel at `path`.
    pub fn channel_config(&self, path: &str) -> Result<ChannelConfig> {
        Ok(ChannelConfig::new(ChannelEndpoint::new(path)?)
            .origin(self.origin()?)
            .reconnect(self.reconnect_config())
            .heartbeat(self.heartbeat_config()))
    }
}
