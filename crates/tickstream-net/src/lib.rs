//! Networking for tickstream.
//!
//! This crate provides the resilient real-time channel client the
//! application's market feeds run on:
//!
//! - **Channels**: a WebSocket client that reconnects with exponential
//!   backoff, keeps the link alive with a text heartbeat, and dispatches
//!   `type`-discriminated JSON envelopes to registered handlers
//! - **Market payloads**: typed records for the price and trade feeds
//! - **Settings**: TOML-backed configuration for both channels
//!
//! # Channel Client
//!
//! ```no_run
//! use std::sync::Arc;
//! use tickstream_core::Observable;
//! use tickstream_net::{ChannelClient, ChannelConfig, ChannelEndpoint, Origin, PriceUpdate};
//!
//! # async fn example() -> tickstream_net::Result<()> {
//! let config = ChannelConfig::new(ChannelEndpoint::new("/ws/prices")?)
//!     .origin(Origin::parse("http://localhost:8000")?);
//!
//! let connected = Arc::new(Observable::new(false));
//! connected.changed().connect(|up| println!("prices channel up: {up}"));
//!
//! let prices = ChannelClient::new(config, connected)?;
//! let sub = prices.on_event("price_update", |update: PriceUpdate| {
//!     for stock in &update.stocks {
//!         println!("{} {}", stock.code, stock.price);
//!     }
//! });
//! prices.connect();
//!
//! // Later: stop listening, then shut the channel down.
//! sub.dispose();
//! prices.close();
//! # Ok(())
//! # }
//! ```
//!
//! # Application Channels
//!
//! [`MarketChannels`] builds the price and trade channels once from
//! [`Settings`] and hands them out as long-lived resources:
//!
//! ```no_run
//! use tickstream_net::{MarketChannels, Settings};
//!
//! # async fn example() -> tickstream_net::Result<()> {
//! let settings = Settings::load("tickstream.toml")?;
//! let channels = MarketChannels::new(&settings)?;
//! channels.connect_all();
//! # Ok(())
//! # }
//! ```

pub mod channel;
mod error;
pub mod market;
pub mod settings;

pub use error::{NetworkError, Result};

// Re-export commonly used types at the crate root
pub use channel::{
    ChannelClient, ChannelConfig, ChannelEndpoint, ChannelState, Envelope, Handler,
    HeartbeatConfig, Origin, ReconnectConfig, Subscription, handler,
};
pub use market::{MarketChannels, MarketEvent, MarketIndex, PriceUpdate, Stock, TradeLog, TradeSide};
pub use settings::Settings;
