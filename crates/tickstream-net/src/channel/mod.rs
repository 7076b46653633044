//! Resilient real-time channel client.
//!
//! A channel is one WebSocket endpoint on the server that pushes
//! `type`-discriminated JSON envelopes. [`ChannelClient`] keeps such a
//! channel open for as long as the application wants it:
//!
//! - **Reconnect**: after any close it did not initiate, the client retries
//!   with exponential backoff (1s, 2s, 4s, ... capped at 30s) and gives up
//!   after ten consecutive failures. A successful open resets the count.
//! - **Heartbeat**: while open, a `"ping"` text frame goes out every 30s. The
//!   server's `"pong"` reply is swallowed before dispatch.
//! - **Dispatch**: every other text frame is parsed as an [`Envelope`] and
//!   handed to the handlers registered for its `type`, in registration
//!   order. Malformed frames are dropped.
//! - **Status**: the client writes `true`/`false` to an injected
//!   [`Observable<bool>`](tickstream_core::Observable) as the connection
//!   opens and closes.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tickstream_core::Observable;
//! use tickstream_net::channel::{ChannelClient, ChannelConfig, ChannelEndpoint, handler};
//!
//! # async fn example() -> tickstream_net::Result<()> {
//! let connected = Arc::new(Observable::new(false));
//! let client = ChannelClient::new(
//!     ChannelConfig::new(ChannelEndpoint::new("/ws/prices")?),
//!     connected.clone(),
//! )?;
//!
//! let sub = client.on("price_update", handler(|envelope| {
//!     println!("{:?}", envelope.get("stocks"));
//! }));
//! client.connect();
//! # sub.dispose();
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod driver;
mod endpoint;
mod envelope;
mod registry;
mod state;
mod transport;

pub use client::ChannelClient;
pub use config::{ChannelConfig, HeartbeatConfig, ReconnectConfig};
pub use endpoint::{ChannelEndpoint, Origin};
pub use envelope::{Envelope, Inbound, TYPE_FIELD};
pub use registry::{Handler, HandlerRegistry, Subscription, SubscriptionGuard, handler};
pub use state::ChannelState;
pub use transport::{Connector, FrameSink, FrameStream, Transport, TungsteniteConnector};
