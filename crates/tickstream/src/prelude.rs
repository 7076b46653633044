//! Prelude module for tickstream.
//!
//! ```ignore
//! use tickstream::prelude::*;
//! ```

// ============================================================================
// Signals and Observables
// ============================================================================

pub use tickstream_core::{ConnectionId, Observable, Property, Signal};

// ============================================================================
// Channels
// ============================================================================

#[cfg(feature = "networking")]
pub use tickstream_net::channel::{
    ChannelClient, ChannelConfig, ChannelEndpoint, ChannelState, Envelope, HeartbeatConfig,
    Origin, ReconnectConfig, Subscription, handler,
};

// ============================================================================
// Market Data
// ============================================================================

#[cfg(feature = "networking")]
pub use tickstream_net::{
    MarketChannels, MarketEvent, MarketIndex, PriceUpdate, Settings, Stock, TradeLog, TradeSide,
};
