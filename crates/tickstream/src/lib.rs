//! tickstream: live market-data feeds over self-healing WebSocket channels.
//!
//! This crate re-exports the workspace crates behind one name:
//!
//! - From `tickstream-core`: [`signal`], [`property`] and [`logging`]
//! - From `tickstream-net` (feature `networking`, on by default):
//!   [`channel`], [`market`] and [`settings`]
//!
//! Most applications only need the prelude:
//!
//! ```no_run
//! use tickstream::prelude::*;
//!
//! # async fn example() -> tickstream::Result<()> {
//! let settings = Settings::load("tickstream.toml")?;
//! let channels = MarketChannels::new(&settings)?;
//!
//! channels.prices_connected().changed().connect(|up| {
//!     println!("prices {}", if *up { "live" } else { "offline" });
//! });
//! let _sub = channels.prices().on_event("price_update", |update: PriceUpdate| {
//!     println!("{} stocks", update.stocks.len());
//! });
//!
//! channels.connect_all();
//! # Ok(())
//! # }
//! ```

pub use tickstream_core::{logging, property, signal};
#[cfg(feature = "networking")]
pub use tickstream_net::{NetworkError, Result, channel, market, settings};

pub mod prelude;
