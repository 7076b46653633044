//! Core primitives for tickstream.
//!
//! This crate holds the small building blocks the channel client is made of:
//!
//! - **Signals**: an ordered set of slots with identity-based deduplication
//!   and idempotent disconnection
//! - **Properties**: a change-detecting value cell, plus [`Observable`], which
//!   pairs a property with a change signal
//! - **Logging**: `tracing` target names used across the workspace
//!
//! # Signal Example
//!
//! ```
//! use tickstream_core::Signal;
//!
//! let price_changed = Signal::<f64>::new();
//!
//! let conn_id = price_changed.connect(|price| {
//!     println!("price is now {price}");
//! });
//!
//! price_changed.emit(71_200.0);
//! price_changed.disconnect(conn_id);
//! ```
//!
//! # Observable Example
//!
//! ```
//! use tickstream_core::Observable;
//!
//! let connected = Observable::new(false);
//! connected.changed().connect(|now| println!("connected: {now}"));
//!
//! assert!(connected.set(true));
//! assert!(!connected.set(true)); // unchanged, nothing emitted
//! ```

pub mod logging;
pub mod property;
pub mod signal;

pub use property::{Observable, Property};
pub use signal::{ConnectionId, Signal, Slot};
