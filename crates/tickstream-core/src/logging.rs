//! Logging facilities for tickstream.
//!
//! tickstream uses the `tracing` crate for instrumentation. Library crates
//! only emit events; installing a subscriber is up to the application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("tickstream_net::channel=debug")
//!     .init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core primitives target.
    pub const CORE: &str = "tickstream_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "tickstream_core::signal";
    /// Channel client lifecycle target (connect, close, backoff).
    pub const CHANNEL: &str = "tickstream_net::channel";
    /// Heartbeat probes and replies.
    pub const HEARTBEAT: &str = "tickstream_net::heartbeat";
    /// Inbound frame parsing and handler dispatch.
    pub const DISPATCH: &str = "tickstream_net::dispatch";
    /// Settings loading.
    pub const SETTINGS: &str = "tickstream_net::settings";
}

#[cfg(test)]
mod tests {
    use super::targets;

    #[test]
    fn test_targets_share_crate_prefixes() {
        assert!(targets::SIGNAL.starts_with(targets::CORE));
        for target in [targets::CHANNEL, targets::HEARTBEAT, targets::DISPATCH, targets::SETTINGS] {
            assert!(target.starts_with("tickstream_net::"), "{target}");
        }
    }
}
