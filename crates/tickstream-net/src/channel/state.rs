//! Lifecycle state of a channel client.

/// Current state of a channel connection.
///
/// ```text
/// Idle -> Connecting -> Open -> Retrying -> Connecting -> ...
///                                   \-> GaveUp (retries exhausted)
/// any state -> Idle (explicit close)
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// Never connected, or shut down with `close()`.
    #[default]
    Idle,
    /// A handshake is in flight.
    Connecting,
    /// Connected; frames are dispatched and heartbeats sent.
    Open,
    /// Connection lost; a reconnect is scheduled.
    Retrying,
    /// Retries exhausted. Only an explicit `connect()` resumes.
    GaveUp,
}

impl ChannelState {
    /// Whether the client holds an open connection.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Whether the client will do nothing further without a `connect()`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Idle | Self::GaveUp)
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Open => write!(f, "Open"),
            Self::Retrying => write!(f, "Retrying"),
            Self::GaveUp => write!(f, "GaveUp"),
        }
    }
}
