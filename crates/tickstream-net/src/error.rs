//! Error types for the networking crate.

use std::fmt;

use tokio_tungstenite::tungstenite;

/// Network-specific errors.
///
/// Transport failures never escape the channel client's lifecycle
/// operations; they are absorbed into the reconnect path. These errors come
/// back only from construction-time validation, settings loading and
/// explicit sends.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// Invalid URL, origin or channel path.
    InvalidUrl(String),
    /// Connection refused, dropped, or not open.
    Connection(String),
    /// WebSocket protocol error.
    WebSocket(String),
    /// JSON serialization/deserialization error, or a JSON value that is
    /// not a valid envelope.
    Json(String),
    /// Invalid configuration or settings file.
    Config(String),
    /// I/O error.
    Io(String),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl(msg) => write!(f, "Invalid URL: {msg}"),
            Self::Connection(msg) => write!(f, "Connection error: {msg}"),
            Self::WebSocket(msg) => write!(f, "WebSocket error: {msg}"),
            Self::Json(msg) => write!(f, "JSON error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for NetworkError {}

impl From<url::ParseError> for NetworkError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for NetworkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<std::io::Error> for NetworkError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<toml::de::Error> for NetworkError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<tungstenite::Error> for NetworkError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                Self::Connection(err.to_string())
            }
            tungstenite::Error::Io(io) => Self::Io(io.to_string()),
            tungstenite::Error::Url(url) => Self::InvalidUrl(url.to_string()),
            other => Self::WebSocket(other.to_string()),
        }
    }
}

/// A specialized Result type for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;
