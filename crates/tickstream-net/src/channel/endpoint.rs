//! Channel endpoint derivation.
//!
//! A channel is addressed by a server-relative path. The full WebSocket URL
//! is derived from the [`Origin`] the application was served from when the
//! client is built: `wss://` when the origin is secure, `ws://` otherwise.

use std::fmt;

use url::Url;

use crate::error::{NetworkError, Result};

/// The host and transport security a channel path is resolved against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Origin {
    host: String,
    secure: bool,
}

impl Origin {
    /// Create an origin from a `host[:port]` authority.
    pub fn new(host: impl Into<String>, secure: bool) -> Self {
        Self {
            host: host.into(),
            secure,
        }
    }

    /// Parse an origin such as `https://desk.example.com:8443`.
    ///
    /// `http`/`ws` origins are insecure, `https`/`wss` origins are secure.
    /// Any path, query or fragment is ignored.
    pub fn parse(origin: &str) -> Result<Self> {
        let url = Url::parse(origin)?;
        let secure = match url.scheme() {
            "https" | "wss" => true,
            "http" | "ws" => false,
            other => {
                return Err(NetworkError::InvalidUrl(format!(
                    "unsupported origin scheme '{other}'"
                )));
            }
        };
        let host = url
            .host_str()
            .ok_or_else(|| NetworkError::InvalidUrl(format!("origin '{origin}' has no host")))?;
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Ok(Self { host, secure })
    }

    /// The `host[:port]` authority.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether the origin was served over an encrypted transport.
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// The WebSocket scheme matching this origin's transport security.
    pub fn ws_scheme(&self) -> &'static str {
        if self.secure { "wss" } else { "ws" }
    }
}

impl Default for Origin {
    fn default() -> Self {
        Self::new("localhost:8000", false)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.secure { "https" } else { "http" };
        write!(f, "{scheme}://{}", self.host)
    }
}

/// A server-relative channel path, e.g. `/ws/prices`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChannelEndpoint {
    path: String,
}

impl ChannelEndpoint {
    /// Create an endpoint. The path must start with `/`.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(NetworkError::InvalidUrl(format!(
                "channel path '{path}' must start with '/'"
            )));
        }
        if path.chars().any(char::is_whitespace) {
            return Err(NetworkError::InvalidUrl(format!(
                "channel path '{path}' contains whitespace"
            )));
        }
        Ok(Self { path })
    }

    /// The server-relative path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Build `{ws|wss}://{host}{path}` for the given origin.
    pub fn resolve(&self, origin: &Origin) -> Result<Url> {
        let url = Url::parse(&format!(
            "{}://{}{}",
            origin.ws_scheme(),
            origin.host(),
            self.path
        ))?;
        Ok(url)
    }
}

impl fmt::Display for ChannelEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}
