//! The public channel client.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tickstream_core::logging::targets;
use tickstream_core::{Observable, Signal};
use tokio::sync::mpsc;
use url::Url;

use super::config::ChannelConfig;
use super::driver::{Command, Driver, Shared};
use super::envelope::Envelope;
use super::registry::{Handler, HandlerRegistry, Subscription, handler};
use super::state::ChannelState;
use super::transport::{Connector, TungsteniteConnector};
use crate::error::{NetworkError, Result};

/// A self-healing subscription to one server channel.
///
/// The client reconnects with exponential backoff after any close it did not
/// initiate, probes the connection with a text heartbeat while open, and
/// routes every inbound JSON envelope to the handlers registered for its
/// `type`. Connection status is published on the [`Observable<bool>`] passed
/// in at construction.
///
/// All network work happens on a driver task that is spawned on the current
/// Tokio runtime by the first [`connect`](Self::connect). Dropping the client
/// stops the driver and closes the connection.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tickstream_core::Observable;
/// use tickstream_net::channel::{ChannelClient, ChannelConfig, ChannelEndpoint, Origin};
///
/// # async fn example() -> tickstream_net::Result<()> {
/// let config = ChannelConfig::new(ChannelEndpoint::new("/ws/prices")?)
///     .origin(Origin::parse("https://markets.example.com")?);
/// let connected = Arc::new(Observable::new(false));
/// let client = ChannelClient::new(config, connected.clone())?;
///
/// let sub = client.on_event("message", |note: serde_json::Value| {
///     println!("{note}");
/// });
/// client.connect();
/// // ...
/// sub.dispose();
/// client.close();
/// # Ok(())
/// # }
/// ```
pub struct ChannelClient {
    config: ChannelConfig,
    url: Url,
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
    command_tx: Mutex<Option<mpsc::UnboundedSender<Command>>>,
}

impl ChannelClient {
    /// Create a client that connects over real WebSockets.
    pub fn new(config: ChannelConfig, connected: Arc<Observable<bool>>) -> Result<Self> {
        Self::with_connector(config, connected, Arc::new(TungsteniteConnector))
    }

    /// Create a client that opens transports through `connector`.
    ///
    /// Fails if the channel URL cannot be derived or the heartbeat interval
    /// is zero.
    pub fn with_connector(
        config: ChannelConfig,
        connected: Arc<Observable<bool>>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        if config.heartbeat.interval.is_zero() {
            return Err(NetworkError::Config(
                "heartbeat interval must be greater than zero".to_string(),
            ));
        }
        let url = config.endpoint.resolve(&config.origin)?;
        Ok(Self {
            config,
            url,
            connector,
            shared: Arc::new(Shared::new(connected)),
            command_tx: Mutex::new(None),
        })
    }

    /// Open the channel.
    ///
    /// Does nothing while a connection is open or being established. While
    /// a reconnect is pending, connects immediately instead of waiting out
    /// the delay. Must be called from within a Tokio runtime.
    ///
    /// If the driver task has stopped (for example because the runtime it
    /// was spawned on shut down), a new one is spawned on the current runtime.
    pub fn connect(&self) {
        let mut command_tx = self.command_tx.lock();
        if let Some(tx) = command_tx.as_ref() {
            if tx.send(Command::Connect).is_ok() {
                return;
            }
            tracing::debug!(target: targets::CHANNEL, url = %self.url, "channel driver stopped, starting a new one");
            *command_tx = None;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!(target: targets::CHANNEL, url = %self.url, "connect called outside a Tokio runtime");
                return;
            }
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = Driver::new(
            self.config.clone(),
            self.url.clone(),
            self.connector.clone(),
            self.shared.clone(),
            rx,
        );
        runtime.spawn(driver.run());
        if tx.send(Command::Connect).is_ok() {
            *command_tx = Some(tx);
        }
    }

    /// Close the channel and cancel any pending reconnect or heartbeat.
    ///
    /// The client stays usable: a later [`connect`](Self::connect) reopens
    /// it with the same handlers.
    pub fn close(&self) {
        let mut command_tx = self.command_tx.lock();
        let stopped = command_tx
            .as_ref()
            .is_some_and(|tx| tx.send(Command::Close).is_err());
        if stopped {
            // The stopped driver already published the channel as idle.
            *command_tx = None;
        }
    }

    /// Register `handler` for envelopes of type `kind`.
    ///
    /// Registering the same handler twice for one type is a no-op. The
    /// registration survives disconnects and reconnects until the returned
    /// [`Subscription`] is disposed.
    pub fn on(&self, kind: impl Into<String>, handler: Handler) -> Subscription {
        self.shared.registry.on(kind, handler)
    }

    /// Register a typed handler for envelopes of type `kind`.
    ///
    /// The whole envelope, `type` included, is decoded into `T`. Envelopes
    /// that do not decode are skipped for this handler only.
    ///
    /// Each call registers a new handler, so passing the same closure twice
    /// means it runs twice per envelope. For set semantics build one
    /// [`Handler`] and pass clones of it to [`on`](Self::on).
    pub fn on_event<T, F>(&self, kind: impl Into<String>, f: F) -> Subscription
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.on(
            kind,
            handler(move |envelope: &Envelope| match envelope.decode::<T>() {
                Ok(event) => f(event),
                Err(e) => {
                    tracing::trace!(target: targets::DISPATCH, kind = envelope.kind(), error = %e, "payload did not decode");
                }
            }),
        )
    }

    /// Send an envelope to the server.
    ///
    /// Fails with [`NetworkError::Connection`] unless the channel is open.
    pub fn send(&self, envelope: &Envelope) -> Result<()> {
        if !self.state().is_open() {
            return Err(NetworkError::Connection("Not connected".to_string()));
        }
        let command_tx = self.command_tx.lock();
        let tx = command_tx
            .as_ref()
            .ok_or_else(|| NetworkError::Connection("Not connected".to_string()))?;
        tx.send(Command::Send(envelope.to_json()))
            .map_err(|_| NetworkError::Connection("Channel driver stopped".to_string()))
    }

    /// Serialize `value` and send it. It must serialize to an object with a
    /// string `type` field.
    pub fn send_json<T: Serialize>(&self, value: &T) -> Result<()> {
        self.send(&Envelope::from_serialize(value)?)
    }

    /// Whether the channel is currently open.
    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// The status sink this client writes to.
    pub fn connected(&self) -> &Arc<Observable<bool>> {
        &self.shared.connected
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.shared.inner.lock().state
    }

    /// Emitted on every lifecycle transition.
    pub fn state_changed(&self) -> &Signal<ChannelState> {
        &self.shared.state_changed
    }

    /// Retries scheduled since the channel was last open.
    pub fn attempts(&self) -> u32 {
        self.shared.inner.lock().attempts
    }

    /// The derived channel URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// The handler registry behind [`on`](Self::on).
    pub fn registry(&self) -> &HandlerRegistry {
        &self.shared.registry
    }
}

impl fmt::Debug for ChannelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelClient")
            .field("url", &self.url.as_str())
            .field("state", &self.state())
            .field("attempts", &self.attempts())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelEndpoint, HeartbeatConfig, Origin};
    use std::time::Duration;

    fn config(path: &str) -> ChannelConfig {
        ChannelConfig::new(ChannelEndpoint::new(path).unwrap())
    }

    #[test]
    fn test_url_is_derived_from_origin() {
        let connected = Arc::new(Observable::new(false));
        let client = ChannelClient::new(
            config("/ws/trades").origin(Origin::parse("https://markets.example.com").unwrap()),
            connected,
        )
        .unwrap();
        assert_eq!(client.url().as_str(), "wss://markets.example.com/ws/trades");
        assert_eq!(client.state(), ChannelState::Idle);
        assert!(!client.is_connected());
    }

    #[test]
    fn test_zero_heartbeat_interval_is_rejected() {
        let connected = Arc::new(Observable::new(false));
        let result = ChannelClient::new(
            config("/ws/prices").heartbeat(HeartbeatConfig::new().interval(Duration::ZERO)),
            connected,
        );
        assert!(matches!(result, Err(NetworkError::Config(_))));
    }

    #[test]
    fn test_send_before_connect_fails() {
        let connected = Arc::new(Observable::new(false));
        let client = ChannelClient::new(config("/ws/prices"), connected).unwrap();
        let err = client.send(&Envelope::new("subscribe")).unwrap_err();
        assert_eq!(err, NetworkError::Connection("Not connected".to_string()));
    }

    #[test]
    fn test_connect_outside_runtime_is_harmless() {
        let connected = Arc::new(Observable::new(false));
        let client = ChannelClient::new(config("/ws/prices"), connected).unwrap();
        client.connect();
        client.close();
        assert_eq!(client.state(), ChannelState::Idle);
    }

    #[test]
    fn test_handlers_can_be_registered_before_connect() {
        let connected = Arc::new(Observable::new(false));
        let client = ChannelClient::new(config("/ws/prices"), connected).unwrap();
        let sub = client.on_event("message", |_: serde_json::Value| {});
        assert_eq!(client.registry().handler_count("message"), 1);
        assert!(sub.dispose());
        assert_eq!(client.registry().handler_count("message"), 0);
    }

    #[test]
    fn test_on_event_registers_a_new_handler_each_call() {
        let connected = Arc::new(Observable::new(false));
        let client = ChannelClient::new(config("/ws/prices"), connected).unwrap();
        let note = |_: serde_json::Value| {};
        client.on_event("message", note);
        client.on_event("message", note);
        assert_eq!(client.registry().handler_count("message"), 2);

        let shared = handler(|_: &Envelope| {});
        client.on("trade", shared.clone());
        client.on("trade", shared);
        assert_eq!(client.registry().handler_count("trade"), 1);
    }
}
