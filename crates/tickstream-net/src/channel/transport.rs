//! The transport seam between the channel driver and the network.
//!
//! The driver never touches sockets directly. It asks a [`Connector`] for a
//! [`Transport`] (one sink and one stream of WebSocket messages) and owns
//! that transport until it closes. [`TungsteniteConnector`] is the
//! production connector; tests substitute an in-memory one.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tickstream_core::logging::targets;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use url::Url;

use crate::error::{NetworkError, Result};

/// Outbound half of a transport.
pub type FrameSink = Pin<Box<dyn Sink<Message, Error = NetworkError> + Send>>;
/// Inbound half of a transport.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Message>> + Send>>;

/// How long a graceful close may take before the transport is dropped.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// One live connection: an outbound sink and an inbound stream.
pub struct Transport {
    sink: FrameSink,
    stream: FrameStream,
}

impl Transport {
    /// Assemble a transport from its two halves.
    pub fn new<S, R>(sink: S, stream: R) -> Self
    where
        S: Sink<Message, Error = NetworkError> + Send + 'static,
        R: Stream<Item = Result<Message>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }

    /// Send one frame.
    pub async fn send(&mut self, message: Message) -> Result<()> {
        self.sink.send(message).await
    }

    /// Receive the next frame. `None` means the peer is gone.
    pub async fn next(&mut self) -> Option<Result<Message>> {
        self.stream.next().await
    }

    /// Send a normal close frame and close the sink, best effort.
    pub async fn close(mut self) {
        let goodbye = async {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "client closing".into(),
            };
            self.sink.send(Message::Close(Some(frame))).await?;
            self.sink.close().await
        };
        match tokio::time::timeout(CLOSE_TIMEOUT, goodbye).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(target: targets::CHANNEL, error = %e, "close frame not delivered"),
            Err(_) => tracing::debug!(target: targets::CHANNEL, "close handshake timed out"),
        }
    }

    /// Flush and close the sink after the peer has closed, best effort.
    ///
    /// Unlike [`close`](Self::close) this sends no close frame of its own;
    /// the WebSocket layer already queued its reply to the peer's.
    pub async fn finish(mut self) {
        match tokio::time::timeout(CLOSE_TIMEOUT, self.sink.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(target: targets::CHANNEL, error = %e, "close reply not delivered"),
            Err(_) => tracing::debug!(target: targets::CHANNEL, "close reply timed out"),
        }
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}

/// Opens transports for a channel.
///
/// `connect` must not block; the returned future performs the handshake.
/// A failed handshake is reported as `Err` and is handled exactly like a
/// close by the driver.
pub trait Connector: Send + Sync + 'static {
    /// Start connecting to `url`.
    fn connect(&self, url: &Url) -> BoxFuture<'static, Result<Transport>>;
}

/// Production connector built on `tokio-tungstenite`.
///
/// `wss://` URLs use rustls with the platform's native roots.
#[derive(Clone, Copy, Debug, Default)]
pub struct TungsteniteConnector;

impl Connector for TungsteniteConnector {
    fn connect(&self, url: &Url) -> BoxFuture<'static, Result<Transport>> {
        let url = url.to_string();
        Box::pin(async move {
            let (ws_stream, _response) = tokio_tungstenite::connect_async(url).await?;
            let (write, read) = ws_stream.split();
            Ok::<_, NetworkError>(Transport::new(
                write.sink_map_err(NetworkError::from),
                read.map(|frame| frame.map_err(NetworkError::from)),
            ))
        })
    }
}
