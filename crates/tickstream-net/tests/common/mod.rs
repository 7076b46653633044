//! In-memory connector for channel tests.
//!
//! Tests script the outcome of each connection attempt, then drive the
//! server side of accepted connections through a [`ServerEnd`]. Combined
//! with `#[tokio::test(start_paused = true)]`, every timer in the client is
//! deterministic.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Sink;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tickstream_core::Observable;
use tickstream_net::channel::{ChannelClient, ChannelConfig, ChannelEndpoint, Connector, Transport};
use tickstream_net::{NetworkError, Result};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

/// What the next connection attempt does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Handshake succeeds; a [`ServerEnd`] becomes available.
    Accept,
    /// Handshake fails immediately.
    Refuse,
    /// Handshake never completes.
    Hang,
}

#[derive(Default)]
pub struct MockConnector {
    script: Mutex<VecDeque<Outcome>>,
    attempts: Mutex<Vec<(Instant, Url)>>,
    servers: Mutex<VecDeque<ServerEnd>>,
}

impl MockConnector {
    /// A connector that refuses every attempt unless scripted otherwise.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A connector whose first attempts follow `outcomes`.
    pub fn scripted(outcomes: impl IntoIterator<Item = Outcome>) -> Arc<Self> {
        let connector = Self::new();
        connector.script.lock().extend(outcomes);
        connector
    }

    pub fn push(&self, outcome: Outcome) {
        self.script.lock().push_back(outcome);
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().len()
    }

    /// Virtual time of every attempt so far.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().iter().map(|(at, _)| *at).collect()
    }

    pub fn attempt_urls(&self) -> Vec<String> {
        self.attempts
            .lock()
            .iter()
            .map(|(_, url)| url.to_string())
            .collect()
    }

    /// Server side of the oldest accepted connection not yet taken.
    pub fn take_server(&self) -> Option<ServerEnd> {
        self.servers.lock().pop_front()
    }
}

impl Connector for MockConnector {
    fn connect(&self, url: &Url) -> BoxFuture<'static, Result<Transport>> {
        self.attempts.lock().push((Instant::now(), url.clone()));
        let outcome = self.script.lock().pop_front().unwrap_or(Outcome::Refuse);
        match outcome {
            Outcome::Accept => {
                let (transport, server) = pair();
                self.servers.lock().push_back(server);
                Box::pin(async move { Ok::<_, NetworkError>(transport) })
            }
            Outcome::Refuse => Box::pin(async {
                Err::<Transport, _>(NetworkError::Connection("connection refused".to_string()))
            }),
            Outcome::Hang => Box::pin(std::future::pending::<Result<Transport>>()),
        }
    }
}

/// Client-side sink of a mock connection. Records when it is closed.
struct ClientSink {
    tx: mpsc::UnboundedSender<Message>,
    closed: Arc<AtomicBool>,
}

impl Sink<Message> for ClientSink {
    type Error = NetworkError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, message: Message) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| NetworkError::Connection("server end dropped".to_string()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.closed.store(true, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

fn pair() -> (Transport, ServerEnd) {
    let (to_client, client_rx) = mpsc::unbounded_channel::<Result<Message>>();
    let (client_tx, from_client) = mpsc::unbounded_channel::<Message>();
    let closed = Arc::new(AtomicBool::new(false));

    let sink = ClientSink {
        tx: client_tx,
        closed: closed.clone(),
    };
    let transport = Transport::new(sink, UnboundedReceiverStream::new(client_rx));
    (
        transport,
        ServerEnd {
            to_client,
            from_client,
            closed,
        },
    )
}

/// The server half of an accepted mock connection.
///
/// Dropping it ends the client's inbound stream, which the client treats as
/// a close.
pub struct ServerEnd {
    to_client: mpsc::UnboundedSender<Result<Message>>,
    from_client: mpsc::UnboundedReceiver<Message>,
    closed: Arc<AtomicBool>,
}

impl ServerEnd {
    pub fn send_text(&self, text: &str) {
        let _ = self.to_client.send(Ok(Message::Text(text.into())));
    }

    pub fn send_json(&self, value: serde_json::Value) {
        self.send_text(&value.to_string());
    }

    pub fn send_binary(&self, data: &[u8]) {
        let _ = self.to_client.send(Ok(Message::Binary(data.to_vec().into())));
    }

    /// Send a close frame.
    pub fn close(&self) {
        let _ = self.to_client.send(Ok(Message::Close(None)));
    }

    /// Inject a transport error.
    pub fn fail(&self) {
        let _ = self
            .to_client
            .send(Err(NetworkError::WebSocket("connection reset".to_string())));
    }

    /// Whether the client closed its sending half.
    pub fn client_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Every frame the client has sent since the last call.
    pub fn received(&mut self) -> Vec<Message> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.from_client.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Text frames the client has sent since the last call.
    pub fn received_text(&mut self) -> Vec<String> {
        self.received()
            .into_iter()
            .filter_map(|frame| match frame {
                Message::Text(text) => Some(text.as_str().to_string()),
                _ => None,
            })
            .collect()
    }
}

/// Let spawned tasks run without advancing virtual time.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Advance virtual time, firing every timer due on the way.
pub async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
    settle().await;
}

pub fn config(path: &str) -> ChannelConfig {
    ChannelConfig::new(ChannelEndpoint::new(path).unwrap())
}

/// A client on `/ws/prices` with default policies and a fresh status sink.
pub fn client(connector: &Arc<MockConnector>) -> (ChannelClient, Arc<Observable<bool>>) {
    client_with(connector, config("/ws/prices"))
}

pub fn client_with(
    connector: &Arc<MockConnector>,
    config: ChannelConfig,
) -> (ChannelClient, Arc<Observable<bool>>) {
    let connected = Arc::new(Observable::new(false));
    let client = ChannelClient::with_connector(config, connected.clone(), connector.clone()).unwrap();
    (client, connected)
}

/// Record every value published on a status sink.
pub fn record_status(connected: &Observable<bool>) -> Arc<Mutex<Vec<bool>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    connected.changed().connect(move |value: &bool| sink.lock().push(*value));
    log
}
