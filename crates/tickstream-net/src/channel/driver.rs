//! The connection driver.
//!
//! One driver task runs per channel client. It exclusively owns the
//! transport, the reconnect timer and the heartbeat timer, and it processes
//! exactly one event per loop turn: a command from the client, a finished
//! handshake, an inbound frame, the reconnect deadline, or a heartbeat tick.
//! Every state transition therefore happens in one place, in order, and a
//! timer is always replaced or cleared within the turn that supersedes it.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tickstream_core::logging::targets;
use tickstream_core::{Observable, Signal};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::config::ChannelConfig;
use super::envelope::Inbound;
use super::registry::HandlerRegistry;
use super::state::ChannelState;
use super::transport::{Connector, Transport};
use crate::error::Result;

/// Command sent from the client to its driver.
#[derive(Debug)]
pub(crate) enum Command {
    Connect,
    Close,
    Send(String),
}

/// Lifecycle bookkeeping readable from the client.
#[derive(Debug, Default)]
pub(crate) struct ChannelInner {
    pub(crate) state: ChannelState,
    pub(crate) attempts: u32,
    /// Bumped for every driver spawned, so a stale driver never resets the
    /// state of its successor.
    pub(crate) generation: u64,
}

/// State shared between a client and its driver.
pub(crate) struct Shared {
    pub(crate) inner: Mutex<ChannelInner>,
    pub(crate) state_changed: Signal<ChannelState>,
    pub(crate) registry: HandlerRegistry,
    pub(crate) connected: Arc<Observable<bool>>,
}

impl Shared {
    pub(crate) fn new(connected: Arc<Observable<bool>>) -> Self {
        Self {
            inner: Mutex::new(ChannelInner::default()),
            state_changed: Signal::new(),
            registry: HandlerRegistry::new(),
            connected,
        }
    }

    fn set_state(&self, state: ChannelState) {
        let changed = {
            let mut inner = self.inner.lock();
            std::mem::replace(&mut inner.state, state) != state
        };
        if changed {
            self.state_changed.emit(state);
        }
    }

    fn set_attempts(&self, attempts: u32) {
        self.inner.lock().attempts = attempts;
    }

    /// Publish a stopped driver as idle and disconnected, unless a newer
    /// driver has taken over.
    fn release(&self, generation: u64) {
        let changed = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return;
            }
            std::mem::replace(&mut inner.state, ChannelState::Idle) != ChannelState::Idle
        };
        if changed {
            self.state_changed.emit(ChannelState::Idle);
        }
        self.connected.set(false);
    }
}

/// One thing the driver reacts to.
enum Event {
    Command(Command),
    Handshake(Result<Transport>),
    Frame(Option<Result<Message>>),
    ReconnectDue,
    HeartbeatDue,
}

pub(crate) struct Driver {
    config: ChannelConfig,
    url: Url,
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
    commands: mpsc::UnboundedReceiver<Command>,
    generation: u64,
    /// Retries scheduled since the last successful open.
    attempts: u32,
    /// In-flight handshake, if connecting.
    handshake: Option<BoxFuture<'static, Result<Transport>>>,
    /// The live connection, if open.
    transport: Option<Transport>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
    heartbeat_timer: Option<Interval>,
}

impl Driver {
    pub(crate) fn new(
        config: ChannelConfig,
        url: Url,
        connector: Arc<dyn Connector>,
        shared: Arc<Shared>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let (attempts, generation) = {
            let mut inner = shared.inner.lock();
            inner.generation = inner.generation.wrapping_add(1);
            (inner.attempts, inner.generation)
        };
        Self {
            config,
            url,
            connector,
            shared,
            commands,
            generation,
            attempts,
            handshake: None,
            transport: None,
            reconnect_timer: None,
            heartbeat_timer: None,
        }
    }

    /// Run until the owning client is dropped.
    pub(crate) async fn run(mut self) {
        while let Some(event) = self.next_event().await {
            self.handle(event).await;
        }
        tracing::debug!(target: targets::CHANNEL, url = %self.url, "client dropped, stopping driver");
        self.shutdown().await;
    }

    /// Wait for the next event. `None` once the client is gone.
    async fn next_event(&mut self) -> Option<Event> {
        tokio::select! {
            biased;
            command = self.commands.recv() => command.map(Event::Command),
            result = wait_handshake(&mut self.handshake), if self.handshake.is_some() => {
                Some(Event::Handshake(result))
            }
            frame = wait_frame(&mut self.transport), if self.transport.is_some() => {
                Some(Event::Frame(frame))
            }
            () = wait_deadline(&mut self.reconnect_timer), if self.reconnect_timer.is_some() => {
                Some(Event::ReconnectDue)
            }
            () = wait_tick(&mut self.heartbeat_timer), if self.heartbeat_timer.is_some() => {
                Some(Event::HeartbeatDue)
            }
        }
    }

    async fn handle(&mut self, event: Event) {
        match event {
            Event::Command(Command::Connect) => self.connect(),
            Event::Command(Command::Close) => self.shutdown().await,
            Event::Command(Command::Send(text)) => self.send_text(text).await,
            Event::Handshake(result) => {
                self.handshake = None;
                match result {
                    Ok(transport) => self.on_open(transport),
                    Err(e) => {
                        tracing::debug!(target: targets::CHANNEL, url = %self.url, error = %e, "handshake failed");
                        self.on_close();
                    }
                }
            }
            Event::Frame(Some(Ok(message))) => self.on_message(message).await,
            Event::Frame(Some(Err(e))) => {
                tracing::debug!(target: targets::CHANNEL, url = %self.url, error = %e, "transport error");
                self.on_close();
            }
            Event::Frame(None) => {
                tracing::debug!(target: targets::CHANNEL, url = %self.url, "stream ended");
                self.on_close();
            }
            Event::ReconnectDue => {
                self.reconnect_timer = None;
                self.connect();
            }
            Event::HeartbeatDue => self.send_probe().await,
        }
    }

    fn connect(&mut self) {
        if self.transport.is_some() {
            tracing::trace!(target: targets::CHANNEL, "already open, connect ignored");
            return;
        }
        if self.handshake.is_some() {
            tracing::trace!(target: targets::CHANNEL, "handshake in flight, connect ignored");
            return;
        }

        // A manual connect pre-empts a pending retry.
        self.reconnect_timer = None;

        tracing::debug!(target: targets::CHANNEL, url = %self.url, attempts = self.attempts, "connecting");
        self.handshake = Some(self.connector.connect(&self.url));
        self.shared.set_state(ChannelState::Connecting);
    }

    fn on_open(&mut self, transport: Transport) {
        self.transport = Some(transport);
        self.attempts = 0;
        self.shared.set_attempts(0);

        let period = self.config.heartbeat.interval;
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.heartbeat_timer = Some(heartbeat);

        tracing::info!(target: targets::CHANNEL, url = %self.url, "channel open");
        self.shared.set_state(ChannelState::Open);
        self.shared.connected.set(true);
    }

    /// Close handling shared by server close, stream end, transport error
    /// and failed handshakes. Runs at most once per transport because the
    /// transport is dropped here.
    fn on_close(&mut self) {
        self.transport = None;
        self.handshake = None;
        self.heartbeat_timer = None;

        let reconnect = &self.config.reconnect;
        if reconnect.allows_retry(self.attempts) {
            let delay = reconnect.delay_for_attempt(self.attempts);
            self.reconnect_timer = Some(Box::pin(tokio::time::sleep(delay)));
            self.attempts = self.attempts.saturating_add(1);
            self.shared.set_attempts(self.attempts);

            tracing::debug!(
                target: targets::CHANNEL,
                url = %self.url,
                delay_ms = delay.as_millis() as u64,
                attempt = self.attempts,
                "reconnect scheduled"
            );
            self.shared.set_state(ChannelState::Retrying);
        } else {
            self.reconnect_timer = None;
            tracing::warn!(
                target: targets::CHANNEL,
                url = %self.url,
                attempts = self.attempts,
                "reconnect attempts exhausted, giving up"
            );
            self.shared.set_state(ChannelState::GaveUp);
        }
        self.shared.connected.set(false);
    }

    /// Explicit shutdown: cancel both timers, abandon any handshake, close
    /// the transport, never reschedule.
    async fn shutdown(&mut self) {
        self.reconnect_timer = None;
        self.heartbeat_timer = None;
        self.handshake = None;

        if let Some(transport) = self.transport.take() {
            tracing::info!(target: targets::CHANNEL, url = %self.url, "closing channel");
            transport.close().await;
        }
        self.shared.set_state(ChannelState::Idle);
        self.shared.connected.set(false);
    }

    async fn on_message(&mut self, message: Message) {
        match message {
            Message::Text(text) => self.dispatch_text(text.as_str()),
            Message::Binary(data) => {
                tracing::trace!(target: targets::DISPATCH, len = data.len(), "dropping binary frame");
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            Message::Close(frame) => {
                tracing::debug!(target: targets::CHANNEL, url = %self.url, ?frame, "server closed channel");
                // Let the transport deliver its close reply before dropping it.
                if let Some(transport) = self.transport.take() {
                    transport.finish().await;
                }
                self.on_close();
            }
        }
    }

    fn dispatch_text(&self, text: &str) {
        match Inbound::classify(text, &self.config.heartbeat.reply) {
            Inbound::Sentinel => {
                tracing::trace!(target: targets::HEARTBEAT, "heartbeat reply");
            }
            Inbound::Envelope(envelope) => {
                let kind = envelope.kind().to_string();
                let handlers = self.shared.registry.dispatch(envelope);
                tracing::trace!(target: targets::DISPATCH, %kind, handlers, "dispatched");
            }
            Inbound::Malformed(err) => {
                tracing::trace!(target: targets::DISPATCH, error = %err, "dropping malformed frame");
            }
        }
    }

    async fn send_probe(&mut self) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        tracing::trace!(target: targets::HEARTBEAT, "sending heartbeat probe");
        let probe = Message::Text(self.config.heartbeat.probe.clone().into());
        if let Err(e) = transport.send(probe).await {
            tracing::debug!(target: targets::HEARTBEAT, error = %e, "heartbeat probe failed");
            self.on_close();
        }
    }

    async fn send_text(&mut self, text: String) {
        let Some(transport) = self.transport.as_mut() else {
            tracing::trace!(target: targets::CHANNEL, "not open, dropping outbound frame");
            return;
        };
        if let Err(e) = transport.send(Message::Text(text.into())).await {
            tracing::debug!(target: targets::CHANNEL, error = %e, "send failed");
            self.on_close();
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        // Covers a driver that stops without reaching `shutdown`, e.g. when
        // its runtime is dropped. Later sends from the client fail, which
        // tells it to spawn a new driver.
        self.commands.close();
        self.shared.release(self.generation);
    }
}

async fn wait_handshake(
    handshake: &mut Option<BoxFuture<'static, Result<Transport>>>,
) -> Result<Transport> {
    match handshake {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

async fn wait_frame(transport: &mut Option<Transport>) -> Option<Result<Message>> {
    match transport {
        Some(transport) => transport.next().await,
        None => std::future::pending().await,
    }
}

async fn wait_deadline(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn wait_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
