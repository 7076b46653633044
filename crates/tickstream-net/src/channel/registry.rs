//! Per-type handler registry.
//!
//! Each message type maps to its own [`Signal<Envelope>`]. Entries are
//! created on first subscription and live as long as the registry; they are
//! never cleared by disconnects or reconnects, only by disposing the
//! [`Subscription`] returned from [`HandlerRegistry::on`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tickstream_core::logging::targets;
use tickstream_core::{ConnectionId, Signal, Slot};

use super::envelope::Envelope;

/// A handler for envelopes of one type.
///
/// Handlers are compared by `Arc` identity: registering a clone of the same
/// `Handler` twice for one type stores it once.
pub type Handler = Slot<Envelope>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Envelope) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Mapping from message type to the handlers interested in it.
#[derive(Default)]
pub struct HandlerRegistry {
    signals: Mutex<HashMap<String, Arc<Signal<Envelope>>>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for envelopes whose `type` is `kind`.
    ///
    /// Returns a disposer for exactly this handler/type pair.
    pub fn on(&self, kind: impl Into<String>, handler: Handler) -> Subscription {
        let kind = kind.into();
        let signal = self
            .signals
            .lock()
            .entry(kind.clone())
            .or_insert_with(|| Arc::new(Signal::new()))
            .clone();
        let id = signal.connect_slot(handler);
        Subscription {
            kind,
            signal: Arc::downgrade(&signal),
            id,
        }
    }

    /// Invoke every handler registered for the envelope's type, in
    /// registration order.
    ///
    /// Returns the number of handlers invoked. Unknown types are a no-op.
    pub fn dispatch(&self, envelope: Envelope) -> usize {
        let signal = self.signals.lock().get(envelope.kind()).cloned();
        let Some(signal) = signal else {
            tracing::trace!(target: targets::DISPATCH, kind = envelope.kind(), "no handlers for type");
            return 0;
        };
        let count = signal.connection_count();
        signal.emit(envelope);
        count
    }

    /// Number of handlers currently registered for `kind`.
    pub fn handler_count(&self, kind: &str) -> usize {
        self.signals
            .lock()
            .get(kind)
            .map_or(0, |signal| signal.connection_count())
    }

    /// Every type that has ever been subscribed to.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.signals.lock().keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Disposer returned by [`HandlerRegistry::on`].
///
/// Dropping a `Subscription` does **not** unsubscribe; call
/// [`dispose`](Self::dispose), or convert it with
/// [`into_guard`](Self::into_guard) for drop-based cleanup.
#[derive(Clone)]
pub struct Subscription {
    kind: String,
    signal: Weak<Signal<Envelope>>,
    id: ConnectionId,
}

impl Subscription {
    /// Remove this handler from this type. Calling it again is harmless.
    ///
    /// Returns `true` if the handler was still registered.
    pub fn dispose(&self) -> bool {
        match self.signal.upgrade() {
            Some(signal) => signal.disconnect(self.id),
            None => false,
        }
    }

    /// Whether the handler is still registered.
    pub fn is_active(&self) -> bool {
        self.signal
            .upgrade()
            .is_some_and(|signal| signal.is_connected(self.id))
    }

    /// The message type this subscription is for.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Dispose automatically when the returned guard is dropped.
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { subscription: self }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .finish()
    }
}

/// RAII form of a [`Subscription`].
#[must_use = "dropping the guard unsubscribes immediately"]
#[derive(Debug)]
pub struct SubscriptionGuard {
    subscription: Subscription,
}

impl SubscriptionGuard {
    /// The guarded subscription.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.subscription.dispose();
    }
}
