//! Signal/slot system for tickstream.
//!
//! A [`Signal<Args>`] is an ordered set of slots (callbacks). Emitting the
//! signal invokes every connected slot synchronously, in the order the slots
//! were connected.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - The signal itself
//! - [`Slot<Args>`] - A shareable callback; its `Arc` identity is what makes
//!   a slot "the same" when connected twice
//! - [`ConnectionId`] - Returned when connecting, used to disconnect
//!
//! # Set Semantics
//!
//! Connecting a [`Slot`] that is already connected (same `Arc` allocation)
//! does not add a second entry; the existing [`ConnectionId`] is returned.
//! Closures passed to [`Signal::connect`] are always new slots.
//!
//! # Re-entrancy
//!
//! Slots run without the connection lock held, so a slot may connect or
//! disconnect slots on the signal that is emitting it. Such changes apply to
//! the next emission; the current emission always runs over the snapshot
//! taken when it started.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tickstream_core::{Signal, Slot};
//!
//! let signal = Signal::<String>::new();
//! let slot: Slot<String> = Arc::new(|text: &String| println!("got {text}"));
//!
//! let first = signal.connect_slot(slot.clone());
//! let second = signal.connect_slot(slot);
//! assert_eq!(first, second);
//! assert_eq!(signal.connection_count(), 1);
//!
//! signal.emit("hello".to_string());
//! assert!(signal.disconnect(first));
//! assert!(!signal.disconnect(first));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::logging::targets;

/// A shareable slot callback.
pub type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A unique identifier for a signal-slot connection.
///
/// IDs are never reused by the signal that issued them, so disconnecting a
/// stale ID is always a harmless no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// The raw numeric value of this ID.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Internal storage for a single connection.
struct Connection<Args> {
    id: ConnectionId,
    slot: Slot<Args>,
}

/// Compare two slots by allocation, ignoring vtable pointers.
fn same_slot<Args>(a: &Slot<Args>, b: &Slot<Args>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// An ordered set of slots invoked on [`emit`](Self::emit).
///
/// `Signal<Args>` is `Send + Sync`; slots must be `Send + Sync` as well.
pub struct Signal<Args> {
    /// Active connections, in connection order.
    connections: Mutex<Vec<Connection<Args>>>,
    /// Source of connection IDs.
    next_id: AtomicU64,
}

impl<Args> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Connect a closure to this signal.
    ///
    /// Every call creates a new slot, so the same closure body connected twice
    /// is invoked twice. Use [`connect_slot`](Self::connect_slot) when the
    /// caller needs set semantics.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connect_slot(Arc::new(slot))
    }

    /// Connect a shared slot, returning the existing ID if this exact slot
    /// (same `Arc` allocation) is already connected.
    pub fn connect_slot(&self, slot: Slot<Args>) -> ConnectionId {
        let mut connections = self.connections.lock();
        if let Some(existing) = connections.iter().find(|c| same_slot(&c.slot, &slot)) {
            return existing.id;
        }
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        connections.push(Connection { id, slot });
        id
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed, `false` if it
    /// was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.lock();
        match connections.iter().position(|c| c.id == id) {
            Some(index) => {
                connections.remove(index);
                true
            }
            None => false,
        }
    }

    /// Check whether a connection is still active.
    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.connections.lock().iter().any(|c| c.id == id)
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Emit the signal, invoking all connected slots in connection order.
    ///
    /// Slots are called on the current thread. A slow slot delays the ones
    /// after it.
    #[tracing::instrument(skip_all, target = "tickstream_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        let slots: Vec<Slot<Args>> = self
            .connections
            .lock()
            .iter()
            .map(|c| c.slot.clone())
            .collect();
        tracing::trace!(target: targets::SIGNAL, connection_count = slots.len(), "emitting signal");

        for slot in &slots {
            slot(&args);
        }
    }
}

impl<Args> fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("connection_count", &self.connection_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_connect_emit() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(42);
        signal.emit(100);

        assert_eq!(*received.lock(), vec![42, 100]);
    }

    #[test]
    fn test_emit_follows_connection_order() {
        let signal = Signal::<()>::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut ids = Vec::new();
        for name in ["a", "b", "c", "d"] {
            let order = order.clone();
            ids.push(signal.connect(move |_| order.lock().push(name)));
        }
        // Removing from the middle must not reorder the rest.
        signal.disconnect(ids[1]);
        let order_clone = order.clone();
        signal.connect(move |_| order_clone.lock().push("e"));

        signal.emit(());
        assert_eq!(*order.lock(), vec!["a", "c", "d", "e"]);
    }

    #[test]
    fn test_same_slot_connected_once() {
        let signal = Signal::<i32>::new();
        let calls = Arc::new(AtomicU64::new(0));

        let calls_clone = calls.clone();
        let slot: Slot<i32> = Arc::new(move |_: &i32| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        let first = signal.connect_slot(slot.clone());
        let second = signal.connect_slot(slot.clone());
        assert_eq!(first, second);
        assert_eq!(signal.connection_count(), 1);

        signal.emit(7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_equal_closures_are_distinct_slots() {
        let signal = Signal::<()>::new();
        signal.connect(|_| {});
        signal.connect(|_| {});
        assert_eq!(signal.connection_count(), 2);
    }

    #[test]
    fn test_signal_disconnect_is_idempotent() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        let conn_id = signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(1);
        assert!(signal.disconnect(conn_id));
        assert!(!signal.disconnect(conn_id));
        assert!(!signal.is_connected(conn_id));
        signal.emit(2);

        assert_eq!(*received.lock(), vec![1]);
    }

    #[test]
    fn test_slot_can_disconnect_itself_during_emit() {
        let signal = Arc::new(Signal::<i32>::new());
        let received = Arc::new(Mutex::new(Vec::new()));
        let own_id = Arc::new(Mutex::new(None));

        let signal_clone = signal.clone();
        let received_clone = received.clone();
        let own_id_clone = own_id.clone();
        let id = signal.connect(move |&value| {
            received_clone.lock().push(value);
            if let Some(id) = *own_id_clone.lock() {
                signal_clone.disconnect(id);
            }
        });
        *own_id.lock() = Some(id);

        signal.emit(1);
        signal.emit(2);

        assert_eq!(*received.lock(), vec![1]);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_emit_from_multiple_threads() {
        let signal = Arc::new(Signal::<usize>::new());
        let total = Arc::new(AtomicU64::new(0));

        let total_clone = total.clone();
        signal.connect(move |&n| {
            total_clone.fetch_add(n as u64, Ordering::SeqCst);
        });

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let signal = signal.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        signal.emit(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(total.load(Ordering::SeqCst), 400);
    }
}
