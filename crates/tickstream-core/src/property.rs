//! Properties with change detection.
//!
//! - [`Property<T>`]: a value cell whose setter reports whether the value
//!   actually changed
//! - [`Observable<T>`]: a property that emits a [`Signal`] whenever it
//!   changes; this is what the channel client uses for its connectivity
//!   status and lifecycle state
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use tickstream_core::Observable;
//!
//! let status = Observable::new(false);
//! let flips = Arc::new(AtomicUsize::new(0));
//!
//! let flips_clone = flips.clone();
//! status.changed().connect(move |_| {
//!     flips_clone.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! status.set(true);
//! status.set(true);
//! status.set(false);
//! assert_eq!(flips.load(Ordering::SeqCst), 2);
//! ```

use std::fmt;

use parking_lot::RwLock;

use crate::signal::Signal;

/// A value cell that tracks changes.
///
/// `set()` compares the new value with the current one and reports whether
/// anything changed, so callers only notify when there is something to say.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Get a copy of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Set the value, returning `true` if it changed.
    pub fn set(&self, value: T) -> bool {
        self.replace(value).is_some()
    }

    /// Set the value, returning the previous one if it changed.
    pub fn replace(&self, value: T) -> Option<T> {
        let mut current = self.value.write();
        if *current != value {
            Some(std::mem::replace(&mut *current, value))
        } else {
            None
        }
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property").field("value", &self.get()).finish()
    }
}

/// A property paired with a change signal.
///
/// Readers call [`get`](Self::get) or connect to [`changed`](Self::changed).
/// The signal fires after the new value is stored, with the new value, and
/// only when the value actually changed.
pub struct Observable<T> {
    value: Property<T>,
    changed: Signal<T>,
}

impl<T: Clone + PartialEq> Observable<T> {
    /// Create an observable with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: Property::new(value),
            changed: Signal::new(),
        }
    }

    /// Get a copy of the current value.
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Store a new value, emitting [`changed`](Self::changed) if it differs.
    ///
    /// Returns `true` if the value changed.
    pub fn set(&self, value: T) -> bool {
        if self.value.set(value.clone()) {
            self.changed.emit(value);
            true
        } else {
            false
        }
    }

    /// The signal emitted with each new value.
    pub fn changed(&self) -> &Signal<T> {
        &self.changed
    }
}

impl<T: Clone + PartialEq + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.get())
            .field("subscribers", &self.changed.connection_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_property_set_detects_change() {
        let prop = Property::new(10);

        assert!(!prop.set(10));
        assert_eq!(prop.get(), 10);

        assert!(prop.set(20));
        assert_eq!(prop.get(), 20);
    }

    #[test]
    fn test_property_replace_returns_old_value() {
        let prop = Property::new("ws".to_string());

        assert!(prop.replace("ws".to_string()).is_none());
        assert_eq!(prop.replace("wss".to_string()), Some("ws".to_string()));
        assert_eq!(prop.get(), "wss");
    }

    #[test]
    fn test_observable_emits_only_on_change() {
        let status = Observable::new(false);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = seen.clone();
        status.changed().connect(move |&value| seen_clone.lock().push(value));

        assert!(status.set(true));
        assert!(!status.set(true));
        assert!(status.set(false));
        assert!(!status.set(false));

        assert_eq!(*seen.lock(), vec![true, false]);
        assert!(!status.get());
    }

    #[test]
    fn test_observable_value_is_stored_before_emit() {
        let status = Arc::new(Observable::new(0u32));
        let observed = Arc::new(Mutex::new(None));

        let status_clone = status.clone();
        let observed_clone = observed.clone();
        status.changed().connect(move |_| {
            *observed_clone.lock() = Some(status_clone.get());
        });

        status.set(5);
        assert_eq!(*observed.lock(), Some(5));
    }
}
