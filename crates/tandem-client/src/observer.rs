//! Observer registry.
//!
//! Callbacks are keyed by a monotonically increasing id so a subscription can
//! be removed without comparing closures. Notification order is subscription
//! order.

use std::fmt;

/// Boxed observer callback.
type Callback<T> = Box<dyn FnMut(&T) + Send>;

/// Which registry a [`Subscription`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Channel {
    Flags,
    Readiness,
    Coordinator,
    Transition,
}

/// Handle returned by the `subscribe_*` methods, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub(crate) channel: Channel,
    pub(crate) id: u64,
}

/// Ordered set of callbacks for one event type.
pub struct Observers<T> {
    next_id: u64,
    callbacks: Vec<(u64, Callback<T>)>,
}

impl<T> Observers<T> {
    /// Empty registry.
    pub fn new() -> Self {
        Self { next_id: 0, callbacks: Vec::new() }
    }

    /// Register `callback` and return its id.
    pub fn subscribe(&mut self, callback: impl FnMut(&T) + Send + 'static) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Remove the callback registered under `id`. Returns whether it existed.
    pub fn unsubscribe(&mut self, id: u64) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(existing, _)| *existing != id);
        self.callbacks.len() != before
    }

    /// Invoke every callback with `event`.
    pub fn notify(&mut self, event: &T) {
        for (_, callback) in &mut self.callbacks {
            callback(event);
        }
    }

    /// Drop every callback. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let released = self.callbacks.len();
        self.callbacks.clear();
        released
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Whether no callback is registered.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Observers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers").field("len", &self.callbacks.len()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl FnMut(&u32) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |v: &u32| sink.lock().unwrap().push(*v))
    }

    #[test]
    fn notifies_in_subscription_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut observers = Observers::new();
        for tag in 0..3u32 {
            let order = Arc::clone(&order);
            observers.subscribe(move |_: &()| order.lock().unwrap().push(tag));
        }

        observers.notify(&());

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn unsubscribed_callback_stops_firing() {
        let (seen, callback) = recorder();
        let mut observers = Observers::new();
        let id = observers.subscribe(callback);

        observers.notify(&1);
        assert!(observers.unsubscribe(id));
        observers.notify(&2);

        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert!(!observers.unsubscribe(id));
    }

    #[test]
    fn ids_are_not_reused() {
        let mut observers: Observers<u32> = Observers::new();
        let first = observers.subscribe(|_| {});
        observers.unsubscribe(first);
        let second = observers.subscribe(|_| {});

        assert_ne!(first, second);
    }

    #[test]
    fn clear_reports_released() {
        let mut observers: Observers<u32> = Observers::new();
        observers.subscribe(|_| {});
        observers.subscribe(|_| {});

        assert_eq!(observers.clear(), 2);
        assert!(observers.is_empty());
    }
}
