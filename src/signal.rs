//! In-process "authentication state changed" signal.
//!
//! The signal carries no payload. Whoever receives it re-reads the session store,
//! so a handler never acts on a stale value when several writers fire in a row.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

type Handler = Arc<dyn Fn() + Send + Sync>;

/// Handle returned by [`AuthSignal::subscribe`], used to unsubscribe again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Handler)>,
}

/// Broadcast channel for auth-state changes. Clones share the same subscribers.
#[derive(Clone, Default)]
pub struct AuthSignal {
    subscribers: Arc<Mutex<Subscribers>>,
}

impl AuthSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut subscribers = self.lock();
        let id = SubscriptionId(subscribers.next_id);
        subscribers.next_id += 1;
        subscribers.handlers.push((id, Arc::new(handler)));
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.handlers.len();
        subscribers.handlers.retain(|(existing, _)| *existing != id);
        subscribers.handlers.len() != before
    }

    /// Invokes every current subscriber once, in subscription order.
    ///
    /// The subscriber list is copied before the first call, so handlers may
    /// subscribe or unsubscribe; the change applies from the next announcement.
    pub fn announce(&self) {
        let handlers: Vec<Handler> = self
            .lock()
            .handlers
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        trace!("Announcing auth change to {} subscribers", handlers.len());
        for handler in handlers {
            handler();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().handlers.len()
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for AuthSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSignal")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_announce_calls_each_subscriber_once_in_order() {
        let signal = AuthSignal::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for name in ["navbar", "bootstrap", "profile"] {
            let calls = calls.clone();
            signal.subscribe(move || calls.lock().unwrap().push(name));
        }

        signal.announce();
        assert_eq!(*calls.lock().unwrap(), vec!["navbar", "bootstrap", "profile"]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let signal = AuthSignal::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        let id = signal.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        signal.announce();
        assert!(signal.unsubscribe(id));
        assert!(!signal.unsubscribe(id));
        signal.announce();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn test_clones_share_subscribers() {
        let signal = AuthSignal::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        signal.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        signal.clone().announce();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_may_subscribe_during_announce() {
        let signal = AuthSignal::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let inner_signal = signal.clone();
        let counter = hits.clone();
        signal.subscribe(move || {
            let counter = counter.clone();
            inner_signal.subscribe(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        });

        signal.announce();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(signal.subscriber_count(), 2);

        signal.announce();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
