//! Bookkeeping for the single in-flight refresh shared by concurrent requests.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, Shared};

use super::error::ClientError;
use crate::models::TokenGrant;

pub(crate) type RefreshOutcome = Result<TokenGrant, ClientError>;
pub(crate) type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Holds the refresh currently in progress, if any.
///
/// Each refresh gets a generation number so a late release only clears the
/// slot it was issued for, never a newer refresh started after it finished.
#[derive(Default)]
pub(crate) struct InflightRefresh {
    slot: Mutex<Slot>,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    current: Option<SharedRefresh>,
}

/// Whether the caller started the refresh or joined one already running.
pub(crate) enum Joined {
    Started(SharedRefresh),
    Waiting(SharedRefresh),
}

/// Frees the slot of one generation when dropped.
///
/// Owned by the task driving the refresh, so the slot is released when that
/// task completes, panics or is torn down with the runtime. Callers awaiting
/// the shared outcome hold nothing that keeps the slot occupied.
pub(crate) struct SlotRelease {
    inflight: Arc<InflightRefresh>,
    generation: u64,
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        self.inflight.finish(self.generation);
    }
}

impl InflightRefresh {
    /// Joins the running refresh, or installs the one produced by `start`.
    ///
    /// `start` receives the release guard for the new generation and must keep
    /// it alive until the refresh has produced its outcome.
    pub fn join_or_start<F>(self: &Arc<Self>, start: F) -> Joined
    where
        F: FnOnce(SlotRelease) -> SharedRefresh,
    {
        let mut slot = self.lock();
        if let Some(current) = slot.current.as_ref() {
            return Joined::Waiting(current.clone());
        }
        slot.generation += 1;
        let release = SlotRelease {
            inflight: self.clone(),
            generation: slot.generation,
        };
        let refresh = start(release);
        slot.current = Some(refresh.clone());
        Joined::Started(refresh)
    }

    fn finish(&self, generation: u64) {
        let mut slot = self.lock();
        if slot.generation == generation {
            slot.current = None;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.lock().current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn ready(token: &str, release: SlotRelease) -> SharedRefresh {
        let grant = TokenGrant {
            access_token: token.to_string(),
            email: None,
        };
        async move {
            drop(release);
            Ok(grant)
        }
        .boxed()
        .shared()
    }

    #[tokio::test]
    async fn test_second_caller_joins_running_refresh() {
        let inflight = Arc::new(InflightRefresh::default());

        let first = inflight.join_or_start(|release| ready("a", release));
        let second = inflight.join_or_start(|release| ready("b", release));

        let (Joined::Started(f1), Joined::Waiting(f2)) = (first, second) else {
            panic!("expected started then waiting");
        };
        assert_eq!(f1.await.unwrap().access_token, "a");
        assert_eq!(f2.await.unwrap().access_token, "a");
        assert!(!inflight.is_running());
    }

    #[tokio::test]
    async fn test_release_only_clears_own_generation() {
        let inflight = Arc::new(InflightRefresh::default());

        let mut stale = None;
        let Joined::Started(_) = inflight.join_or_start(|release| {
            stale = Some(release);
            futures::future::pending().boxed().shared()
        }) else {
            panic!("expected a fresh refresh");
        };
        assert!(inflight.is_running());

        // The first generation is released, a second one starts.
        drop(stale.take());
        assert!(!inflight.is_running());
        let mut current = None;
        let Joined::Started(_) = inflight.join_or_start(|release| {
            current = Some(release);
            futures::future::pending().boxed().shared()
        }) else {
            panic!("expected a fresh refresh");
        };

        // Releasing the old generation again must not drop the new one.
        inflight.finish(1);
        assert!(inflight.is_running());
        drop(current);
        assert!(!inflight.is_running());
    }

    #[tokio::test]
    async fn test_dropping_a_joined_future_keeps_the_slot_owned_by_its_guard() {
        let inflight = Arc::new(InflightRefresh::default());

        let mut guard = None;
        let Joined::Started(refresh) = inflight.join_or_start(|release| {
            guard = Some(release);
            futures::future::pending().boxed().shared()
        }) else {
            panic!("expected a fresh refresh");
        };
        drop(refresh);
        assert!(inflight.is_running());

        drop(guard);
        assert!(!inflight.is_running());
    }
}
