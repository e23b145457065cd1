//! Per-device state cache entry with a shared in-flight fetch.
//!
//! One [`CacheEntry`] exists per service device. Concurrent readers that miss
//! the cache collapse onto one shared fetch future; the `epoch` counter makes
//! write-through invalidation race-safe — a fetch that was already in flight
//! when a write invalidated the entry finishes normally for its waiters but
//! can no longer populate the cache.

use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use tokio::time::Instant;

use plughub_domain::error::PlugHubError;
use plughub_domain::state::SwitchState;

/// A fetch shared by every caller that joined it.
pub(crate) type SharedFetch = Shared<BoxFuture<'static, Result<SwitchState, PlugHubError>>>;

/// Cached state for one device.
#[derive(Default)]
pub(crate) struct CacheEntry {
    value: Option<SwitchState>,
    fetched_at: Option<Instant>,
    in_flight: Option<SharedFetch>,
    epoch: u64,
}

impl CacheEntry {
    /// The cached value, when younger than `ttl`.
    pub(crate) fn fresh_value(&self, ttl: Duration, now: Instant) -> Option<SwitchState> {
        let age_ok = self
            .fetched_at
            .is_some_and(|at| now.duration_since(at) < ttl);
        if age_ok { self.value } else { None }
    }

    /// The fetch currently in flight, if any — joiners share its outcome.
    pub(crate) fn join(&self) -> Option<SharedFetch> {
        self.in_flight.clone()
    }

    /// Install a new in-flight fetch; returns the epoch the leader must
    /// present back in [`finish`](Self::finish).
    pub(crate) fn lead(&mut self, fetch: SharedFetch) -> u64 {
        self.in_flight = Some(fetch);
        self.epoch
    }

    /// Complete the in-flight fetch installed at `epoch`.
    ///
    /// The result only populates the cache when no invalidation happened in
    /// the meantime; the in-flight slot clears either way.
    pub(crate) fn finish(
        &mut self,
        epoch: u64,
        result: &Result<SwitchState, PlugHubError>,
        now: Instant,
    ) {
        self.in_flight = None;
        if self.epoch != epoch {
            return;
        }
        if let Ok(state) = result {
            self.value = Some(*state);
            self.fetched_at = Some(now);
        }
    }

    /// Drop the cached value and fence off any fetch still in flight.
    pub(crate) fn invalidate(&mut self) {
        self.value = None;
        self.fetched_at = None;
        self.epoch += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn state(relay: bool) -> SwitchState {
        SwitchState { relay, power: None }
    }

    fn shared_ok(relay: bool) -> SharedFetch {
        async move { Ok(state(relay)) }.boxed().shared()
    }

    #[tokio::test]
    async fn should_serve_value_within_ttl() {
        let mut entry = CacheEntry::default();
        let start = Instant::now();
        let epoch = entry.lead(shared_ok(true));
        entry.finish(epoch, &Ok(state(true)), start);

        let hit = entry.fresh_value(Duration::from_secs(2), start + Duration::from_secs(1));
        assert_eq!(hit, Some(state(true)));
    }

    #[tokio::test]
    async fn should_expire_value_after_ttl() {
        let mut entry = CacheEntry::default();
        let start = Instant::now();
        let epoch = entry.lead(shared_ok(true));
        entry.finish(epoch, &Ok(state(true)), start);

        let hit = entry.fresh_value(Duration::from_secs(2), start + Duration::from_secs(2));
        assert_eq!(hit, None);
    }

    #[tokio::test]
    async fn should_expose_in_flight_fetch_to_joiners() {
        let mut entry = CacheEntry::default();
        assert!(entry.join().is_none());

        let epoch = entry.lead(shared_ok(true));
        assert!(entry.join().is_some());

        entry.finish(epoch, &Ok(state(true)), Instant::now());
        assert!(entry.join().is_none());
    }

    #[tokio::test]
    async fn should_not_store_result_after_invalidation() {
        let mut entry = CacheEntry::default();
        let epoch = entry.lead(shared_ok(true));

        // a write invalidates while the fetch is still in flight
        entry.invalidate();
        entry.finish(epoch, &Ok(state(true)), Instant::now());

        assert_eq!(entry.fresh_value(Duration::from_secs(2), Instant::now()), None);
        assert!(entry.join().is_none());
    }

    #[tokio::test]
    async fn should_not_store_failed_results() {
        let mut entry = CacheEntry::default();
        let epoch = entry.lead(shared_ok(true));
        let failure = Err(PlugHubError::transport(std::io::Error::other("down")));
        entry.finish(epoch, &failure, Instant::now());

        assert_eq!(entry.fresh_value(Duration::from_secs(2), Instant::now()), None);
    }
}
