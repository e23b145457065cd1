//! Cached state service — rate-limited access to device power state.
//!
//! Owns the authoritative map of known switch devices, built from the
//! reachability tracker's lifecycle events. Every read goes through a
//! time-boxed, single-flight cache: concurrent readers of one device share a
//! single outstanding fetch, successful writes invalidate the device's cache
//! entry, and a periodic sweep refreshes devices that were recently read so
//! downstream consumers see changes without hammering the hardware.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::TimeDelta;
use futures::FutureExt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use plughub_domain::device::TrackedDevice;
use plughub_domain::error::PlugHubError;
use plughub_domain::event::DeviceEvent;
use plughub_domain::id::DeviceId;
use plughub_domain::state::{StateUpdate, SwitchState, Watts};
use plughub_domain::time::{Timestamp, now};

use crate::ports::{StateNotifier, SwitchClient, SwitchClientFactory};
use crate::services::cache::{CacheEntry, SharedFetch};
use crate::services::naming::NameIndex;

/// Cached state service configuration.
///
/// The cache TTL is deliberately short relative to the poll interval so an
/// externally triggered read and the next poll cycle usually share one fetch.
#[derive(Debug, Clone)]
pub struct StateServiceConfig {
    /// How long a fetched state stays fresh.
    pub cache_ttl: Duration,
    /// Period of the background poll sweep.
    pub poll_interval: Duration,
    /// How recently a device must have been read externally to stay in the
    /// poll sweep.
    pub active_duration: Duration,
}

impl Default for StateServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_millis(2000),
            poll_interval: Duration::from_secs(4),
            active_duration: Duration::from_secs(60),
        }
    }
}

/// Listing row for the hub-integration layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSummary {
    /// Stable device identifier.
    pub id: DeviceId,
    /// Resolved display name.
    pub name: String,
    /// Current reachability.
    pub reachable: bool,
}

/// One known device: its client plus cache and usage bookkeeping.
struct ServiceDevice<C> {
    client: Arc<C>,
    name: String,
    reachable: bool,
    /// Time of the last externally-driven read; poll-driven reads do not
    /// count.
    last_use: Option<Timestamp>,
    cache: Arc<Mutex<CacheEntry>>,
}

/// How a read will be satisfied, decided under the cache lock.
enum FetchPlan {
    Cached(SwitchState),
    Join(SharedFetch),
    Lead { fetch: SharedFetch, epoch: u64 },
}

/// Cached, single-flight access to the power state of known devices.
pub struct SwitchStateService<F: SwitchClientFactory> {
    factory: F,
    names: NameIndex,
    config: StateServiceConfig,
    devices: Mutex<HashMap<DeviceId, ServiceDevice<F::Client>>>,
}

impl<F: SwitchClientFactory> SwitchStateService<F> {
    /// Create a service backed by the given client factory and name index.
    pub fn new(factory: F, names: NameIndex, config: StateServiceConfig) -> Self {
        Self {
            factory,
            names,
            config,
            devices: Mutex::new(HashMap::new()),
        }
    }

    fn devices(&self) -> MutexGuard<'_, HashMap<DeviceId, ServiceDevice<F::Client>>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cache(cache: &Arc<Mutex<CacheEntry>>) -> MutexGuard<'_, CacheEntry> {
        cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a device reported by the reachability tracker.
    ///
    /// A device already known (e.g. rediscovered after a tracker clear) keeps
    /// its client and cache; it is merely marked reachable.
    pub fn add_device(&self, tracked: &TrackedDevice) {
        let mut devices = self.devices();
        if let Some(known) = devices.get_mut(&tracked.id) {
            known.reachable = true;
            return;
        }

        let name = self.names.display_name(tracked);
        tracing::info!(
            id = %tracked.id,
            %name,
            host = %tracked.host,
            "registering switch device"
        );
        devices.insert(
            tracked.id.clone(),
            ServiceDevice {
                client: Arc::new(self.factory.client_for(tracked)),
                name,
                reachable: tracked.reachable,
                last_use: None,
                cache: Arc::new(Mutex::new(CacheEntry::default())),
            },
        );
    }

    /// Flip a known device's reachability flag. The client is kept either
    /// way; the cache is not purged — reads fail fast while unreachable.
    pub fn set_reachable(&self, id: &DeviceId, reachable: bool) {
        if let Some(device) = self.devices().get_mut(id) {
            device.reachable = reachable;
        }
    }

    /// Remove one device. Returns whether it was known.
    pub fn remove_device(&self, id: &DeviceId) -> bool {
        self.devices().remove(id).is_some()
    }

    /// Remove every known device.
    pub fn remove_all(&self) {
        self.devices().clear();
    }

    /// Id, display name, and reachability of every known device, ordered by
    /// id.
    #[must_use]
    pub fn device_summaries(&self) -> Vec<DeviceSummary> {
        let mut summaries: Vec<DeviceSummary> = self
            .devices()
            .iter()
            .map(|(id, device)| DeviceSummary {
                id: id.clone(),
                name: device.name.clone(),
                reachable: device.reachable,
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    /// The client and cache handles for a device, provided it is reachable.
    ///
    /// This is the gate every operation passes before any network IO.
    fn reachable_handles(
        &self,
        id: &DeviceId,
    ) -> Result<(Arc<F::Client>, Arc<Mutex<CacheEntry>>), PlugHubError> {
        let devices = self.devices();
        devices
            .get(id)
            .filter(|device| device.reachable)
            .map(|device| (Arc::clone(&device.client), Arc::clone(&device.cache)))
            .ok_or_else(|| PlugHubError::NotReachable { id: id.clone() })
    }

    fn touch(&self, id: &DeviceId) {
        if let Some(device) = self.devices().get_mut(id) {
            device.last_use = Some(now());
        }
    }

    /// Read a device's state, serving from cache when fresh.
    ///
    /// Concurrent callers for the same device share one outstanding fetch
    /// and observe the same outcome; callers for different devices never
    /// block each other.
    ///
    /// # Errors
    ///
    /// [`PlugHubError::NotReachable`] when the device is unknown or marked
    /// unreachable (checked before any network IO),
    /// [`PlugHubError::InvalidResponse`] when the device answered without the
    /// relay marker, or [`PlugHubError::Transport`] for network failures.
    pub async fn get_state(&self, id: &DeviceId) -> Result<SwitchState, PlugHubError> {
        self.state_with_usage(id, true).await
    }

    async fn state_with_usage(
        &self,
        id: &DeviceId,
        touch_usage: bool,
    ) -> Result<SwitchState, PlugHubError> {
        let (client, cache) = self.reachable_handles(id)?;

        let plan = {
            let mut entry = Self::cache(&cache);
            if let Some(state) = entry.fresh_value(self.config.cache_ttl, Instant::now()) {
                FetchPlan::Cached(state)
            } else if let Some(fetch) = entry.join() {
                FetchPlan::Join(fetch)
            } else {
                let fetch = fetch_state(client, id.clone()).boxed().shared();
                let epoch = entry.lead(fetch.clone());
                FetchPlan::Lead { fetch, epoch }
            }
        };

        let result = match plan {
            FetchPlan::Cached(state) => Ok(state),
            FetchPlan::Join(fetch) => fetch.await,
            FetchPlan::Lead { fetch, epoch } => {
                let result = fetch.await;
                Self::cache(&cache).finish(epoch, &result, Instant::now());
                result
            }
        };

        if touch_usage && result.is_ok() {
            self.touch(id);
        }
        result
    }

    /// Whether the device's relay is on.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`get_state`](Self::get_state).
    pub async fn get_power_state(&self, id: &DeviceId) -> Result<bool, PlugHubError> {
        Ok(self.get_state(id).await?.relay)
    }

    /// The device's momentary power draw, when its firmware reports one.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`get_state`](Self::get_state).
    pub async fn get_power_consumption(
        &self,
        id: &DeviceId,
    ) -> Result<Option<Watts>, PlugHubError> {
        Ok(self.get_state(id).await?.power)
    }

    /// Switch a device's relay on or off.
    ///
    /// On success the device's cache entry is invalidated so the next read
    /// re-fetches. On failure the cache is left untouched and the underlying
    /// error propagates.
    ///
    /// # Errors
    ///
    /// [`PlugHubError::NotReachable`] for unknown/unreachable devices, or
    /// the client's own failure.
    pub async fn set_power_state(&self, id: &DeviceId, on: bool) -> Result<(), PlugHubError> {
        let (client, cache) = self.reachable_handles(id)?;
        client.set_relay(on).await?;
        self.touch(id);
        Self::cache(&cache).invalidate();
        Ok(())
    }

    /// Toggle a device's relay.
    ///
    /// # Errors
    ///
    /// Same contract as [`set_power_state`](Self::set_power_state).
    pub async fn toggle(&self, id: &DeviceId) -> Result<(), PlugHubError> {
        let (client, cache) = self.reachable_handles(id)?;
        client.toggle().await?;
        self.touch(id);
        Self::cache(&cache).invalidate();
        Ok(())
    }

    /// Reachable devices whose last external read falls within the active
    /// window — the ones worth polling.
    fn poll_candidates(&self, now: Timestamp) -> Vec<DeviceId> {
        let window = TimeDelta::from_std(self.config.active_duration).unwrap_or(TimeDelta::MAX);
        self.devices()
            .iter()
            .filter(|(_, device)| {
                device.reachable
                    && device
                        .last_use
                        .is_some_and(|last_use| now - last_use <= window)
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Refresh every actively-used reachable device and hand the results to
    /// the notifier.
    ///
    /// Poll-driven reads do not reset the usage window. The relay position
    /// is always reported; power consumption only when the firmware supplied
    /// one — no fallback value is invented. A failing device is logged and
    /// skipped, the sweep continues.
    pub async fn poll_sweep<N: StateNotifier>(&self, notifier: &N) {
        for id in self.poll_candidates(now()) {
            match self.state_with_usage(&id, false).await {
                Ok(state) => {
                    notifier
                        .notify(StateUpdate::power_state(id.clone(), state.relay))
                        .await;
                    if let Some(watts) = state.power {
                        notifier
                            .notify(StateUpdate::power_consumption(id.clone(), watts))
                            .await;
                    }
                }
                Err(error) => {
                    tracing::warn!(id = %id, %error, "poll fetch failed");
                }
            }
        }
    }
}

impl<F> SwitchStateService<F>
where
    F: SwitchClientFactory + Send + Sync + 'static,
{
    /// Spawn the task that keeps the device map in sync with the
    /// reachability tracker's event bus.
    pub fn spawn_event_loop(
        self: Arc<Self>,
        mut events: broadcast::Receiver<DeviceEvent>,
    ) -> JoinHandle<()> {
        let service = self;
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(DeviceEvent::Discovered(device)) => service.add_device(&device),
                    Ok(DeviceEvent::ReachableAgain(device)) => {
                        service.set_reachable(&device.id, true);
                    }
                    Ok(DeviceEvent::Unreachable(device)) => {
                        service.set_reachable(&device.id, false);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "device event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Spawn the background poll sweep.
    pub fn spawn_polling<N: StateNotifier + 'static>(self: Arc<Self>, notifier: N) -> JoinHandle<()> {
        let service = self;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(service.config.poll_interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                service.poll_sweep(&notifier).await;
            }
        })
    }
}

/// The actual network fetch plus validation, shaped for sharing between
/// concurrent callers.
async fn fetch_state<C: SwitchClient>(
    client: Arc<C>,
    id: DeviceId,
) -> Result<SwitchState, PlugHubError> {
    let report = client.report().await?;
    SwitchState::try_from_report(&id, report)
}
