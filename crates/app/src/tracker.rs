//! Reachability tracker — the discovery controller.
//!
//! Consumes the merged discovery stream, applies the device-type filter,
//! deduplicates repeat sightings, and runs the timeout sweep that flips
//! silent devices to unreachable. Lifecycle transitions are published on the
//! device event bus.
//!
//! Per-device state machine: `Unknown → Reachable` on the first passing
//! sighting, `Reachable → Unreachable` when no sighting arrives within the
//! timeout, `Unreachable → Reachable` on the next passing sighting. Repeat
//! sightings while reachable are idempotent refreshes and emit nothing.
//! `Unknown` is only re-entered through [`ReachabilityTracker::clear`].

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::TimeDelta;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use plughub_domain::device::{DeviceType, DiscoverySighting, TrackedDevice};
use plughub_domain::event::{DeviceEvent, DiscoveryEvent};
use plughub_domain::id::DeviceId;
use plughub_domain::time::{Timestamp, now};

use crate::event_bus::DeviceEventBus;

/// Fixed period of the background timeout sweep.
pub const SWEEP_PERIOD: Duration = Duration::from_secs(1);

/// Capacity of the device event bus.
const EVENT_BUS_CAPACITY: usize = 256;

/// Tracker configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// How long a device may stay silent before it is marked unreachable.
    pub reachable_timeout: Duration,
    /// Device types admitted by the sighting filter.
    pub device_type_filter: HashSet<DeviceType>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            reachable_timeout: Duration::from_secs(30),
            device_type_filter: DeviceType::ALL.into_iter().collect(),
        }
    }
}

/// Tracks per-device liveness from the merged discovery stream.
pub struct ReachabilityTracker {
    config: TrackerConfig,
    devices: Mutex<HashMap<DeviceId, TrackedDevice>>,
    bus: DeviceEventBus,
}

impl ReachabilityTracker {
    /// Create a tracker with the given configuration.
    #[must_use]
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            devices: Mutex::new(HashMap::new()),
            bus: DeviceEventBus::new(EVENT_BUS_CAPACITY),
        }
    }

    /// Subscribe to device lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.bus.subscribe()
    }

    fn devices(&self) -> MutexGuard<'_, HashMap<DeviceId, TrackedDevice>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of one tracked device.
    #[must_use]
    pub fn get(&self, id: &DeviceId) -> Option<TrackedDevice> {
        self.devices().get(id).cloned()
    }

    /// Snapshot of all tracked devices.
    #[must_use]
    pub fn get_all(&self) -> Vec<TrackedDevice> {
        self.devices().values().cloned().collect()
    }

    /// Drop every tracked device, forcing a fresh discovery epoch.
    pub fn clear(&self) {
        self.devices().clear();
    }

    /// Process one sighting from the merged stream.
    pub fn handle_sighting(&self, sighting: DiscoverySighting) {
        let passing = sighting
            .device_type
            .filter(|t| self.config.device_type_filter.contains(t));
        let Some(device_type) = passing else {
            tracing::debug!(
                id = %sighting.id,
                device_type = ?sighting.device_type,
                "sighting dropped by device-type filter"
            );
            self.bus.publish(DeviceEvent::Filtered(sighting));
            return;
        };

        let event = {
            let mut devices = self.devices();
            match devices.entry(sighting.id.clone()) {
                Entry::Vacant(slot) => {
                    let device = TrackedDevice::from_sighting(&sighting, device_type);
                    slot.insert(device.clone());
                    Some(DeviceEvent::Discovered(device))
                }
                Entry::Occupied(mut slot) => {
                    let known = slot.get_mut();
                    known.refresh(&sighting);
                    if known.reachable {
                        // idempotent refresh, no event
                        None
                    } else {
                        known.reachable = true;
                        Some(DeviceEvent::ReachableAgain(known.clone()))
                    }
                }
            }
        };

        if let Some(event) = event {
            match &event {
                DeviceEvent::Discovered(device) => {
                    tracing::info!(
                        id = %device.id,
                        device_type = %device.device_type,
                        host = %device.host,
                        "discovered device"
                    );
                }
                DeviceEvent::ReachableAgain(device) => {
                    tracing::info!(id = %device.id, "device reachable again");
                }
                _ => {}
            }
            self.bus.publish(event);
        }
    }

    /// Run one timeout sweep against the given time.
    ///
    /// Every reachable device whose last activity is older than the
    /// configured timeout flips to unreachable and is announced exactly once.
    pub fn sweep(&self, now: Timestamp) {
        let timeout =
            TimeDelta::from_std(self.config.reachable_timeout).unwrap_or(TimeDelta::MAX);

        let timed_out: Vec<TrackedDevice> = {
            let mut devices = self.devices();
            let mut flipped = Vec::new();
            for device in devices.values_mut() {
                if device.reachable && now - device.last_activity > timeout {
                    device.reachable = false;
                    flipped.push(device.clone());
                }
            }
            flipped
        };

        for device in timed_out {
            tracing::info!(id = %device.id, "device no longer reachable");
            self.bus.publish(DeviceEvent::Unreachable(device));
        }
    }

    fn handle_event(&self, event: DiscoveryEvent) {
        match event {
            DiscoveryEvent::Sighting(sighting) => self.handle_sighting(sighting),
            DiscoveryEvent::Started { source } => {
                tracing::info!(source, "discovery started");
                self.bus.publish(DeviceEvent::DiscoveryStarted);
            }
            DiscoveryEvent::Stopped { source } => {
                tracing::info!(source, "discovery stopped");
                self.bus.publish(DeviceEvent::DiscoveryStopped);
            }
            DiscoveryEvent::Error { source, error } => {
                tracing::error!(source, %error, "discovery source failed");
                self.bus.publish(DeviceEvent::DiscoveryError(error));
            }
        }
    }

    /// Spawn the tracker's background task.
    ///
    /// The task interleaves sighting handling with the fixed one-second
    /// timeout sweep. The sweep keeps running for the lifetime of the
    /// tracker, whether or not discovery is currently delivering events.
    pub fn spawn(self: Arc<Self>, mut events: mpsc::Receiver<DiscoveryEvent>) -> JoinHandle<()> {
        let tracker = self;
        tokio::spawn(async move {
            let mut sweep = tokio::time::interval(SWEEP_PERIOD);
            sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut stream_open = true;
            loop {
                tokio::select! {
                    // drain pending sightings before sweeping, so a sighting
                    // arriving in the same tick keeps its device reachable
                    biased;
                    maybe = events.recv(), if stream_open => match maybe {
                        Some(event) => tracker.handle_event(event),
                        None => stream_open = false,
                    },
                    _ = sweep.tick() => tracker.sweep(now()),
                }
            }
        })
    }
}
