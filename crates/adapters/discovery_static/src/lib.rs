//! # plughub-adapter-discovery-static
//!
//! Static discovery adapter — "discovers" manually configured devices.
//!
//! Devices that cannot be auto-discovered (or networks where broadcast is
//! filtered) are listed in the configuration file with a `host`. This source
//! re-emits one sighting per hosted entry on a fixed interval, default 5
//! seconds — the same cadence as the UDP broadcasts it substitutes for, so
//! the reachability tracker's timeout logic behaves identically regardless
//! of where sightings come from. Entries without a `host` are skipped; they
//! only participate in display-name lookup.
//!
//! ## Dependency rule
//! Depends on `plughub-app` (port traits) and `plughub-domain` only.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use plughub_app::ports::DiscoverySource;
use plughub_domain::device::{DeviceEntry, DiscoverySighting};
use plughub_domain::event::DiscoveryEvent;
use plughub_domain::time::now;

const SOURCE_NAME: &str = "static";

/// Matches the broadcast cadence of the real devices.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Discovery source that re-emits configured device entries.
pub struct StaticDiscoverySource {
    entries: Vec<DeviceEntry>,
    refresh_interval: Duration,
    task: Option<JoinHandle<()>>,
    events: Option<mpsc::Sender<DiscoveryEvent>>,
}

impl StaticDiscoverySource {
    /// Create a source over the configured entries with the default cadence.
    #[must_use]
    pub fn new(entries: Vec<DeviceEntry>) -> Self {
        Self::with_refresh_interval(entries, DEFAULT_REFRESH_INTERVAL)
    }

    /// Create a source with a custom re-emit cadence.
    #[must_use]
    pub fn with_refresh_interval(entries: Vec<DeviceEntry>, refresh_interval: Duration) -> Self {
        Self {
            entries,
            refresh_interval,
            task: None,
            events: None,
        }
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl DiscoverySource for StaticDiscoverySource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn start(&mut self, events: mpsc::Sender<DiscoveryEvent>) {
        if self.is_running() {
            return;
        }

        if !self.entries.iter().any(|entry| entry.host.is_some()) {
            tracing::warn!("device configuration defines no entries with a host");
        }

        self.events = Some(events.clone());
        self.task = Some(tokio::spawn(announce(
            self.entries.clone(),
            self.refresh_interval,
            events,
        )));
    }

    fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        let events = self.events.take();
        if task.is_finished() {
            return;
        }
        task.abort();
        if let Some(events) = events {
            let _ = events.try_send(DiscoveryEvent::Stopped {
                source: SOURCE_NAME,
            });
        }
    }
}

/// Emit one sighting per hosted entry, every interval, until stopped.
async fn announce(
    entries: Vec<DeviceEntry>,
    refresh_interval: Duration,
    events: mpsc::Sender<DiscoveryEvent>,
) {
    tracing::info!(
        devices = entries.iter().filter(|entry| entry.host.is_some()).count(),
        "announcing statically configured devices"
    );
    let _ = events
        .send(DiscoveryEvent::Started {
            source: SOURCE_NAME,
        })
        .await;

    let mut tick = tokio::time::interval(refresh_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tick.tick().await;
        for entry in &entries {
            let Some(host) = entry.host.clone() else {
                continue;
            };
            let sighting = DiscoverySighting {
                id: entry.id.clone(),
                host,
                device_type: Some(entry.device_type),
                seen_at: now(),
                name: Some(entry.name.clone()),
            };
            if events.send(DiscoveryEvent::Sighting(sighting)).await.is_err() {
                return;
            }
        }
    }
}
