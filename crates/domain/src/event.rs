//! Discovery and device lifecycle events.
//!
//! [`DiscoveryEvent`]s flow from discovery sources through the aggregator
//! into the reachability tracker. [`DeviceEvent`]s are what the tracker
//! publishes on the device event bus for downstream consumers (the cached
//! state service and the hub-integration layer).

use crate::device::{DiscoverySighting, TrackedDevice};
use crate::error::PlugHubError;
use crate::id::DeviceId;

/// Event emitted by a discovery source.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// A device was observed on the network.
    Sighting(DiscoverySighting),
    /// The source began emitting sightings.
    Started {
        /// Name of the emitting source.
        source: &'static str,
    },
    /// The source stopped emitting sightings.
    Stopped {
        /// Name of the emitting source.
        source: &'static str,
    },
    /// The source hit a transport failure and stopped itself.
    Error {
        /// Name of the emitting source.
        source: &'static str,
        /// What went wrong.
        error: PlugHubError,
    },
}

/// Event published on the device event bus by the reachability tracker.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// First passing sighting of a device id in the current epoch.
    Discovered(TrackedDevice),
    /// A sighting was dropped by the device-type filter.
    Filtered(DiscoverySighting),
    /// A previously unreachable device was sighted again.
    ReachableAgain(TrackedDevice),
    /// A device exceeded the reachability timeout.
    Unreachable(TrackedDevice),
    /// Discovery started (first registered source).
    DiscoveryStarted,
    /// Discovery stopped (first registered source).
    DiscoveryStopped,
    /// A discovery source failed.
    DiscoveryError(PlugHubError),
}

impl DeviceEvent {
    /// The device id this event concerns, when it concerns one.
    #[must_use]
    pub fn device_id(&self) -> Option<&DeviceId> {
        match self {
            Self::Discovered(d) | Self::ReachableAgain(d) | Self::Unreachable(d) => Some(&d.id),
            Self::Filtered(s) => Some(&s.id),
            Self::DiscoveryStarted | Self::DiscoveryStopped | Self::DiscoveryError(_) => None,
        }
    }
}
