//! Device model — types, sightings, and liveness records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::id::DeviceId;
use crate::time::Timestamp;

/// Model tag of a discoverable device.
///
/// The numeric codes are the values carried in byte 6 of the UDP discovery
/// beacon; the string forms appear in configuration files and type filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceType {
    /// WiFi Switch v1.
    Wsw,
    /// WiFi Bulb.
    Wrb,
    /// WiFi Button Plus.
    Wbp,
    /// WiFi Button.
    Wbs,
    /// WiFi LED Strip.
    Wrs,
    /// WiFi Switch v2 — the model the static configuration format was
    /// originally written for, hence the default.
    #[default]
    Ws2,
    /// WiFi Switch EU.
    Wse,
}

impl DeviceType {
    /// All known device types, in beacon-code order.
    pub const ALL: [Self; 7] = [
        Self::Wsw,
        Self::Wrb,
        Self::Wbp,
        Self::Wbs,
        Self::Wrs,
        Self::Ws2,
        Self::Wse,
    ];

    /// Resolve a beacon type code. Unknown codes yield `None` and are
    /// filtered upstream by the reachability tracker.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            101 => Some(Self::Wsw),
            102 => Some(Self::Wrb),
            103 => Some(Self::Wbp),
            104 => Some(Self::Wbs),
            105 => Some(Self::Wrs),
            106 => Some(Self::Ws2),
            107 => Some(Self::Wse),
            _ => None,
        }
    }

    /// The beacon type code for this device type.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Wsw => 101,
            Self::Wrb => 102,
            Self::Wbp => 103,
            Self::Wbs => 104,
            Self::Wrs => 105,
            Self::Ws2 => 106,
            Self::Wse => 107,
        }
    }

    /// Uppercase tag as used in configuration and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wsw => "WSW",
            Self::Wrb => "WRB",
            Self::Wbp => "WBP",
            Self::Wbs => "WBS",
            Self::Wrs => "WRS",
            Self::Ws2 => "WS2",
            Self::Wse => "WSE",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when parsing an unknown device-type tag from configuration.
#[derive(Debug, thiserror::Error)]
#[error("unknown device type tag {0:?}")]
pub struct UnknownDeviceType(pub String);

impl FromStr for DeviceType {
    type Err = UnknownDeviceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownDeviceType(s.to_owned()))
    }
}

/// One discovery observation of a device, emitted by a discovery source.
///
/// Immutable once emitted. `device_type` is absent when the beacon carried
/// an unknown type code; such sightings never pass the tracker's filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoverySighting {
    /// Stable device identifier.
    pub id: DeviceId,
    /// Network address the device was seen at (IP or hostname).
    pub host: String,
    /// Device model tag, when recognised.
    pub device_type: Option<DeviceType>,
    /// When the sighting happened.
    pub seen_at: Timestamp,
    /// Display name, when the source knows one (static configuration).
    pub name: Option<String>,
}

/// Persistent liveness record kept by the reachability tracker for one
/// device id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedDevice {
    /// Stable device identifier.
    pub id: DeviceId,
    /// Most recently sighted network address.
    pub host: String,
    /// Device model tag.
    pub device_type: DeviceType,
    /// Display name, when known.
    pub name: Option<String>,
    /// Time of the most recent sighting.
    pub last_activity: Timestamp,
    /// Whether the device is currently considered alive.
    pub reachable: bool,
}

impl TrackedDevice {
    /// Create a record from the first passing sighting of an id.
    #[must_use]
    pub fn from_sighting(sighting: &DiscoverySighting, device_type: DeviceType) -> Self {
        Self {
            id: sighting.id.clone(),
            host: sighting.host.clone(),
            device_type,
            name: sighting.name.clone(),
            last_activity: sighting.seen_at,
            reachable: true,
        }
    }

    /// Fold a repeat sighting into the record, refreshing activity, address,
    /// and name. Does not touch the `reachable` flag.
    pub fn refresh(&mut self, sighting: &DiscoverySighting) {
        self.last_activity = sighting.seen_at;
        self.host.clone_from(&sighting.host);
        if sighting.name.is_some() {
            self.name.clone_from(&sighting.name);
        }
    }
}

/// One entry of the static device configuration.
///
/// Entries without a `host` are excluded from static discovery but still
/// feed display-name lookup for devices discovered over UDP.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeviceEntry {
    /// Stable device identifier (MAC).
    pub id: DeviceId,
    /// Configured display name.
    pub name: String,
    /// Device model tag.
    #[serde(rename = "type", default)]
    pub device_type: DeviceType,
    /// Network address, when the device should be statically discovered.
    #[serde(default)]
    pub host: Option<String>,
}
