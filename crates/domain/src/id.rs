//! Device identifier newtype.
//!
//! A [`DeviceId`] is the stable identity of one physical device. Devices
//! discovered over UDP derive it from the six MAC address bytes of the
//! broadcast beacon; configured devices carry it verbatim from the
//! configuration file. Ids are normalised to lowercase so the two sources
//! agree on equality.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Unique identifier for a device, typically the lowercase-hex MAC address
/// (e.g. `"30aea4001122"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap a raw identifier, normalising to lowercase.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().to_ascii_lowercase())
    }

    /// Build an id from the six raw MAC address bytes of a discovery beacon.
    #[must_use]
    pub fn from_mac(mac: [u8; 6]) -> Self {
        Self(format!(
            "{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
        ))
    }

    /// Access the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DeviceId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

// Manual impl so ids read from configuration get the same lowercase
// normalisation as ids derived from MAC bytes.
impl<'de> Deserialize<'de> for DeviceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}
