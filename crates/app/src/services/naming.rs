//! Display-name lookup for discovered devices.
//!
//! UDP-discovered devices carry no name of their own; the configuration file
//! may still know one for their id. Precedence: the name the sighting itself
//! carried, then the configured name, then `"<TYPE> <id>"`.

use std::collections::HashMap;

use plughub_domain::device::{DeviceEntry, TrackedDevice};
use plughub_domain::id::DeviceId;

/// Maps device ids to configured display names.
#[derive(Debug, Default)]
pub struct NameIndex {
    names: HashMap<DeviceId, String>,
}

impl NameIndex {
    /// Build an index from the configured device entries.
    ///
    /// Entries without a `host` participate too — that is the whole point of
    /// keeping them in the configuration.
    #[must_use]
    pub fn new(entries: &[DeviceEntry]) -> Self {
        Self {
            names: entries
                .iter()
                .map(|entry| (entry.id.clone(), entry.name.clone()))
                .collect(),
        }
    }

    /// Resolve the display name for a tracked device.
    #[must_use]
    pub fn display_name(&self, device: &TrackedDevice) -> String {
        if let Some(name) = &device.name {
            return name.clone();
        }
        if let Some(name) = self.names.get(&device.id) {
            return name.clone();
        }
        format!("{} {}", device.device_type, device.id)
    }
}
