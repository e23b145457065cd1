//! Switch state — relay position, power consumption, and outbound updates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PlugHubError;
use crate::id::DeviceId;

/// Power draw in watts.
///
/// Rendered with one decimal place, matching the device firmware's own
/// display convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watts(f64);

impl Watts {
    /// Wrap a wattage value.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// The raw wattage.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Watts {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Watts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// Raw state report as returned by a device's `/report` endpoint.
///
/// Deserialization is tolerant: unknown fields are ignored and both known
/// fields are optional. Validation into a [`SwitchState`] happens separately
/// so a missing `relay` marker can be reported as an invalid response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct StateReport {
    /// Relay position; the marker every valid report must carry.
    #[serde(default)]
    pub relay: Option<bool>,
    /// Current power draw in watts. Some firmware variants omit it.
    #[serde(default)]
    pub power: Option<f64>,
}

/// Validated switch state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SwitchState {
    /// Whether the relay is switched on.
    pub relay: bool,
    /// Current power draw, when the device reports one.
    pub power: Option<Watts>,
}

impl SwitchState {
    /// Validate a raw report.
    ///
    /// # Errors
    ///
    /// Returns [`PlugHubError::InvalidResponse`] when the report lacks the
    /// `relay` marker. A missing `power` value is legitimate — firmware
    /// variants without a power meter omit it.
    pub fn try_from_report(id: &DeviceId, report: StateReport) -> Result<Self, PlugHubError> {
        let relay = report.relay.ok_or_else(|| PlugHubError::InvalidResponse {
            id: id.clone(),
        })?;
        Ok(Self {
            relay,
            power: report.power.map(Watts::from),
        })
    }
}

/// Attribute of a device that the poll sweep reports downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    /// On/off position of the relay.
    PowerState,
    /// Momentary power draw.
    PowerConsumption,
}

impl Attribute {
    /// Component identifier understood by the hub-integration layer.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PowerState => "power-switch",
            Self::PowerConsumption => "power-curr-consumption-sensor",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value carried by a [`StateUpdate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeValue {
    /// Boolean attribute value.
    Bool(bool),
    /// Wattage attribute value.
    Watts(Watts),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => value.fmt(f),
            Self::Watts(value) => value.fmt(f),
        }
    }
}

/// One outbound notification for the hub-integration layer.
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate {
    /// Device the update is about.
    pub device_id: DeviceId,
    /// Which attribute changed.
    pub attribute: Attribute,
    /// The new value.
    pub value: AttributeValue,
}

impl StateUpdate {
    /// Update for the relay's on/off position.
    #[must_use]
    pub fn power_state(device_id: DeviceId, on: bool) -> Self {
        Self {
            device_id,
            attribute: Attribute::PowerState,
            value: AttributeValue::Bool(on),
        }
    }

    /// Update for the momentary power draw.
    #[must_use]
    pub fn power_consumption(device_id: DeviceId, watts: Watts) -> Self {
        Self {
            device_id,
            attribute: Attribute::PowerConsumption,
            value: AttributeValue::Watts(watts),
        }
    }
}
