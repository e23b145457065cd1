//! Discovery beacon parser.
//!
//! Pure functions operating on raw `&[u8]` datagrams — no socket dependency.
//! Supported switches announce themselves with a fixed 8-byte broadcast:
//!
//! | Offset | Field | Type |
//! |--------|-------|------|
//! | 0–5 | MAC address | 6 raw bytes |
//! | 6 | Device-type code | u8, see [`DeviceType::from_code`] |
//! | 7 | Reserved | u8, ignored |

use plughub_domain::device::{DeviceType, DiscoverySighting};
use plughub_domain::id::DeviceId;
use plughub_domain::time::Timestamp;

/// UDP port the switches broadcast on.
pub const DISCOVERY_PORT: u16 = 7979;

/// Exact length of a discovery beacon.
pub const BEACON_LEN: usize = 8;

/// Parsed discovery beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beacon {
    /// Announced MAC address.
    pub mac: [u8; 6],
    /// Raw device-type code (byte 6).
    pub type_code: u8,
}

impl Beacon {
    /// The device id derived from the MAC bytes.
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        DeviceId::from_mac(self.mac)
    }

    /// Resolve the type code. Unknown codes yield `None`; such sightings
    /// pass through and are filtered by the reachability tracker.
    #[must_use]
    pub fn device_type(&self) -> Option<DeviceType> {
        DeviceType::from_code(self.type_code)
    }

    /// Build the sighting for a beacon received from `host` at `seen_at`.
    #[must_use]
    pub fn into_sighting(self, host: String, seen_at: Timestamp) -> DiscoverySighting {
        DiscoverySighting {
            id: self.device_id(),
            host,
            device_type: self.device_type(),
            seen_at,
            name: None,
        }
    }
}

/// Why a datagram could not be parsed as a beacon.
#[derive(Debug, thiserror::Error)]
pub enum BeaconParseError {
    /// The datagram is not exactly [`BEACON_LEN`] bytes.
    #[error("discovery beacon must be {BEACON_LEN} bytes, got {actual}")]
    WrongLength {
        /// The actual datagram length.
        actual: usize,
    },
}

/// Parse one datagram.
///
/// # Errors
///
/// Returns [`BeaconParseError::WrongLength`] for any datagram that is not
/// exactly 8 bytes. Callers log and drop such datagrams — they are noise,
/// not transport failures.
pub fn parse_beacon(data: &[u8]) -> Result<Beacon, BeaconParseError> {
    if data.len() != BEACON_LEN {
        return Err(BeaconParseError::WrongLength { actual: data.len() });
    }

    let mut mac = [0u8; 6];
    mac.copy_from_slice(&data[0..6]);

    Ok(Beacon {
        mac,
        type_code: data[6],
    })
}
