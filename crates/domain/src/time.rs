//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for sighting times, `last_activity`, `last_use`, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}
