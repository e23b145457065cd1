//! # plughub-domain
//!
//! Pure domain model for the plughub smart-plug integration.
//!
//! ## Responsibilities
//! - Foundational types: device identifiers, error conventions, timestamps
//! - Define **Sightings** (one discovery observation of a device on the LAN)
//! - Define **Tracked devices** (the liveness record kept per device id)
//! - Define **Switch state** (relay position and power consumption)
//! - Define **Events** (discovery-stream and device-lifecycle records)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod event;
pub mod state;
