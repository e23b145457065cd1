//! # plughub-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `DiscoverySource` — emits device sightings from a transport
//!   - `SwitchClient` / `SwitchClientFactory` — per-device command channel
//!   - `StateNotifier` — hands poll results to the hub-integration layer
//! - Provide the **discovery pipeline**:
//!   - `DiscoveryAggregator` — merges N sources into one event stream
//!   - `ReachabilityTracker` — dedupes sightings and tracks device liveness
//! - Provide the **cached state service** — single-flight reads with
//!   write-through invalidation and usage-aware polling
//! - Provide **in-process infrastructure** (device event bus) that needs no IO
//!
//! ## Dependency rule
//! Depends on `plughub-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the
//! reverse.

pub mod aggregator;
pub mod event_bus;
pub mod ports;
pub mod services;
pub mod tracker;
