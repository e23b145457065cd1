//! Discovery source port — one transport that can sight devices.
//!
//! A discovery source bridges a transport (UDP broadcast, static
//! configuration, …) into the discovery pipeline. Sources are registered with
//! the [`DiscoveryAggregator`](crate::aggregator::DiscoveryAggregator), which
//! merges their event streams for the reachability tracker.

use tokio::sync::mpsc;

use plughub_domain::event::DiscoveryEvent;

/// A pluggable discovery source.
///
/// Implementations live in adapter crates. The contract:
///
/// - [`start`](Self::start) must not block: it spawns whatever task the
///   transport needs and returns. Once listening, the source emits
///   [`DiscoveryEvent::Started`], then one
///   [`DiscoveryEvent::Sighting`] per observed device, at least once per
///   broadcast/refresh interval while the device is live. Calling `start` on
///   a running source is a no-op.
/// - Transport failures surface as [`DiscoveryEvent::Error`] followed by
///   [`DiscoveryEvent::Stopped`]; they stop this source only and must never
///   terminate the process.
/// - [`stop`](Self::stop) halts emission and signals
///   [`DiscoveryEvent::Stopped`]. Stopping a stopped source is a no-op.
pub trait DiscoverySource: Send {
    /// Short name identifying this source (e.g. `"udp"`) in logs and
    /// lifecycle events.
    fn name(&self) -> &'static str;

    /// Begin emitting discovery events into `events`.
    fn start(&mut self, events: mpsc::Sender<DiscoveryEvent>);

    /// Halt emission.
    fn stop(&mut self);
}
