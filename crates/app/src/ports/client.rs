//! Device client port — the per-device command channel.

use std::future::Future;

use plughub_domain::device::TrackedDevice;
use plughub_domain::error::PlugHubError;
use plughub_domain::state::StateReport;

/// Handle for talking to one physical device.
///
/// Implementations translate these calls into the device's own protocol
/// (HTTP for the supported switches). Every failure maps into the
/// [`PlugHubError`] taxonomy: transport problems and non-success statuses are
/// [`PlugHubError::Transport`], undecodable payloads are
/// [`PlugHubError::InvalidResponse`].
pub trait SwitchClient: Send + Sync + 'static {
    /// Fetch the device's current state report.
    fn report(&self) -> impl Future<Output = Result<StateReport, PlugHubError>> + Send;

    /// Switch the relay on or off.
    fn set_relay(&self, on: bool) -> impl Future<Output = Result<(), PlugHubError>> + Send;

    /// Toggle the relay.
    fn toggle(&self) -> impl Future<Output = Result<(), PlugHubError>> + Send;
}

/// Builds one [`SwitchClient`] per discovered device.
///
/// The cached state service calls this when the reachability tracker reports
/// a new device; the client lives for as long as the service keeps the
/// device.
pub trait SwitchClientFactory: Send + Sync {
    /// The client type produced by this factory.
    type Client: SwitchClient;

    /// Build a client bound to the device's sighted address.
    fn client_for(&self, device: &TrackedDevice) -> Self::Client;
}
