//! Outbound notification port — poll results for the hub-integration layer.

use std::future::Future;

use plughub_domain::state::StateUpdate;

/// Consumer of per-device attribute updates produced by the poll sweep.
///
/// The hub-integration layer (or a logging stand-in) implements this.
/// Delivery is best-effort: implementations handle their own failures, the
/// sweep never inspects the outcome.
pub trait StateNotifier: Send + Sync {
    /// Hand one attribute update downstream.
    fn notify(&self, update: StateUpdate) -> impl Future<Output = ()> + Send;
}
