//! Logging notifier — stands in for the hub-integration layer.

use plughub_app::ports::StateNotifier;
use plughub_domain::state::StateUpdate;

/// Writes every poll update to the log instead of a hub connection.
pub struct LogNotifier;

impl StateNotifier for LogNotifier {
    async fn notify(&self, update: StateUpdate) {
        tracing::info!(
            device = %update.device_id,
            attribute = %update.attribute,
            value = %update.value,
            "state update"
        );
    }
}
