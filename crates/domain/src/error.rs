//! Common error taxonomy used across the workspace.
//!
//! Every per-device operation failure is one of three kinds: the device is
//! not reachable, the device answered with a malformed payload, or the
//! transport to the device failed. None of them is fatal to the process —
//! callers treat `NotReachable` as "try again later" and the discovery
//! pipeline keeps running regardless.
//!
//! The whole taxonomy is `Clone` because concurrent readers of the state
//! cache share one in-flight fetch and must all observe the same failure;
//! [`TransportError`] wraps its source in an `Arc` to make that possible.

use std::fmt;
use std::sync::Arc;

use crate::id::DeviceId;

/// Errors raised by device operations and the discovery pipeline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlugHubError {
    /// The operation targets an id with no tracked device, or a device
    /// currently marked unreachable.
    #[error("device {id} is not reachable")]
    NotReachable {
        /// The requested device id.
        id: DeviceId,
    },

    /// The device returned a payload missing the expected state marker.
    #[error("invalid response from device {id}")]
    InvalidResponse {
        /// The responding device id.
        id: DeviceId,
    },

    /// Network or protocol failure reaching a device or binding a socket.
    #[error("device transport error")]
    Transport(#[source] TransportError),
}

impl PlugHubError {
    /// Wrap any transport-level failure into [`PlugHubError::Transport`].
    #[must_use]
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(TransportError::new(err))
    }
}

/// Shareable wrapper around a transport-level source error.
#[derive(Debug, Clone)]
pub struct TransportError(Arc<dyn std::error::Error + Send + Sync + 'static>);

impl TransportError {
    /// Wrap a source error.
    #[must_use]
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(err))
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}
