//! Application services.

mod cache;
pub mod naming;
pub mod state_service;

pub use naming::NameIndex;
pub use state_service::{StateServiceConfig, SwitchStateService};
