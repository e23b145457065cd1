//! # plughubd — plughub daemon
//!
//! Composition root that wires the discovery pipeline and the cached state
//! service together and runs them until interrupted.
//!
//! ## Responsibilities
//! - Parse configuration (TOML file, env vars)
//! - Build the discovery sources (UDP listener, static configuration)
//! - Merge them through the aggregator into the reachability tracker
//! - Construct the cached state service over HTTP device clients
//! - Start the poll sweep with the logging notifier
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod notify;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use plughub_adapter_device_http::HttpSwitchClientFactory;
use plughub_adapter_discovery_static::StaticDiscoverySource;
use plughub_adapter_discovery_udp::UdpDiscoverySource;
use plughub_app::aggregator::DiscoveryAggregator;
use plughub_app::services::{NameIndex, SwitchStateService};
use plughub_app::tracker::ReachabilityTracker;

use config::Config;
use notify::LogNotifier;

/// Capacity of the merged discovery stream.
const DISCOVERY_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Discovery pipeline
    let (mut aggregator, merged) = DiscoveryAggregator::new(DISCOVERY_CHANNEL_CAPACITY);
    if config.discovery.udp_enabled {
        aggregator.add_source(Box::new(UdpDiscoverySource::new(config.discovery.listen)))?;
    }
    if config.devices.iter().any(|entry| entry.host.is_some()) {
        aggregator.add_source(Box::new(StaticDiscoverySource::new(config.devices.clone())))?;
    }
    if aggregator.is_empty() {
        tracing::warn!("no discovery source configured, no devices will be found");
    }

    let tracker = Arc::new(ReachabilityTracker::new(config.tracker_config()));
    let _tracker_task = Arc::clone(&tracker).spawn(merged);

    // Cached state service
    let factory = HttpSwitchClientFactory::new(&config.http_config())?;
    let service = Arc::new(SwitchStateService::new(
        factory,
        NameIndex::new(&config.devices),
        config.state_service_config(),
    ));
    let _event_task = Arc::clone(&service).spawn_event_loop(tracker.subscribe());
    let _poll_task = Arc::clone(&service).spawn_polling(LogNotifier);

    aggregator.start();
    tracing::info!("plughubd running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    aggregator.stop();

    Ok(())
}
