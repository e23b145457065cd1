//! Discovery aggregator — bundles multiple discovery sources into a single
//! event stream.
//!
//! Sightings and errors from every registered source are forwarded
//! unmodified. `Started`/`Stopped` are only used for lifecycle logging, so
//! they are forwarded from the first registered source alone — running two
//! sources must not log every lifecycle transition twice.

use tokio::sync::mpsc;

use plughub_domain::event::DiscoveryEvent;

use crate::ports::DiscoverySource;

/// Buffer between one source and the merged stream.
const SOURCE_CHANNEL_CAPACITY: usize = 64;

/// Raised when a source is registered after the aggregator has started.
#[derive(Debug, thiserror::Error)]
#[error("discovery sources must be registered before the aggregator starts")]
pub struct LateRegistration;

/// Merges N discovery sources into one [`DiscoveryEvent`] stream.
pub struct DiscoveryAggregator {
    sources: Vec<Box<dyn DiscoverySource>>,
    merged: mpsc::Sender<DiscoveryEvent>,
    started: bool,
}

impl DiscoveryAggregator {
    /// Create an aggregator and the merged receiving end of its stream.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DiscoveryEvent>) {
        let (merged, events) = mpsc::channel(capacity);
        (
            Self {
                sources: Vec::new(),
                merged,
                started: false,
            },
            events,
        )
    }

    /// Register a discovery source. Must be called before [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns [`LateRegistration`] once the aggregator has started — a
    /// source added afterwards would miss the fan-out.
    pub fn add_source(&mut self, source: Box<dyn DiscoverySource>) -> Result<(), LateRegistration> {
        if self.started {
            return Err(LateRegistration);
        }
        self.sources.push(source);
        Ok(())
    }

    /// Start every registered source. Calling `start` again is a no-op.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        for (index, source) in self.sources.iter_mut().enumerate() {
            let (events, feed) = mpsc::channel(SOURCE_CHANNEL_CAPACITY);
            // the forwarder ends on its own once the source drops its sender
            tokio::spawn(forward(feed, self.merged.clone(), index == 0));
            source.start(events);
        }
    }

    /// Stop every registered source.
    ///
    /// The forwarder tasks drain remaining events (including the sources'
    /// `Stopped` signals) and end once the source channels close.
    pub fn stop(&mut self) {
        for source in &mut self.sources {
            source.stop();
        }
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no source has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Forward one source's events into the merged stream.
///
/// Lifecycle events (`Started`/`Stopped`) only pass through for the first
/// registered source.
async fn forward(
    mut feed: mpsc::Receiver<DiscoveryEvent>,
    merged: mpsc::Sender<DiscoveryEvent>,
    primary: bool,
) {
    while let Some(event) = feed.recv().await {
        let pass = match &event {
            DiscoveryEvent::Started { .. } | DiscoveryEvent::Stopped { .. } => primary,
            DiscoveryEvent::Sighting(_) | DiscoveryEvent::Error { .. } => true,
        };
        if pass && merged.send(event).await.is_err() {
            break;
        }
    }
}
