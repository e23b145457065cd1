//! # plughub-adapter-discovery-udp
//!
//! UDP discovery adapter — listens for switch broadcast beacons and emits
//! one sighting per valid datagram.
//!
//! Supported switches announce themselves every few seconds with an 8-byte
//! UDP broadcast on port 7979 (see [`parser`] for the layout). Datagrams of
//! any other size are logged and dropped; they are background noise on the
//! discovery port, not failures. A socket-level error stops this source —
//! and only this source — surfacing as a [`DiscoveryEvent::Error`].
//!
//! ## Dependency rule
//! Depends on `plughub-app` (port traits) and `plughub-domain` only.

pub mod parser;

use std::net::IpAddr;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use plughub_app::ports::DiscoverySource;
use plughub_domain::error::PlugHubError;
use plughub_domain::event::DiscoveryEvent;
use plughub_domain::time::now;

const SOURCE_NAME: &str = "udp";

/// Discovery source listening for UDP broadcast beacons.
pub struct UdpDiscoverySource {
    listen: IpAddr,
    port: u16,
    task: Option<JoinHandle<()>>,
    events: Option<mpsc::Sender<DiscoveryEvent>>,
}

impl UdpDiscoverySource {
    /// Listen on the given address (use `0.0.0.0` for all interfaces) and
    /// the standard discovery port.
    #[must_use]
    pub fn new(listen: IpAddr) -> Self {
        Self::with_port(listen, parser::DISCOVERY_PORT)
    }

    /// Listen on a non-standard port.
    #[must_use]
    pub fn with_port(listen: IpAddr, port: u16) -> Self {
        Self {
            listen,
            port,
            task: None,
            events: None,
        }
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl DiscoverySource for UdpDiscoverySource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn start(&mut self, events: mpsc::Sender<DiscoveryEvent>) {
        if self.is_running() {
            return;
        }
        self.events = Some(events.clone());
        self.task = Some(tokio::spawn(listen(self.listen, self.port, events)));
    }

    fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        let events = self.events.take();
        if task.is_finished() {
            // the task already signalled Stopped on its way out
            return;
        }
        task.abort();
        if let Some(events) = events {
            let _ = events.try_send(DiscoveryEvent::Stopped {
                source: SOURCE_NAME,
            });
        }
    }
}

/// Receive loop: bind, announce, then emit one sighting per valid beacon.
async fn listen(listen: IpAddr, port: u16, events: mpsc::Sender<DiscoveryEvent>) {
    let socket = match UdpSocket::bind((listen, port)).await {
        Ok(socket) => socket,
        Err(err) => {
            tracing::error!(%err, %listen, port, "failed to bind discovery socket");
            let _ = events
                .send(DiscoveryEvent::Error {
                    source: SOURCE_NAME,
                    error: PlugHubError::transport(err),
                })
                .await;
            let _ = events
                .send(DiscoveryEvent::Stopped {
                    source: SOURCE_NAME,
                })
                .await;
            return;
        }
    };

    tracing::info!(%listen, port, "listening for switch UDP broadcasts");
    let _ = events
        .send(DiscoveryEvent::Started {
            source: SOURCE_NAME,
        })
        .await;

    let mut buf = [0u8; 64];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, peer)) => {
                let datagram = &buf[..len];
                match parser::parse_beacon(datagram) {
                    Ok(beacon) => {
                        let sighting = beacon.into_sighting(peer.ip().to_string(), now());
                        tracing::trace!(
                            id = %sighting.id,
                            host = %sighting.host,
                            "received discovery beacon"
                        );
                        if events.send(DiscoveryEvent::Sighting(sighting)).await.is_err() {
                            // pipeline gone, nothing left to discover for
                            return;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(
                            %err,
                            from = %peer,
                            data = %hex(datagram),
                            "ignoring invalid discovery datagram"
                        );
                    }
                }
            }
            Err(err) => {
                tracing::error!(%err, "discovery socket failed, stopping UDP discovery");
                let _ = events
                    .send(DiscoveryEvent::Error {
                        source: SOURCE_NAME,
                        error: PlugHubError::transport(err),
                    })
                    .await;
                break;
            }
        }
    }

    let _ = events
        .send(DiscoveryEvent::Stopped {
            source: SOURCE_NAME,
        })
        .await;
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::Ipv4Addr;
    use std::time::Duration;

    use plughub_domain::device::DeviceType;

    const BEACON: [u8; 8] = [0x30, 0xAE, 0xA4, 0x00, 0x11, 0x22, 0x6A, 0x00];

    async fn free_port() -> u16 {
        let probe = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        probe.local_addr().unwrap().port()
    }

    async fn next_event(events: &mut mpsc::Receiver<DiscoveryEvent>) -> DiscoveryEvent {
        tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for discovery event")
            .expect("event stream closed")
    }

    #[tokio::test]
    async fn should_emit_sighting_for_valid_beacon() {
        let port = free_port().await;
        let mut source = UdpDiscoverySource::with_port(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        let (tx, mut events) = mpsc::channel(16);
        source.start(tx);

        assert!(matches!(
            next_event(&mut events).await,
            DiscoveryEvent::Started { source: "udp" }
        ));

        let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        sender
            .send_to(&BEACON, (Ipv4Addr::LOCALHOST, port))
            .await
            .unwrap();

        let DiscoveryEvent::Sighting(sighting) = next_event(&mut events).await else {
            panic!("expected a sighting");
        };
        assert_eq!(sighting.id.as_str(), "30aea4001122");
        assert_eq!(sighting.device_type, Some(DeviceType::Ws2));
        assert_eq!(sighting.host, "127.0.0.1");

        source.stop();
        assert!(matches!(
            next_event(&mut events).await,
            DiscoveryEvent::Stopped { source: "udp" }
        ));
    }

    #[tokio::test]
    async fn should_drop_malformed_datagrams() {
        let port = free_port().await;
        let mut source = UdpDiscoverySource::with_port(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        let (tx, mut events) = mpsc::channel(16);
        source.start(tx);
        let _ = next_event(&mut events).await; // Started

        let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        // six bytes: logged and dropped, no sighting
        sender
            .send_to(&BEACON[..6], (Ipv4Addr::LOCALHOST, port))
            .await
            .unwrap();
        // a valid beacon right after is still picked up
        sender
            .send_to(&BEACON, (Ipv4Addr::LOCALHOST, port))
            .await
            .unwrap();

        let DiscoveryEvent::Sighting(sighting) = next_event(&mut events).await else {
            panic!("expected the valid beacon's sighting");
        };
        assert_eq!(sighting.id.as_str(), "30aea4001122");

        source.stop();
    }

    #[tokio::test]
    async fn should_report_bind_failure_and_stop() {
        let blocker = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = blocker.local_addr().unwrap().port();

        let mut source = UdpDiscoverySource::with_port(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        let (tx, mut events) = mpsc::channel(16);
        source.start(tx);

        assert!(matches!(
            next_event(&mut events).await,
            DiscoveryEvent::Error { source: "udp", .. }
        ));
        assert!(matches!(
            next_event(&mut events).await,
            DiscoveryEvent::Stopped { source: "udp" }
        ));
    }

    #[tokio::test]
    async fn should_ignore_repeated_start_while_running() {
        let port = free_port().await;
        let mut source = UdpDiscoverySource::with_port(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        let (tx, mut events) = mpsc::channel(16);
        source.start(tx.clone());
        let _ = next_event(&mut events).await; // Started

        // a second start must not bind again or emit another Started
        source.start(tx);
        source.stop();

        assert!(matches!(
            next_event(&mut events).await,
            DiscoveryEvent::Stopped { source: "udp" }
        ));
        assert!(events.try_recv().is_err());
    }
}
