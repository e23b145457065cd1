//! # plughub-adapter-device-http
//!
//! HTTP device adapter — talks to a switch's local REST endpoints.
//!
//! The devices expose a tiny HTTP API on port 80:
//!
//! | Endpoint | Effect |
//! |----------|--------|
//! | `GET /report` | JSON state report (`relay`, `power`, …) |
//! | `GET /relay?state=0\|1` | switch off / on |
//! | `GET /toggle` | toggle |
//!
//! Any non-success status or connection problem is a transport failure; an
//! undecodable report body is an invalid response. Requests carry a timeout
//! so a hung device delays only its own reads, and expiry surfaces as a
//! retryable transport error.
//!
//! ## Dependency rule
//! Depends on `plughub-app` (port traits) and `plughub-domain` only.

use std::time::Duration;

use plughub_app::ports::{SwitchClient, SwitchClientFactory};
use plughub_domain::device::TrackedDevice;
use plughub_domain::error::PlugHubError;
use plughub_domain::id::DeviceId;
use plughub_domain::state::StateReport;

/// HTTP transport configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout. Expiry is a transport error, not fatal.
    pub request_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Errors specific to the HTTP device adapter.
#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    /// The request could not be sent or the connection failed.
    #[error("request to device failed")]
    Request(#[source] reqwest::Error),

    /// The device answered with a non-success status.
    #[error("unexpected status {status} from device")]
    Status {
        /// The response status code.
        status: reqwest::StatusCode,
    },
}

impl From<HttpClientError> for PlugHubError {
    fn from(err: HttpClientError) -> Self {
        Self::transport(err)
    }
}

/// Builds one [`HttpSwitchClient`] per discovered device, all sharing one
/// connection pool.
pub struct HttpSwitchClientFactory {
    http: reqwest::Client,
}

impl HttpSwitchClientFactory {
    /// Build the shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError::Request`] when the TLS backend cannot be
    /// initialised.
    pub fn new(config: &HttpClientConfig) -> Result<Self, HttpClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(HttpClientError::Request)?;
        Ok(Self { http })
    }
}

impl SwitchClientFactory for HttpSwitchClientFactory {
    type Client = HttpSwitchClient;

    fn client_for(&self, device: &TrackedDevice) -> HttpSwitchClient {
        HttpSwitchClient::new(self.http.clone(), &device.host, device.id.clone())
    }
}

/// HTTP client bound to one device.
pub struct HttpSwitchClient {
    http: reqwest::Client,
    base: String,
    id: DeviceId,
}

impl HttpSwitchClient {
    /// Bind a client to the device at `host` (IP or hostname, port 80).
    #[must_use]
    pub fn new(http: reqwest::Client, host: &str, id: DeviceId) -> Self {
        Self {
            http,
            base: format!("http://{host}"),
            id,
        }
    }

    /// Issue a GET and check for a success status.
    async fn get(&self, path_and_query: &str) -> Result<reqwest::Response, PlugHubError> {
        let url = format!("{}{}", self.base, path_and_query);
        tracing::debug!(id = %self.id, %url, "GET");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(HttpClientError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpClientError::Status { status }.into());
        }
        Ok(response)
    }
}

impl SwitchClient for HttpSwitchClient {
    async fn report(&self) -> Result<StateReport, PlugHubError> {
        let response = self.get("/report").await?;
        response.json::<StateReport>().await.map_err(|err| {
            // an undecodable body is the device's fault, not the transport's
            tracing::warn!(id = %self.id, %err, "undecodable report body");
            PlugHubError::InvalidResponse {
                id: self.id.clone(),
            }
        })
    }

    async fn set_relay(&self, on: bool) -> Result<(), PlugHubError> {
        self.get(&format!("/relay?state={}", u8::from(on)))
            .await
            .map(|_| ())
    }

    async fn toggle(&self) -> Result<(), PlugHubError> {
        self.get("/toggle").await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use plughub_domain::device::DeviceType;
    use plughub_domain::time::now;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpSwitchClient {
        HttpSwitchClient::new(
            reqwest::Client::new(),
            &server.address().to_string(),
            DeviceId::new("30aea4001122"),
        )
    }

    #[tokio::test]
    async fn should_parse_state_report() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/report"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"{"relay": true, "power": 52.34}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let report = client_for(&server).report().await.unwrap();
        assert_eq!(report.relay, Some(true));
        assert_eq!(report.power, Some(52.34));
    }

    #[tokio::test]
    async fn should_accept_report_without_power() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/report"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(r#"{"relay": false}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let report = client_for(&server).report().await.unwrap();
        assert_eq!(report.relay, Some(false));
        assert_eq!(report.power, None);
    }

    #[tokio::test]
    async fn should_treat_non_success_status_as_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/report"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server).report().await.unwrap_err();
        assert!(matches!(err, PlugHubError::Transport(_)));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("500"));
    }

    #[tokio::test]
    async fn should_treat_undecodable_body_as_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/report"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("not json", "text/plain"))
            .mount(&server)
            .await;

        let err = client_for(&server).report().await.unwrap_err();
        assert!(matches!(err, PlugHubError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn should_switch_relay_on_with_state_one() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/relay"))
            .and(query_param("state", "1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).set_relay(true).await.unwrap();
    }

    #[tokio::test]
    async fn should_switch_relay_off_with_state_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/relay"))
            .and(query_param("state", "0"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).set_relay(false).await.unwrap();
    }

    #[tokio::test]
    async fn should_toggle_via_the_toggle_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/toggle"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).toggle().await.unwrap();
    }

    #[tokio::test]
    async fn should_report_connection_failure_as_transport_error() {
        // nothing listens on this address
        let client = HttpSwitchClient::new(
            reqwest::Client::new(),
            "127.0.0.1:9",
            DeviceId::new("30aea4001122"),
        );
        let err = client.report().await.unwrap_err();
        assert!(matches!(err, PlugHubError::Transport(_)));
    }

    #[tokio::test]
    async fn should_build_clients_from_tracked_devices() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/report"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"{"relay": true}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let factory = HttpSwitchClientFactory::new(&HttpClientConfig::default()).unwrap();
        let device = TrackedDevice {
            id: DeviceId::new("30aea4001122"),
            host: server.address().to_string(),
            device_type: DeviceType::Ws2,
            name: None,
            last_activity: now(),
            reachable: true,
        };

        let client = factory.client_for(&device);
        assert_eq!(client.report().await.unwrap().relay, Some(true));
    }
}
