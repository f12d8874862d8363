//! HTTP transport for the runtime's REST API.
//!
//! # Endpoints
//!
//! - `PUT /container/:name` - create and start a unit
//! - `PUT /container/:name/stopped` - stop a unit
//! - `DELETE /container/:name` - delete a stopped unit
//! - `GET /container/:name/status` - inspect a unit
//! - `GET /containers?all=1` - list every unit, including exited ones

use async_trait::async_trait;
use berth_core::{UnitName, UnitRequest};
use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result, TransportError};
use crate::transport::{RawResponse, RuntimeTransport};
use crate::wire::CreateContainer;

/// Sends lifecycle requests to the runtime over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    link_host: String,
}

impl HttpTransport {
    /// Create a transport from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` if the configuration is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.runtime_url.trim_end_matches('/').to_string(),
            link_host: config.link_host.clone(),
        })
    }

    /// Create a transport with a custom reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            link_host: ClientConfig::default().link_host,
        }
    }

    /// Set the host network links forward to.
    #[must_use]
    pub fn with_link_host(mut self, link_host: impl Into<String>) -> Self {
        self.link_host = link_host.into();
        self
    }

    /// Get the base URL of the runtime API.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn container_url(&self, name: &UnitName) -> String {
        format!("{}/container/{}", self.base_url, name)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<RawResponse, TransportError> {
        let started = std::time::Instant::now();
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        trace!(status, elapsed = ?started.elapsed(), "Runtime responded");
        Ok(RawResponse::new(status, body))
    }
}

#[async_trait]
impl RuntimeTransport for HttpTransport {
    async fn create_and_start(
        &self,
        request: &UnitRequest,
    ) -> std::result::Result<RawResponse, TransportError> {
        let body = CreateContainer::from_request(request, &self.link_host);
        debug!(unit = %request.name, image = %body.image, "Sending create request");
        self.send(self.client.put(self.container_url(&request.name)).json(&body))
            .await
    }

    async fn stop_and_remove(
        &self,
        name: &UnitName,
    ) -> std::result::Result<RawResponse, TransportError> {
        let url = self.container_url(name);

        let stopped = self.send(self.client.put(format!("{url}/stopped"))).await?;
        if !stopped.is_success() {
            debug!(unit = %name, status = stopped.status, "Stop request not accepted");
            return Ok(stopped);
        }

        self.send(self.client.delete(url)).await
    }

    async fn inspect(&self, name: &UnitName) -> std::result::Result<RawResponse, TransportError> {
        let url = format!("{}/status", self.container_url(name));
        self.send(self.client.get(url)).await
    }

    async fn list_all(&self) -> std::result::Result<RawResponse, TransportError> {
        let url = format!("{}/containers?all=1", self.base_url);
        self.send(self.client.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_from_config() {
        let transport =
            HttpTransport::new(&ClientConfig::with_runtime_url("http://runtime:9000/")).unwrap();
        assert_eq!(transport.base_url(), "http://runtime:9000");
        assert_eq!(
            transport.container_url(&UnitName::new("web").unwrap()),
            "http://runtime:9000/container/web"
        );
    }

    #[test]
    fn transport_rejects_invalid_config() {
        let mut config = ClientConfig::default();
        config.connect_timeout_ms = 0;
        assert!(matches!(
            HttpTransport::new(&config),
            Err(ClientError::Config(_))
        ));
    }
}
