//! The boundary between the lifecycle client and the container runtime.
//!
//! A transport only moves requests and responses. It never interprets a
//! status code; classifying responses is the client's job. A transport
//! returns `Err` only when it could not get an answer at all.

use std::sync::Arc;

use async_trait::async_trait;
use berth_core::{UnitName, UnitRequest};

use crate::error::TransportError;

/// Status code and body of a runtime response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP-style status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl RawResponse {
    /// Create a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Whether the runtime reported the target as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Sends lifecycle requests to a container runtime.
#[async_trait]
pub trait RuntimeTransport: Send + Sync {
    /// Create a unit from `request` and start it.
    ///
    /// # Errors
    ///
    /// Returns an error only if the runtime could not be reached.
    async fn create_and_start(
        &self,
        request: &UnitRequest,
    ) -> Result<RawResponse, TransportError>;

    /// Stop a unit and delete its record.
    ///
    /// A 404 means the unit was not there to remove.
    ///
    /// # Errors
    ///
    /// Returns an error only if the runtime could not be reached.
    async fn stop_and_remove(&self, name: &UnitName) -> Result<RawResponse, TransportError>;

    /// Fetch a single unit. A 404 means not found.
    ///
    /// # Errors
    ///
    /// Returns an error only if the runtime could not be reached.
    async fn inspect(&self, name: &UnitName) -> Result<RawResponse, TransportError>;

    /// Fetch every unit the runtime knows, including exited ones.
    ///
    /// # Errors
    ///
    /// Returns an error only if the runtime could not be reached.
    async fn list_all(&self) -> Result<RawResponse, TransportError>;
}

#[async_trait]
impl<T: RuntimeTransport + ?Sized> RuntimeTransport for Arc<T> {
    async fn create_and_start(
        &self,
        request: &UnitRequest,
    ) -> Result<RawResponse, TransportError> {
        (**self).create_and_start(request).await
    }

    async fn stop_and_remove(&self, name: &UnitName) -> Result<RawResponse, TransportError> {
        (**self).stop_and_remove(name).await
    }

    async fn inspect(&self, name: &UnitName) -> Result<RawResponse, TransportError> {
        (**self).inspect(name).await
    }

    async fn list_all(&self) -> Result<RawResponse, TransportError> {
        (**self).list_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range() {
        assert!(RawResponse::new(200, "").is_success());
        assert!(RawResponse::new(202, "").is_success());
        assert!(RawResponse::new(204, "").is_success());
        assert!(!RawResponse::new(199, "").is_success());
        assert!(!RawResponse::new(300, "").is_success());
        assert!(!RawResponse::new(404, "").is_success());
        assert!(RawResponse::new(404, "").is_not_found());
    }
}
