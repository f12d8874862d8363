//! The lifecycle client.
//!
//! [`UnitRuntimeClient`] is the capability every runtime backend provides.
//! [`RuntimeClient`] implements it over any [`RuntimeTransport`] and turns
//! raw runtime responses into typed outcomes:
//!
//! | Runtime answer                  | Outcome                           |
//! |---------------------------------|-----------------------------------|
//! | no answer                       | `ClientError::Transport`          |
//! | 2xx                             | success                           |
//! | 404 on remove                   | success (already gone)            |
//! | 404 on inspect                  | `Ok(None)`                        |
//! | any other status                | `ClientError::Runtime`            |
//!
//! None of the operations retry. Waiting for a state is done separately
//! with [`crate::wait::wait_for_state`].

use std::sync::Arc;

use async_trait::async_trait;
use berth_core::{Unit, UnitName, UnitRequest};
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Operation, Result};
use crate::http::HttpTransport;
use crate::transport::{RawResponse, RuntimeTransport};
use crate::wire::{ContainerEntry, ContainerList};

/// Lifecycle operations on units, keyed by unit name.
///
/// Operations on different names may run concurrently. Operations on the
/// same name are not serialized by the client.
#[async_trait]
pub trait UnitRuntimeClient: Send + Sync {
    /// Create and start a unit.
    ///
    /// Success means the runtime has recorded the unit. It may not be
    /// active yet; use [`crate::wait::wait_for_state`] for that.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if a unit with the name is present,
    /// `Runtime` if the runtime rejects the request, and `Transport` if the
    /// runtime cannot be reached.
    async fn add(&self, request: &UnitRequest) -> Result<()>;

    /// Stop and remove a unit.
    ///
    /// Removing a unit that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// Returns `Runtime` if the runtime rejects the removal and `Transport`
    /// if it cannot be reached.
    async fn remove(&self, name: &UnitName) -> Result<()>;

    /// Check whether the runtime has a record of the unit.
    ///
    /// # Errors
    ///
    /// Returns an error only if the lookup itself fails; an absent unit is
    /// `Ok(false)`.
    async fn exists(&self, name: &UnitName) -> Result<bool>;

    /// List all units, including ones whose process has exited.
    ///
    /// # Errors
    ///
    /// Returns `Runtime` if the runtime rejects the request and `Transport`
    /// if it cannot be reached.
    async fn list(&self) -> Result<Vec<Unit>>;

    /// Look up a single unit.
    ///
    /// # Errors
    ///
    /// Returns an error only if the lookup itself fails; an absent unit is
    /// `Ok(None)`.
    async fn inspect(&self, name: &UnitName) -> Result<Option<Unit>> {
        Ok(self.list().await?.into_iter().find(|u| &u.name == name))
    }
}

#[async_trait]
impl<C: UnitRuntimeClient + ?Sized> UnitRuntimeClient for Arc<C> {
    async fn add(&self, request: &UnitRequest) -> Result<()> {
        (**self).add(request).await
    }

    async fn remove(&self, name: &UnitName) -> Result<()> {
        (**self).remove(name).await
    }

    async fn exists(&self, name: &UnitName) -> Result<bool> {
        (**self).exists(name).await
    }

    async fn list(&self) -> Result<Vec<Unit>> {
        (**self).list().await
    }

    async fn inspect(&self, name: &UnitName) -> Result<Option<Unit>> {
        (**self).inspect(name).await
    }
}

/// Lifecycle client over a [`RuntimeTransport`].
#[derive(Debug, Clone)]
pub struct RuntimeClient<T> {
    transport: T,
}

/// The production client: a [`RuntimeClient`] speaking HTTP.
pub type HttpRuntimeClient = RuntimeClient<HttpTransport>;

impl<T: RuntimeTransport> RuntimeClient<T> {
    /// Create a client over `transport`.
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Get a reference to the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }
}

impl RuntimeClient<HttpTransport> {
    /// Create an HTTP client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` if the configuration is invalid.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(HttpTransport::new(config)?))
    }
}

fn rejected(operation: Operation, response: RawResponse) -> ClientError {
    ClientError::Runtime {
        operation,
        status: response.status,
        body: response.body,
    }
}

fn decode_list(response: &RawResponse) -> Result<Vec<Unit>> {
    serde_json::from_str::<ContainerList>(&response.body)
        .map(ContainerList::into_units)
        .map_err(|e| ClientError::MalformedResponse {
            operation: Operation::List,
            message: e.to_string(),
        })
}

#[async_trait]
impl<T: RuntimeTransport> UnitRuntimeClient for RuntimeClient<T> {
    async fn add(&self, request: &UnitRequest) -> Result<()> {
        // The runtime may still reject a duplicate that appears after this
        // check; that surfaces as a Runtime error below.
        if self.exists(&request.name).await? {
            warn!(unit = %request.name, "Unit already exists, refusing to add");
            return Err(ClientError::AlreadyExists(request.name.clone()));
        }

        let response = self.transport.create_and_start(request).await?;
        if response.is_success() {
            info!(
                unit = %request.name,
                image = %request.image_name,
                ports = request.ports.len(),
                links = request.links.len(),
                environment = request.environment.is_some(),
                "Added unit"
            );
            Ok(())
        } else {
            error!(
                unit = %request.name,
                status = response.status,
                body = %response.body,
                "Runtime rejected unit creation"
            );
            Err(rejected(Operation::Add, response))
        }
    }

    async fn remove(&self, name: &UnitName) -> Result<()> {
        let response = self.transport.stop_and_remove(name).await?;
        if response.is_success() {
            info!(unit = %name, "Removed unit");
            Ok(())
        } else if response.is_not_found() {
            warn!(unit = %name, "Unit not found, already removed");
            Ok(())
        } else {
            error!(
                unit = %name,
                status = response.status,
                body = %response.body,
                "Runtime rejected unit removal"
            );
            Err(rejected(Operation::Remove, response))
        }
    }

    async fn exists(&self, name: &UnitName) -> Result<bool> {
        let found = self.list().await?.iter().any(|u| &u.name == name);
        debug!(unit = %name, found, "Checked unit existence");
        Ok(found)
    }

    async fn list(&self) -> Result<Vec<Unit>> {
        let response = self.transport.list_all().await?;
        if !response.is_success() {
            return Err(rejected(Operation::List, response));
        }
        decode_list(&response)
    }

    async fn inspect(&self, name: &UnitName) -> Result<Option<Unit>> {
        let response = self.transport.inspect(name).await?;
        if response.is_not_found() {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(rejected(Operation::Inspect, response));
        }

        let entry: ContainerEntry =
            serde_json::from_str(&response.body).map_err(|e| ClientError::MalformedResponse {
                operation: Operation::Inspect,
                message: e.to_string(),
            })?;
        Ok(entry.into_unit().filter(|u| &u.name == name))
    }
}
