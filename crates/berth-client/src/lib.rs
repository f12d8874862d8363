//! Lifecycle client for a container unit runtime.
//!
//! This crate provides the [`UnitRuntimeClient`] trait and the
//! [`RuntimeClient`] implementation that drives a runtime daemon over HTTP.
//! It handles:
//!
//! - Creating and starting units with ports, links and an environment
//! - Stopping and removing units (idempotently)
//! - Listing units, including ones whose process has exited
//! - Waiting for a unit to reach a state, and for its ports to answer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Caller                                   │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 UnitRuntimeClient (trait)                        │
//! │  ┌───────────────────────────┐   ┌──────────────────────────┐  │
//! │  │ RuntimeClient<T>          │   │ InMemoryClient           │  │
//! │  │ (status classification)   │   │ (test-utils)             │  │
//! │  └───────────────────────────┘   └──────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//!                 │                              ▲
//!                 ▼                              │ list()
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │ RuntimeTransport (trait)     │   │ wait_for_state / loop_until  │
//! │  HttpTransport │ FakeRuntime │   │ (deadline-bounded polling)   │
//! └──────────────────────────────┘   └──────────────────────────────┘
//!                 │
//!                 ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Runtime daemon (HTTP API)                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use berth_client::{add_and_wait, ClientConfig, HttpRuntimeClient, UnitRuntimeClient};
//! use berth_core::{ActivationState, PortMap, UnitName, UnitRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env();
//! let client = HttpRuntimeClient::from_config(&config)?;
//!
//! let request = UnitRequest::new(UnitName::new("web")?, "openshift/busybox-http-app")
//!     .with_ports([PortMap::new(8080, 18080)?]);
//!
//! let unit = add_and_wait(
//!     &client,
//!     &request,
//!     &[ActivationState::Active],
//!     Duration::from_secs(30),
//!     &config.poll_policy(),
//! )
//! .await?;
//! println!("{} is {}", unit.name, unit.describe_state());
//!
//! client.remove(&request.name).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Testing
//!
//! For testing without a runtime daemon, enable the `test-utils` feature and
//! use the fakes:
//!
//! ```ignore
//! use berth_client::{InMemoryClient, UnitRuntimeClient};
//! use berth_core::{UnitName, UnitRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = InMemoryClient::new();
//! client.add(&UnitRequest::new(UnitName::new("web")?, "nginx")).await?;
//! assert_eq!(client.unit_count(), 1);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod poll;
pub mod transport;
pub mod wait;
pub mod wire;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use client::{HttpRuntimeClient, RuntimeClient, UnitRuntimeClient};
pub use config::ClientConfig;
pub use error::{ClientError, Operation, Result, TransportError, TransportErrorKind};
pub use http::HttpTransport;
pub use poll::{loop_until, PollPolicy, Probe, Verdict};
pub use transport::{RawResponse, RuntimeTransport};
pub use wait::{add_and_wait, request_until_response, wait_for_state};

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{FakeRuntime, InMemoryClient};
