//! Unit descriptor model for berth.
//!
//! This crate provides the data types every other berth crate speaks:
//!
//! - **Identifiers**: [`UnitName`] and [`EnvironmentId`], validated against the
//!   runtime's naming rules
//! - **Descriptors**: [`PortMap`], [`Link`], [`Environment`] and [`UnitRequest`]
//! - **Observations**: [`Unit`] and its [`ActivationState`]
//!
//! Constructing any of these with structurally invalid data fails with a
//! [`ValidationError`] before anything reaches a runtime.
//!
//! # Example
//!
//! ```
//! use berth_core::{Environment, EnvironmentId, PortMap, UnitName, UnitRequest};
//!
//! let request = UnitRequest::new(UnitName::new("web")?, "openshift/busybox-http-app")
//!     .with_ports([PortMap::parse("8080:32768")?])
//!     .with_environment(Environment::new(
//!         EnvironmentId::new("E1")?,
//!         [("key1", "value1"), ("key2", "value2")],
//!     )?);
//!
//! assert_eq!(request.ports[0].external_port(), 32768);
//! assert!(UnitName::new("!!!###!!!").is_err());
//! # Ok::<(), berth_core::ValidationError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod environment;
pub mod error;
pub mod names;
pub mod ports;
pub mod unit;

pub use environment::Environment;
pub use error::{Result, ValidationError};
pub use names::{EnvironmentId, UnitName};
pub use ports::{Link, PortMap};
pub use unit::{ActivationState, Unit, UnitRequest};
