//! Validation errors for unit descriptors.
//!
//! Every error here is raised synchronously while a descriptor is being
//! built, before anything is sent to the runtime.

use thiserror::Error;

/// A result type using `ValidationError`.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Errors produced when a descriptor is structurally invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A unit name or environment ID does not satisfy the naming rules.
    #[error("invalid {kind} {value:?}: {reason}")]
    InvalidName {
        /// What was being named ("unit name", "environment id").
        kind: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A port value is not a usable TCP port.
    #[error("invalid port {value:?}: {reason}")]
    InvalidPort {
        /// The rejected value, as supplied.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A port mapping or link string is not of the form `a:b`.
    #[error("invalid port mapping {0:?}: expected <port>:<port>")]
    InvalidMapping(String),

    /// An environment variable key is unusable.
    #[error("invalid environment variable name {key:?}: {reason}")]
    InvalidVariable {
        /// The rejected key.
        key: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The same environment variable key was supplied twice.
    #[error("duplicate environment variable {0:?}")]
    DuplicateVariable(String),
}
