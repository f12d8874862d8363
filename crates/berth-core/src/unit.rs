//! Units, their lifecycle states, and the descriptor used to create them.
//!
//! # State Machine
//!
//! ```text
//!   ┌──────────┐   add    ┌────────────┐          ┌──────────┐
//!   │ inactive │ ───────▶ │ activating │ ───────▶ │  active  │
//!   └──────────┘          └────────────┘          └────┬─────┘
//!        ▲                                              │ stop / exit
//!        │                ┌──────────────┐              │
//!        └─────────────── │ deactivating │ ◀────────────┘
//!      (sub-state: dead)  └──────────────┘
//! ```
//!
//! Every transition is driven by the runtime. The client requests actions
//! and observes the result; it never moves a unit between states itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::environment::Environment;
use crate::names::UnitName;
use crate::ports::{Link, PortMap};

/// Sub-state reported for a unit whose process has exited.
pub const SUB_STATE_DEAD: &str = "dead";

/// Activation state of a unit, as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivationState {
    /// Not started, fully torn down, or exited.
    Inactive,
    /// Start accepted, not yet confirmed running.
    Activating,
    /// Confirmed running.
    Active,
    /// Stop requested, not yet confirmed stopped.
    Deactivating,
    /// The runtime gave up on the unit.
    Failed,
    /// The runtime is reloading the unit's configuration.
    Reloading,
    /// A state this client does not know; kept verbatim.
    Unknown(String),
}

impl ActivationState {
    /// Parse a state string as reported by the runtime.
    #[must_use]
    pub fn from_runtime(state: &str) -> Self {
        match state {
            "inactive" => Self::Inactive,
            "activating" => Self::Activating,
            "active" => Self::Active,
            "deactivating" => Self::Deactivating,
            "failed" => Self::Failed,
            "reloading" => Self::Reloading,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The state string as the runtime spells it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Inactive => "inactive",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Deactivating => "deactivating",
            Self::Failed => "failed",
            Self::Reloading => "reloading",
            Self::Unknown(other) => other,
        }
    }

    /// Whether the unit is between two stable states.
    #[must_use]
    pub const fn is_transitional(&self) -> bool {
        matches!(self, Self::Activating | Self::Deactivating | Self::Reloading)
    }
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ActivationState {
    fn from(value: String) -> Self {
        Self::from_runtime(&value)
    }
}

impl From<ActivationState> for String {
    fn from(state: ActivationState) -> Self {
        state.as_str().to_string()
    }
}

/// A unit as observed from the runtime.
///
/// A `Unit` is a snapshot: `observed_at` records when the runtime was asked.
/// Nothing about it is kept up to date after the observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Name of the unit.
    pub name: UnitName,
    /// Activation state at observation time.
    pub activation_state: ActivationState,
    /// Runtime sub-state, e.g. `running` or `dead`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_state: Option<String>,
    /// Image the unit was created from, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_image: Option<String>,
    /// Exposed ports, when reported.
    #[serde(default)]
    pub ports: Vec<PortMap>,
    /// Network links, when reported.
    #[serde(default)]
    pub links: Vec<Link>,
    /// Injected environment, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    /// When the runtime was asked about this unit.
    pub observed_at: DateTime<Utc>,
}

impl Unit {
    /// Create an observation with no descriptor details.
    #[must_use]
    pub fn observed(name: UnitName, activation_state: ActivationState) -> Self {
        Self {
            name,
            activation_state,
            sub_state: None,
            container_image: None,
            ports: Vec::new(),
            links: Vec::new(),
            environment: None,
            observed_at: Utc::now(),
        }
    }

    /// Set the sub-state.
    #[must_use]
    pub fn with_sub_state(mut self, sub_state: impl Into<String>) -> Self {
        self.sub_state = Some(sub_state.into());
        self
    }

    /// Set the image name.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.container_image = Some(image.into());
        self
    }

    /// Whether the unit's process has exited but its record still exists.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.activation_state == ActivationState::Inactive
            && self.sub_state.as_deref() == Some(SUB_STATE_DEAD)
    }

    /// A short `state/sub-state` description for diagnostics.
    #[must_use]
    pub fn describe_state(&self) -> String {
        match &self.sub_state {
            Some(sub) => format!("{}/{sub}", self.activation_state),
            None => self.activation_state.to_string(),
        }
    }
}

/// Everything needed to create and start a unit.
///
/// Ports and links are fixed once the request is handed to `add`; changing
/// a request afterwards has no effect on the running unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRequest {
    /// Name of the unit to create.
    pub name: UnitName,
    /// Image reference, resolved by the runtime.
    pub image_name: String,
    /// Ports to expose, in order.
    #[serde(default)]
    pub ports: Vec<PortMap>,
    /// Links to establish, in order.
    #[serde(default)]
    pub links: Vec<Link>,
    /// Environment to inject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
}

impl UnitRequest {
    /// Start a request for `name` running `image_name`.
    #[must_use]
    pub fn new(name: UnitName, image_name: impl Into<String>) -> Self {
        Self {
            name,
            image_name: image_name.into(),
            ports: Vec::new(),
            links: Vec::new(),
            environment: None,
        }
    }

    /// Set the exposed ports.
    #[must_use]
    pub fn with_ports(mut self, ports: impl IntoIterator<Item = PortMap>) -> Self {
        self.ports = ports.into_iter().collect();
        self
    }

    /// Set the network links.
    #[must_use]
    pub fn with_links(mut self, links: impl IntoIterator<Item = Link>) -> Self {
        self.links = links.into_iter().collect();
        self
    }

    /// Set the injected environment.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::EnvironmentId;

    fn name(s: &str) -> UnitName {
        UnitName::new(s).unwrap()
    }

    #[test]
    fn activation_state_from_runtime() {
        assert_eq!(ActivationState::from_runtime("inactive"), ActivationState::Inactive);
        assert_eq!(ActivationState::from_runtime("activating"), ActivationState::Activating);
        assert_eq!(ActivationState::from_runtime("active"), ActivationState::Active);
        assert_eq!(
            ActivationState::from_runtime("deactivating"),
            ActivationState::Deactivating
        );
        assert_eq!(ActivationState::from_runtime("failed"), ActivationState::Failed);
        assert_eq!(
            ActivationState::from_runtime("maintenance"),
            ActivationState::Unknown("maintenance".to_string())
        );
    }

    #[test]
    fn activation_state_round_trips_unknown_verbatim() {
        let state = ActivationState::from_runtime("maintenance");
        assert_eq!(state.as_str(), "maintenance");
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, "\"maintenance\"");
    }

    #[test]
    fn transitional_states() {
        assert!(ActivationState::Activating.is_transitional());
        assert!(ActivationState::Deactivating.is_transitional());
        assert!(!ActivationState::Active.is_transitional());
        assert!(!ActivationState::Inactive.is_transitional());
    }

    #[test]
    fn dead_unit_detection() {
        let dead = Unit::observed(name("job"), ActivationState::Inactive).with_sub_state("dead");
        assert!(dead.is_dead());
        assert_eq!(dead.describe_state(), "inactive/dead");

        let inactive = Unit::observed(name("job"), ActivationState::Inactive);
        assert!(!inactive.is_dead());
        assert_eq!(inactive.describe_state(), "inactive");

        let active = Unit::observed(name("job"), ActivationState::Active).with_sub_state("dead");
        assert!(!active.is_dead());
    }

    #[test]
    fn unit_request_builder() {
        let env = Environment::new(EnvironmentId::new("E1").unwrap(), [("k", "v")]).unwrap();
        let request = UnitRequest::new(name("web"), "busybox")
            .with_ports([PortMap::new(8080, 32768).unwrap()])
            .with_links([Link::new(5432, 15432).unwrap()])
            .with_environment(env.clone());

        assert_eq!(request.name.as_str(), "web");
        assert_eq!(request.image_name, "busybox");
        assert_eq!(request.ports.len(), 1);
        assert_eq!(request.links.len(), 1);
        assert_eq!(request.environment, Some(env));
    }

    #[test]
    fn unit_serde_skips_empty_options() {
        let unit = Unit::observed(name("web"), ActivationState::Active);
        let json = serde_json::to_value(&unit).unwrap();
        assert_eq!(json["activation_state"], "active");
        assert!(json.get("sub_state").is_none());
        assert!(json.get("environment").is_none());
    }

    #[test]
    fn request_with_invalid_name_does_not_decode() {
        let err = serde_json::from_value::<UnitRequest>(serde_json::json!({
            "name": "!!!###!!!",
            "image_name": "busybox",
        }))
        .unwrap_err();
        assert!(err.to_string().contains("invalid unit name"), "got {err}");

        let request: UnitRequest = serde_json::from_value(serde_json::json!({
            "name": "web",
            "image_name": "busybox",
        }))
        .unwrap();
        assert_eq!(request, UnitRequest::new(name("web"), "busybox"));
    }
}
