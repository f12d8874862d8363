//! JSON bodies exchanged with the runtime's HTTP API.
//!
//! The runtime uses PascalCase field names for containers and lowercase
//! names inside environment definitions.

use berth_core::{ActivationState, Unit, UnitName, UnitRequest};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Body of `PUT /container/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateContainer {
    /// Image reference.
    pub image: String,
    /// Start the unit immediately after creation.
    pub started: bool,
    /// Exposed ports.
    #[serde(default)]
    pub ports: Vec<PortBinding>,
    /// Network links.
    #[serde(default)]
    pub network_links: Vec<NetworkLink>,
    /// Injected environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvironmentBody>,
}

impl CreateContainer {
    /// Build the body for a request. `link_host` is the host every link
    /// forwards to.
    #[must_use]
    pub fn from_request(request: &UnitRequest, link_host: &str) -> Self {
        Self {
            image: request.image_name.clone(),
            started: true,
            ports: request
                .ports
                .iter()
                .map(|p| PortBinding {
                    internal: p.internal_port(),
                    external: p.external_port(),
                })
                .collect(),
            network_links: request
                .links
                .iter()
                .map(|l| NetworkLink {
                    from_host: "127.0.0.1".to_string(),
                    from_port: l.local_port(),
                    to_host: link_host.to_string(),
                    to_port: l.remote_port(),
                })
                .collect(),
            environment: request.environment.as_ref().map(|env| EnvironmentBody {
                id: env.id().to_string(),
                variables: env
                    .variables()
                    .map(|(name, value)| Variable {
                        name: name.to_string(),
                        value: value.to_string(),
                    })
                    .collect(),
            }),
        }
    }
}

/// One exposed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortBinding {
    /// Port inside the unit.
    pub internal: u16,
    /// Port on the host.
    pub external: u16,
}

/// One network link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkLink {
    /// Address inside the unit the link listens on.
    pub from_host: String,
    /// Port inside the unit.
    pub from_port: u16,
    /// Host traffic is forwarded to.
    pub to_host: String,
    /// Port on that host.
    pub to_port: u16,
}

/// An environment definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentBody {
    /// Environment ID.
    pub id: String,
    /// Variables, in key order.
    pub variables: Vec<Variable>,
}

/// One environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    /// Variable name.
    pub name: String,
    /// Variable value.
    pub value: String,
}

/// Body of `GET /containers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerList {
    /// Every unit the runtime knows about, including exited ones.
    #[serde(rename = "Containers", default)]
    pub containers: Vec<ContainerEntry>,
}

impl ContainerList {
    /// Convert to units, dropping entries whose names this client cannot
    /// represent.
    #[must_use]
    pub fn into_units(self) -> Vec<Unit> {
        self.containers
            .into_iter()
            .filter_map(ContainerEntry::into_unit)
            .collect()
    }
}

/// One unit as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerEntry {
    /// Unit name.
    pub id: String,
    /// Activation state, e.g. `active`.
    pub active_state: String,
    /// Sub-state, e.g. `dead`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_state: Option<String>,
    /// Image the unit runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ContainerEntry {
    /// Convert to a [`Unit`] observation.
    ///
    /// Returns `None` if the runtime reports a name that does not satisfy
    /// the client's naming rules.
    #[must_use]
    pub fn into_unit(self) -> Option<Unit> {
        let name = match UnitName::new(self.id.as_str()) {
            Ok(name) => name,
            Err(e) => {
                warn!(id = %self.id, error = %e, "Ignoring runtime unit with unusable name");
                return None;
            }
        };

        let mut unit = Unit::observed(name, ActivationState::from_runtime(&self.active_state));
        unit.sub_state = self.sub_state.filter(|s| !s.is_empty());
        unit.container_image = self.image;
        Some(unit)
    }

    /// Build an entry from a unit observation.
    #[must_use]
    pub fn from_unit(unit: &Unit) -> Self {
        Self {
            id: unit.name.to_string(),
            active_state: unit.activation_state.to_string(),
            sub_state: unit.sub_state.clone(),
            image: unit.container_image.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_core::{Environment, EnvironmentId, Link, PortMap};
    use serde_json::json;

    #[test]
    fn create_body_matches_runtime_api() {
        let request = UnitRequest::new(UnitName::new("web").unwrap(), "busybox")
            .with_ports([PortMap::new(8080, 32768).unwrap()])
            .with_links([Link::new(5432, 15432).unwrap()])
            .with_environment(
                Environment::new(
                    EnvironmentId::new("E1").unwrap(),
                    [("key2", "value2"), ("key1", "value1")],
                )
                .unwrap(),
            );

        let body =
            serde_json::to_value(CreateContainer::from_request(&request, "10.0.0.1")).unwrap();
        assert_eq!(
            body,
            json!({
                "Image": "busybox",
                "Started": true,
                "Ports": [{"Internal": 8080, "External": 32768}],
                "NetworkLinks": [{
                    "FromHost": "127.0.0.1",
                    "FromPort": 5432,
                    "ToHost": "10.0.0.1",
                    "ToPort": 15432
                }],
                "Environment": {
                    "id": "E1",
                    "variables": [
                        {"name": "key1", "value": "value1"},
                        {"name": "key2", "value": "value2"}
                    ]
                }
            })
        );
    }

    #[test]
    fn create_body_omits_missing_environment() {
        let request = UnitRequest::new(UnitName::new("web").unwrap(), "busybox");
        let body =
            serde_json::to_value(CreateContainer::from_request(&request, "127.0.0.1")).unwrap();
        assert!(body.get("Environment").is_none());
        assert_eq!(body["Ports"], json!([]));
        assert_eq!(body["NetworkLinks"], json!([]));
    }

    #[test]
    fn container_list_keeps_dead_units() {
        let list: ContainerList = serde_json::from_value(json!({
            "Containers": [
                {"Id": "web", "ActiveState": "active", "SubState": "running", "Image": "busybox"},
                {"Id": "job", "ActiveState": "inactive", "SubState": "dead"},
                {"Id": "bad name!", "ActiveState": "active"}
            ]
        }))
        .unwrap();

        let units = list.into_units();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].activation_state, ActivationState::Active);
        assert_eq!(units[0].container_image.as_deref(), Some("busybox"));
        assert!(units[1].is_dead());
    }

    #[test]
    fn empty_sub_state_is_none() {
        let entry = ContainerEntry {
            id: "web".to_string(),
            active_state: "activating".to_string(),
            sub_state: Some(String::new()),
            image: None,
        };
        let unit = entry.into_unit().unwrap();
        assert_eq!(unit.sub_state, None);
        assert_eq!(unit.activation_state, ActivationState::Activating);
    }
}
