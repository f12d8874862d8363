//! In-memory runtimes for testing without a container daemon.
//!
//! [`FakeRuntime`] is a [`RuntimeTransport`] that answers the way the real
//! runtime's HTTP API does, so a [`crate::RuntimeClient`] can be exercised end
//! to end. [`InMemoryClient`] implements [`UnitRuntimeClient`] directly.
//!
//! Both simulate the runtime's asynchronous behaviour: a new unit is
//! reported as `activating` for a configurable number of observations
//! before it settles. Images registered with `exit_immediately` settle as
//! `inactive`/`dead`; every other image settles as `active`/`running`.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use berth_core::{ActivationState, Unit, UnitName, UnitRequest};
use parking_lot::Mutex;

use crate::client::UnitRuntimeClient;
use crate::error::{ClientError, Operation, Result, TransportError, TransportErrorKind};
use crate::transport::{RawResponse, RuntimeTransport};
use crate::wire::{ContainerEntry, ContainerList, CreateContainer};

/// Host used for network links in bodies built by [`FakeRuntime`].
const FAKE_LINK_HOST: &str = "127.0.0.1";

struct FakeUnit {
    body: CreateContainer,
    state: ActivationState,
    sub_state: String,
    settles_as: (ActivationState, &'static str),
    observations_left: u32,
}

impl FakeUnit {
    fn observe(&mut self, name: &UnitName) -> Unit {
        if self.state == ActivationState::Activating {
            if self.observations_left == 0 {
                let (state, sub_state) = self.settles_as.clone();
                self.state = state;
                self.sub_state = sub_state.to_string();
            } else {
                self.observations_left -= 1;
            }
        }

        Unit::observed(name.clone(), self.state.clone())
            .with_sub_state(self.sub_state.clone())
            .with_image(self.body.image.clone())
    }

    /// What `env` prints inside the unit.
    fn process_output(&self) -> String {
        self.body
            .environment
            .iter()
            .flat_map(|env| env.variables.iter())
            .map(|v| format!("{}={}\n", v.name, v.value))
            .collect()
    }
}

/// A rejection the fake host produces, as a status code and body.
struct Rejection(u16, String);

#[derive(Default)]
struct FakeHostState {
    units: BTreeMap<UnitName, FakeUnit>,
    exiting_images: HashSet<String>,
    missing_images: HashSet<String>,
    activation_observations: u32,
    transport_failures: u32,
}

impl FakeHostState {
    fn take_transport_failure(&mut self) -> std::result::Result<(), TransportError> {
        if self.transport_failures > 0 {
            self.transport_failures -= 1;
            return Err(TransportError::connect("connection refused (injected)"));
        }
        Ok(())
    }

    fn create(
        &mut self,
        name: &UnitName,
        body: CreateContainer,
    ) -> std::result::Result<(), Rejection> {
        if self.units.contains_key(name) {
            return Err(Rejection(409, format!("container {name} already exists")));
        }
        if self.missing_images.contains(&body.image) {
            return Err(Rejection(400, format!("image {} could not be found", body.image)));
        }

        let settles_as = if self.exiting_images.contains(&body.image) {
            (ActivationState::Inactive, "dead")
        } else {
            (ActivationState::Active, "running")
        };
        self.units.insert(
            name.clone(),
            FakeUnit {
                body,
                state: ActivationState::Activating,
                sub_state: "start".to_string(),
                settles_as,
                observations_left: self.activation_observations,
            },
        );
        Ok(())
    }

    fn observe_all(&mut self) -> Vec<Unit> {
        self.units
            .iter_mut()
            .map(|(name, unit)| unit.observe(name))
            .collect()
    }
}

/// Shared configuration surface of the two fakes.
macro_rules! fake_host_builders {
    () => {
        /// Units created from `image` exit as soon as they start.
        #[must_use]
        pub fn exit_immediately(self, image: impl Into<String>) -> Self {
            self.state.lock().exiting_images.insert(image.into());
            self
        }

        /// Creating a unit from `image` is rejected as if the image did not exist.
        #[must_use]
        pub fn missing_image(self, image: impl Into<String>) -> Self {
            self.state.lock().missing_images.insert(image.into());
            self
        }

        /// Number of observations a new unit stays `activating` for.
        #[must_use]
        pub fn activation_observations(self, observations: u32) -> Self {
            self.state.lock().activation_observations = observations;
            self
        }

        /// Make the next `count` calls fail as if the runtime refused the
        /// connection.
        pub fn fail_next(&self, count: u32) {
            self.state.lock().transport_failures = count;
        }

        /// Number of units currently recorded.
        #[must_use]
        pub fn unit_count(&self) -> usize {
            self.state.lock().units.len()
        }

        /// Simulate the unit's process exiting on its own.
        pub fn stop_unit(&self, name: &UnitName) {
            if let Some(unit) = self.state.lock().units.get_mut(name) {
                unit.state = ActivationState::Inactive;
                unit.sub_state = "dead".to_string();
            }
        }

        /// What the unit's process prints when it enumerates its
        /// environment, one `key=value` line per variable.
        #[must_use]
        pub fn process_output(&self, name: &UnitName) -> Option<String> {
            self.state.lock().units.get(name).map(FakeUnit::process_output)
        }
    };
}

/// A fake runtime answering like the real HTTP API.
///
/// Create requests go through the same body encoding as
/// [`crate::HttpTransport`], so the fake only ever sees what would have
/// crossed the wire.
pub struct FakeRuntime {
    state: Mutex<FakeHostState>,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRuntime {
    /// Create an empty fake runtime. New units stay `activating` for one
    /// observation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeHostState {
                activation_observations: 1,
                ..FakeHostState::default()
            }),
        }
    }

    fake_host_builders!();

    fn json<T: serde::Serialize>(status: u16, value: &T) -> RawResponse {
        match serde_json::to_string(value) {
            Ok(body) => RawResponse::new(status, body),
            Err(e) => RawResponse::new(500, e.to_string()),
        }
    }
}

#[async_trait]
impl RuntimeTransport for FakeRuntime {
    async fn create_and_start(
        &self,
        request: &UnitRequest,
    ) -> std::result::Result<RawResponse, TransportError> {
        let mut state = self.state.lock();
        state.take_transport_failure()?;

        // Decode from JSON like the real runtime would.
        let encoded = serde_json::to_vec(&CreateContainer::from_request(request, FAKE_LINK_HOST))
            .map_err(|e| TransportError::new(TransportErrorKind::Request, e.to_string()))?;
        let body: CreateContainer = match serde_json::from_slice(&encoded) {
            Ok(body) => body,
            Err(e) => return Ok(RawResponse::new(400, e.to_string())),
        };

        Ok(match state.create(&request.name, body) {
            Ok(()) => RawResponse::new(202, ""),
            Err(Rejection(status, body)) => RawResponse::new(status, body),
        })
    }

    async fn stop_and_remove(
        &self,
        name: &UnitName,
    ) -> std::result::Result<RawResponse, TransportError> {
        let mut state = self.state.lock();
        state.take_transport_failure()?;

        Ok(match state.units.remove(name) {
            Some(_) => RawResponse::new(204, ""),
            None => RawResponse::new(404, format!("container {name} not found")),
        })
    }

    async fn inspect(&self, name: &UnitName) -> std::result::Result<RawResponse, TransportError> {
        let mut state = self.state.lock();
        state.take_transport_failure()?;

        Ok(match state.units.get_mut(name) {
            Some(unit) => Self::json(200, &ContainerEntry::from_unit(&unit.observe(name))),
            None => RawResponse::new(404, format!("container {name} not found")),
        })
    }

    async fn list_all(&self) -> std::result::Result<RawResponse, TransportError> {
        let mut state = self.state.lock();
        state.take_transport_failure()?;

        let list = ContainerList {
            containers: state
                .observe_all()
                .iter()
                .map(ContainerEntry::from_unit)
                .collect(),
        };
        Ok(Self::json(200, &list))
    }
}

/// An in-memory [`UnitRuntimeClient`].
pub struct InMemoryClient {
    state: Mutex<FakeHostState>,
}

impl Default for InMemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryClient {
    /// Create an empty client. New units stay `activating` for one
    /// observation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeHostState {
                activation_observations: 1,
                ..FakeHostState::default()
            }),
        }
    }

    fake_host_builders!();
}

#[async_trait]
impl UnitRuntimeClient for InMemoryClient {
    async fn add(&self, request: &UnitRequest) -> Result<()> {
        let mut state = self.state.lock();
        state.take_transport_failure()?;

        if state.units.contains_key(&request.name) {
            return Err(ClientError::AlreadyExists(request.name.clone()));
        }
        state
            .create(&request.name, CreateContainer::from_request(request, FAKE_LINK_HOST))
            .map_err(|Rejection(status, body)| ClientError::Runtime {
                operation: Operation::Add,
                status,
                body,
            })
    }

    async fn remove(&self, name: &UnitName) -> Result<()> {
        let mut state = self.state.lock();
        state.take_transport_failure()?;
        state.units.remove(name);
        Ok(())
    }

    async fn exists(&self, name: &UnitName) -> Result<bool> {
        let mut state = self.state.lock();
        state.take_transport_failure()?;
        Ok(state.units.contains_key(name))
    }

    async fn list(&self) -> Result<Vec<Unit>> {
        let mut state = self.state.lock();
        state.take_transport_failure()?;
        Ok(state.observe_all())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RuntimeClient;
    use berth_core::{Environment, EnvironmentId};

    fn name(s: &str) -> UnitName {
        UnitName::new(s).unwrap()
    }

    #[tokio::test]
    async fn fake_unit_activates_after_observations() {
        let client = InMemoryClient::new().activation_observations(2);
        client.add(&UnitRequest::new(name("web"), "nginx")).await.unwrap();

        let states: Vec<_> = {
            let mut states = Vec::new();
            for _ in 0..4 {
                states.push(client.list().await.unwrap()[0].describe_state());
            }
            states
        };
        assert_eq!(
            states,
            vec!["activating/start", "activating/start", "active/running", "active/running"]
        );
    }

    #[tokio::test]
    async fn exiting_image_settles_dead() {
        let client = InMemoryClient::new()
            .activation_observations(0)
            .exit_immediately("busybox");
        client.add(&UnitRequest::new(name("job"), "busybox")).await.unwrap();

        let units = client.list().await.unwrap();
        assert!(units[0].is_dead());
    }

    #[tokio::test]
    async fn fake_runtime_speaks_wire_format() {
        let runtime = FakeRuntime::new();
        let env =
            Environment::new(EnvironmentId::new("E1").unwrap(), [("key1", "value1")]).unwrap();
        let request = UnitRequest::new(name("web"), "nginx").with_environment(env);

        assert_eq!(runtime.create_and_start(&request).await.unwrap().status, 202);
        assert_eq!(runtime.create_and_start(&request).await.unwrap().status, 409);

        let listed = runtime.list_all().await.unwrap();
        assert!(listed.body.contains(r#""Id":"web""#));
        assert!(listed.body.contains(r#""ActiveState":"activating""#));

        assert_eq!(runtime.process_output(&name("web")).as_deref(), Some("key1=value1\n"));

        assert_eq!(runtime.stop_and_remove(&name("web")).await.unwrap().status, 204);
        assert_eq!(runtime.stop_and_remove(&name("web")).await.unwrap().status, 404);
        assert_eq!(runtime.inspect(&name("web")).await.unwrap().status, 404);
    }

    #[tokio::test]
    async fn injected_transport_failures_are_consumed() {
        let runtime = FakeRuntime::new();
        runtime.fail_next(2);
        assert!(runtime.list_all().await.is_err());
        assert!(runtime.list_all().await.is_err());
        assert!(runtime.list_all().await.is_ok());
    }

    #[tokio::test]
    async fn missing_image_is_a_runtime_rejection() {
        let client = RuntimeClient::new(FakeRuntime::new().missing_image("no/such-image"));
        let err = client
            .add(&UnitRequest::new(name("web"), "no/such-image"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(400));

        let in_memory = InMemoryClient::new().missing_image("no/such-image");
        let err = in_memory
            .add(&UnitRequest::new(name("web"), "no/such-image"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(400));
    }

    #[tokio::test]
    async fn stop_unit_marks_dead() {
        let client = InMemoryClient::new();
        client.add(&UnitRequest::new(name("web"), "nginx")).await.unwrap();
        client.stop_unit(&name("web"));
        assert!(client.list().await.unwrap()[0].is_dead());
        assert_eq!(client.unit_count(), 1);
    }
}
