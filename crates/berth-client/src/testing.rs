//! Helpers for tests that drive a unit runtime.

use std::net::TcpListener;
use std::sync::Once;

use berth_core::UnitName;

/// A unit name that will not collide with other tests.
#[must_use]
pub fn random_name() -> UnitName {
    let name = format!("berth-{}", uuid::Uuid::new_v4().simple());
    UnitName::new(name.as_str())
        .unwrap_or_else(|e| panic!("generated unit name {name} rejected: {e}"))
}

/// A host port that was free when this was called.
///
/// # Panics
///
/// Panics if no local port can be bound.
#[must_use]
pub fn find_free_port() -> u16 {
    TcpListener::bind(("127.0.0.1", 0))
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .unwrap_or_else(|e| panic!("no free local port: {e}"))
}

/// Install a test-friendly tracing subscriber once per process.
///
/// Honours `RUST_LOG`, defaulting to debug output for the berth crates.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info,berth_client=debug,berth_core=debug".into());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Behavioural checks every [`crate::UnitRuntimeClient`] must pass.
///
/// The backend under test must be set up so that
/// - [`RUNNING_IMAGE`] starts and stays active,
/// - [`EXITING_IMAGE`] starts and exits on its own,
/// - [`MISSING_IMAGE`] is rejected at creation.
///
/// Each check panics with a description when the backend misbehaves, and
/// removes the units it created.
#[allow(clippy::missing_panics_doc)]
pub mod conformance {
    use std::time::Duration;

    use berth_core::{ActivationState, Environment, EnvironmentId, UnitName, UnitRequest};
    use futures::future::join_all;

    use super::random_name;
    use crate::client::UnitRuntimeClient;
    use crate::error::ClientError;
    use crate::poll::PollPolicy;
    use crate::wait::{add_and_wait, wait_for_state};

    /// Image that starts a long-running process.
    pub const RUNNING_IMAGE: &str = "openshift/busybox-http-app";
    /// Image whose process exits immediately.
    pub const EXITING_IMAGE: &str = "busybox";
    /// Image the runtime cannot find.
    pub const MISSING_IMAGE: &str = "berth/no-such-image";

    /// How long a check waits for a unit to settle.
    pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

    fn policy() -> PollPolicy {
        PollPolicy::default().with_intervals(Duration::from_millis(5), Duration::from_millis(50))
    }

    async fn cleanup<C: UnitRuntimeClient + ?Sized>(client: &C, name: &UnitName) {
        if let Err(e) = client.remove(name).await {
            panic!("failed to remove {name} during cleanup: {e}");
        }
    }

    /// `add` creates a unit that then becomes active.
    pub async fn add_starts_unit<C: UnitRuntimeClient + ?Sized>(client: &C) {
        let name = random_name();
        let unit = add_and_wait(
            client,
            &UnitRequest::new(name.clone(), RUNNING_IMAGE),
            &[ActivationState::Active],
            SETTLE_TIMEOUT,
            &policy(),
        )
        .await
        .unwrap_or_else(|e| panic!("{name} never became active: {e}"));

        assert_eq!(unit.name, name);
        assert_eq!(unit.activation_state, ActivationState::Active);
        cleanup(client, &name).await;
    }

    /// `add` with an image the runtime cannot use fails with a rejection.
    pub async fn missing_image_is_rejected<C: UnitRuntimeClient + ?Sized>(client: &C) {
        let name = random_name();
        let err = client
            .add(&UnitRequest::new(name.clone(), MISSING_IMAGE))
            .await
            .expect_err("adding a unit with a missing image should fail");
        assert!(err.is_runtime_rejection(), "expected a runtime rejection, got {err}");
        cleanup(client, &name).await;
    }

    /// A unit whose process exits stays listed as inactive and dead.
    pub async fn dead_units_are_listed<C: UnitRuntimeClient + ?Sized>(client: &C) {
        let name = random_name();
        add_and_wait(
            client,
            &UnitRequest::new(name.clone(), EXITING_IMAGE),
            &[ActivationState::Inactive],
            SETTLE_TIMEOUT,
            &policy(),
        )
        .await
        .unwrap_or_else(|e| panic!("{name} never became inactive: {e}"));

        let units = client.list().await.expect("list should succeed");
        let unit = units
            .iter()
            .find(|u| u.name == name)
            .unwrap_or_else(|| panic!("{name} missing from listing after exit"));
        assert!(unit.is_dead(), "expected {name} dead, got {}", unit.describe_state());
        assert!(client.exists(&name).await.expect("exists should succeed"));
        cleanup(client, &name).await;
    }

    /// Waiting for a state the unit never reaches times out with the last
    /// observation.
    pub async fn unreachable_state_times_out<C: UnitRuntimeClient + ?Sized>(client: &C) {
        let name = random_name();
        client
            .add(&UnitRequest::new(name.clone(), RUNNING_IMAGE))
            .await
            .expect("add should succeed");

        let err = wait_for_state(
            client,
            &name,
            &[ActivationState::Failed],
            Duration::from_millis(1),
            &policy(),
        )
        .await
        .expect_err("waiting for an unreachable state should time out");
        match &err {
            ClientError::Timeout { last_observed, .. } => {
                assert!(!last_observed.is_empty(), "timeout should carry an observation");
            }
            other => panic!("expected Timeout, got {other}"),
        }
        cleanup(client, &name).await;
    }

    /// The environment given to `add` is visible to the unit's process.
    ///
    /// `process_output` returns what the unit prints when it enumerates its
    /// environment.
    pub async fn environment_reaches_process<C, F>(client: &C, process_output: F)
    where
        C: UnitRuntimeClient + ?Sized,
        F: Fn(&UnitName) -> Option<String>,
    {
        let name = random_name();
        let environment = Environment::new(
            EnvironmentId::new(format!("{name}-env")).expect("environment id is valid"),
            [("key1", "value1"), ("key2", "value2")],
        )
        .expect("environment is valid");

        add_and_wait(
            client,
            &UnitRequest::new(name.clone(), RUNNING_IMAGE).with_environment(environment),
            &[ActivationState::Active],
            SETTLE_TIMEOUT,
            &policy(),
        )
        .await
        .unwrap_or_else(|e| panic!("{name} never became active: {e}"));

        let output = process_output(&name).unwrap_or_default();
        for line in ["key1=value1\n", "key2=value2\n"] {
            assert!(output.contains(line), "{line:?} missing from {output:?}");
        }
        cleanup(client, &name).await;
    }

    /// Removing twice, or removing a unit that never existed, succeeds.
    pub async fn remove_is_idempotent<C: UnitRuntimeClient + ?Sized>(client: &C) {
        let name = random_name();
        client
            .add(&UnitRequest::new(name.clone(), RUNNING_IMAGE))
            .await
            .expect("add should succeed");

        client.remove(&name).await.expect("first remove should succeed");
        client.remove(&name).await.expect("second remove should succeed");
        client
            .remove(&random_name())
            .await
            .expect("removing a unit that never existed should succeed");
        assert!(!client.exists(&name).await.expect("exists should succeed"));
    }

    /// `exists` follows `add` and `remove`.
    pub async fn exists_tracks_lifecycle<C: UnitRuntimeClient + ?Sized>(client: &C) {
        let name = random_name();
        assert!(!client.exists(&name).await.expect("exists should succeed"));

        client
            .add(&UnitRequest::new(name.clone(), RUNNING_IMAGE))
            .await
            .expect("add should succeed");
        assert!(client.exists(&name).await.expect("exists should succeed"));

        client.remove(&name).await.expect("remove should succeed");
        assert!(!client.exists(&name).await.expect("exists should succeed"));
    }

    /// A second `add` with the same name is refused.
    pub async fn duplicate_add_is_rejected<C: UnitRuntimeClient + ?Sized>(client: &C) {
        let name = random_name();
        let request = UnitRequest::new(name.clone(), RUNNING_IMAGE);
        client.add(&request).await.expect("first add should succeed");

        let err = client
            .add(&request)
            .await
            .expect_err("second add should fail");
        assert!(err.is_runtime_rejection(), "expected a rejection, got {err}");
        cleanup(client, &name).await;
    }

    /// Operations on distinct names may run concurrently.
    pub async fn concurrent_units_are_independent<C: UnitRuntimeClient + ?Sized>(client: &C) {
        let names: Vec<UnitName> = (0..4).map(|_| random_name()).collect();
        let requests: Vec<UnitRequest> = names
            .iter()
            .map(|name| UnitRequest::new(name.clone(), RUNNING_IMAGE))
            .collect();
        let policy = policy();

        let added = join_all(requests.iter().map(|request| {
            add_and_wait(
                client,
                request,
                &[ActivationState::Active],
                SETTLE_TIMEOUT,
                &policy,
            )
        }))
        .await;
        for (name, result) in names.iter().zip(added) {
            result.unwrap_or_else(|e| panic!("{name} never became active: {e}"));
        }

        let listed = client.list().await.expect("list should succeed");
        for name in &names {
            assert!(listed.iter().any(|u| &u.name == name), "{name} missing from listing");
        }

        let removed = join_all(names.iter().map(|name| client.remove(name))).await;
        assert!(removed.iter().all(Result::is_ok), "concurrent removes failed: {removed:?}");
        for name in &names {
            assert!(!client.exists(name).await.expect("exists should succeed"));
        }
    }
}
