//! Behavioural checks run against both in-process backends.

use std::sync::Arc;
use std::time::Duration;

use berth_client::testing::conformance::{self, EXITING_IMAGE, MISSING_IMAGE};
use berth_client::testing::{init_tracing, random_name};
use berth_client::{
    wait_for_state, ClientError, FakeRuntime, InMemoryClient, PollPolicy, RuntimeClient,
    UnitRuntimeClient,
};
use berth_core::{ActivationState, UnitRequest};

fn in_memory() -> InMemoryClient {
    init_tracing();
    InMemoryClient::new()
        .exit_immediately(EXITING_IMAGE)
        .missing_image(MISSING_IMAGE)
}

fn fake_runtime() -> Arc<FakeRuntime> {
    init_tracing();
    Arc::new(
        FakeRuntime::new()
            .exit_immediately(EXITING_IMAGE)
            .missing_image(MISSING_IMAGE),
    )
}

/// Expands to one test per check for a backend constructor.
macro_rules! conformance_tests {
    ($module:ident, $client:expr) => {
        mod $module {
            use super::*;

            #[tokio::test]
            async fn add_starts_unit() {
                conformance::add_starts_unit(&$client).await;
            }

            #[tokio::test]
            async fn missing_image_is_rejected() {
                conformance::missing_image_is_rejected(&$client).await;
            }

            #[tokio::test]
            async fn dead_units_are_listed() {
                conformance::dead_units_are_listed(&$client).await;
            }

            #[tokio::test]
            async fn unreachable_state_times_out() {
                conformance::unreachable_state_times_out(&$client).await;
            }

            #[tokio::test]
            async fn remove_is_idempotent() {
                conformance::remove_is_idempotent(&$client).await;
            }

            #[tokio::test]
            async fn exists_tracks_lifecycle() {
                conformance::exists_tracks_lifecycle(&$client).await;
            }

            #[tokio::test]
            async fn duplicate_add_is_rejected() {
                conformance::duplicate_add_is_rejected(&$client).await;
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn concurrent_units_are_independent() {
                conformance::concurrent_units_are_independent(&$client).await;
            }
        }
    };
}

conformance_tests!(in_memory_client, in_memory());
conformance_tests!(runtime_client_over_fake, RuntimeClient::new(fake_runtime()));

#[tokio::test]
async fn environment_reaches_process_in_memory() {
    let client = in_memory();
    conformance::environment_reaches_process(&client, |name| client.process_output(name)).await;
}

#[tokio::test]
async fn environment_reaches_process_over_fake_runtime() {
    let runtime = fake_runtime();
    let client = RuntimeClient::new(Arc::clone(&runtime));
    conformance::environment_reaches_process(&client, |name| runtime.process_output(name)).await;
}

#[tokio::test]
async fn wait_survives_transport_errors() {
    let runtime = fake_runtime();
    let client = RuntimeClient::new(Arc::clone(&runtime));
    let name = random_name();

    client
        .add(&UnitRequest::new(name.clone(), "openshift/busybox-http-app"))
        .await
        .unwrap();
    runtime.fail_next(3);

    let unit = wait_for_state(
        &client,
        &name,
        &[ActivationState::Active],
        Duration::from_secs(5),
        &PollPolicy::fixed(Duration::from_millis(5)),
    )
    .await
    .unwrap();
    assert_eq!(unit.activation_state, ActivationState::Active);
}

#[tokio::test]
async fn transport_errors_are_not_retried_outside_waits() {
    let runtime = fake_runtime();
    let client = RuntimeClient::new(Arc::clone(&runtime));
    runtime.fail_next(1);

    let err = client.list().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(client.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn wait_reports_not_found_for_absent_unit() {
    let client = in_memory();
    let err = wait_for_state(
        &client,
        &random_name(),
        &[ActivationState::Active],
        Duration::from_millis(20),
        &PollPolicy::fixed(Duration::from_millis(5)),
    )
    .await
    .unwrap_err();

    match err {
        ClientError::Timeout { last_observed, .. } => assert_eq!(last_observed, "not found"),
        other => panic!("expected Timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn shared_client_is_usable_as_trait_object() {
    let client: Arc<dyn UnitRuntimeClient> = Arc::new(in_memory());
    let name = random_name();
    client
        .add(&UnitRequest::new(name.clone(), "nginx"))
        .await
        .unwrap();
    assert!(client.exists(&name).await.unwrap());
    assert!(client.inspect(&name).await.unwrap().is_some());
    client.remove(&name).await.unwrap();
    assert!(client.inspect(&name).await.unwrap().is_none());
}
