//! Waiting for units to reach a state and for their ports to answer.
//!
//! Both waits are instances of [`loop_until`]. Transport failures are
//! treated as "not ready yet" until the deadline; runtime rejections end
//! the wait immediately.

use std::time::Duration;

use berth_core::{ActivationState, Unit, UnitName, UnitRequest};
use tracing::{debug, info};

use crate::client::UnitRuntimeClient;
use crate::error::{ClientError, Result};
use crate::poll::{loop_until, PollPolicy, Probe};

/// Observation text used when the unit is absent from the listing.
pub const NOT_FOUND: &str = "not found";

fn describe_states(states: &[ActivationState]) -> String {
    states
        .iter()
        .map(ActivationState::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Wait until the runtime reports `name` in one of the `expected` states.
///
/// Returns the first matching observation. The first lookup happens
/// immediately, so a unit that is already in an expected state is returned
/// without delay.
///
/// # Errors
///
/// Returns `ClientError::Timeout` with the last observed state (or
/// [`NOT_FOUND`]) if the deadline passes, and any non-transport error from
/// `list` as soon as it happens.
pub async fn wait_for_state<C>(
    client: &C,
    name: &UnitName,
    expected: &[ActivationState],
    timeout: Duration,
    policy: &PollPolicy,
) -> Result<Unit>
where
    C: UnitRuntimeClient + ?Sized,
{
    debug!(unit = %name, expected = %describe_states(expected), ?timeout, "Waiting for unit state");

    let unit = loop_until(policy, timeout, move || async move {
        match client.list().await {
            Ok(units) => match units.into_iter().find(|u| &u.name == name) {
                Some(unit) if expected.contains(&unit.activation_state) => Probe::Ready(unit),
                Some(unit) => Probe::Pending(unit.describe_state()),
                None => Probe::Pending(NOT_FOUND.to_string()),
            },
            Err(ClientError::Transport(e)) => Probe::Pending(format!("transport error: {e}")),
            Err(e) => Probe::Failed(e),
        }
    })
    .await?;

    info!(unit = %name, state = %unit.describe_state(), "Unit reached expected state");
    Ok(unit)
}

/// Add a unit, then wait for it to reach one of the `expected` states.
///
/// The wait starts only after `add` has returned. A unit that never reaches
/// the expected state is left in place; removing it is up to the caller.
///
/// # Errors
///
/// Returns any error from `add`, or the error from [`wait_for_state`].
pub async fn add_and_wait<C>(
    client: &C,
    request: &UnitRequest,
    expected: &[ActivationState],
    timeout: Duration,
    policy: &PollPolicy,
) -> Result<Unit>
where
    C: UnitRuntimeClient + ?Sized,
{
    client.add(request).await?;
    wait_for_state(client, &request.name, expected, timeout, policy).await
}

/// Send `GET url` until the server answers.
///
/// A freshly started unit may be running before the server inside it has
/// bound its socket. Refused connections, timeouts and connections closed
/// before a response are retried until the deadline; any HTTP response,
/// whatever its status, ends the wait.
///
/// # Errors
///
/// Returns `ClientError::Timeout` if no response arrives before the
/// deadline, and `ClientError::Config` if the request cannot be built
/// (e.g. an unparseable URL).
pub async fn request_until_response(
    http: &reqwest::Client,
    url: &str,
    timeout: Duration,
    policy: &PollPolicy,
) -> Result<reqwest::Response> {
    let response = loop_until(policy, timeout, move || async move {
        match http.get(url).send().await {
            Ok(response) => Probe::Ready(response),
            Err(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
                Probe::Pending(e.to_string())
            }
            Err(e) => Probe::Failed(ClientError::from(e)),
        }
    })
    .await?;

    debug!(url, status = %response.status(), "Endpoint answered");
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_states_joins() {
        assert_eq!(
            describe_states(&[ActivationState::Active, ActivationState::Inactive]),
            "active, inactive"
        );
        assert_eq!(describe_states(&[]), "");
    }

    #[tokio::test]
    async fn invalid_url_fails_fast() {
        let http = reqwest::Client::new();
        let err = request_until_response(
            &http,
            "not a url",
            Duration::from_secs(5),
            &PollPolicy::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)), "got {err:?}");
    }
}
