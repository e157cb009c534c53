//! Then steps for integration lifecycle BDD scenarios.

use super::world::IntegrationWorld;
use rstest_bdd_macros::then;
use tasklink::integration::{domain::IntegrationStatus, services::IntegrationLifecycleError};

#[then(r#"the integration status is "{status}""#)]
fn integration_status_is(world: &IntegrationWorld, status: String) -> Result<(), eyre::Report> {
    let expected = IntegrationStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let actual = world.integration()?.status();
    if actual != expected {
        return Err(eyre::eyre!("expected status {expected}, found {actual}"));
    }
    Ok(())
}

#[then("the integration holds an access token")]
fn holds_access_token(world: &IntegrationWorld) -> Result<(), eyre::Report> {
    if !world.integration()?.has_access_token() {
        return Err(eyre::eyre!("expected an access token"));
    }
    Ok(())
}

#[then("the integration holds no access token")]
fn holds_no_access_token(world: &IntegrationWorld) -> Result<(), eyre::Report> {
    if world.integration()?.has_access_token() {
        return Err(eyre::eyre!("expected the access token to be wiped"));
    }
    Ok(())
}

#[then(r#"the last error mentions "{fragment}""#)]
fn last_error_mentions(world: &IntegrationWorld, fragment: String) -> Result<(), eyre::Report> {
    let last_error = world
        .integration()?
        .last_error()
        .ok_or_else(|| eyre::eyre!("expected a recorded error"))?;
    if !last_error.contains(fragment.as_str()) {
        return Err(eyre::eyre!("expected error containing {fragment:?}, found {last_error:?}"));
    }
    Ok(())
}

#[then("the integration has no recorded error")]
fn no_recorded_error(world: &IntegrationWorld) -> Result<(), eyre::Report> {
    if let Some(last_error) = world.integration()?.last_error() {
        return Err(eyre::eyre!("expected no error, found {last_error:?}"));
    }
    Ok(())
}

#[then("the request is refused because the integration is inactive")]
fn refused_as_inactive(world: &IntegrationWorld) -> Result<(), eyre::Report> {
    match &world.last_result {
        Some(Err(IntegrationLifecycleError::Inactive(_))) => Ok(()),
        Some(other) => Err(eyre::eyre!("expected an inactive refusal, found {other:?}")),
        None => Err(eyre::eyre!("missing lifecycle result in scenario world")),
    }
}
