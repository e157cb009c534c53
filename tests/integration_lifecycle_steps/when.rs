//! When steps for integration lifecycle BDD scenarios.

use super::world::{IntegrationWorld, run_async};
use rstest_bdd_macros::when;

#[when("the owner authenticates the integration")]
fn owner_authenticates(world: &mut IntegrationWorld) -> Result<(), eyre::Report> {
    let id = world.integration()?.id();
    world.last_result = Some(run_async(world.service.authenticate(id)));
    world.reload()
}

#[when("the owner tests the connection")]
fn owner_tests_connection(world: &mut IntegrationWorld) -> Result<(), eyre::Report> {
    let id = world.integration()?.id();
    world.last_result = Some(run_async(world.service.test_connection(id)));
    world.reload()
}

#[when("the owner refreshes the access token")]
fn owner_refreshes_token(world: &mut IntegrationWorld) -> Result<(), eyre::Report> {
    let id = world.integration()?.id();
    world.last_result = Some(run_async(world.service.refresh_access_token(id)));
    world.reload()
}

#[when("the owner disconnects the integration")]
fn owner_disconnects(world: &mut IntegrationWorld) -> Result<(), eyre::Report> {
    let id = world.integration()?.id();
    world.last_result = Some(run_async(world.service.disconnect(id)));
    world.reload()
}
