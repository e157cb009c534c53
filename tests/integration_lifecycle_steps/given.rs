//! Given steps for integration lifecycle BDD scenarios.

use super::world::{IntegrationWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use tasklink::integration::{
    domain::AccountId, ports::PlatformError, services::CreateIntegrationRequest,
};
use tasklink::task::domain::FestivalId;

fn create_draft(world: &mut IntegrationWorld, channel_id: String) -> Result<(), eyre::Report> {
    let created = run_async(world.service.create(CreateIntegrationRequest::new(
        AccountId::new(),
        FestivalId::new(),
        channel_id,
        "channel-secret",
    )))
    .wrap_err("create draft integration")?;
    world.integration = Some(created);
    Ok(())
}

#[given(r#"a draft integration for channel "{channel_id}""#)]
fn draft_integration(world: &mut IntegrationWorld, channel_id: String) -> Result<(), eyre::Report> {
    create_draft(world, channel_id)
}

#[given(r#"a connected integration for channel "{channel_id}""#)]
fn connected_integration(
    world: &mut IntegrationWorld,
    channel_id: String,
) -> Result<(), eyre::Report> {
    create_draft(world, channel_id)?;
    let id = world.integration()?.id();
    let connected =
        run_async(world.service.authenticate(id)).wrap_err("authenticate in scenario setup")?;
    world.integration = Some(connected);
    Ok(())
}

#[given("the platform refuses token exchange")]
fn platform_refuses_token_exchange(world: &mut IntegrationWorld) -> Result<(), eyre::Report> {
    world
        .platform
        .fail_token_exchange(Some(PlatformError::Rejected {
            status: 400,
            message: "invalid client secret".to_owned(),
        }))
        .wrap_err("script token exchange failure")
}

#[given("the platform has expired every token")]
fn platform_expired_tokens(world: &mut IntegrationWorld) -> Result<(), eyre::Report> {
    world.platform.expire_tokens().wrap_err("expire platform tokens")
}

#[given("the connection test has failed")]
fn connection_test_failed(world: &mut IntegrationWorld) -> Result<(), eyre::Report> {
    let id = world.integration()?.id();
    if run_async(world.service.test_connection(id)).is_ok() {
        return Err(eyre::eyre!("connection test unexpectedly succeeded"));
    }
    world.reload()
}

#[given("the integration has been disconnected")]
fn integration_disconnected(world: &mut IntegrationWorld) -> Result<(), eyre::Report> {
    let id = world.integration()?.id();
    let disconnected =
        run_async(world.service.disconnect(id)).wrap_err("disconnect in scenario setup")?;
    world.integration = Some(disconnected);
    Ok(())
}
