//! Shared world state for integration lifecycle BDD scenarios.

use std::sync::Arc;

use eyre::WrapErr;
use mockable::DefaultClock;
use rstest::fixture;
use tasklink::integration::{
    adapters::{memory::InMemoryIntegrationRepository, runtime::InMemoryMessagingPlatform},
    domain::Integration,
    services::{IntegrationLifecycleError, IntegrationLifecycleService},
};

/// Service type used by the BDD world.
pub type TestLifecycle = IntegrationLifecycleService<
    InMemoryIntegrationRepository,
    InMemoryMessagingPlatform,
    DefaultClock,
>;

/// Scenario world for integration lifecycle behaviour tests.
pub struct IntegrationWorld {
    pub service: TestLifecycle,
    pub platform: Arc<InMemoryMessagingPlatform>,
    pub integration: Option<Integration>,
    pub last_result: Option<Result<Integration, IntegrationLifecycleError>>,
}

impl IntegrationWorld {
    /// Creates a world with no integration yet.
    #[must_use]
    pub fn new() -> Self {
        let platform = Arc::new(InMemoryMessagingPlatform::new());
        let service = IntegrationLifecycleService::new(
            Arc::new(InMemoryIntegrationRepository::new()),
            Arc::clone(&platform),
            Arc::new(DefaultClock),
        );

        Self {
            service,
            platform,
            integration: None,
            last_result: None,
        }
    }

    /// Returns the integration under test.
    ///
    /// # Errors
    ///
    /// Returns an error when no integration was created.
    pub fn integration(&self) -> eyre::Result<&Integration> {
        self.integration
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing integration in scenario world"))
    }

    /// Reloads the integration from the repository.
    ///
    /// # Errors
    ///
    /// Returns an error when no integration was created or it cannot be read.
    pub fn reload(&mut self) -> eyre::Result<()> {
        let id = self.integration()?.id();
        let stored = run_async(self.service.get(id)).wrap_err("reload integration")?;
        self.integration = Some(stored);
        Ok(())
    }
}

impl Default for IntegrationWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> IntegrationWorld {
    IntegrationWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
