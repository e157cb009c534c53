//! Port definitions for the integration context.

mod platform;
mod repository;

pub use platform::{GroupSummary, MessagingPlatform, PlatformError, PlatformResult};
pub use repository::{
    GroupRepository, GroupRepositoryError, GroupRepositoryResult, IntegrationRepository,
    IntegrationRepositoryError, IntegrationRepositoryResult,
};
