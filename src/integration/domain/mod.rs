//! Domain model for chat-platform integrations and their groups.
//!
//! Infrastructure concerns (HTTP, SQL) stay outside this boundary.

mod credentials;
mod error;
mod group;
mod ids;
mod integration;
mod preferences;
mod status;

pub use credentials::{Credentials, SecretValue, TokenGrant};
pub use error::{IntegrationDomainError, ParseIntegrationStatusError};
pub use group::{Group, MembershipChange, PersistedGroupData};
pub use ids::{AccountId, GroupId, IntegrationId};
pub use integration::{Integration, NewIntegration, PersistedIntegrationData};
pub use preferences::{NotificationKind, NotificationPreferences};
pub use status::IntegrationStatus;
