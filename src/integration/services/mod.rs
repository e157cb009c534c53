//! Application services for integration lifecycle and group bookkeeping.

mod group_sync;
mod lifecycle;

pub use group_sync::{GroupSyncError, GroupSyncResult, GroupSyncService, SyncReport};
pub use lifecycle::{
    CreateIntegrationRequest, IntegrationLifecycleError, IntegrationLifecycleResult,
    IntegrationLifecycleService,
};
