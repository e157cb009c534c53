//! Chat-platform integrations: connection lifecycle, groups and the
//! outbound platform API.
//!
//! An integration binds one platform channel to one festival. Its status
//! (`draft`, `connected`, `error`, `inactive`) together with `last_error`
//! is the health surface of the whole pipeline. The module follows
//! hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
