//! Festival task lifecycle management for tasklink.
//!
//! Tasks belong to the surrounding festival-management application. The
//! messaging pipeline only creates tasks and transitions their status; it
//! never deletes them. The module follows hexagonal architecture:
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
