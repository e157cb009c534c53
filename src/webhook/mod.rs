//! Inbound webhook surface.
//!
//! The HTTP handler does three things synchronously: it verifies the
//! `X-Signature` header against the destination integration's channel
//! secret, normalizes the platform envelope into [`NormalizedEvent`]s, and
//! enqueues one job per event. Everything else happens in the worker pool.

mod envelope;
mod handler;
mod normalizer;
mod signature;

pub use envelope::{WebhookEnvelope, WireEvent, WireMembers, WireMessage, WireSource};
pub use handler::{WebhookState, router};
pub use normalizer::{EventSource, InboundEvent, MembershipEvent, NormalizedEvent, normalize};
pub use signature::{SIGNATURE_HEADER, SignatureVerdict, sign, verify_signature};

#[cfg(test)]
mod tests;
