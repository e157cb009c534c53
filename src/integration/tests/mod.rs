//! Unit tests for the integration context.
