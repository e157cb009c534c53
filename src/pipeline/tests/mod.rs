//! Unit tests for the message pipeline and job routing.
