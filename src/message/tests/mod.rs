//! Unit tests for the message context.

mod classifier_tests;
