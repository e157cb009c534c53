//! Unit tests for webhook ingestion.
