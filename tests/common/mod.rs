//! Shared helpers for integration tests.
//!
//! - `logger`: phase-tagged test logging to stderr

pub mod logger;
