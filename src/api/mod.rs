//! Typed operations against the MittFortum API.

pub mod client;

pub use client::{ApiTestStatus, ConnectionReport, FortumClient, SessionStatus};
