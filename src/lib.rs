//! mittfortum - MittFortum energy API client
//!
//! Authenticated access to the Fortum customer site: customer details,
//! metering points and time-series consumption, with expiry-aware request
//! retries and date-range degradation when the backend rejects a query.
//! The login flow itself is external; credentials arrive through an
//! [`core::auth::Authenticator`].

#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod cli;
pub mod core;
pub mod error;
pub mod render;
pub mod storage;
pub mod util;

/// Test utilities module - included in test builds or when test-utils feature is enabled.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use api::FortumClient;
pub use error::{ExitCode, FortumError, Result};

// Re-export test utilities for external test crates
#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::*;
