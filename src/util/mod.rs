//! Utility functions.

pub mod env;
pub mod format;
pub mod jwt;

pub use format::{format_currency, format_energy};
