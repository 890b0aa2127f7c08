//! Machine-readable output (JSON).
//!
//! Every command wraps its payload in the same envelope so scripts can
//! dispatch on `command` and check `schemaVersion`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::endpoints::Locale;
use crate::error::{FortumError, Result};

/// Version tag of the JSON envelope.
pub const SCHEMA_VERSION: &str = "mittfortum.v1";

/// Top-level JSON envelope for command output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotOutput<T> {
    pub schema_version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub command: String,
    pub locale: Locale,
    pub data: T,
}

impl<T> RobotOutput<T> {
    pub fn new(command: impl Into<String>, locale: Locale, data: T) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            command: command.into(),
            locale,
            data,
        }
    }
}

/// Serialize `output`, indented when `pretty`.
pub fn render_json<T: Serialize>(output: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(output)?
    } else {
        serde_json::to_string(output)?
    };
    Ok(json)
}

/// Render `data` inside the envelope.
pub fn render_envelope<T: Serialize>(
    command: &str,
    locale: Locale,
    data: T,
    pretty: bool,
) -> Result<String> {
    render_json(&RobotOutput::new(command, locale, data), pretty)
}

/// Structured error for machine consumption.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorJson {
    error_code: &'static str,
    category: String,
    message: String,
    is_retryable: bool,
}

/// Render an error as a JSON object.
#[must_use]
pub fn render_error(error: &FortumError, pretty: bool) -> String {
    let body = ErrorJson {
        error_code: error.error_code(),
        category: error.category().to_string(),
        message: error.to_string(),
        is_retryable: error.is_retryable(),
    };
    render_json(&body, pretty).unwrap_or_else(|_| format!("Error [{}]: {error}", error.error_code()))
}
