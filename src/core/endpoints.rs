//! Fortum site URLs and request URL construction.
//!
//! Two API shapes are served under the locale's site:
//! - `{site}/api/auth/session`: plain JSON session endpoint
//! - `{site}/api/trpc/<procedure>?batch=1&input=<percent-encoded JSON>`:
//!   batched RPC endpoint

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FortumError, Result};

/// Path fragment identifying the batched RPC endpoint.
pub const TRPC_PATH: &str = "/api/trpc/";
/// Path fragment identifying the session endpoint.
pub const SESSION_PATH: &str = "/api/auth/session";

const TIME_SERIES_PROCEDURE: &str = "loggedIn.timeSeries.listTimeSeries";
const TRPC_BATCH_PARAM: &str = "1";

// =============================================================================
// Locale
// =============================================================================

/// Market served by a Fortum account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Locale {
    /// Sweden.
    #[default]
    Sv,
    /// Finland.
    Fi,
}

impl Locale {
    /// Public site base URL for this locale.
    #[must_use]
    pub const fn site_url(self) -> &'static str {
        match self {
            Self::Sv => "https://www.fortum.com/se/el",
            Self::Fi => "https://www.fortum.com/fi/sahkoa",
        }
    }

    /// Currency used on invoices.
    #[must_use]
    pub const fn cost_unit(self) -> &'static str {
        match self {
            Self::Sv => "SEK",
            Self::Fi => "EUR",
        }
    }

    /// Two-letter code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Sv => "SV",
            Self::Fi => "FI",
        }
    }
}

impl FromStr for Locale {
    type Err = FortumError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "SV" => Ok(Self::Sv),
            "FI" => Ok(Self::Fi),
            _ => Err(FortumError::UnsupportedLocale(s.to_string())),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Time-series bucket size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Resolution {
    Hour,
    Day,
    #[default]
    Month,
    Year,
}

impl Resolution {
    /// All resolutions the API accepts.
    pub const ALL: [Self; 4] = [Self::Hour, Self::Day, Self::Month, Self::Year];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "HOUR",
            Self::Day => "DAY",
            Self::Month => "MONTH",
            Self::Year => "YEAR",
        }
    }
}

impl FromStr for Resolution {
    type Err = FortumError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                FortumError::Config(format!(
                    "Invalid resolution \"{s}\". Valid resolutions: HOUR, DAY, MONTH, YEAR"
                ))
            })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// RPC input
// =============================================================================

/// Input object of a `listTimeSeries` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesQuery {
    pub metering_point_no: Vec<String>,
    #[serde(serialize_with = "serialize_rpc_date")]
    pub from_date: DateTime<Utc>,
    #[serde(serialize_with = "serialize_rpc_date")]
    pub to_date: DateTime<Utc>,
    pub resolution: Resolution,
}

fn serialize_rpc_date<S>(date: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Batch envelope: `{"0":{"json": <input>}}`.
#[derive(Serialize)]
struct RpcBatch<'a> {
    #[serde(rename = "0")]
    first: RpcCall<'a>,
}

#[derive(Serialize)]
struct RpcCall<'a> {
    json: &'a TimeSeriesQuery,
}

/// Compact JSON for the `input` query parameter, before percent-encoding.
///
/// # Errors
///
/// Returns error if the query cannot be serialized.
pub fn rpc_input_json(query: &TimeSeriesQuery) -> Result<String> {
    Ok(serde_json::to_string(&RpcBatch {
        first: RpcCall { json: query },
    })?)
}

// =============================================================================
// Endpoints
// =============================================================================

/// URL builder for one locale's site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    locale: Locale,
    site_url: String,
}

impl Endpoints {
    /// Endpoints on the public Fortum site.
    #[must_use]
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            site_url: locale.site_url().to_string(),
        }
    }

    /// Endpoints on a different host, e.g. a proxy or a mock server.
    #[must_use]
    pub fn with_site_url(locale: Locale, site_url: impl Into<String>) -> Self {
        let site_url: String = site_url.into();
        Self {
            locale,
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub const fn locale(&self) -> Locale {
        self.locale
    }

    #[must_use]
    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    #[must_use]
    pub fn api_url(&self) -> String {
        format!("{}/api", self.site_url)
    }

    /// Referer sent with every request.
    #[must_use]
    pub fn referer(&self) -> String {
        format!("{}/inloggad/el", self.site_url)
    }

    /// Session endpoint.
    #[must_use]
    pub fn session_url(&self) -> String {
        format!("{}{SESSION_PATH}", self.site_url)
    }

    /// Base of the time-series RPC procedure, without query string.
    #[must_use]
    pub fn time_series_base_url(&self) -> String {
        format!("{}{TRPC_PATH}{TIME_SERIES_PROCEDURE}", self.site_url)
    }

    /// Full RPC URL for a time-series query.
    ///
    /// # Errors
    ///
    /// Returns error if the query cannot be serialized.
    pub fn time_series_url(&self, query: &TimeSeriesQuery) -> Result<String> {
        let input = rpc_input_json(query)?;
        Ok(format!(
            "{}?batch={TRPC_BATCH_PARAM}&input={}",
            self.time_series_base_url(),
            urlencoding::encode(&input)
        ))
    }
}

/// Whether `url` is served with cookie auth only (no bearer header).
#[must_use]
pub fn is_cookie_authenticated(url: &str) -> bool {
    url.contains(TRPC_PATH) || url.contains(SESSION_PATH)
}
