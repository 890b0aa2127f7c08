//! MittFortum API client.
//!
//! Customer data and metering points come from the session endpoint; energy
//! readings come from the time-series RPC procedure. Time-series queries
//! narrow their date range when the backend rejects them with a 500.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::core::auth::{Authenticator, SESSION_BASED_TOKEN};
use crate::core::date_range::{DateRange, with_degradation};
use crate::core::endpoints::{Endpoints, Locale, Resolution, TimeSeriesQuery};
use crate::core::http::{HttpTransport, ReqwestTransport};
use crate::core::models::{ConsumptionData, CustomerDetails, MeteringPoint, TimeSeries};
use crate::core::pipeline::RequestPipeline;
use crate::error::{FortumError, Result};
use crate::util::jwt;

/// Window probed by [`FortumClient::test_connection`].
const CONNECTION_TEST_WINDOW: TimeDelta = TimeDelta::hours(24);

/// Client for one account on one locale's site.
#[derive(Clone)]
pub struct FortumClient {
    pipeline: RequestPipeline,
}

impl FortumClient {
    pub fn new(
        auth: Arc<dyn Authenticator>,
        transport: Arc<dyn HttpTransport>,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            pipeline: RequestPipeline::new(auth, transport, endpoints),
        }
    }

    /// Client using the reqwest transport.
    pub fn with_timeout(auth: Arc<dyn Authenticator>, endpoints: Endpoints, timeout: Duration) -> Self {
        Self::new(auth, Arc::new(ReqwestTransport::new(timeout)), endpoints)
    }

    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        self.pipeline.endpoints()
    }

    #[must_use]
    pub const fn locale(&self) -> Locale {
        self.pipeline.endpoints().locale()
    }

    // =========================================================================
    // Customer
    // =========================================================================

    /// Customer ID from the login session, or from the ID token's
    /// `customerid[0].crmid` claim.
    ///
    /// # Errors
    ///
    /// Returns [`FortumError::CustomerId`] if neither source has it.
    pub async fn get_customer_id(&self) -> Result<String> {
        let snapshot = self.pipeline.authenticator().snapshot();

        if let Some(id) = snapshot
            .session_data
            .as_ref()
            .and_then(|s| s.get("user"))
            .and_then(|u| u.get("customerId"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
        {
            return Ok(id.to_string());
        }

        match snapshot.id_token.as_deref() {
            None | Some("") => Err(FortumError::CustomerId(
                "No ID token or session data available".to_string(),
            )),
            Some(SESSION_BASED_TOKEN) => Err(FortumError::CustomerId(
                "Customer ID not found in session data".to_string(),
            )),
            Some(token) => jwt::customer_id_from_token(token),
        }
    }

    /// # Errors
    ///
    /// Returns pipeline errors, or [`FortumError::InvalidResponse`] if the
    /// session has no customer.
    pub async fn get_customer_details(&self) -> Result<CustomerDetails> {
        let session = self.session().await?;
        CustomerDetails::from_api_response(&session)
    }

    /// Metering points of every delivery site in the session.
    ///
    /// # Errors
    ///
    /// Returns pipeline errors, or [`FortumError::InvalidResponse`] if a
    /// delivery site cannot be mapped.
    pub async fn get_metering_points(&self) -> Result<Vec<MeteringPoint>> {
        let session = self.session().await?;
        MeteringPoint::from_session(&session)
    }

    async fn session(&self) -> Result<Value> {
        self.pipeline.get_json(&self.endpoints().session_url()).await
    }

    // =========================================================================
    // Time series
    // =========================================================================

    /// Time series for `metering_points` between `from` and `to`.
    ///
    /// Missing bounds default to the 90 days before the start of the
    /// current month up to now. On a server error the query is retried for
    /// the last 30 days, then the last 7 days.
    ///
    /// # Errors
    ///
    /// Returns the first non-server error, or the server error of the last
    /// attempted range.
    pub async fn get_time_series_data(
        &self,
        metering_points: &[String],
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        resolution: Resolution,
    ) -> Result<Vec<TimeSeries>> {
        let now = Utc::now();
        let requested = DateRange::resolve(from, to, now);
        with_degradation(requested, now, |range| {
            self.fetch_time_series(metering_points, range, resolution)
        })
        .await
    }

    async fn fetch_time_series(
        &self,
        metering_points: &[String],
        range: DateRange,
        resolution: Resolution,
    ) -> Result<Vec<TimeSeries>> {
        let query = TimeSeriesQuery {
            metering_point_no: metering_points.to_vec(),
            from_date: range.from,
            to_date: range.to,
            resolution,
        };
        tracing::debug!(
            from = %range.from.to_rfc3339(),
            to = %range.to.to_rfc3339(),
            %resolution,
            metering_points = metering_points.len(),
            "Fetching time series"
        );

        let url = self.endpoints().time_series_url(&query)?;
        let payload = self.pipeline.get_json(&url).await?;
        TimeSeries::from_api_response(&payload)
    }

    // =========================================================================
    // Consumption
    // =========================================================================

    /// Per-interval consumption for `metering_points`, or for all of the
    /// customer's metering points when `None` or empty.
    ///
    /// # Errors
    ///
    /// Returns [`FortumError::NoMeteringPoints`] if the customer has none,
    /// and any error of [`Self::get_time_series_data`].
    pub async fn get_consumption_data(
        &self,
        metering_points: Option<&[String]>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        resolution: Resolution,
    ) -> Result<Vec<ConsumptionData>> {
        let numbers: Vec<String> = match metering_points {
            Some(numbers) if !numbers.is_empty() => numbers.to_vec(),
            _ => {
                let points = self.get_metering_points().await?;
                if points.is_empty() {
                    return Err(FortumError::NoMeteringPoints);
                }
                points.into_iter().map(|p| p.metering_point_no).collect()
            }
        };

        let series = self
            .get_time_series_data(&numbers, from, to, resolution)
            .await?;
        Ok(series.iter().flat_map(ConsumptionData::from_time_series).collect())
    }

    /// Consumption for all metering points over the default range.
    ///
    /// # Errors
    ///
    /// See [`Self::get_consumption_data`].
    pub async fn get_total_consumption(&self) -> Result<Vec<ConsumptionData>> {
        self.get_consumption_data(None, None, None, Resolution::default())
            .await
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Probe the session endpoint and a minimal time-series call.
    ///
    /// Never fails; problems are reported in the returned
    /// [`ConnectionReport`].
    pub async fn test_connection(&self) -> ConnectionReport {
        let session = match self.session().await {
            Ok(session) => session,
            Err(e) => {
                return ConnectionReport::failed(
                    SessionStatus::Unknown,
                    format!("Connection test failed: {e}"),
                );
            }
        };

        let Some(user) = session.get("user").filter(|u| is_non_empty(u)) else {
            return ConnectionReport::failed(
                SessionStatus::Invalid,
                "No user data in session - authentication may have failed",
            );
        };

        let user_id = user.get("id").and_then(scalar_string);
        let metering_points = nested_metering_points(user);
        if metering_points.is_empty() {
            return ConnectionReport {
                user_id,
                ..ConnectionReport::failed(
                    SessionStatus::Valid,
                    "No metering points found in session data",
                )
            };
        }

        let now = Utc::now();
        let probe = DateRange::new(now - CONNECTION_TEST_WINDOW, now);
        let result = self
            .fetch_time_series(&metering_points[..1], probe, Resolution::Hour)
            .await;

        match result {
            Ok(series) => ConnectionReport {
                success: true,
                error: None,
                session_status: SessionStatus::Valid,
                user_id,
                metering_points,
                api_test: Some(ApiTestStatus::Passed),
                test_data_points: Some(series.len()),
            },
            Err(e) => ConnectionReport {
                user_id,
                metering_points,
                api_test: Some(ApiTestStatus::Failed),
                ..ConnectionReport::failed(SessionStatus::Valid, format!("API test failed: {e}"))
            },
        }
    }
}

fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn nested_metering_points(user: &Value) -> Vec<String> {
    user.get("deliverySites")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|site| site.get("consumption")?.get("meteringPointNo"))
        .filter_map(scalar_string)
        .collect()
}

// =============================================================================
// Connection report
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Valid,
    Invalid,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiTestStatus {
    Passed,
    Failed,
}

/// Outcome of [`FortumClient::test_connection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub session_status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metering_points: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_test: Option<ApiTestStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_data_points: Option<usize>,
}

impl ConnectionReport {
    fn failed(session_status: SessionStatus, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            session_status,
            user_id: None,
            metering_points: Vec::new(),
            api_test: None,
            test_data_points: None,
        }
    }
}
