//! Domain records for Fortum API payloads.
//!
//! Records are built only through the `from_api_response` mappers, which take
//! a payload already unwrapped by [`crate::core::envelope::decode`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FortumError, Result};

/// Energy entry type counted toward consumption totals.
pub const ENERGY_TYPE: &str = "ENERGY";

fn map_value<T: DeserializeOwned>(value: &Value, what: &str) -> Result<T> {
    T::deserialize(value)
        .map_err(|e| FortumError::invalid_response_from(format!("Invalid {what} response"), e))
}

// =============================================================================
// Cost types
// =============================================================================

/// Fixed vocabulary of invoice cost components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostType {
    ElcertAmount,
    FixedFeeAmount,
    SpotVariableAmount,
    VarAmount,
    VarDiscountAmount,
}

impl CostType {
    pub const ALL: [Self; 5] = [
        Self::ElcertAmount,
        Self::FixedFeeAmount,
        Self::SpotVariableAmount,
        Self::VarAmount,
        Self::VarDiscountAmount,
    ];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ElcertAmount => "ELCERT_AMOUNT",
            Self::FixedFeeAmount => "FIXED_FEE_AMOUNT",
            Self::SpotVariableAmount => "SPOT_VARIABLE_AMOUNT",
            Self::VarAmount => "VAR_AMOUNT",
            Self::VarDiscountAmount => "VAR_DISCOUNT_AMOUNT",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ElcertAmount => "Certificate costs",
            Self::FixedFeeAmount => "Fixed fees",
            Self::SpotVariableAmount => "Variable spot price",
            Self::VarAmount => "Variable amount",
            Self::VarDiscountAmount => "Discounts",
        }
    }
}

impl FromStr for CostType {
    type Err = FortumError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FortumError::invalid_response(format!("Unknown cost type: {s}")))
    }
}

impl fmt::Display for CostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Time series
// =============================================================================

/// One energy reading inside an interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyDataPoint {
    pub value: f64,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One cost line inside an interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostDataPoint {
    pub total: f64,
    pub value: f64,
    #[serde(rename = "type")]
    pub kind: String,
}

impl CostDataPoint {
    /// Parsed cost type, if it is one of the known components.
    #[must_use]
    pub fn cost_type(&self) -> Option<CostType> {
        self.kind.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub total: f64,
    pub value: f64,
    pub vat_amount: f64,
    pub vat_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub temperature: f64,
}

/// Readings for one interval of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesDataPoint {
    #[serde(rename = "atUTC")]
    pub at_utc: DateTime<Utc>,
    pub energy: Vec<EnergyDataPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<Vec<CostDataPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_reading: Option<TemperatureReading>,
}

impl TimeSeriesDataPoint {
    /// Sum of `ENERGY` entries; other entry types are ignored.
    #[must_use]
    pub fn total_energy(&self) -> f64 {
        self.energy
            .iter()
            .filter(|e| e.kind == ENERGY_TYPE)
            .map(|e| e.value)
            .sum()
    }

    /// Sum of cost line totals, zero without cost data.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.cost
            .as_deref()
            .map_or(0.0, |lines| lines.iter().map(|c| c.total).sum())
    }

    /// Whether any energy entry is positive.
    #[must_use]
    pub fn has_consumption(&self) -> bool {
        self.energy.iter().any(|e| e.value > 0.0)
    }

    fn has_cost(&self) -> bool {
        self.cost.as_ref().is_some_and(|lines| !lines.is_empty())
    }

    /// Cost totals per known component.
    #[must_use]
    pub fn cost_components(&self) -> BTreeMap<CostType, f64> {
        let mut components = BTreeMap::new();
        for line in self.cost.iter().flatten() {
            if let Some(cost_type) = line.cost_type() {
                *components.entry(cost_type).or_insert(0.0) += line.total;
            }
        }
        components
    }
}

/// Series for one metering point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub delivery_site_category: String,
    pub measurement_unit: String,
    pub metering_point_no: String,
    pub price_unit: String,
    pub cost_unit: String,
    pub temperature_unit: String,
    pub series: Vec<TimeSeriesDataPoint>,
}

impl TimeSeries {
    /// Map a decoded RPC payload, which is either one series or a list.
    ///
    /// # Errors
    ///
    /// Returns [`FortumError::InvalidResponse`] if any series is missing
    /// required fields.
    pub fn from_api_response(data: &Value) -> Result<Vec<Self>> {
        match data {
            Value::Array(items) => items
                .iter()
                .map(|item| map_value(item, "time series"))
                .collect(),
            single => Ok(vec![map_value(single, "time series")?]),
        }
    }

    #[must_use]
    pub fn total_energy_consumption(&self) -> f64 {
        self.series.iter().map(TimeSeriesDataPoint::total_energy).sum()
    }

    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.series.iter().map(TimeSeriesDataPoint::total_cost).sum()
    }

    /// Most recent interval with positive energy.
    #[must_use]
    pub fn latest_data_point(&self) -> Option<&TimeSeriesDataPoint> {
        self.series.iter().rev().find(|p| p.has_consumption())
    }
}

// =============================================================================
// Consumption
// =============================================================================

/// Flattened per-interval consumption.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumptionData {
    pub date_time: DateTime<Utc>,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    pub unit: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub cost_components: BTreeMap<CostType, f64>,
}

impl ConsumptionData {
    /// One record per interval with positive energy.
    #[must_use]
    pub fn from_time_series(series: &TimeSeries) -> Vec<Self> {
        series
            .series
            .iter()
            .filter(|p| p.has_consumption())
            .map(|p| Self {
                date_time: p.at_utc,
                value: p.total_energy(),
                cost: p.has_cost().then(|| p.total_cost()),
                unit: series.measurement_unit.clone(),
                cost_components: p.cost_components(),
            })
            .collect()
    }
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub customer_id: String,
    pub postal_address: String,
    pub post_office: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionUser {
    customer_id: String,
    #[serde(default)]
    postal_address: String,
    #[serde(default)]
    post_office: String,
    #[serde(default)]
    name: Option<String>,
}

impl CustomerDetails {
    /// Map a session payload (`{"user": {...}}`) or a flat customer object.
    ///
    /// # Errors
    ///
    /// Returns [`FortumError::InvalidResponse`] without a customer ID, or
    /// for a flat object missing its address fields.
    pub fn from_api_response(data: &Value) -> Result<Self> {
        if let Some(user) = data.get("user") {
            let user: SessionUser = map_value(user, "customer details")?;
            return Ok(Self {
                customer_id: user.customer_id,
                postal_address: user.postal_address,
                post_office: user.post_office,
                name: user.name,
            });
        }
        map_value(data, "customer details")
    }
}

// =============================================================================
// Metering points
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeteringPoint {
    pub metering_point_no: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl MeteringPoint {
    /// Map one delivery site.
    ///
    /// The number sits either on the site itself or under `consumption`.
    ///
    /// # Errors
    ///
    /// Returns [`FortumError::InvalidResponse`] if neither location has it.
    pub fn from_api_response(site: &Value) -> Result<Self> {
        let number = site
            .get("meteringPointNo")
            .or_else(|| site.get("consumption").and_then(|c| c.get("meteringPointNo")))
            .and_then(metering_point_string)
            .ok_or_else(|| {
                FortumError::invalid_response("Invalid metering points response: missing meteringPointNo")
            })?;

        Ok(Self {
            metering_point_no: number,
            address: site.get("address").and_then(Value::as_str).map(str::to_string),
        })
    }

    /// Map every delivery site of a session payload.
    ///
    /// A session without `user.deliverySites` has no metering points.
    ///
    /// # Errors
    ///
    /// Returns [`FortumError::InvalidResponse`] if a site cannot be mapped.
    pub fn from_session(session: &Value) -> Result<Vec<Self>> {
        let Some(sites) = session.get("user").and_then(|u| u.get("deliverySites")) else {
            return Ok(Vec::new());
        };
        let sites = sites.as_array().ok_or_else(|| {
            FortumError::invalid_response("Invalid metering points response: deliverySites is not a list")
        })?;
        sites.iter().map(Self::from_api_response).collect()
    }
}

fn metering_point_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
