//! Authenticated request pipeline and Fortum data models.

pub mod auth;
pub mod cookies;
pub mod date_range;
pub mod endpoints;
pub mod envelope;
pub mod http;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod token_gate;

pub use auth::{AuthMode, Authenticator, CredentialSnapshot};
pub use date_range::DateRange;
pub use endpoints::{Endpoints, Locale, Resolution};
pub use http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use models::{
    ConsumptionData, CostType, CustomerDetails, MeteringPoint, TimeSeries, TimeSeriesDataPoint,
};
pub use pipeline::RequestPipeline;
pub use token_gate::TokenGate;
