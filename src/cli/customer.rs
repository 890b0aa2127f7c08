//! Customer and metering-point commands.

use serde::Serialize;

use super::Output;
use crate::api::FortumClient;
use crate::core::models::CustomerDetails;
use crate::error::Result;
use crate::render::human;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CustomerOutput {
    customer_id: String,
    details: CustomerDetails,
}

/// Execute the customer command.
pub async fn execute_customer(client: &FortumClient, output: Output) -> Result<()> {
    let customer_id = client.get_customer_id().await?;
    let details = client.get_customer_details().await?;
    if details.customer_id != customer_id {
        tracing::warn!(
            session = %details.customer_id,
            credentials = %customer_id,
            "Customer ID in session differs from stored credentials"
        );
    }

    let data = CustomerOutput {
        customer_id,
        details,
    };
    output.emit("customer", client.locale(), &data, || {
        human::render_customer(&data.details, output.no_color)
    })
}

/// Execute the metering-points command.
pub async fn execute_metering_points(client: &FortumClient, output: Output) -> Result<()> {
    let points = client.get_metering_points().await?;
    tracing::debug!(count = points.len(), "Fetched metering points");
    output.emit("metering-points", client.locale(), &points, || {
        human::render_metering_points(&points, output.no_color)
    })
}
