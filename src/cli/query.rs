//! Time-series and consumption commands.

use super::Output;
use crate::api::FortumClient;
use crate::cli::args::QueryArgs;
use crate::core::endpoints::Resolution;
use crate::error::{FortumError, Result};
use crate::render::human;
use crate::storage::ResolvedConfig;

fn resolution(args: &QueryArgs, config: &ResolvedConfig) -> Resolution {
    args.resolution.unwrap_or(config.default_resolution)
}

/// Execute the time-series command.
///
/// Without `--metering-point` every metering point of the customer is
/// queried.
pub async fn execute_time_series(
    client: &FortumClient,
    args: &QueryArgs,
    config: &ResolvedConfig,
    output: Output,
) -> Result<()> {
    let metering_points = if args.metering_points.is_empty() {
        client
            .get_metering_points()
            .await?
            .into_iter()
            .map(|p| p.metering_point_no)
            .collect()
    } else {
        args.metering_points.clone()
    };
    if metering_points.is_empty() {
        return Err(FortumError::NoMeteringPoints);
    }

    let series = client
        .get_time_series_data(&metering_points, args.from, args.to, resolution(args, config))
        .await?;
    output.emit("time-series", client.locale(), &series, || {
        human::render_time_series(&series, output.no_color)
    })
}

/// Execute the consumption command.
///
/// Without `--metering-point` every metering point of the customer is
/// queried.
pub async fn execute_consumption(
    client: &FortumClient,
    args: &QueryArgs,
    config: &ResolvedConfig,
    output: Output,
) -> Result<()> {
    let records = client
        .get_consumption_data(
            Some(args.metering_points.as_slice()),
            args.from,
            args.to,
            resolution(args, config),
        )
        .await?;

    let currency = client.locale().cost_unit();
    output.emit("consumption", client.locale(), &records, || {
        human::render_consumption(&records, currency, output.no_color)
    })
}
