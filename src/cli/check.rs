//! Check command implementation.

use super::Output;
use crate::api::FortumClient;
use crate::error::{ExitCode, Result};
use crate::render::human;

/// Execute the check command.
///
/// A failed check is reported, not returned as an error; the exit code is
/// non-zero so scripts can still branch on it.
pub async fn execute(client: &FortumClient, output: Output) -> Result<ExitCode> {
    let report = client.test_connection().await;
    output.emit("check", client.locale(), &report, || {
        human::render_connection(&report, output.no_color)
    })?;

    Ok(if report.success {
        ExitCode::Success
    } else {
        ExitCode::GeneralError
    })
}
