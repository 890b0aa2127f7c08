//! Output rendering for human and JSON modes.

pub mod human;
pub mod robot;

use crate::cli::args::OutputFormat;
use crate::error::FortumError;

/// Render an error in the selected output format.
#[must_use]
pub fn render_error(error: &FortumError, format: OutputFormat, pretty: bool, no_color: bool) -> String {
    match format {
        OutputFormat::Human => human::render_error(error, no_color),
        OutputFormat::Json => robot::render_error(error, pretty),
    }
}
