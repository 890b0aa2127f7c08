//! Human-readable terminal output using `colored`.

use colored::Colorize;

use crate::api::{ApiTestStatus, ConnectionReport, SessionStatus};
use crate::cli::config::ConfigReport;
use crate::core::models::{ConsumptionData, CustomerDetails, MeteringPoint, TimeSeries};
use crate::error::FortumError;
use crate::util::{format_currency, format_energy};

/// Color switch shared by every renderer.
#[derive(Debug, Clone, Copy)]
struct Palette {
    enabled: bool,
}

impl Palette {
    const fn new(no_color: bool) -> Self {
        Self { enabled: !no_color }
    }

    fn title(self, text: &str) -> String {
        if self.enabled {
            text.bold().cyan().to_string()
        } else {
            text.to_string()
        }
    }

    fn label(self, text: &str) -> String {
        if self.enabled {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn good(self, text: &str) -> String {
        if self.enabled {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    fn bad(self, text: &str) -> String {
        if self.enabled {
            text.red().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn number(self, text: &str) -> String {
        if self.enabled {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Render customer ID and contact details.
#[must_use]
pub fn render_customer(details: &CustomerDetails, no_color: bool) -> String {
    let p = Palette::new(no_color);
    let mut lines = vec![
        p.title("Customer"),
        format!("  {} {}", p.label("ID:     "), details.customer_id),
    ];
    if let Some(name) = details.name.as_deref().filter(|n| !n.is_empty()) {
        lines.push(format!("  {} {name}", p.label("Name:   ")));
    }
    let address = [details.postal_address.as_str(), details.post_office.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if !address.is_empty() {
        lines.push(format!("  {} {address}", p.label("Address:")));
    }
    to_block(&lines)
}

/// Render the customer's metering points.
#[must_use]
pub fn render_metering_points(points: &[MeteringPoint], no_color: bool) -> String {
    let p = Palette::new(no_color);
    if points.is_empty() {
        return format!("{}\n", p.label("No metering points found"));
    }

    let mut lines = vec![p.title("Metering points")];
    lines.extend(points.iter().map(|point| {
        format!(
            "  {:<12} {}",
            p.number(&point.metering_point_no),
            point.address.as_deref().unwrap_or("")
        )
    }));
    to_block(&lines)
}

/// Render time series with per-series totals.
#[must_use]
pub fn render_time_series(series: &[TimeSeries], no_color: bool) -> String {
    let p = Palette::new(no_color);
    if series.is_empty() {
        return format!("{}\n", p.label("No time series returned"));
    }

    let mut output = String::new();
    for ts in series {
        output.push_str(&render_one_series(ts, p));
        output.push('\n');
    }
    output
}

fn render_one_series(ts: &TimeSeries, p: Palette) -> String {
    let mut lines = vec![format!(
        "{} {}",
        p.title("Metering point"),
        p.number(&ts.metering_point_no)
    )];
    for point in &ts.series {
        let mut line = format!(
            "  {}  {:>14}",
            point.at_utc.format("%Y-%m-%d %H:%M"),
            format_energy(Some(point.total_energy()), &ts.measurement_unit)
        );
        if point.cost.is_some() {
            line.push_str(&format!(
                "  {:>14}",
                format_currency(Some(point.total_cost()), &ts.cost_unit)
            ));
        }
        if let Some(reading) = &point.temperature_reading {
            line.push_str(&format!("  {:.1} {}", reading.temperature, ts.temperature_unit));
        }
        lines.push(line);
    }
    lines.push(format!(
        "  {} {}  {}",
        p.label("Total:"),
        p.number(&format_energy(
            Some(ts.total_energy_consumption()),
            &ts.measurement_unit
        )),
        p.number(&format_currency(Some(ts.total_cost()), &ts.cost_unit))
    ));
    if let Some(latest) = ts.latest_data_point() {
        lines.push(format!(
            "  {} {}",
            p.label("Latest reading:"),
            latest.at_utc.format("%Y-%m-%d %H:%M")
        ));
    }
    to_block(&lines)
}

/// Render flattened consumption records.
#[must_use]
pub fn render_consumption(records: &[ConsumptionData], currency: &str, no_color: bool) -> String {
    let p = Palette::new(no_color);
    if records.is_empty() {
        return format!("{}\n", p.label("No consumption in the requested range"));
    }

    let mut lines = vec![p.title("Consumption")];
    lines.extend(records.iter().map(|record| {
        let cost = record
            .cost
            .map(|c| format_currency(Some(c), currency))
            .unwrap_or_default();
        format!(
            "  {}  {:>14}  {:>14}",
            record.date_time.format("%Y-%m-%d %H:%M"),
            format_energy(Some(record.value), &record.unit),
            cost
        )
    }));

    let energy: f64 = records.iter().map(|r| r.value).sum();
    let cost: f64 = records.iter().filter_map(|r| r.cost).sum();
    let unit = records.first().map_or("kWh", |r| r.unit.as_str());
    lines.push(format!(
        "  {} {}  {}",
        p.label("Total:"),
        p.number(&format_energy(Some(energy), unit)),
        p.number(&format_currency(Some(cost), currency))
    ));
    to_block(&lines)
}

/// Render a connection diagnostic.
#[must_use]
pub fn render_connection(report: &ConnectionReport, no_color: bool) -> String {
    let p = Palette::new(no_color);

    let verdict = if report.success {
        p.good("OK")
    } else {
        p.bad("FAILED")
    };
    let session = match report.session_status {
        SessionStatus::Valid => p.good("valid"),
        SessionStatus::Invalid => p.bad("invalid"),
        SessionStatus::Unknown => p.label("unknown"),
    };
    let mut lines = vec![
        format!("{} {verdict}", p.title("Connection test:")),
        format!("  {} {session}", p.label("Session:        ")),
    ];

    if let Some(user_id) = &report.user_id {
        lines.push(format!("  {} {user_id}", p.label("User:           ")));
    }
    if !report.metering_points.is_empty() {
        lines.push(format!(
            "  {} {}",
            p.label("Metering points:"),
            report.metering_points.join(", ")
        ));
    }
    if let Some(status) = report.api_test {
        let text = match status {
            ApiTestStatus::Passed => p.good("passed"),
            ApiTestStatus::Failed => p.bad("failed"),
        };
        lines.push(format!("  {} {text}", p.label("API test:       ")));
    }
    if let Some(points) = report.test_data_points {
        lines.push(format!("  {} {points}", p.label("Series returned:")));
    }
    if let Some(error) = &report.error {
        lines.push(format!("  {} {error}", p.label("Error:          ")));
    }
    to_block(&lines)
}

/// Render the resolved configuration.
#[must_use]
pub fn render_config(report: &ConfigReport, no_color: bool) -> String {
    let p = Palette::new(no_color);
    let missing = |exists: bool| if exists { String::new() } else { p.label(" (missing)") };

    let mut lines = vec![
        p.title("Configuration"),
        format!(
            "  {} {}{}",
            p.label("Config file:       "),
            report.config_file.display(),
            missing(report.config_file_exists)
        ),
    ];
    let rows = [
        ("Locale:            ", &report.locale, String::new()),
        ("Site URL:          ", &report.site_url, String::new()),
        ("Timeout (seconds): ", &report.timeout_seconds, String::new()),
        (
            "Credentials file:  ",
            &report.credentials_file,
            missing(report.credentials_file_exists),
        ),
        ("Default resolution:", &report.default_resolution, String::new()),
    ];
    lines.extend(rows.into_iter().map(|(label, setting, suffix)| {
        format!(
            "  {} {}{suffix} {}",
            p.label(label),
            setting.value,
            p.label(&format!("[{}]", setting.source))
        )
    }));
    to_block(&lines)
}

/// Render an error for the terminal.
#[must_use]
pub fn render_error(error: &FortumError, no_color: bool) -> String {
    let p = Palette::new(no_color);
    let mut output = format!(
        "{} {error}",
        p.bad(&format!("Error [{}]:", error.error_code()))
    );
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        output.push_str(&format!("\n  {} {cause}", p.label("caused by:")));
        source = cause.source();
    }
    output
}

/// Join rendered lines, each terminated by a newline.
fn to_block(lines: &[String]) -> String {
    let mut output = String::new();
    for line in lines {
        output.push_str(line);
        output.push('\n');
    }
    output
}
