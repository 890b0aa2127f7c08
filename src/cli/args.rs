//! CLI argument definitions using clap.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::core::endpoints::{Locale, Resolution};

/// MittFortum - Query electricity consumption from Fortum.
#[derive(Parser, Debug)]
#[command(name = "mittfortum")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    // === Global flags ===
    /// Output format
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Market of the account (SV or FI)
    #[arg(long, value_name = "LOCALE", value_parser = parse_locale, global = true)]
    pub locale: Option<Locale>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// Override the site base URL
    #[arg(long, value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Credentials file written by the login tool
    #[arg(long, value_name = "PATH", global = true)]
    pub credentials: Option<PathBuf>,
}

impl Cli {
    /// Resolve the effective output format.
    #[must_use]
    pub const fn effective_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show customer ID and details
    Customer,

    /// List metering points
    MeteringPoints,

    /// Show raw time series
    TimeSeries(QueryArgs),

    /// Show per-interval consumption and cost
    Consumption(QueryArgs),

    /// Test the session and a minimal time-series call
    Check,

    /// Show the resolved configuration
    Config(ConfigArgs),
}

/// Arguments shared by time-series queries.
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Metering point number (repeatable; defaults to all)
    #[arg(long = "metering-point", short = 'm', value_name = "NUMBER")]
    pub metering_points: Vec<String>,

    /// Start of the range (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_name = "DATE", value_parser = parse_date)]
    pub from: Option<DateTime<Utc>>,

    /// End of the range (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_name = "DATE", value_parser = parse_date)]
    pub to: Option<DateTime<Utc>>,

    /// Bucket size (HOUR, DAY, MONTH, YEAR)
    #[arg(long, short = 'r', value_name = "RESOLUTION", value_parser = parse_resolution)]
    pub resolution: Option<Resolution>,
}

impl QueryArgs {
    /// Validate argument combinations.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::FortumError::Config`] when `from` is after `to`.
    pub fn validate(&self) -> crate::error::Result<()> {
        if let (Some(from), Some(to)) = (self.from, self.to)
            && from > to
        {
            return Err(crate::error::FortumError::Config(
                "--from must not be after --to".to_string(),
            ));
        }
        Ok(())
    }
}

/// Arguments for the `config` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Only print the config file path
    #[arg(long)]
    pub path: bool,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
}

fn parse_locale(s: &str) -> Result<Locale, String> {
    s.parse().map_err(|e: crate::error::FortumError| e.to_string())
}

fn parse_resolution(s: &str) -> Result<Resolution, String> {
    s.parse().map_err(|e: crate::error::FortumError| e.to_string())
}

/// Parse `YYYY-MM-DD` as midnight UTC, or a full RFC 3339 timestamp.
fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid date \"{s}\": {e}"))
}
