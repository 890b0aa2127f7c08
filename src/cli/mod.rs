//! CLI argument parsing and command dispatch.

pub mod args;
pub mod check;
pub mod config;
pub mod customer;
pub mod query;

use std::sync::Arc;

use serde::Serialize;

pub use args::{Cli, Commands, OutputFormat};

use crate::api::FortumClient;
use crate::core::endpoints::Locale;
use crate::error::{ExitCode, Result};
use crate::render;
use crate::storage::{FileCredentialStore, ResolvedConfig};

/// Output settings shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub format: OutputFormat,
    pub pretty: bool,
    pub no_color: bool,
}

impl Output {
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.effective_format(),
            pretty: cli.pretty,
            no_color: !crate::util::env::should_use_color(cli.no_color),
        }
    }

    /// Print `data` as an enveloped JSON document, or the text from `human`.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` cannot be serialized.
    pub fn emit<T: Serialize>(
        self,
        command: &str,
        locale: Locale,
        data: &T,
        human: impl FnOnce() -> String,
    ) -> Result<()> {
        match self.format {
            OutputFormat::Human => print!("{}", human()),
            OutputFormat::Json => println!(
                "{}",
                render::robot::render_envelope(command, locale, data, self.pretty)?
            ),
        }
        Ok(())
    }
}

/// Build a client for the resolved configuration.
///
/// # Errors
///
/// Returns an error if the credentials file is missing or invalid.
pub fn connect(config: &ResolvedConfig) -> Result<FortumClient> {
    let store = FileCredentialStore::load(&config.credentials_file)?;
    tracing::debug!(
        locale = %config.locale,
        site = config.endpoints().site_url(),
        timeout_secs = config.timeout.as_secs(),
        "Connecting"
    );
    Ok(FortumClient::with_timeout(
        Arc::new(store),
        config.endpoints(),
        config.timeout,
    ))
}

/// Run a parsed command line.
///
/// # Errors
///
/// Returns the first error of the command; the caller maps it to an exit code.
pub async fn run(cli: &Cli, config: &ResolvedConfig) -> Result<ExitCode> {
    let output = Output::from_cli(cli);

    match &cli.command {
        Commands::Config(args) => config::execute(args, config, output)?,
        Commands::Customer => customer::execute_customer(&connect(config)?, output).await?,
        Commands::MeteringPoints => {
            customer::execute_metering_points(&connect(config)?, output).await?;
        }
        Commands::TimeSeries(args) => {
            args.validate()?;
            query::execute_time_series(&connect(config)?, args, config, output).await?;
        }
        Commands::Consumption(args) => {
            args.validate()?;
            query::execute_consumption(&connect(config)?, args, config, output).await?;
        }
        Commands::Check => return check::execute(&connect(config)?, output).await,
    }
    Ok(ExitCode::Success)
}
