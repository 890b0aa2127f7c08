//! mittfortum - MittFortum energy API client
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use mittfortum::cli::{Cli, Output, run};
use mittfortum::core::logging::{self, LogSettings};
use mittfortum::storage::{Config, ENV_CONFIG, ResolvedConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::from_cli(&cli);

    let config_level = config_log_level();
    let settings = LogSettings::resolve(
        cli.log_level.as_deref(),
        cli.json_output,
        config_level.as_deref(),
        |key| std::env::var(key).ok(),
    );
    logging::init(settings.level, settings.format, settings.file, cli.verbose);

    let result = match ResolvedConfig::resolve(&cli) {
        Ok(config) => run(&cli, &config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            tracing::debug!(error_code = e.error_code(), kind = ?e.kind(), "Command failed");
            eprintln!(
                "{}",
                mittfortum::render::render_error(&e, output.format, output.pretty, output.no_color)
            );
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Log level from the config file; read before logging is initialized.
fn config_log_level() -> Option<String> {
    let path = std::env::var_os(ENV_CONFIG).map_or_else(Config::config_path, PathBuf::from);
    Config::load_from(&path).ok()?.general.log_level
}
