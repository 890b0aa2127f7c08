//! Config command implementation.

use std::path::PathBuf;

use serde::Serialize;

use super::Output;
use crate::cli::args::ConfigArgs;
use crate::error::Result;
use crate::render;
use crate::storage::config::{ConfigSource, ResolvedConfig};

/// One resolved setting and where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct Setting {
    pub value: String,
    pub source: String,
}

impl Setting {
    fn new(value: impl ToString, source: ConfigSource) -> Self {
        Self {
            value: value.to_string(),
            source: source.to_string(),
        }
    }
}

/// Resolved configuration as shown by `mittfortum config`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigReport {
    pub config_file: PathBuf,
    pub config_file_exists: bool,
    pub locale: Setting,
    pub site_url: Setting,
    pub timeout_seconds: Setting,
    pub credentials_file: Setting,
    pub credentials_file_exists: bool,
    pub default_resolution: Setting,
}

impl ConfigReport {
    #[must_use]
    pub fn from_resolved(config: &ResolvedConfig) -> Self {
        let sources = &config.sources;
        Self {
            config_file: config.config_file.clone(),
            config_file_exists: config.config_file.exists(),
            locale: Setting::new(config.locale, sources.locale),
            site_url: Setting::new(config.endpoints().site_url(), sources.base_url),
            timeout_seconds: Setting::new(config.timeout.as_secs(), sources.timeout),
            credentials_file: Setting::new(
                config.credentials_file.display(),
                sources.credentials_file,
            ),
            credentials_file_exists: config.credentials_file.exists(),
            default_resolution: Setting::new(config.default_resolution, sources.default_resolution),
        }
    }
}

/// Execute the config command.
///
/// Needs no credentials and makes no network calls.
pub fn execute(args: &ConfigArgs, config: &ResolvedConfig, output: Output) -> Result<()> {
    if args.path {
        println!("{}", config.config_file.display());
        return Ok(());
    }

    let report = ConfigReport::from_resolved(config);
    output.emit("config", config.locale, &report, || {
        render::human::render_config(&report, output.no_color)
    })
}
