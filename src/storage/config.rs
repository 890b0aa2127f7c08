//! Configuration file loading and management.
//!
//! Loads configuration from:
//! - Linux: `~/.config/mittfortum/config.toml`
//! - macOS: `~/Library/Application Support/com.mittfortum.mittfortum/config.toml`
//! - Windows: `%APPDATA%/mittfortum/config/config.toml`
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `MITTFORTUM_LOCALE`: Account market (SV, FI)
//! - `MITTFORTUM_TIMEOUT`: Request timeout in seconds
//! - `MITTFORTUM_BASE_URL`: Override of the site base URL
//! - `MITTFORTUM_CREDENTIALS`: Path of the credentials file
//! - `MITTFORTUM_CONFIG`: Override config file path

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::cli::args::Cli;
use crate::core::endpoints::{Endpoints, Locale, Resolution};
use crate::error::{FortumError, Result};

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable for the account locale.
pub const ENV_LOCALE: &str = "MITTFORTUM_LOCALE";
/// Environment variable for timeout in seconds.
pub const ENV_TIMEOUT: &str = "MITTFORTUM_TIMEOUT";
/// Environment variable for the site base URL.
pub const ENV_BASE_URL: &str = "MITTFORTUM_BASE_URL";
/// Environment variable for the credentials file.
pub const ENV_CREDENTIALS: &str = "MITTFORTUM_CREDENTIALS";
/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "MITTFORTUM_CONFIG";

/// Accepted timeout range in seconds.
const TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=300;

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Fully resolved configuration after merging CLI, env vars, and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub locale: Locale,
    pub timeout: Duration,
    /// Site URL override; `None` uses the locale's public site.
    pub base_url: Option<String>,
    pub credentials_file: PathBuf,
    pub default_resolution: Resolution,
    /// Config file that was read, if any.
    pub config_file: PathBuf,
    /// Source of each setting for debugging.
    pub sources: ConfigSources,
}

/// Tracks the source of each configuration value.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub locale: ConfigSource,
    pub timeout: ConfigSource,
    pub base_url: ConfigSource,
    pub credentials_file: ConfigSource,
    pub default_resolution: ConfigSource,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value from CLI flag.
    Cli,
    /// Value from environment variable.
    Env,
    /// Value from config file.
    ConfigFile,
    /// Built-in default.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl ResolvedConfig {
    /// Resolve final configuration from CLI args, environment variables, and
    /// config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but is invalid, or any
    /// resolved value is invalid.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        Self::resolve_with(cli, |key| std::env::var(key).ok())
    }

    /// Like [`Self::resolve`], reading environment variables through `env`.
    ///
    /// # Errors
    ///
    /// See [`Self::resolve`].
    pub fn resolve_with(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config_file = env(ENV_CONFIG).map_or_else(Config::config_path, PathBuf::from);
        let config = Config::load_from(&config_file)?;
        config.validate()?;

        let mut sources = ConfigSources::default();
        let locale = Self::resolve_locale(cli, &config, &env, &mut sources.locale)?;
        let timeout = Self::resolve_timeout(cli, &config, &env, &mut sources.timeout)?;
        let base_url = Self::resolve_base_url(cli, &config, &env, &mut sources.base_url);
        let credentials_file =
            Self::resolve_credentials(cli, &config, &env, &mut sources.credentials_file);
        let default_resolution = if let Some(resolution) = &config.api.default_resolution {
            sources.default_resolution = ConfigSource::ConfigFile;
            resolution.parse()?
        } else {
            Resolution::default()
        };

        Ok(Self {
            locale,
            timeout,
            base_url,
            credentials_file,
            default_resolution,
            config_file,
            sources,
        })
    }

    /// Endpoints for the resolved locale and base URL.
    #[must_use]
    pub fn endpoints(&self) -> Endpoints {
        self.base_url.as_ref().map_or_else(
            || Endpoints::new(self.locale),
            |url| Endpoints::with_site_url(self.locale, url.clone()),
        )
    }

    fn resolve_locale(
        cli: &Cli,
        config: &Config,
        env: &impl Fn(&str) -> Option<String>,
        source: &mut ConfigSource,
    ) -> Result<Locale> {
        if let Some(locale) = cli.locale {
            *source = ConfigSource::Cli;
            return Ok(locale);
        }
        if let Some(value) = env(ENV_LOCALE) {
            *source = ConfigSource::Env;
            return value.parse();
        }
        if let Some(value) = &config.general.locale {
            *source = ConfigSource::ConfigFile;
            return value.parse();
        }
        *source = ConfigSource::Default;
        Ok(Locale::default())
    }

    fn resolve_timeout(
        cli: &Cli,
        config: &Config,
        env: &impl Fn(&str) -> Option<String>,
        source: &mut ConfigSource,
    ) -> Result<Duration> {
        let seconds = if let Some(timeout) = cli.timeout {
            *source = ConfigSource::Cli;
            timeout
        } else if let Some(timeout) = env(ENV_TIMEOUT).and_then(|v| v.trim().parse::<u64>().ok()) {
            *source = ConfigSource::Env;
            timeout
        } else {
            *source = ConfigSource::ConfigFile;
            config.general.timeout_seconds
        };
        validate_timeout(seconds)?;
        Ok(Duration::from_secs(seconds))
    }

    fn resolve_base_url(
        cli: &Cli,
        config: &Config,
        env: &impl Fn(&str) -> Option<String>,
        source: &mut ConfigSource,
    ) -> Option<String> {
        if let Some(url) = &cli.base_url {
            *source = ConfigSource::Cli;
            return Some(url.clone());
        }
        if let Some(url) = env(ENV_BASE_URL).filter(|u| !u.is_empty()) {
            *source = ConfigSource::Env;
            return Some(url);
        }
        if let Some(url) = &config.api.base_url {
            *source = ConfigSource::ConfigFile;
            return Some(url.clone());
        }
        *source = ConfigSource::Default;
        None
    }

    fn resolve_credentials(
        cli: &Cli,
        config: &Config,
        env: &impl Fn(&str) -> Option<String>,
        source: &mut ConfigSource,
    ) -> PathBuf {
        if let Some(path) = &cli.credentials {
            *source = ConfigSource::Cli;
            return path.clone();
        }
        if let Some(path) = env(ENV_CREDENTIALS) {
            *source = ConfigSource::Env;
            return PathBuf::from(path);
        }
        if let Some(path) = &config.auth.credentials_file {
            *source = ConfigSource::ConfigFile;
            return path.clone();
        }
        *source = ConfigSource::Default;
        AppPaths::new().credentials_file()
    }
}

fn validate_timeout(seconds: u64) -> Result<()> {
    if TIMEOUT_RANGE.contains(&seconds) {
        Ok(())
    } else {
        Err(FortumError::Config(
            "Timeout must be between 1 and 300 seconds".to_string(),
        ))
    }
}

// =============================================================================
// Config File
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub api: ApiConfig,
    pub auth: AuthConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Account market (SV or FI).
    pub locale: Option<String>,
    /// Timeout for network requests in seconds.
    pub timeout_seconds: u64,
    /// Default log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
}

/// API settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Site base URL override, e.g. for a proxy.
    pub base_url: Option<String>,
    /// Resolution used when a query does not specify one.
    pub default_resolution: Option<String>,
}

/// Credential settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Path of the credentials file written by the login tool.
    pub credentials_file: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            locale: None,
            timeout_seconds: 30,
            log_level: None,
        }
    }
}

impl Config {
    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error only if the file exists but is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| FortumError::Config(format!("Invalid config file: {e}")))
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| FortumError::Config(format!("Failed to serialize config: {e}")))?;

        fs::write(path, content)?;
        tracing::debug!(?path, "Config file saved");
        Ok(())
    }

    /// Get the default config file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        AppPaths::new().config_file()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`FortumError::Config`] or [`FortumError::UnsupportedLocale`]
    /// naming the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if let Some(locale) = &self.general.locale {
            locale.parse::<Locale>()?;
        }
        if let Some(resolution) = &self.api.default_resolution {
            resolution.parse::<Resolution>()?;
        }
        if let Some(url) = &self.api.base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(FortumError::Config(format!(
                "Invalid base_url \"{url}\". Must start with http:// or https://"
            )));
        }
        validate_timeout(self.general.timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestDir;
    use clap::Parser;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["mittfortum"];
        argv.extend_from_slice(args);
        argv.push("check");
        Cli::try_parse_from(argv).unwrap()
    }

    fn env_with(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.general.timeout_seconds, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_missing_file_returns_default() {
        let config = Config::load_from(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config.general.timeout_seconds, 30);
        assert!(config.general.locale.is_none());
    }

    #[test]
    fn load_valid_toml() {
        let file = config_file(
            r#"
[general]
locale = "FI"
timeout_seconds = 60

[api]
default_resolution = "DAY"

[auth]
credentials_file = "/tmp/creds.json"
"#,
        );

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.general.locale.as_deref(), Some("FI"));
        assert_eq!(config.general.timeout_seconds, 60);
        assert_eq!(config.api.default_resolution.as_deref(), Some("DAY"));
        assert_eq!(
            config.auth.credentials_file,
            Some(PathBuf::from("/tmp/creds.json"))
        );
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let file = config_file("this is not valid toml {{{{");
        assert!(matches!(
            Config::load_from(file.path()),
            Err(FortumError::Config(_))
        ));
    }

    #[test]
    fn roundtrip_save_load() {
        let dir = TestDir::new();
        let path = dir.file_path("nested/config.toml");

        let mut config = Config::default();
        config.general.timeout_seconds = 120;
        config.general.locale = Some("FI".to_string());
        config.api.base_url = Some("http://localhost:8080/se/el".to_string());

        config.save_to(&path).unwrap();

        let written = dir.read_file("nested/config.toml").unwrap();
        assert!(written.contains("[general]"));
        assert!(written.contains("locale = \"FI\""));
        assert!(written.contains("timeout_seconds = 120"));

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.general.timeout_seconds, 120);
        assert_eq!(loaded.general.locale.as_deref(), Some("FI"));
        assert_eq!(loaded.api.base_url, config.api.base_url);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.general.locale = Some("DE".to_string());
        assert!(matches!(
            config.validate(),
            Err(FortumError::UnsupportedLocale(_))
        ));

        let mut config = Config::default();
        config.api.default_resolution = Some("WEEK".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api.base_url = Some("ftp://example".to_string());
        assert!(config.validate().is_err());

        for timeout in [0, 301] {
            let mut config = Config::default();
            config.general.timeout_seconds = timeout;
            let err = config.validate().unwrap_err().to_string();
            assert!(err.contains("Timeout must be between"));
        }
    }

    #[test]
    fn resolved_defaults() {
        let file = config_file("");
        let path = file.path().to_string_lossy().to_string();
        let resolved =
            ResolvedConfig::resolve_with(&cli(&[]), env_with(&[(ENV_CONFIG, &path)])).unwrap();

        assert_eq!(resolved.locale, Locale::Sv);
        assert_eq!(resolved.timeout, Duration::from_secs(30));
        assert_eq!(resolved.default_resolution, Resolution::Month);
        assert!(resolved.base_url.is_none());
        assert_eq!(resolved.sources.locale, ConfigSource::Default);
        assert_eq!(resolved.config_file, file.path());
        assert_eq!(resolved.endpoints().site_url(), "https://www.fortum.com/se/el");
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let file = config_file("[general]\nlocale = \"SV\"\ntimeout_seconds = 45\n");
        let path = file.path().to_string_lossy().to_string();

        let resolved = ResolvedConfig::resolve_with(
            &cli(&[]),
            env_with(&[(ENV_CONFIG, &path), (ENV_LOCALE, "fi")]),
        )
        .unwrap();
        assert_eq!(resolved.locale, Locale::Fi);
        assert_eq!(resolved.sources.locale, ConfigSource::Env);
        assert_eq!(resolved.timeout, Duration::from_secs(45));
        assert_eq!(resolved.sources.timeout, ConfigSource::ConfigFile);

        let resolved = ResolvedConfig::resolve_with(
            &cli(&["--locale", "SV", "--timeout", "10"]),
            env_with(&[(ENV_CONFIG, &path), (ENV_LOCALE, "FI"), (ENV_TIMEOUT, "20")]),
        )
        .unwrap();
        assert_eq!(resolved.locale, Locale::Sv);
        assert_eq!(resolved.sources.locale, ConfigSource::Cli);
        assert_eq!(resolved.timeout, Duration::from_secs(10));
    }

    #[test]
    fn env_base_url_and_credentials() {
        let file = config_file("");
        let path = file.path().to_string_lossy().to_string();
        let resolved = ResolvedConfig::resolve_with(
            &cli(&[]),
            env_with(&[
                (ENV_CONFIG, &path),
                (ENV_BASE_URL, "http://127.0.0.1:9000/se/el/"),
                (ENV_CREDENTIALS, "/tmp/c.json"),
            ]),
        )
        .unwrap();
        assert_eq!(
            resolved.endpoints().session_url(),
            "http://127.0.0.1:9000/se/el/api/auth/session"
        );
        assert_eq!(resolved.credentials_file, PathBuf::from("/tmp/c.json"));
        assert_eq!(resolved.sources.credentials_file, ConfigSource::Env);
    }

    #[test]
    fn invalid_env_locale_is_error() {
        let file = config_file("");
        let path = file.path().to_string_lossy().to_string();
        let result = ResolvedConfig::resolve_with(
            &cli(&[]),
            env_with(&[(ENV_CONFIG, &path), (ENV_LOCALE, "NO")]),
        );
        assert!(matches!(result, Err(FortumError::UnsupportedLocale(_))));
    }

    #[test]
    fn cli_timeout_out_of_range_is_error() {
        let file = config_file("");
        let path = file.path().to_string_lossy().to_string();
        let result =
            ResolvedConfig::resolve_with(&cli(&["--timeout", "0"]), env_with(&[(ENV_CONFIG, &path)]));
        assert!(result.is_err());
    }

    #[test]
    fn config_source_display() {
        assert_eq!(ConfigSource::Cli.to_string(), "CLI flag");
        assert_eq!(ConfigSource::Env.to_string(), "environment variable");
        assert_eq!(ConfigSource::ConfigFile.to_string(), "config file");
        assert_eq!(ConfigSource::Default.to_string(), "default");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let file = config_file("[general]\ntimeout_seconds = 15\nfuture_option = true\n");
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.general.timeout_seconds, 15);
    }
}
