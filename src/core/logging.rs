//! Diagnostic logging to stderr or a file.
//!
//! Request retries, range degradation and server errors are reported as
//! `tracing` events; this module installs the subscriber that renders them.
//! `RUST_LOG` wins over every other setting when present.

use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

pub const LOG_LEVEL_ENV: &str = "MITTFORTUM_LOG";
pub const LOG_FORMAT_ENV: &str = "MITTFORTUM_LOG_FORMAT";
pub const LOG_FILE_ENV: &str = "MITTFORTUM_LOG_FILE";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable logs.
    #[default]
    Human,
    /// JSON logs (one event per line).
    Json,
    /// Compact logs (single line, terse).
    Compact,
}

impl LogFormat {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "human" | "pretty" => Some(Self::Human),
            "json" | "jsonl" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Log level from CLI argument or environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "verbose" | "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" | "critical" => Some(Self::Error),
            _ => None,
        }
    }

    /// Convert to tracing filter string.
    #[must_use]
    pub const fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    #[must_use]
    pub const fn as_tracing_level(self) -> Level {
        match self {
            Self::Trace => Level::TRACE,
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }
}

/// Logging settings gathered from CLI flags, environment and config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl LogSettings {
    /// Resolve settings. Explicit arguments beat environment variables,
    /// which beat `config_level`.
    #[must_use]
    pub fn resolve(
        cli_level: Option<&str>,
        json_output: bool,
        config_level: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let non_empty = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let level = cli_level
            .and_then(LogLevel::from_arg)
            .or_else(|| non_empty(LOG_LEVEL_ENV).and_then(|v| LogLevel::from_arg(&v)))
            .or_else(|| config_level.and_then(LogLevel::from_arg))
            .unwrap_or_default();

        let format = if json_output {
            LogFormat::Json
        } else {
            non_empty(LOG_FORMAT_ENV)
                .and_then(|v| LogFormat::from_arg(&v))
                .unwrap_or_default()
        };

        Self {
            level,
            format,
            file: non_empty(LOG_FILE_ENV).map(PathBuf::from),
        }
    }
}

/// Initialize logging with the given settings.
///
/// `verbose` raises a default level to debug. Calling twice is a no-op.
pub fn init(level: LogLevel, format: LogFormat, log_file: Option<PathBuf>, verbose: bool) {
    let level = if verbose && matches!(level, LogLevel::Warn | LogLevel::Error) {
        LogLevel::Debug
    } else {
        level
    };

    let file = log_file.and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok()
    });

    let make_writer = |file: Option<&std::fs::File>| -> BoxMakeWriter {
        if let Some(file) = file.and_then(|inner| inner.try_clone().ok()) {
            BoxMakeWriter::new(file)
        } else {
            BoxMakeWriter::new(std::io::stderr)
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mittfortum={}", level.as_filter())));
    let writer = make_writer(file.as_ref());

    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_writer(writer)
                .with_span_events(FmtSpan::CLOSE)
                .try_init()
                .ok();
        }
        LogFormat::Compact => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .compact()
                .with_writer(writer)
                .with_target(true)
                .try_init()
                .ok();
        }
        LogFormat::Human => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_target(false)
                .without_time()
                .try_init()
                .ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn level_aliases() {
        assert_eq!(LogLevel::from_arg("verbose"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_arg("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_arg("loud"), None);
        assert_eq!(LogLevel::Info.as_tracing_level(), Level::INFO);
    }

    #[test]
    fn defaults_without_any_source() {
        let settings = LogSettings::resolve(None, false, None, env(&[]));
        assert_eq!(settings, LogSettings::default());
        assert_eq!(settings.level, LogLevel::Warn);
    }

    #[test]
    fn cli_beats_env_beats_config() {
        let vars = env(&[(LOG_LEVEL_ENV, "trace")]);
        assert_eq!(
            LogSettings::resolve(Some("info"), false, Some("error"), &vars).level,
            LogLevel::Info
        );
        assert_eq!(
            LogSettings::resolve(None, false, Some("error"), &vars).level,
            LogLevel::Trace
        );
        assert_eq!(
            LogSettings::resolve(None, false, Some("error"), env(&[])).level,
            LogLevel::Error
        );
    }

    #[test]
    fn format_and_file_from_env() {
        let vars = env(&[(LOG_FORMAT_ENV, "compact"), (LOG_FILE_ENV, " /tmp/mf.log ")]);
        let settings = LogSettings::resolve(None, false, None, &vars);
        assert_eq!(settings.format, LogFormat::Compact);
        assert_eq!(settings.file, Some(PathBuf::from("/tmp/mf.log")));

        assert_eq!(
            LogSettings::resolve(None, true, None, &vars).format,
            LogFormat::Json
        );
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let settings = LogSettings::resolve(None, false, None, env(&[(LOG_LEVEL_ENV, "  ")]));
        assert_eq!(settings.level, LogLevel::Warn);
    }
}
