//! Logging through `tracing` and `tracing-subscriber`.
//!
//! Logs always go to stderr: stdout carries the usage line and the final
//! success or error message, and scripts depend on it.
//!
//! - `RUST_LOG` overrides the default `warn` filter.
//! - `CSV2IIF_LOG_FORMAT` picks `compact` (default), `pretty` or `json`.
//!
//! Row contents are only ever logged at `debug` or below.

use std::io::{self, IsTerminal};
use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

/// Environment variable selecting the log output format.
pub(crate) const LOG_FORMAT_VAR: &str = "CSV2IIF_LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum LogFormat {
    /// Single-line human-readable format.
    #[default]
    Compact,
    /// Multi-line human-readable format.
    Pretty,
    /// JSON lines for machine parsing.
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogConfig {
    /// Level used when `RUST_LOG` is unset or invalid.
    pub level: Level,
    pub format: LogFormat,
    /// Whether to use ANSI colors; ignored for JSON.
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::default(),
            with_ansi: false,
        }
    }
}

impl LogConfig {
    /// Reads the format from `CSV2IIF_LOG_FORMAT`; colors only on a terminal.
    pub fn from_env() -> Self {
        Self::from_format_var(std::env::var(LOG_FORMAT_VAR).ok().as_deref())
    }

    fn from_format_var(value: Option<&str>) -> Self {
        Self {
            format: value.and_then(LogFormat::parse).unwrap_or_default(),
            with_ansi: io::stderr().is_terminal(),
            ..Self::default()
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub(crate) fn init_logging(config: &LogConfig) -> Result<(), TryInitError> {
    let filter = build_env_filter(config.level);
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(io::stderr)
                    .with_ansi(config.with_ansi)
                    .with_target(false)
                    .without_time(),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(io::stderr)
                    .with_ansi(config.with_ansi)
                    .without_time(),
            )
            .try_init(),
    }
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::{LogConfig, LogFormat};
    use tracing::Level;

    #[test]
    fn test_format_from_env_value() {
        assert_eq!(LogConfig::from_format_var(None).format, LogFormat::Compact);
        assert_eq!(
            LogConfig::from_format_var(Some("JSON")).format,
            LogFormat::Json
        );
        assert_eq!(
            LogConfig::from_format_var(Some(" pretty ")).format,
            LogFormat::Pretty
        );
        assert_eq!(
            LogConfig::from_format_var(Some("fancy")).format,
            LogFormat::Compact
        );
    }

    #[test]
    fn test_default_level_is_warn() {
        assert_eq!(LogConfig::from_format_var(None).level, Level::WARN);
    }
}
