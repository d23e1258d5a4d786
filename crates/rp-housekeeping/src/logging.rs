//! # Structured Logging
//!
//! Logging goes through the `tracing` ecosystem. Programs built on this crate
//! call [`init_logging`] once at startup; library code only emits events:
//!
//! - `info`: block mapped / unmapped
//! - `warn`: declared block size short of the field table, hex text not
//!   fully parsed
//! - `debug`: backend selection, simulated SPI runs
//! - `trace`: every register write (field, offset, word)
//!
//! Output goes to stderr so that program output on stdout stays clean.
//!
//! ```rust,ignore
//! use rp_housekeeping::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development());
//! ```

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

/// Default verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

/// Event layout on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event
    Json,
    /// Multi-line, for reading at a terminal
    Pretty,
    /// One line per event
    #[default]
    Compact,
}

/// Logging configuration, usually the `log` section of the YAML config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level for every target without a directive
    pub level: LogLevel,

    pub format: LogFormat,

    /// Full filter in `RUST_LOG` syntax; replaces `level` and `RUST_LOG`
    pub filter: Option<String>,

    /// Prefix events with a timestamp
    pub timestamps: bool,

    /// Add file:line to each event
    pub source_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            filter: None,
            timestamps: true,
            source_location: false,
        }
    }
}

impl LogConfig {
    /// Bench setup: every register write of this crate, debug elsewhere
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            filter: Some("debug,rp_housekeeping=trace".to_string()),
            source_location: true,
            ..Self::default()
        }
    }

    /// Errors only, no timestamps
    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Error,
            timestamps: false,
            ..Self::default()
        }
    }

    /// Filter in effect: explicit `filter`, else `RUST_LOG`, else `level`
    pub fn env_filter(&self) -> EnvFilter {
        let fallback = || {
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from(self.level).into())
                .parse_lossy("")
        };
        match &self.filter {
            Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|_| fallback()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn stderr_layer(config: &LogConfig) -> BoxedLayer {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    match (config.format, config.timestamps) {
        (LogFormat::Json, true) => layer.json().boxed(),
        (LogFormat::Json, false) => layer.json().without_time().boxed(),
        (LogFormat::Pretty, true) => layer.pretty().boxed(),
        (LogFormat::Pretty, false) => layer.pretty().without_time().boxed(),
        (LogFormat::Compact, true) => layer.compact().boxed(),
        (LogFormat::Compact, false) => layer.compact().without_time().boxed(),
    }
}

/// Install the global subscriber
///
/// Returns `false` when one is already installed; the call then has no
/// effect, so libraries and tests may call it freely.
pub fn init_logging(config: &LogConfig) -> bool {
    tracing_subscriber::registry()
        .with(stderr_layer(config))
        .with(config.env_filter())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_mapping() {
        assert_eq!(LevelFilter::from(LogLevel::Trace), LevelFilter::TRACE);
        assert_eq!(LevelFilter::from(LogLevel::Off), LevelFilter::OFF);
        assert!(LogLevel::Trace < LogLevel::Warn);
    }

    #[test]
    fn test_presets() {
        let dev = LogConfig::development();
        assert_eq!(dev.format, LogFormat::Pretty);
        assert!(dev.filter.as_deref().is_some_and(|f| f.contains("rp_housekeeping=trace")));

        let quiet = LogConfig::quiet();
        assert_eq!(quiet.level, LogLevel::Error);
        assert_eq!(quiet.format, LogFormat::Compact);
        assert!(quiet.filter.is_none());
    }

    #[test]
    fn test_log_section_from_yaml() {
        let config: LogConfig =
            serde_yaml::from_str("level: off\nformat: json\nsource_location: true\n").unwrap();
        assert_eq!(config.level, LogLevel::Off);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.source_location);
        // unspecified keys keep their defaults
        assert!(config.timestamps);
    }

    #[test]
    fn test_explicit_filter_wins() {
        let config = LogConfig {
            filter: Some("rp_housekeeping::devmem=debug".to_string()),
            ..LogConfig::quiet()
        };
        assert!(config.env_filter().to_string().contains("rp_housekeeping::devmem"));
    }

    #[test]
    fn test_second_init_is_ignored() {
        let _ = init_logging(&LogConfig::quiet());
        assert!(!init_logging(&LogConfig::quiet()));
    }
}
