//! # Logging
//!
//! Installs the global `tracing` subscriber. All components log through the
//! `tracing` macros with structured fields (`trace_id`, `func`, `uri`, ...),
//! so the output format is decided here only.
//!
//! ## Environment Variables
//!
//! - `BRRTD_LOG_LEVEL` - `trace`/`debug`/`info`/`warn`/`error` (default `info`)
//! - `BRRTD_LOG_FORMAT` - `json` (default) or `pretty`
//! - `BRRTD_LOG_TARGET_FILTER` - extra comma-separated `EnvFilter` directives
//! - `BRRTD_LOG_INCLUDE_LOCATION` - `true` to print file and line
//! - `BRRTD_LOG_ASYNC` - `true` to write through a non-blocking buffer
//!
//! `RUST_LOG`, when set, replaces the base level.

use std::env;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base level: trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Extra directives (comma-separated)
    pub target_filter: Option<String>,
    /// Include file:line location
    pub include_location: bool,
    /// Buffer output on a background thread
    pub async_logging: bool,
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset values take defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| {
            lookup(key)
                .and_then(|s| s.parse().ok())
                .unwrap_or(false)
        };
        Self {
            log_level: lookup("BRRTD_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            format: LogFormat::parse(&lookup("BRRTD_LOG_FORMAT").unwrap_or_default()),
            target_filter: lookup("BRRTD_LOG_TARGET_FILTER").filter(|s| !s.trim().is_empty()),
            include_location: flag("BRRTD_LOG_INCLUDE_LOCATION"),
            async_logging: flag("BRRTD_LOG_ASYNC"),
        }
    }

    /// Verbose, human-readable settings for local runs and tests
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            target_filter: None,
            include_location: true,
            async_logging: false,
        }
    }

    /// Build the `EnvFilter` this configuration describes.
    ///
    /// # Errors
    ///
    /// Fails if a directive in `target_filter` cannot be parsed.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        let level = match self.log_level.to_lowercase().as_str() {
            lvl @ ("trace" | "debug" | "info" | "warn" | "error") => lvl.to_string(),
            _ => "info".to_string(),
        };
        let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        // Connection resets are reported by may_minihttp at error level.
        filter = filter.add_directive(
            "may_minihttp=warn"
                .parse()
                .context("invalid built-in log directive")?,
        );

        if let Some(extra) = &self.target_filter {
            for directive in extra.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                let parsed = directive
                    .parse()
                    .with_context(|| format!("invalid log filter directive '{directive}'"))?;
                filter = filter.add_directive(parsed);
            }
        }
        Ok(filter)
    }
}

/// Install the global subscriber.
///
/// With `async_logging` the returned guard must be held until exit so the
/// buffer is flushed.
///
/// # Errors
///
/// Fails on invalid filter directives or if a subscriber is already set.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = config.env_filter()?;

    let (writer, guard) = if config.async_logging {
        let (nb, guard) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(nb), Some(guard))
    } else {
        (
            tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout),
            None,
        )
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parse_defaults_to_json() {
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(""), LogFormat::Json);
    }

    #[test]
    fn lookup_defaults() {
        let cfg = LogConfig::from_lookup(|_| None);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.format, LogFormat::Json);
        assert!(cfg.target_filter.is_none());
        assert!(!cfg.include_location);
        assert!(!cfg.async_logging);
    }

    #[test]
    fn lookup_reads_values() {
        let cfg = LogConfig::from_lookup(|key| match key {
            "BRRTD_LOG_LEVEL" => Some("warn".into()),
            "BRRTD_LOG_FORMAT" => Some("pretty".into()),
            "BRRTD_LOG_TARGET_FILTER" => Some("brrtdispatch=trace".into()),
            "BRRTD_LOG_INCLUDE_LOCATION" => Some("true".into()),
            _ => None,
        });
        assert_eq!(cfg.log_level, "warn");
        assert_eq!(cfg.format, LogFormat::Pretty);
        assert_eq!(cfg.target_filter.as_deref(), Some("brrtdispatch=trace"));
        assert!(cfg.include_location);
    }

    #[test]
    fn bad_directive_is_reported() {
        let mut cfg = LogConfig::default_dev();
        cfg.target_filter = Some("brrtdispatch=loud".into());
        let err = cfg.env_filter().unwrap_err();
        assert!(err.to_string().contains("brrtdispatch=loud"));
    }

    #[test]
    fn good_directives_build() {
        let mut cfg = LogConfig::default_dev();
        cfg.target_filter = Some("brrtdispatch::rpc=trace, may=info".into());
        assert!(cfg.env_filter().is_ok());
    }
}
