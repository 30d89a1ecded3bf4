//! # Logger
//!
//! Installs the global `tracing` subscriber from a [`LoggingConfig`] section.
//!
//! The model crates only emit `tracing` events; applications (and tests that want to see
//! those events) call [`init`] once at startup and keep the returned [`Logger`] alive.
//!
//! * Console output uses the compact formatter with ANSI colors.
//! * File output uses a rolling, non-blocking appender; set `json = true` for JSON lines.
//! * `RUST_LOG` is honoured when no explicit `filter` is configured.
//!
//! ## Example
//!
//! ```rust
//! use basis_logger::LoggingConfig;
//!
//! let config = LoggingConfig { level: "debug".into(), ..LoggingConfig::default() };
//! let _logger = basis_logger::init(&config).unwrap();
//! tracing::debug!("logging is up");
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const LOG_FILE_SUFFIX: &str = "log";

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<RotationPolicy> for Rotation {
    fn from(policy: RotationPolicy) -> Self {
        match policy {
            RotationPolicy::Minutely => Self::MINUTELY,
            RotationPolicy::Hourly => Self::HOURLY,
            RotationPolicy::Daily => Self::DAILY,
            RotationPolicy::Never => Self::NEVER,
        }
    }
}

/// The `[logging]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Prefix for rolling log files (`<name>.<date>.log`).
    pub name: String,
    /// Default level: `trace`, `debug`, `info`, `warn`, `error` or `off`.
    pub level: String,
    /// Explicit filter directives (e.g. `basis_model=debug,basis_storage=warn`).
    pub filter: Option<String>,
    pub console: bool,
    /// Directory for rolling log files; file output is disabled when unset.
    pub directory: Option<PathBuf>,
    pub rotation: RotationPolicy,
    pub max_files: usize,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            name: "basis".to_owned(),
            level: "info".to_owned(),
            filter: None,
            console: true,
            directory: None,
            rotation: RotationPolicy::Daily,
            max_files: 10,
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Checks the section without touching the global subscriber.
    ///
    /// # Errors
    /// Returns [`LoggerError::InvalidConfiguration`] for an empty name, zero `max_files`,
    /// an unknown level, a malformed filter, or when no output is enabled.
    pub fn validate(&self) -> Result<(), LoggerError> {
        if self.name.trim().is_empty() {
            return Err(invalid("Logger name cannot be empty"));
        }
        if self.max_files == 0 {
            return Err(invalid("max_files must be greater than zero"));
        }
        if !self.console && self.directory.is_none() {
            return Err(invalid("No logging output enabled. Enable console or set a directory."));
        }
        self.env_filter().map(|_| ())
    }

    fn level_filter(&self) -> Result<LevelFilter, LoggerError> {
        LevelFilter::from_str(self.level.trim()).map_err(|e| LoggerError::InvalidConfiguration {
            message: format!("Unknown level '{}': {e}", self.level).into(),
            context: None,
        })
    }

    fn env_filter(&self) -> Result<EnvFilter, LoggerError> {
        let builder = EnvFilter::builder().with_default_directive(self.level_filter()?.into());
        self.filter.as_ref().map_or_else(
            || Ok(builder.from_env_lossy()),
            |filter| {
                builder.parse(filter).map_err(|e| LoggerError::InvalidConfiguration {
                    message: format!("Invalid filter '{filter}': {e}").into(),
                    context: None,
                })
            },
        )
    }
}

fn invalid(message: &'static str) -> LoggerError {
    LoggerError::InvalidConfiguration { message: message.into(), context: None }
}

/// Installs the global subscriber described by `config`.
///
/// # Errors
/// Returns [`LoggerError::InvalidConfiguration`] for an invalid section,
/// [`LoggerError::Io`] / [`LoggerError::Appender`] when the log directory is unusable, and
/// [`LoggerError::Subscriber`] if a global subscriber has already been set.
pub fn init(config: &LoggingConfig) -> Result<Logger, LoggerError> {
    config.validate()?;
    let env_filter = config.env_filter()?;

    let mut layers = Vec::new();

    if config.console {
        layers.push(layer().compact().with_ansi(true).boxed());
    }

    let guard = match &config.directory {
        Some(directory) => {
            fs::create_dir_all(directory)
                .context(format!("Failed to create log directory: {}", directory.display()))?;

            let appender = RollingFileAppender::builder()
                .rotation(config.rotation.into())
                .filename_prefix(&config.name)
                .filename_suffix(LOG_FILE_SUFFIX)
                .max_log_files(config.max_files)
                .build(directory)?;

            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = layer().with_writer(writer).with_ansi(false);
            layers.push(if config.json { file_layer.json().boxed() } else { file_layer.boxed() });
            Some(guard)
        },
        None => None,
    };

    tracing_subscriber::registry().with(env_filter).with(layers).try_init()?;

    Ok(Logger { guard })
}

/// Keeps the non-blocking file writer alive; drop it only at shutdown.
#[must_use = "Dropping this handle stops the background log writer."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    /// Returns `true` when file output is active.
    #[must_use]
    pub const fn writes_files(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!("Logging system shutting down, flushing buffers...");
        }
    }
}
