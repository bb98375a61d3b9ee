//! Logging setup for the `pr-changes` binary.
//!
//! Logging is off unless a level is configured. When on, events from this
//! crate only are written through a non-blocking writer to stderr or a file,
//! as compact text or JSON lines.

use crate::config::Settings;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const ALL: [LogLevel; 5] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    /// Parses a level name, case-insensitively. `warning` is accepted for `warn`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let name = s.trim().to_ascii_lowercase();
        if name == "warning" {
            return Some(LogLevel::Warn);
        }
        Self::ALL.into_iter().find(|level| level.as_filter_str() == name)
    }

    /// The level as written in a tracing filter directive.
    #[must_use]
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Logging options taken from the resolved settings.
#[derive(Debug, Default)]
pub struct LogConfig {
    /// `None` disables logging.
    pub level: Option<LogLevel>,
    /// `None` writes to stderr.
    pub file: Option<PathBuf>,
    pub format: LogFormat,
}

impl LogConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            level: settings.log_level.as_ref().map(|level| *level.value()),
            file: settings.log_file.as_ref().map(|file| file.value().clone()),
            format: *settings.log_format.value(),
        }
    }

    /// Filter directive restricting output to this crate, `None` when disabled.
    pub fn filter_directive(&self) -> Option<String> {
        self.level
            .map(|level| format!("pr_changes={}", level.as_filter_str()))
    }

    fn writer(&self) -> Result<(NonBlocking, WorkerGuard)> {
        match &self.file {
            Some(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open log file: {}", path.display()))?;
                Ok(tracing_appender::non_blocking(file))
            }
            None => Ok(tracing_appender::non_blocking(std::io::stderr())),
        }
    }

    fn layer(&self, writer: NonBlocking) -> Box<dyn Layer<Registry> + Send + Sync> {
        // Source locations only help when reading a log file later.
        let to_file = self.file.is_some();
        match self.format {
            LogFormat::Json => fmt::layer()
                .with_writer(writer)
                .json()
                .with_span_events(FmtSpan::CLOSE)
                .with_file(to_file)
                .with_line_number(to_file)
                .boxed(),
            LogFormat::Text => fmt::layer()
                .with_writer(writer)
                .with_ansi(!to_file)
                .with_file(to_file)
                .with_line_number(to_file)
                .compact()
                .boxed(),
        }
    }
}

/// Keeps the background log writer alive; pending events are flushed on drop.
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Installs the global subscriber described by `config`.
///
/// Returns `Ok(None)` when logging is disabled. Hold the guard until exit.
///
/// # Example
///
/// ```rust,no_run
/// use pr_changes::logging::{LogConfig, LogLevel, LogFormat, init_logging};
/// use std::path::PathBuf;
///
/// let config = LogConfig {
///     level: Some(LogLevel::Debug),
///     file: Some(PathBuf::from("/tmp/pr-changes.log")),
///     format: LogFormat::Json,
/// };
///
/// let _guard = init_logging(&config).unwrap();
/// ```
#[must_use = "the returned guard must be held until application exit"]
pub fn init_logging(config: &LogConfig) -> Result<Option<LogGuard>> {
    let Some(directive) = config.filter_directive() else {
        return Ok(None);
    };

    let (writer, guard) = config.writer()?;
    tracing_subscriber::registry()
        .with(config.layer(writer))
        .with(EnvFilter::new(directive))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(Some(LogGuard { _guard: guard }))
}
