//! Process logging
//!
//! The logger is built once at process start and handed to every component as a
//! [`PipelineLogger`]. Events emitted inside [`PipelineLogger::in_scope`] go to
//!
//! - an append-only file named after the process start time
//!   (`logs/%m_%d_%Y_%H_%M_%S.log`), one line per event:
//!   `[ 2024-05-01 10:00:00,123 ] 42 scorecast::ingestion - INFO - message`
//! - stderr, filtered by `RUST_LOG` or the configured directive.
//!
//! No global subscriber is installed.

use crate::config::LoggingConfig;
use crate::error::{ErrorContext, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{Dispatch, Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{self, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Line format of the process log file
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLogFormat;

impl<S, N> FormatEvent<S, N> for ProcessLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        write!(
            writer,
            "[ {} ] {} {} - {} - ",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            meta.line().unwrap_or(0),
            meta.target(),
            meta.level(),
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// File name of a log started at the current local time
pub fn log_file_name() -> String {
    format!("{}.log", Local::now().format("%m_%d_%Y_%H_%M_%S"))
}

/// Logging handle injected into pipeline components
#[derive(Clone)]
pub struct PipelineLogger {
    dispatch: Dispatch,
    log_file: Option<PathBuf>,
}

impl std::fmt::Debug for PipelineLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineLogger")
            .field("log_file", &self.log_file)
            .finish()
    }
}

impl PipelineLogger {
    /// Build the file and stderr layers described by `config`
    pub fn init(config: &LoggingConfig) -> Result<Self> {
        let stderr_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.stderr_filter));
        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(stderr_filter);

        let (file_layer, log_file) = if config.file_logging {
            std::fs::create_dir_all(&config.log_dir)
                .context(format!("create log directory {}", config.log_dir.display()))?;
            let path = config.log_dir.join(log_file_name());
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .context(format!("open log file {}", path.display()))?;
            let layer = fmt::layer()
                .event_format(ProcessLogFormat)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(LevelFilter::INFO);
            (Some(layer), Some(path))
        } else {
            (None, None)
        };

        let subscriber = Registry::default().with(file_layer).with(stderr_layer);
        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            log_file,
        })
    }

    /// A logger that drops every event
    pub fn disabled() -> Self {
        Self {
            dispatch: Dispatch::none(),
            log_file: None,
        }
    }

    /// Run `f` with this logger as the current thread's subscriber
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Underlying dispatcher
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Path of the log file, when file logging is enabled
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

impl Default for PipelineLogger {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name_shape() {
        let name = log_file_name();
        assert!(name.ends_with(".log"));
        // %m_%d_%Y_%H_%M_%S
        assert_eq!(name.trim_end_matches(".log").split('_').count(), 6);
    }

    #[test]
    fn test_file_line_format() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            log_dir: dir.path().join("logs"),
            file_logging: true,
            stderr_filter: "off".to_string(),
        };
        let logger = PipelineLogger::init(&config).unwrap();
        logger.in_scope(|| tracing::info!("Entered the data ingestion method"));

        let contents = std::fs::read_to_string(logger.log_file().unwrap()).unwrap();
        let line = contents.lines().next().unwrap();
        assert!(line.starts_with("[ "));
        assert!(line.contains(" scorecast::logging::tests - INFO - Entered the data ingestion method"));
    }

    #[test]
    fn test_debug_events_not_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            log_dir: dir.path().to_path_buf(),
            file_logging: true,
            stderr_filter: "off".to_string(),
        };
        let logger = PipelineLogger::init(&config).unwrap();
        logger.in_scope(|| tracing::debug!("noise"));

        let contents = std::fs::read_to_string(logger.log_file().unwrap()).unwrap();
        assert!(contents.is_empty());
    }

    #[test]
    fn test_disabled_logger_runs_closure() {
        let logger = PipelineLogger::disabled();
        assert_eq!(logger.in_scope(|| 7), 7);
        assert!(logger.log_file().is_none());
    }
}
