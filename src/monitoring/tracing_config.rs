//! Subscriber setup: EnvFilter, optional stderr output and an optional
//! daily-rotated log file.

use super::config::{LogFormat, MonitoringConfig};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "docqa.log";

#[derive(Debug, Error)]
pub enum MonitoringError {
    #[error("Cannot create log directory: {0}")]
    LogDir(#[from] std::io::Error),
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer when dropped, so hold it until
/// the program exits. If a subscriber is already installed this is a no-op
/// apart from creating the log directory.
pub fn init_tracing(config: &MonitoringConfig) -> Result<Option<WorkerGuard>, MonitoringError> {
    if !config.enabled {
        return Ok(None);
    }

    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let console = config
        .log_to_console
        .then(|| fmt::layer().with_writer(std::io::stderr).with_target(true));

    let mut guard = None;
    let file = if config.log_to_file {
        config.ensure_log_dir()?;
        let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);

        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        Some(match config.file_format {
            LogFormat::Json => layer.json().boxed(),
            LogFormat::Text => layer.boxed(),
        })
    } else {
        None
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_logging_returns_guard() {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitoringConfig {
            log_dir: dir.path().join("logs"),
            ..Default::default()
        };
        let guard = init_tracing(&config).unwrap();
        assert!(guard.is_some());
        assert!(config.log_dir.is_dir());
    }

    #[test]
    fn test_disabled_installs_nothing() {
        let config = MonitoringConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_tracing(&config).unwrap().is_none());
    }

    #[test]
    fn test_console_only_has_no_guard() {
        let config = MonitoringConfig {
            log_to_file: false,
            log_to_console: true,
            file_format: LogFormat::Text,
            ..Default::default()
        };
        assert!(init_tracing(&config).unwrap().is_none());
    }
}
