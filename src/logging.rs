use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::Config;

const LOG_FILE_PREFIX: &str = "most-read";
const MAX_LOG_FILES: usize = 30;

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
}

impl From<&Config> for LogConfig {
    fn from(config: &Config) -> Self {
        Self {
            log_level: config.log_level.clone(),
            enable_file_logs: config.enable_file_logs,
            log_dir: config.log_dir.clone(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_file_logs: false,
            log_dir: "./logs".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open rolling log files in {dir}: {source}")]
    Appender {
        dir: String,
        #[source]
        source: InitError,
    },
}

/// Installs the global subscriber: stdout always, daily JSON files when enabled.
///
/// Keep the returned guard alive for the life of the process, dropping it
/// flushes buffered file output. Calling this again after a subscriber is
/// installed changes nothing.
pub fn init_tracing(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let stdout_layer = fmt::layer().with_target(true).with_thread_ids(false);
    let registry = Registry::default().with(env_filter).with(stdout_layer);

    if !config.enable_file_logs {
        let _ = registry.try_init();
        return Ok(None);
    }

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(&config.log_dir)
        .map_err(|source| LoggingError::Appender {
            dir: config.log_dir.clone(),
            source,
        })?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = fmt::layer().with_writer(writer).with_ansi(false).json();

    if registry.with(file_layer).try_init().is_err() {
        // Someone else owns the global subscriber; our file writer would never see events.
        return Ok(None);
    }
    Ok(Some(guard))
}
