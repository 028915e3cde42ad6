use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log directive: {0}")]
    Directive(String),

    #[error("Invalid log file path: {0}")]
    FilePath(String),

    #[error("Failed to create log directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Logging configuration for the mock server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Whether to enable JSON formatted logs
    pub json_format: bool,

    /// Whether to include thread names in logs
    pub include_thread_names: bool,

    /// Whether to include file and line number information
    pub include_file_info: bool,

    /// Whether to enable colored output (only for non-JSON format)
    pub enable_colors: bool,

    /// Log file path (optional, if None logs only to stdout)
    pub log_file: Option<String>,

    /// Module-specific log levels
    pub module_levels: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut module_levels = HashMap::new();

        module_levels.insert("mock_core".to_string(), "info".to_string());
        module_levels.insert("attack_engine".to_string(), "info".to_string());
        module_levels.insert("hyper".to_string(), "warn".to_string());
        module_levels.insert("reqwest".to_string(), "warn".to_string());
        module_levels.insert("tokio".to_string(), "warn".to_string());

        Self {
            level: "info".to_string(),
            json_format: false,
            include_thread_names: true,
            include_file_info: false,
            enable_colors: true,
            log_file: None,
            module_levels,
        }
    }
}

/// Build the filter from the base level plus per-module overrides
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| LoggingError::Directive(format!("{}: {}", config.level, e)))?;

    for (module, level) in &config.module_levels {
        let directive = format!("{}={}", module, level);
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| LoggingError::Directive(format!("{}: {}", directive, e)))?,
        );
    }
    Ok(filter)
}

/// Initialize logging based on the provided configuration
///
/// The returned guard flushes the file writer; keep it alive for the
/// lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = build_filter(config)?;

    let stdout_layer = if config.json_format {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_names(config.include_thread_names)
            .with_file(config.include_file_info)
            .with_line_number(config.include_file_info)
            .with_ansi(config.enable_colors)
            .boxed()
    };

    let (file_layer, guard) = match &config.log_file {
        Some(log_file) => {
            let (writer, guard) = tracing_appender::non_blocking(create_file_appender(log_file)?);
            let layer = fmt::layer().with_writer(writer).with_ansi(false).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // Try to initialize logging, ignore if already initialized
    let result = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();

    match result {
        Ok(_) => tracing::info!("Logging initialized with config level: {}", config.level),
        Err(_) => tracing::debug!("Logging already initialized, skipping"),
    }

    Ok(guard)
}

/// Daily-rotated file appender
fn create_file_appender(log_file: &str) -> Result<RollingFileAppender, LoggingError> {
    let log_path = Path::new(log_file);
    let directory = log_path
        .parent()
        .map(|dir| if dir.as_os_str().is_empty() { Path::new(".") } else { dir })
        .ok_or_else(|| LoggingError::FilePath(log_file.to_string()))?;
    let filename = log_path
        .file_name()
        .ok_or_else(|| LoggingError::FilePath(log_file.to_string()))?
        .to_string_lossy();

    std::fs::create_dir_all(directory)?;

    Ok(RollingFileAppender::new(Rotation::DAILY, directory, filename.as_ref()))
}

/// Log level utilities
pub mod levels {
    /// Check if a log level string is valid
    pub fn is_valid_level(level: &str) -> bool {
        matches!(
            level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        )
    }
}
