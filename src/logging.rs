//! Logging infrastructure - structured tracing for the bridge
//!
//! Diagnostics go to stderr by default (the caller's diagnostic stream),
//! optionally to a file. `RUST_LOG` overrides the configured filter.

use once_cell::sync::OnceCell;
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Global logging state (holds the file writer guard, if any)
static LOGGER: OnceCell<Option<WorkerGuard>> = OnceCell::new();

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Log file path; stderr when absent
    pub log_path: Option<String>,
    /// Enable JSON format (vs human-readable)
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            log_path: None,
            json_format: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // JEVRESP_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level_str) = std::env::var("JEVRESP_LOG_LEVEL") {
            config.level = parse_level(&level_str).unwrap_or(config.level);
        }

        // JEVRESP_LOG_FILE: path to log file
        if let Ok(path) = std::env::var("JEVRESP_LOG_FILE") {
            if !path.is_empty() {
                config.log_path = Some(path);
            }
        }

        // JEVRESP_LOG_JSON: enable JSON format
        config.json_format = std::env::var("JEVRESP_LOG_JSON").is_ok();

        config
    }

    /// Verbose config used when a caller asks for verbose output
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            ..Self::default()
        }
    }
}

/// Parse a level name (case-insensitive)
pub fn parse_level(name: &str) -> Option<Level> {
    match name.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize logging from the environment
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with custom configuration; later calls are no-ops
pub fn init_with_config(config: LogConfig) {
    LOGGER.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("jevresp={}", config.level.as_str().to_lowercase()))
        });

        match config.log_path.as_deref() {
            Some(path) => {
                let path = Path::new(path);
                let directory = path.parent().filter(|p| !p.as_os_str().is_empty());
                let file_name = path.file_name().unwrap_or_else(|| "jevresp.log".as_ref());
                let appender = tracing_appender::rolling::never(
                    directory.unwrap_or_else(|| Path::new(".")),
                    file_name,
                );
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = if config.json_format {
                    fmt::layer().json().with_writer(writer).with_ansi(false).boxed()
                } else {
                    fmt::layer().with_writer(writer).with_ansi(false).boxed()
                };
                tracing_subscriber::registry()
                    .with(layer.with_filter(filter))
                    .try_init()
                    .ok();
                Some(guard)
            }
            None => {
                let layer = if config.json_format {
                    fmt::layer().json().with_writer(io::stderr).boxed()
                } else {
                    fmt::layer()
                        .compact()
                        .with_writer(io::stderr)
                        .with_target(true)
                        .boxed()
                };
                tracing_subscriber::registry()
                    .with(layer.with_filter(filter))
                    .try_init()
                    .ok();
                None
            }
        }
    });
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER.get().is_some()
}

// ============================================================================
// Bridge-specific logging functions
// ============================================================================

/// Log managed-runtime startup
pub fn log_runtime_start(generation: u64, option_count: usize) {
    use tracing::info;
    info!(
        event = "runtime_start",
        generation,
        options = option_count,
        "managed runtime started"
    );
}

/// Log managed-runtime shutdown
pub fn log_runtime_stop(generation: u64) {
    use tracing::info;
    info!(event = "runtime_stop", generation, "managed runtime stopped");
}

/// Log a remote method invocation
#[inline]
pub fn log_remote_call(method: &str, args: usize) {
    use tracing::debug;
    debug!(event = "remote_call", method, args, "remote method called");
}

/// Log a remote method return
#[inline]
pub fn log_remote_return(method: &str, success: bool) {
    use tracing::trace;
    trace!(event = "remote_return", method, success, "remote method returned");
}

/// Log a symbol that failed to resolve
pub fn log_symbol_miss(owner: &str, name: &str, signature: &str) {
    use tracing::error;
    error!(
        event = "symbol_miss",
        owner,
        name,
        signature,
        "remote symbol not found"
    );
}

/// Log a remote fault that has been described and cleared
pub fn log_remote_fault(method: &str, description: &str) {
    use tracing::error;
    error!(
        event = "remote_fault",
        method,
        description,
        "remote exception cleared"
    );
}

/// Performance tracking utilities
pub mod perf {
    use std::time::Instant;
    use tracing::debug;

    /// Track operation duration (returns guard that logs on drop)
    #[must_use]
    pub fn track(operation: &'static str) -> PerformanceGuard {
        PerformanceGuard {
            operation,
            start: Instant::now(),
        }
    }

    pub struct PerformanceGuard {
        operation: &'static str,
        start: Instant,
    }

    impl Drop for PerformanceGuard {
        fn drop(&mut self) {
            debug!(
                operation = self.operation,
                duration_us = self.start.elapsed().as_micros() as u64,
                "operation completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::WARN);
        assert!(config.log_path.is_none());

        assert_eq!(LogConfig::verbose().level, Level::DEBUG);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("TRACE"), Some(Level::TRACE));
        assert_eq!(parse_level("warning"), Some(Level::WARN));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_init_idempotent() {
        init();
        init(); // Should not panic
        assert!(is_initialized());
    }

    #[test]
    fn test_logging_functions() {
        log_runtime_start(1, 2);
        log_remote_call("rBlksEvresp", 12);
        log_remote_return("rBlksEvresp", true);
        log_symbol_miss("a/B", "c", "()V");
        log_remote_fault("rBlksEvresp", "java.lang.RuntimeException");
        log_runtime_stop(1);
        let _guard = perf::track("test");
    }
}
