//! # Observability
//!
//! Logging setup shared by every snip crate.
//!
//! Library crates only emit events through the standard `tracing` macros and
//! never install a subscriber themselves. The binary calls
//! [`init_with_config`] once at startup, which wires:
//!
//! - a JSONL file layer (`~/.snip/logs/snip.jsonl` by default), one object per
//!   line with timestamp, level, service, pid, target, message and fields
//! - an optional compact stderr layer for interactive runs
//!
//! The level filter comes from `RUST_LOG` when set, otherwise from
//! [`LogConfig::default_level`].
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "cli".into(),
//!     default_level: "warn".into(),
//!     ..Default::default()
//! });
//! tracing::info!("ready");
//! ```

mod json_layer;
mod writer;

use std::io;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use json_layer::{JsonLayer, LogEntry};
pub use writer::{FileLogWriter, WriterFactory};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "cli").
    /// Included in every log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.snip/logs/snip.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr for immediate feedback.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

impl LogConfig {
    /// Resolve the log file path, falling back to the default location.
    ///
    /// Returns `None` when no path was configured and the home directory
    /// cannot be determined.
    pub fn resolved_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(default_log_path)
    }
}

/// Default log file location: `~/.snip/logs/snip.jsonl`.
fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".snip").join("logs").join("snip.jsonl"))
}

/// Initialize the logging system with default settings.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize the logging system with custom configuration.
///
/// Safe to call more than once; only the first call installs a subscriber.
/// A log file that cannot be opened disables the file layer instead of
/// failing startup.
pub fn init_with_config(config: LogConfig) {
    let file_layer = config.resolved_log_path().and_then(|path| {
        match FileLogWriter::new(&path) {
            Ok(writer) => Some(JsonLayer::new(
                config.service_name.clone(),
                WriterFactory::new(writer),
            )),
            Err(e) => {
                eprintln!("observability: cannot open log file {}: {}", path.display(), e);
                None
            }
        }
    });

    let stderr_layer = if config.also_stderr {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_writer(io::stderr),
        )
    } else {
        None
    };

    let result = tracing_subscriber::registry()
        .with(file_layer.map(|l| l.with_filter(env_filter(&config.default_level))))
        .with(stderr_layer.map(|l| l.with_filter(env_filter(&config.default_level))))
        .try_init();

    if result.is_ok() {
        tracing::debug!(
            service = %config.service_name,
            log_path = ?config.resolved_log_path(),
            "observability initialized"
        );
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(!config.also_stderr);
    }

    #[test]
    fn test_resolved_log_path_prefers_explicit_path() {
        let config = LogConfig {
            log_path: Some(PathBuf::from("/tmp/snip-test.jsonl")),
            ..Default::default()
        };
        assert_eq!(
            config.resolved_log_path(),
            Some(PathBuf::from("/tmp/snip-test.jsonl"))
        );
    }

    #[test]
    fn test_default_log_path_lives_under_snip_dir() {
        if let Some(path) = default_log_path() {
            assert!(path.ends_with(".snip/logs/snip.jsonl"));
        }
    }
}
