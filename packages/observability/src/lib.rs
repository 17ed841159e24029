//! # Observability
//!
//! Process-wide logging setup for the allocation services.
//!
//! Services call [`init`] or [`init_with_config`] once at startup and use the
//! standard `tracing` macros everywhere else. They never know where their log
//! lines end up.
//!
//! Two sinks are available:
//!
//! - a compact, human-readable stderr layer (on by default)
//! - a JSONL file layer, one structured entry per line, enabled by setting
//!   [`LogConfig::log_path`]
//!
//! Both sinks honour `RUST_LOG`, falling back to [`LogConfig::default_level`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "redis-event-consumer".into(),
//!         default_level: "debug".into(),
//!         ..Default::default()
//!     });
//!
//!     tracing::info!("service started");
//! }
//! ```

mod file;
mod json_layer;

use std::io;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use file::{FileLogWriter, WriterFactory};
pub use json_layer::{JsonLayer, LogEntry};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, written into every JSONL entry.
    pub service_name: String,

    /// Default level filter (e.g. "debug", "info").
    /// Overridden by `RUST_LOG` when it is set.
    pub default_level: String,

    /// JSONL log file. No file sink is installed when unset.
    pub log_path: Option<PathBuf>,

    /// Emit compact logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: true,
        }
    }
}

/// Initialize logging with default settings for the named service.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with custom configuration.
///
/// If the JSONL file cannot be opened the file sink is skipped and a warning
/// is logged through the remaining sinks. Calling this twice in one process
/// is a no-op for the second call.
pub fn init_with_config(config: LogConfig) {
    let env_filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.default_level))
    };

    let mut file_error = None;
    let json_layer = match config.log_path.as_ref() {
        Some(path) => match FileLogWriter::new(path) {
            Ok(writer) => Some(
                JsonLayer::new(config.service_name.clone(), WriterFactory::new(writer))
                    .with_filter(env_filter()),
            ),
            Err(e) => {
                file_error = Some((path.clone(), e));
                None
            }
        },
        None => None,
    };

    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .compact()
            .with_writer(io::stderr)
            .with_filter(env_filter())
    });

    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if !installed {
        return;
    }

    match file_error {
        Some((path, e)) => {
            tracing::warn!(log_path = %path.display(), error = %e, "JSONL log sink disabled")
        }
        None => tracing::debug!(service = %config.service_name, "observability initialized"),
    }
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(config.also_stderr);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init("first");
        init("second");
        tracing::info!("still logging");
    }
}
