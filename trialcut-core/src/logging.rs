//! Tracing setup: human-readable stderr plus optional JSON file logging.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter for the stderr layer (`RUST_LOG` syntax).
    #[serde(default = "default_level")]
    pub level: String,
    /// Directory for daily-rotated JSON logs; disabled when unset.
    #[serde(default)]
    pub json_log_dir: Option<PathBuf>,
    /// Filter for the JSON file layer.
    #[serde(default = "default_json_level")]
    pub json_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json_log_dir: None,
            json_level: default_json_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_json_level() -> String {
    "debug".to_string()
}

/// Install the global subscriber.
///
/// Returns the file writer guard when JSON logging is enabled; keep it alive
/// for the lifetime of the program. Calling this again after a subscriber is
/// installed is a no-op.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(&config.level));

    let mut dir_error = None;
    let json_dir = match &config.json_log_dir {
        Some(dir) => match std::fs::create_dir_all(dir) {
            Ok(()) => Some(dir),
            Err(e) => {
                dir_error = Some((dir, e));
                None
            }
        },
        None => None,
    };
    let (json_layer, guard) = match json_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "trialcut.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(&config.json_level));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    if tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("Subscriber already installed; keeping it");
    }
    if let Some((dir, e)) = dir_error {
        tracing::warn!(dir = %dir.display(), error = %e, "JSON log directory unavailable; file logging disabled");
    }
    guard
}
