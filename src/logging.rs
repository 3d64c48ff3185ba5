//! Logging setup
//!
//! Structured logs via `tracing`. `RUST_LOG` takes precedence over the
//! configured level. Logs go to stderr unless a log file is given, in which
//! case they are appended to it without ANSI colors.

use crate::types::ServerError;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// # Errors
///
/// Returns [`ServerError::Logging`] if the filter is invalid, the log file
/// cannot be opened, or a subscriber is already installed.
pub fn init(level: &str, log_file: Option<&Path>) -> Result<(), ServerError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(logging_error)?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| ServerError::Logging {
                    message: format!("cannot open {}: {}", path.display(), e),
                })?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(logging_error)
        }
        None => builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(logging_error),
    }
}

fn logging_error(e: impl std::fmt::Display) -> ServerError {
    ServerError::Logging {
        message: e.to_string(),
    }
}
