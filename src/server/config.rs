//! Server configuration

use crate::core::executor::DEFAULT_DEADLINE;
use crate::core::limiter::DEFAULT_CAPACITY;
use std::time::Duration;
use tracing::warn;

/// Default listening port
pub const DEFAULT_PORT: u16 = 12345;

/// Configuration for the TCP server
///
/// Controls where the server listens, how many commands may run against the
/// ledger at once and how long each command may take.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,
    /// TCP port to bind, 0 for an ephemeral port
    pub port: u16,
    /// Admission limiter capacity
    pub max_concurrent: usize,
    /// Per-command deadline
    pub timeout: Duration,
    /// Number of tokio worker threads
    pub worker_threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_concurrent: DEFAULT_CAPACITY,
            timeout: DEFAULT_DEADLINE,
            worker_threads: num_cpus::get(),
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig with custom values
    ///
    /// Zero values for the limiter capacity, the timeout or the worker thread
    /// count are invalid and fall back to their defaults with a warning.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        max_concurrent: usize,
        timeout: Duration,
        worker_threads: usize,
    ) -> Self {
        let default = Self::default();

        let max_concurrent = if max_concurrent == 0 {
            warn!(
                "Invalid max_concurrent ({}), using default ({})",
                max_concurrent, default.max_concurrent
            );
            default.max_concurrent
        } else {
            max_concurrent
        };

        let timeout = if timeout.is_zero() {
            warn!(
                "Invalid timeout (0 ms), using default ({} ms)",
                default.timeout.as_millis()
            );
            default.timeout
        } else {
            timeout
        };

        let worker_threads = if worker_threads == 0 {
            warn!(
                "Invalid worker_threads ({}), using default ({})",
                worker_threads, default.worker_threads
            );
            default.worker_threads
        } else {
            worker_threads
        };

        Self {
            host: host.into(),
            port,
            max_concurrent,
            timeout,
            worker_threads,
        }
    }

    /// Configuration for tests: loopback, ephemeral port
    pub fn local(max_concurrent: usize, timeout: Duration) -> Self {
        Self::new("127.0.0.1", 0, max_concurrent, timeout, 2)
    }
}
