use crate::core::executor::DEFAULT_DEADLINE;
use crate::core::limiter::DEFAULT_CAPACITY;
use crate::server::{ServerConfig, DEFAULT_PORT};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Banking server speaking a line-oriented TCP protocol
#[derive(Parser, Debug)]
#[command(name = "banco-server")]
#[command(about = "Line-oriented TCP banking server", long_about = None)]
pub struct CliArgs {
    /// Address to listen on
    #[arg(long, value_name = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, value_name = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Snapshot file holding every account balance
    #[arg(
        long = "ledger-file",
        value_name = "PATH",
        default_value = "contas.csv",
        help = "CSV snapshot loaded at startup and rewritten after every change"
    )]
    pub ledger_file: PathBuf,

    /// Keep balances in memory only
    #[arg(long, help = "Do not read or write the snapshot file")]
    pub ephemeral: bool,

    /// Maximum number of commands running against the ledger at once
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        default_value_t = DEFAULT_CAPACITY,
        help = "Maximum number of commands in flight (default: 5)"
    )]
    pub max_concurrent: usize,

    /// Per-command deadline in milliseconds
    #[arg(
        long = "timeout-ms",
        value_name = "MS",
        default_value_t = DEFAULT_DEADLINE.as_millis() as u64,
        help = "Deadline for each command in milliseconds (default: 5000)"
    )]
    pub timeout_ms: u64,

    /// Number of runtime worker threads
    #[arg(
        long = "worker-threads",
        value_name = "COUNT",
        help = "Runtime worker threads (default: CPU cores)"
    )]
    pub worker_threads: Option<usize>,

    /// Append logs to this file instead of stderr
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log verbosity, overridden by RUST_LOG
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: LogLevel,
}

/// Available log levels
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl CliArgs {
    /// Create a ServerConfig from CLI arguments
    ///
    /// Invalid values are corrected by [`ServerConfig::new`], which logs a
    /// warning for each fallback, so call this after logging is set up.
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig::new(
            self.host.clone(),
            self.port,
            self.max_concurrent,
            Duration::from_millis(self.timeout_ms),
            self.worker_threads.unwrap_or_else(num_cpus::get),
        )
    }
}

/// Interactive client for the banking server
#[derive(Parser, Debug)]
#[command(name = "banco-client")]
#[command(about = "Send commands typed on stdin to a banking server", long_about = None)]
pub struct ClientArgs {
    /// Server address
    #[arg(long, value_name = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port
    #[arg(long, value_name = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}
