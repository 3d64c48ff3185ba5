//! Banco Server
//!
//! TCP banking server with a line-oriented protocol.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin banco-server
//! cargo run --bin banco-server -- --port 12345 --ledger-file contas.csv
//! cargo run --bin banco-server -- --ephemeral --max-concurrent 8 --timeout-ms 2000
//! RUST_LOG=debug cargo run --bin banco-server -- --log-file banco.log
//! ```
//!
//! The server loads the snapshot file (if any), listens for clients and runs
//! until Ctrl-C. On shutdown it stops accepting, lets in-flight commands
//! finish and writes the snapshot one last time.
//!
//! # Exit Codes
//!
//! - 0: Clean shutdown
//! - 1: Startup error (bad log file, port in use, etc.)

use banco_server::cli::{self, CliArgs};
use banco_server::core::{Ledger, SnapshotStore};
use banco_server::io::{CsvSnapshotStore, MemorySnapshotStore};
use banco_server::logging;
use banco_server::server::BankServer;
use banco_server::types::ServerError;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

fn main() {
    let args = cli::parse_args();

    if let Err(e) = logging::init(args.log_level.as_directive(), args.log_file.as_deref()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(args) {
        error!(error = %e, "Server failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<(), ServerError> {
    let config = args.to_server_config();

    // Ledger work runs on the blocking pool; one thread per permit
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .max_blocking_threads(config.max_concurrent)
        .enable_all()
        .build()
        .map_err(|e| ServerError::Runtime {
            message: e.to_string(),
        })?;

    let store: Arc<dyn SnapshotStore> = if args.ephemeral {
        info!("Running without a snapshot file");
        Arc::new(MemorySnapshotStore::new())
    } else {
        Arc::new(CsvSnapshotStore::new(&args.ledger_file))
    };
    let ledger = Arc::new(Ledger::open(store));

    runtime.block_on(async move {
        let server = BankServer::bind(&config, ledger).await?;

        let shutdown = server.shutdown_token();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl-C");
                    shutdown.cancel();
                }
                Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
            }
        });

        server.run().await
    })
}
