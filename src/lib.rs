//! Banco Server Library
//! # Overview
//!
//! A TCP banking server: clients connect, send one command per line and get
//! one reply line per command. Balances live in a shared in-memory ledger and
//! are snapshotted to a CSV file after every change.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (AccountId, Amount, Command, errors)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Concurrency and consistency engine:
//!   - [`core::ledger`] - Balances and their atomic operations
//!   - [`core::limiter`] - Bound on commands in flight
//!   - [`core::executor`] - Per-command deadline
//! - [`io`] - Wire protocol and snapshot persistence
//! - [`server`] - Accept loop and connection sessions
//! - [`logging`] - Subscriber setup
//!
//! # Commands
//!
//! - **DEPOSITAR** `<conta> <valor>`: credit an account, creating it if needed
//! - **SACAR** `<conta> <valor>`: debit an account that covers the amount
//! - **SALDO** `<conta>`: report a balance, zero for unknown accounts
//! - **TRANSFERIR** `<origem> <destino> <valor>`: move funds atomically
//! - **SAIR**: close the connection
//!
//! # Guarantees
//!
//! - No balance ever goes negative
//! - Transfers conserve the total across all accounts
//! - The snapshot file never holds a partially written state
//! - At most `max_concurrent` commands touch the ledger at any moment

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod server;
pub mod types;

pub use core::{AdmissionLimiter, Ledger, OperationExecutor, SnapshotStore};
pub use io::{CsvSnapshotStore, MemorySnapshotStore, Response};
pub use server::{BankServer, ServerConfig};
pub use types::{
    AccountBalance, AccountId, Amount, Command, CommandError, LedgerError, Receipt, ServerError,
};
