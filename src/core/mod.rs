//! Core business logic module
//!
//! This module contains the concurrency-and-consistency engine:
//! - `traits` - Persistence abstraction used by the ledger
//! - `ledger` - Account balances behind a single critical section
//! - `limiter` - Admission limiter bounding in-flight commands
//! - `executor` - Deadline-bound execution of one command

pub mod executor;
pub mod ledger;
pub mod limiter;
pub mod traits;

pub use executor::{OperationExecutor, Outcome};
pub use ledger::Ledger;
pub use limiter::{AdmissionLimiter, AdmissionPermit};
pub use traits::SnapshotStore;
