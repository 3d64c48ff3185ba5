//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account identifiers, amounts and snapshot records
//! - `command`: Client commands and ledger receipts
//! - `error`: Error types for the banking server

pub mod account;
pub mod command;
pub mod error;

pub use account::{AccountBalance, AccountId, Amount, CURRENCY_SCALE};
pub use command::{Command, Receipt};
pub use error::{AdmissionError, CommandError, LedgerError, ServerError};
