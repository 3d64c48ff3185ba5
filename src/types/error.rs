//! Error types for the banking server
//!
//! This module defines all error types that can occur while serving clients.
//!
//! # Error Categories
//!
//! - **Protocol errors** ([`CommandError`]): malformed lines, wrong argument
//!   counts, bad amounts. Answered with a rejection line; the connection stays open.
//! - **Ledger errors** ([`LedgerError`]): insufficient funds (a normal business
//!   outcome), arithmetic overflow, snapshot I/O and parsing.
//! - **Admission errors** ([`AdmissionError`]): the limiter was closed on shutdown.
//! - **Server errors** ([`ServerError`]): startup failures, the only errors that
//!   terminate the process.

use rust_decimal::Decimal;
use thiserror::Error;

use super::account::AccountId;

/// Rejection of a command line before it reaches the ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// The first token is not a known verb
    #[error("Unknown operation '{verb}'")]
    UnknownOperation {
        /// The verb as received
        verb: String,
    },

    /// Argument count does not match the verb
    #[error("Wrong number of arguments, usage: {usage}")]
    WrongArity {
        /// Usage line of the verb
        usage: &'static str,
    },

    /// Amount token is not a decimal number
    #[error("Invalid amount '{value}'")]
    InvalidAmount {
        /// The amount token as received
        value: String,
    },

    /// Amount is zero or negative
    #[error("Amount must be positive, got '{value}'")]
    NonPositiveAmount {
        /// The amount token as received
        value: String,
    },

    /// Amount has more fractional digits than the currency's smallest unit
    #[error("Amount '{value}' has more than two decimal places")]
    TooPrecise {
        /// The amount token as received
        value: String,
    },

    /// Line exceeded the framing limit
    #[error("Line exceeds {max} bytes")]
    LineTooLong {
        /// Maximum accepted line length in bytes
        max: usize,
    },

    /// Line is not valid UTF-8
    #[error("Line is not valid UTF-8")]
    InvalidEncoding,
}

impl CommandError {
    /// Create an UnknownOperation error
    pub fn unknown_operation(verb: &str) -> Self {
        CommandError::UnknownOperation {
            verb: verb.to_string(),
        }
    }

    /// Create a WrongArity error
    pub fn wrong_arity(usage: &'static str) -> Self {
        CommandError::WrongArity { usage }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(value: &str) -> Self {
        CommandError::InvalidAmount {
            value: value.to_string(),
        }
    }

    /// Create a NonPositiveAmount error
    pub fn non_positive_amount(value: &str) -> Self {
        CommandError::NonPositiveAmount {
            value: value.to_string(),
        }
    }

    /// Create a TooPrecise error
    pub fn too_precise(value: &str) -> Self {
        CommandError::TooPrecise {
            value: value.to_string(),
        }
    }
}

/// Errors raised by the ledger and its persistence gateway
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Balance is lower than the requested amount
    ///
    /// A business outcome, not a failure: the ledger is left unchanged and
    /// the client gets a normal response line.
    #[error("Insufficient funds in account {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Account that would go negative
        account: AccountId,
        /// Balance at the time of the check
        available: Decimal,
        /// Requested amount
        requested: Decimal,
    },

    /// A credit would overflow the decimal range
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Account being credited
        account: AccountId,
    },

    /// I/O error while reading or writing the snapshot file
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// Snapshot file content could not be parsed
    #[error("Snapshot parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Snapshot {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::Snapshot {
            line,
            message: error.to_string(),
        }
    }
}

impl LedgerError {
    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: &AccountId, available: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            account: account.clone(),
            available,
            requested,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: &AccountId) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account: account.clone(),
        }
    }
}

/// The admission limiter no longer hands out permits
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("Admission limiter is closed")]
    Closed,
}

/// Fatal startup errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServerError {
    /// The listening socket could not be bound
    #[error("Failed to bind {addr}: {message}")]
    Bind {
        /// Address that was requested
        addr: String,
        /// Description of the bind failure
        message: String,
    },

    /// Generic I/O failure outside a session
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// Logging could not be initialized
    #[error("Failed to initialize logging: {message}")]
    Logging {
        /// Description of the failure
        message: String,
    },

    /// The async runtime could not be built
    #[error("Failed to create tokio runtime: {message}")]
    Runtime {
        /// Description of the failure
        message: String,
    },
}

impl From<std::io::Error> for ServerError {
    fn from(error: std::io::Error) -> Self {
        ServerError::Io {
            message: error.to_string(),
        }
    }
}
