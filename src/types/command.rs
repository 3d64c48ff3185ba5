//! Command-related types for the banking server
//!
//! This module defines the commands a client can issue and the receipts the
//! ledger produces for the ones that succeed.

use rust_decimal::Decimal;

use super::account::{AccountId, Amount};

/// Commands supported by the wire protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Credit funds to an account, creating it on first use
    Deposit { account: AccountId, amount: Amount },

    /// Debit funds from an account
    ///
    /// Requires a balance of at least `amount`.
    Withdraw { account: AccountId, amount: Amount },

    /// Query the current balance of an account
    ///
    /// Unknown accounts report a balance of zero and are not created.
    Balance { account: AccountId },

    /// Move funds between two accounts atomically
    ///
    /// The destination is created on first use.
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },

    /// End the session
    SignOff,
}

impl Command {
    /// Whether a successful run of this command changes the ledger
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Command::Deposit { .. } | Command::Withdraw { .. } | Command::Transfer { .. }
        )
    }

    /// Wire verb of the command, used in log fields
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Deposit { .. } => "DEPOSITAR",
            Command::Withdraw { .. } => "SACAR",
            Command::Balance { .. } => "SALDO",
            Command::Transfer { .. } => "TRANSFERIR",
            Command::SignOff => "SAIR",
        }
    }
}

/// Successful outcome of a ledger command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receipt {
    Deposited {
        account: AccountId,
        amount: Amount,
        balance: Decimal,
    },
    Withdrawn {
        account: AccountId,
        amount: Amount,
        balance: Decimal,
    },
    Balance {
        account: AccountId,
        balance: Decimal,
    },
    Transferred {
        from: AccountId,
        to: AccountId,
        amount: Amount,
        from_balance: Decimal,
        to_balance: Decimal,
    },
    /// The client signed off; the ledger was not touched
    SignedOff,
}
