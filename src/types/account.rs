//! Account-related types for the banking ledger
//!
//! This module defines the account identifier, the validated amount type and
//! the snapshot record written to the ledger file.

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use super::error::CommandError;

/// Number of fractional digits of the currency's smallest unit (centavos)
pub const CURRENCY_SCALE: u32 = 2;

/// Account identifier
///
/// Opaque, case-sensitive token. Never empty and never contains whitespace,
/// since it is read from a whitespace-separated command line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(String);

impl AccountId {
    /// Create an account identifier from a single protocol token
    ///
    /// Returns `None` if the token is empty or contains whitespace.
    pub fn new(token: &str) -> Option<Self> {
        if token.is_empty() || token.chars().any(char::is_whitespace) {
            return None;
        }
        Some(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A strictly positive monetary amount
///
/// An `Amount` can only be built through [`Amount::parse`] or
/// [`Amount::new`], both of which reject zero, negative values and values
/// finer than one centavo. Ledger operations take `Amount`, so invalid
/// amounts are refused before the ledger lock is ever taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(Decimal);

impl Amount {
    /// Validate a decimal as an amount
    pub fn new(value: Decimal) -> Option<Self> {
        let value = value.normalize();
        if value <= Decimal::ZERO || value.scale() > CURRENCY_SCALE {
            return None;
        }
        Some(Self(value))
    }

    /// Parse an amount token from the wire
    ///
    /// # Errors
    ///
    /// * `CommandError::InvalidAmount` - token is not a decimal number
    /// * `CommandError::NonPositiveAmount` - zero or negative
    /// * `CommandError::TooPrecise` - more than two fractional digits
    pub fn parse(token: &str) -> Result<Self, CommandError> {
        let value = Decimal::from_str(token).map_err(|_| CommandError::invalid_amount(token))?;
        let value = value.normalize();

        if value <= Decimal::ZERO {
            return Err(CommandError::non_positive_amount(token));
        }
        if value.scale() > CURRENCY_SCALE {
            return Err(CommandError::too_precise(token));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// One account of a ledger snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalance {
    pub account: AccountId,
    pub balance: Decimal,
}
