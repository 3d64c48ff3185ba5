//! Wire protocol of the banking server
//!
//! This module centralizes all wire format concerns:
//! - Parsing one request line into a [`Command`]
//! - Rendering one [`Response`] as the reply line
//!
//! Both directions are pure (no I/O) for easy testing.
//!
//! # Commands
//!
//! | Line | Command |
//! |------|---------|
//! | `DEPOSITAR <conta> <valor>` | deposit |
//! | `SACAR <conta> <valor>` | withdraw |
//! | `SALDO <conta>` | balance |
//! | `TRANSFERIR <origem> <destino> <valor>` | transfer |
//! | `SAIR` | sign-off |
//!
//! Verbs are case-insensitive, account ids are not.

use crate::types::{AccountId, Amount, Command, CommandError, LedgerError, Receipt};
use rust_decimal::Decimal;
use std::fmt;

/// Maximum accepted request line length in bytes
pub const MAX_LINE_LENGTH: usize = 1024;

const DEPOSIT_USAGE: &str = "DEPOSITAR <conta> <valor>";
const WITHDRAW_USAGE: &str = "SACAR <conta> <valor>";
const BALANCE_USAGE: &str = "SALDO <conta>";
const TRANSFER_USAGE: &str = "TRANSFERIR <origem> <destino> <valor>";
const SIGN_OFF_USAGE: &str = "SAIR";

/// Parse one request line into a Command
///
/// # Arguments
///
/// * `line` - A single line, without its terminator
///
/// # Returns
///
/// * `Ok(Command)` - Well-formed command
/// * `Err(CommandError)` - Unknown verb, wrong argument count or bad amount
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((verb, args)) = tokens.split_first() else {
        return Err(CommandError::unknown_operation(""));
    };

    match verb.to_uppercase().as_str() {
        "DEPOSITAR" => match args {
            [account, amount] => Ok(Command::Deposit {
                account: account_id(account, DEPOSIT_USAGE)?,
                amount: Amount::parse(amount)?,
            }),
            _ => Err(CommandError::wrong_arity(DEPOSIT_USAGE)),
        },
        "SACAR" => match args {
            [account, amount] => Ok(Command::Withdraw {
                account: account_id(account, WITHDRAW_USAGE)?,
                amount: Amount::parse(amount)?,
            }),
            _ => Err(CommandError::wrong_arity(WITHDRAW_USAGE)),
        },
        "SALDO" => match args {
            [account] => Ok(Command::Balance {
                account: account_id(account, BALANCE_USAGE)?,
            }),
            _ => Err(CommandError::wrong_arity(BALANCE_USAGE)),
        },
        "TRANSFERIR" => match args {
            [from, to, amount] => Ok(Command::Transfer {
                from: account_id(from, TRANSFER_USAGE)?,
                to: account_id(to, TRANSFER_USAGE)?,
                amount: Amount::parse(amount)?,
            }),
            _ => Err(CommandError::wrong_arity(TRANSFER_USAGE)),
        },
        "SAIR" => match args {
            [] => Ok(Command::SignOff),
            _ => Err(CommandError::wrong_arity(SIGN_OFF_USAGE)),
        },
        _ => Err(CommandError::unknown_operation(verb)),
    }
}

fn account_id(token: &str, usage: &'static str) -> Result<AccountId, CommandError> {
    AccountId::new(token).ok_or_else(|| CommandError::wrong_arity(usage))
}

/// One reply line sent back to the client
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The ledger accepted the command
    Receipt(Receipt),

    /// The line was rejected before reaching the ledger
    Rejected(CommandError),

    /// The source account did not cover the amount
    InsufficientFunds { account: AccountId },

    /// The command exceeded its deadline
    TimedOut,

    /// The server is shutting down and no longer admits commands
    Unavailable,

    /// The command could not be completed for a server-side reason
    InternalError,
}

impl Response {
    /// Map a ledger result onto a reply
    pub fn from_ledger(result: Result<Receipt, LedgerError>) -> Self {
        match result {
            Ok(receipt) => Response::Receipt(receipt),
            Err(LedgerError::InsufficientFunds { account, .. }) => {
                Response::InsufficientFunds { account }
            }
            Err(_) => Response::InternalError,
        }
    }

    /// Whether the connection is closed after this reply
    pub fn closes_session(&self) -> bool {
        matches!(self, Response::Receipt(Receipt::SignedOff))
    }
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value)
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Receipt(Receipt::Deposited {
                account, amount, ..
            }) => write!(
                f,
                "Depósito de R${} realizado com sucesso na conta {}.",
                amount, account
            ),
            Response::Receipt(Receipt::Withdrawn {
                account, amount, ..
            }) => write!(
                f,
                "Saque de R${} realizado com sucesso da conta {}.",
                amount, account
            ),
            Response::Receipt(Receipt::Balance { account, balance }) => {
                write!(f, "Saldo da conta {}: {}", account, money(*balance))
            }
            Response::Receipt(Receipt::Transferred {
                from, to, amount, ..
            }) => write!(
                f,
                "Transferência de R${} da conta {} para a conta {} realizada com sucesso.",
                amount, from, to
            ),
            Response::Receipt(Receipt::SignedOff) => f.write_str("Desconectando do servidor..."),
            Response::Rejected(error) => match error {
                CommandError::UnknownOperation { .. } => f.write_str(
                    "Operação inválida. Use DEPOSITAR, SACAR, SALDO, TRANSFERIR ou SAIR.",
                ),
                CommandError::WrongArity { usage } => {
                    write!(f, "Argumentos inválidos. Uso: {}", usage)
                }
                CommandError::InvalidAmount { value } => write!(f, "Valor inválido: {}", value),
                CommandError::NonPositiveAmount { value } => {
                    write!(f, "Valor deve ser positivo: {}", value)
                }
                CommandError::TooPrecise { value } => {
                    write!(f, "Valor com mais de duas casas decimais: {}", value)
                }
                CommandError::LineTooLong { max } => {
                    write!(f, "Linha excede o tamanho máximo de {} bytes.", max)
                }
                CommandError::InvalidEncoding => {
                    f.write_str("Linha contém caracteres inválidos (UTF-8 esperado).")
                }
            },
            Response::InsufficientFunds { account } => {
                write!(f, "Saldo insuficiente na conta {}.", account)
            }
            Response::TimedOut => f.write_str("Operação demorou muito para ser concluída."),
            Response::Unavailable => {
                f.write_str("Servidor em desligamento. Tente novamente mais tarde.")
            }
            Response::InternalError => f.write_str("Erro interno ao processar a operação."),
        }
    }
}
