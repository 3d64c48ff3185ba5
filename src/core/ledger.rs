//! Account ledger
//!
//! This module provides the [`Ledger`], the single authoritative mapping of
//! account ids to balances.
//!
//! # Design
//!
//! Every operation runs under one `Mutex` covering the whole map. Per-account
//! locks would force `transfer` to take two locks in a fixed order; one
//! critical section makes every deposit, withdrawal and transfer linearizable
//! and keeps transfers trivially atomic.
//!
//! After a committed mutation the full snapshot is handed to the
//! [`SnapshotStore`] while the lock is still held, so saves are serialized by
//! the same critical section and never interleave.
//!
//! # Invariants
//!
//! - Every balance is >= 0 before and after every operation
//! - A failed operation leaves the map untouched and is not persisted
//! - Balance queries never create accounts

use crate::core::SnapshotStore;
use crate::types::{AccountBalance, AccountId, Amount, Command, LedgerError, Receipt};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info};

type Accounts = HashMap<AccountId, Decimal>;

/// In-memory ledger with a single mutual-exclusion domain
pub struct Ledger {
    accounts: Mutex<Accounts>,
    store: Arc<dyn SnapshotStore>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("accounts", &self.lock().len())
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Create a ledger from the store's last snapshot
    ///
    /// A missing snapshot is a first run. An unreadable one is reported and
    /// the ledger starts empty; neither is a startup failure.
    pub fn open(store: Arc<dyn SnapshotStore>) -> Self {
        let accounts: Accounts = match store.load() {
            Ok(Some(snapshot)) => {
                info!(accounts = snapshot.len(), "Loaded ledger snapshot");
                snapshot
                    .into_iter()
                    .map(|entry| (entry.account, entry.balance))
                    .collect()
            }
            Ok(None) => {
                info!("No ledger snapshot found, starting with an empty ledger");
                HashMap::new()
            }
            Err(e) => {
                info!(error = %e, "Ledger snapshot unreadable, starting with an empty ledger");
                HashMap::new()
            }
        };

        Self {
            accounts: Mutex::new(accounts),
            store,
        }
    }

    // Writes happen only after every check passes, so a poisoned map is
    // still consistent.
    fn lock(&self) -> MutexGuard<'_, Accounts> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist the current state; errors are logged, never returned
    ///
    /// Must be called with the lock held.
    fn commit(&self, accounts: &Accounts) {
        if let Err(e) = self.store.save(&sorted_snapshot(accounts)) {
            error!(error = %e, "Failed to save ledger snapshot, in-memory state kept");
        }
    }

    /// Credit `amount` to `account`, creating it if needed
    ///
    /// # Returns
    ///
    /// * `Ok(balance)` - the new balance
    /// * `Err(LedgerError::ArithmeticOverflow)` - the credit would overflow
    pub fn deposit(&self, account: &AccountId, amount: Amount) -> Result<Decimal, LedgerError> {
        let mut accounts = self.lock();

        let current = accounts.get(account).copied().unwrap_or(Decimal::ZERO);
        let balance = current
            .checked_add(amount.value())
            .ok_or_else(|| LedgerError::arithmetic_overflow("deposit", account))?;

        accounts.insert(account.clone(), balance);
        self.commit(&accounts);
        Ok(balance)
    }

    /// Debit `amount` from `account`
    ///
    /// # Returns
    ///
    /// * `Ok(balance)` - the new balance
    /// * `Err(LedgerError::InsufficientFunds)` - balance lower than `amount`,
    ///   nothing changed
    pub fn withdraw(&self, account: &AccountId, amount: Amount) -> Result<Decimal, LedgerError> {
        let mut accounts = self.lock();

        let current = accounts.get(account).copied().unwrap_or(Decimal::ZERO);
        if current < amount.value() {
            return Err(LedgerError::insufficient_funds(
                account,
                current,
                amount.value(),
            ));
        }

        let balance = current - amount.value();
        accounts.insert(account.clone(), balance);
        self.commit(&accounts);
        Ok(balance)
    }

    /// Move `amount` from `from` to `to` in one step
    ///
    /// A self-transfer is a successful no-op and is not persisted.
    ///
    /// # Returns
    ///
    /// * `Ok((from_balance, to_balance))` - both balances after the transfer
    /// * `Err(LedgerError::InsufficientFunds)` - source balance lower than
    ///   `amount`, nothing changed
    /// * `Err(LedgerError::ArithmeticOverflow)` - the credit would overflow,
    ///   nothing changed
    pub fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(Decimal, Decimal), LedgerError> {
        let mut accounts = self.lock();

        let from_current = accounts.get(from).copied().unwrap_or(Decimal::ZERO);
        if from == to {
            return Ok((from_current, from_current));
        }

        if from_current < amount.value() {
            return Err(LedgerError::insufficient_funds(
                from,
                from_current,
                amount.value(),
            ));
        }

        let to_current = accounts.get(to).copied().unwrap_or(Decimal::ZERO);
        let to_balance = to_current
            .checked_add(amount.value())
            .ok_or_else(|| LedgerError::arithmetic_overflow("transfer", to))?;
        let from_balance = from_current - amount.value();

        accounts.insert(from.clone(), from_balance);
        accounts.insert(to.clone(), to_balance);
        self.commit(&accounts);
        Ok((from_balance, to_balance))
    }

    /// Current balance of `account`, zero if it does not exist
    pub fn balance(&self, account: &AccountId) -> Decimal {
        self.lock().get(account).copied().unwrap_or(Decimal::ZERO)
    }

    /// Run a parsed command against the ledger
    ///
    /// `Command::SignOff` does not touch the ledger and yields
    /// `Receipt::SignedOff`.
    pub fn apply(&self, command: Command) -> Result<Receipt, LedgerError> {
        let receipt = match command {
            Command::Deposit { account, amount } => {
                let balance = self.deposit(&account, amount)?;
                info!(account = %account, amount = %amount, "Deposit committed");
                Receipt::Deposited {
                    account,
                    amount,
                    balance,
                }
            }
            Command::Withdraw { account, amount } => {
                let balance = self.withdraw(&account, amount)?;
                info!(account = %account, amount = %amount, "Withdrawal committed");
                Receipt::Withdrawn {
                    account,
                    amount,
                    balance,
                }
            }
            Command::Balance { account } => {
                let balance = self.balance(&account);
                debug!(account = %account, "Balance queried");
                Receipt::Balance { account, balance }
            }
            Command::Transfer { from, to, amount } => {
                let (from_balance, to_balance) = self.transfer(&from, &to, amount)?;
                info!(from = %from, to = %to, amount = %amount, "Transfer committed");
                Receipt::Transferred {
                    from,
                    to,
                    amount,
                    from_balance,
                    to_balance,
                }
            }
            Command::SignOff => Receipt::SignedOff,
        };

        Ok(receipt)
    }

    /// Sorted copy of every account and balance
    pub fn snapshot(&self) -> Vec<AccountBalance> {
        sorted_snapshot(&self.lock())
    }

    /// Save the current state, used for the final save on shutdown
    pub fn flush(&self) -> Result<(), LedgerError> {
        let accounts = self.lock();
        self.store.save(&sorted_snapshot(&accounts))
    }

    /// Sum of all balances, `None` if it does not fit in a decimal
    pub fn total(&self) -> Option<Decimal> {
        self.lock()
            .values()
            .try_fold(Decimal::ZERO, |sum, balance| sum.checked_add(*balance))
    }
}

fn sorted_snapshot(accounts: &Accounts) -> Vec<AccountBalance> {
    let mut snapshot: Vec<AccountBalance> = accounts
        .iter()
        .map(|(account, balance)| AccountBalance {
            account: account.clone(),
            balance: *balance,
        })
        .collect();
    snapshot.sort_by(|a, b| a.account.cmp(&b.account));
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemorySnapshotStore;
    use std::thread;

    fn account(id: &str) -> AccountId {
        AccountId::new(id).unwrap()
    }

    fn amount(value: &str) -> Amount {
        Amount::parse(value).unwrap()
    }

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn ledger() -> (Ledger, Arc<MemorySnapshotStore>) {
        let store = Arc::new(MemorySnapshotStore::new());
        (Ledger::open(store.clone()), store)
    }

    /// Store whose saves always fail
    struct FailingStore;

    impl SnapshotStore for FailingStore {
        fn load(&self) -> Result<Option<Vec<AccountBalance>>, LedgerError> {
            Err(LedgerError::Io {
                message: "disk on fire".to_string(),
            })
        }

        fn save(&self, _snapshot: &[AccountBalance]) -> Result<(), LedgerError> {
            Err(LedgerError::Io {
                message: "disk full".to_string(),
            })
        }
    }

    #[test]
    fn test_deposit_creates_account() {
        let (ledger, _) = ledger();

        let balance = ledger.deposit(&account("A100"), amount("50.00")).unwrap();

        assert_eq!(balance, dec("50.00"));
        assert_eq!(ledger.balance(&account("A100")), dec("50.00"));
    }

    #[test]
    fn test_withdraw_after_deposit() {
        let (ledger, _) = ledger();
        ledger.deposit(&account("A100"), amount("50.00")).unwrap();

        let balance = ledger.withdraw(&account("A100"), amount("30.00")).unwrap();

        assert_eq!(balance, dec("20.00"));
    }

    #[test]
    fn test_withdraw_insufficient_funds_leaves_balance() {
        let (ledger, store) = ledger();
        ledger.deposit(&account("A100"), amount("20.00")).unwrap();

        let result = ledger.withdraw(&account("A100"), amount("1000.00"));

        assert_eq!(
            result,
            Err(LedgerError::insufficient_funds(
                &account("A100"),
                dec("20.00"),
                dec("1000.00")
            ))
        );
        assert_eq!(ledger.balance(&account("A100")), dec("20.00"));
        assert_eq!(store.saves(), 1);
    }

    #[test]
    fn test_withdraw_from_unknown_account_does_not_create_it() {
        let (ledger, _) = ledger();

        assert!(ledger.withdraw(&account("X"), amount("1")).is_err());
        assert!(ledger.snapshot().is_empty());
    }

    #[test]
    fn test_transfer_moves_funds() {
        let (ledger, _) = ledger();
        ledger.deposit(&account("A100"), amount("20.00")).unwrap();

        let (from, to) = ledger
            .transfer(&account("A100"), &account("B200"), amount("20.00"))
            .unwrap();

        assert_eq!(from, Decimal::ZERO);
        assert_eq!(to, dec("20.00"));
        assert_eq!(ledger.balance(&account("A100")), Decimal::ZERO);
        assert_eq!(ledger.balance(&account("B200")), dec("20.00"));
    }

    #[test]
    fn test_transfer_insufficient_funds_changes_nothing() {
        let (ledger, store) = ledger();
        ledger.deposit(&account("A100"), amount("10")).unwrap();

        let result = ledger.transfer(&account("A100"), &account("B200"), amount("10.01"));

        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(ledger.balance(&account("A100")), dec("10"));
        assert_eq!(ledger.snapshot().len(), 1, "destination must not be created");
        assert_eq!(store.saves(), 1);
    }

    #[test]
    fn test_self_transfer_is_noop() {
        let (ledger, store) = ledger();
        ledger.deposit(&account("A100"), amount("5")).unwrap();

        let result = ledger.transfer(&account("A100"), &account("A100"), amount("3"));

        assert_eq!(result, Ok((dec("5"), dec("5"))));
        assert_eq!(ledger.balance(&account("A100")), dec("5"));
        assert_eq!(store.saves(), 1);
    }

    #[test]
    fn test_balance_of_unknown_account_is_zero_and_not_created() {
        let (ledger, store) = ledger();

        assert_eq!(ledger.balance(&account("nobody")), Decimal::ZERO);
        assert!(ledger.snapshot().is_empty());
        assert_eq!(store.saves(), 0);
    }

    #[test]
    fn test_balance_query_is_idempotent() {
        let (ledger, _) = ledger();
        ledger.deposit(&account("A100"), amount("12.34")).unwrap();

        let first = ledger.balance(&account("A100"));
        let second = ledger.balance(&account("A100"));

        assert_eq!(first, second);
    }

    #[test]
    fn test_saves_only_after_mutations() {
        let (ledger, store) = ledger();

        ledger.deposit(&account("A"), amount("10")).unwrap();
        ledger.balance(&account("A"));
        ledger.withdraw(&account("A"), amount("3")).unwrap();
        let _ = ledger.withdraw(&account("A"), amount("100"));
        ledger.transfer(&account("A"), &account("B"), amount("2")).unwrap();

        assert_eq!(store.saves(), 3);
        assert_eq!(
            store.snapshot().unwrap(),
            vec![
                AccountBalance {
                    account: account("A"),
                    balance: dec("5")
                },
                AccountBalance {
                    account: account("B"),
                    balance: dec("2")
                },
            ]
        );
    }

    #[test]
    fn test_open_restores_snapshot() {
        let store = Arc::new(MemorySnapshotStore::with_snapshot(vec![AccountBalance {
            account: account("B200"),
            balance: dec("20.00"),
        }]));

        let ledger = Ledger::open(store);

        assert_eq!(ledger.balance(&account("B200")), dec("20.00"));
    }

    #[test]
    fn test_save_failure_keeps_in_memory_state() {
        let ledger = Ledger::open(Arc::new(FailingStore));

        let balance = ledger.deposit(&account("A100"), amount("50")).unwrap();

        assert_eq!(balance, dec("50"));
        assert_eq!(ledger.balance(&account("A100")), dec("50"));
        assert!(ledger.flush().is_err());
    }

    #[test]
    fn test_deposit_overflow_is_rejected() {
        let (ledger, _) = ledger();
        let max = Amount::new(Decimal::MAX).unwrap();
        ledger.deposit(&account("A"), max).unwrap();

        let result = ledger.deposit(&account("A"), amount("1"));

        assert!(matches!(
            result,
            Err(LedgerError::ArithmeticOverflow { .. })
        ));
        assert_eq!(ledger.balance(&account("A")), Decimal::MAX);
    }

    #[test]
    fn test_apply_dispatches_commands() {
        let (ledger, _) = ledger();

        let receipt = ledger
            .apply(Command::Deposit {
                account: account("A100"),
                amount: amount("50"),
            })
            .unwrap();
        assert_eq!(
            receipt,
            Receipt::Deposited {
                account: account("A100"),
                amount: amount("50"),
                balance: dec("50"),
            }
        );

        let receipt = ledger
            .apply(Command::Balance {
                account: account("A100"),
            })
            .unwrap();
        assert_eq!(
            receipt,
            Receipt::Balance {
                account: account("A100"),
                balance: dec("50"),
            }
        );
    }

    #[test]
    fn test_conservation_under_mixed_operations() {
        let (ledger, _) = ledger();
        let accounts = ["A", "B", "C"].map(account);

        ledger.deposit(&accounts[0], amount("100")).unwrap();
        ledger.deposit(&accounts[1], amount("50")).unwrap();
        ledger.withdraw(&accounts[1], amount("20")).unwrap();
        let expected = dec("130");

        for i in 0..30 {
            let from = &accounts[i % 3];
            let to = &accounts[(i + 1) % 3];
            let _ = ledger.transfer(from, to, amount("7.5"));
            assert_eq!(ledger.total(), Some(expected));
        }

        for entry in ledger.snapshot() {
            assert!(entry.balance >= Decimal::ZERO);
        }
    }

    // Concurrent access tests
    // These tests verify that the single critical section linearizes
    // operations issued from many threads.
    #[test]
    fn test_concurrent_alternating_transfers_keep_balances() {
        let (ledger, _) = ledger();
        let ledger = Arc::new(ledger);
        ledger.deposit(&account("A"), amount("10")).unwrap();
        ledger.deposit(&account("B"), amount("10")).unwrap();

        let mut handles = vec![];
        for i in 0..100 {
            let ledger = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                let (from, to) = if i % 2 == 0 { ("A", "B") } else { ("B", "A") };
                let _ = ledger.transfer(&account(from), &account(to), amount("10"));
                assert!(ledger.balance(&account("A")) >= Decimal::ZERO);
                assert!(ledger.balance(&account("B")) >= Decimal::ZERO);
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        // Each transfer either moved 10 or failed; the total never changes
        assert_eq!(ledger.total(), Some(dec("20")));
        assert!(ledger.balance(&account("A")) >= Decimal::ZERO);
        assert!(ledger.balance(&account("B")) >= Decimal::ZERO);
    }

    #[test]
    fn test_concurrent_paired_transfers_restore_balances() {
        let (ledger, _) = ledger();
        let ledger = Arc::new(ledger);
        ledger.deposit(&account("A"), amount("1000")).unwrap();
        ledger.deposit(&account("B"), amount("1000")).unwrap();

        let mut handles = vec![];
        for i in 0..100 {
            let ledger = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                let (from, to) = if i % 2 == 0 { ("A", "B") } else { ("B", "A") };
                ledger
                    .transfer(&account(from), &account(to), amount("5"))
                    .unwrap();
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.balance(&account("A")), dec("1000"));
        assert_eq!(ledger.balance(&account("B")), dec("1000"));
    }

    #[test]
    fn test_concurrent_deposits_same_account() {
        let (ledger, store) = ledger();
        let ledger = Arc::new(ledger);

        let mut handles = vec![];
        for _ in 0..100 {
            let ledger = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                ledger.deposit(&account("A"), amount("0.01")).unwrap();
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.balance(&account("A")), dec("1.00"));
        assert_eq!(store.saves(), 100);
    }

    #[test]
    fn test_concurrent_withdrawals_never_overdraw() {
        let (ledger, _) = ledger();
        let ledger = Arc::new(ledger);
        ledger.deposit(&account("A"), amount("50")).unwrap();

        let mut handles = vec![];
        for _ in 0..20 {
            let ledger = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                ledger.withdraw(&account("A"), amount("5")).is_ok()
            }));
        }

        let successes = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 10);
        assert_eq!(ledger.balance(&account("A")), Decimal::ZERO);
    }
}
