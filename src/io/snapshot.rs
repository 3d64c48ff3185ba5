//! Snapshot persistence for the ledger
//!
//! This module provides the two [`SnapshotStore`] implementations:
//! - [`CsvSnapshotStore`] - file-backed, atomically rewritten CSV document
//! - [`MemorySnapshotStore`] - in-process store for `--ephemeral` runs and tests
//!
//! # File Format
//!
//! ```text
//! account,balance
//! A100,0.00
//! B200,20.00
//! ```
//!
//! Rows are sorted by account id and balances are written with exactly two
//! decimals, so every balance round-trips to the centavo.

use crate::core::SnapshotStore;
use crate::types::{AccountBalance, AccountId, LedgerError, CURRENCY_SCALE};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// CSV row of the snapshot file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub account: String,
    pub balance: String,
}

/// Convert a SnapshotRecord to an AccountBalance
///
/// # Arguments
///
/// * `record` - The deserialized CSV row
/// * `line` - Line number of the row, for error reporting
///
/// # Returns
///
/// * `Ok(AccountBalance)` - Successfully converted row
/// * `Err(LedgerError::Snapshot)` - Invalid account id, or a balance that is
///   not a non-negative decimal with at most two fractional digits
pub fn convert_snapshot_record(
    record: SnapshotRecord,
    line: u64,
) -> Result<AccountBalance, LedgerError> {
    let account = AccountId::new(record.account.trim()).ok_or_else(|| LedgerError::Snapshot {
        line: Some(line),
        message: format!("invalid account id '{}'", record.account),
    })?;

    let balance = Decimal::from_str(record.balance.trim()).map_err(|_| LedgerError::Snapshot {
        line: Some(line),
        message: format!("invalid balance '{}'", record.balance),
    })?;

    if balance.is_sign_negative() && !balance.is_zero() {
        return Err(LedgerError::Snapshot {
            line: Some(line),
            message: format!("negative balance {} for account {}", balance, account),
        });
    }

    // Saves write two decimals; anything finer would be rounded away
    if balance.normalize().scale() > CURRENCY_SCALE {
        return Err(LedgerError::Snapshot {
            line: Some(line),
            message: format!(
                "balance {} for account {} has more than two decimal places",
                balance, account
            ),
        });
    }

    Ok(AccountBalance { account, balance })
}

/// File-backed snapshot store
///
/// `save` writes the whole ledger to `<path>.tmp` and renames it over
/// `<path>`, so a crash mid-write leaves either the previous snapshot or the
/// new one, never a torn file.
#[derive(Debug, Clone)]
pub struct CsvSnapshotStore {
    path: PathBuf,
}

impl CsvSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl SnapshotStore for CsvSnapshotStore {
    fn load(&self) -> Result<Option<Vec<AccountBalance>>, LedgerError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut snapshot = Vec::new();
        for (index, result) in reader.deserialize::<SnapshotRecord>().enumerate() {
            // Header is line 1
            let line = index as u64 + 2;
            snapshot.push(convert_snapshot_record(result?, line)?);
        }

        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &[AccountBalance]) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.temp_path();
        let file = File::create(&temp_path)?;
        let mut writer = csv::Writer::from_writer(file);

        for entry in snapshot {
            writer.serialize(SnapshotRecord {
                account: entry.account.to_string(),
                balance: format!("{:.2}", entry.balance),
            })?;
        }

        // An empty ledger still gets a header so the file stays loadable
        if snapshot.is_empty() {
            writer.write_record(["account", "balance"])?;
        }

        writer.flush()?;
        let mut file = writer.into_inner().map_err(|e| LedgerError::Io {
            message: e.to_string(),
        })?;
        file.flush()?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

/// In-process snapshot store
///
/// Keeps the last saved snapshot in memory and counts saves.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshot: Mutex<Option<Vec<AccountBalance>>>,
    saves: AtomicUsize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a snapshot, as if from a previous run
    pub fn with_snapshot(snapshot: Vec<AccountBalance>) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of successful saves so far
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Last saved snapshot
    pub fn snapshot(&self) -> Option<Vec<AccountBalance>> {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<Vec<AccountBalance>>, LedgerError> {
        Ok(self.snapshot())
    }

    fn save(&self, snapshot: &[AccountBalance]) -> Result<(), LedgerError> {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.to_vec());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
